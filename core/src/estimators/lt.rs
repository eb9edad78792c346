//! Light tracing: symmetric to `pt` but starting from the emitter. At each
//! non-specular light-subpath vertex, attempts a direct connection to the
//! sensor and splats the result at the raster position the connection
//! projects onto. Grounded on
//! `original_source/src/liblightmetrica/renderer/renderer_lt.cpp`.

use crate::film::Film;
use crate::pathspace::{connect_to_sensor, trace_light_subpath};
use crate::rng::Rng;
use crate::scene::Scene;
use crate::sensor::Sensor;

/// Traces one light subpath and splats every legal sensor connection into
/// `film`. Returns the number of connections splatted (used by the caller
/// to normalize the overall splat contribution by total sample count).
pub fn trace_and_splat(scene: &Scene, sensor: &Sensor, rng: &mut Rng, max_vertices: usize, film: &Film) -> u32 {
    let subpath = trace_light_subpath(scene, rng, max_vertices);
    let mut splats = 0;
    for s in 1..=subpath.len() {
        if let Some(connection) = connect_to_sensor(scene, sensor, &subpath, s) {
            if let Some(p) = connection.raster_pos {
                let x = (p.x as u32).min(film.width.saturating_sub(1));
                let y = (p.y as u32).min(film.height.saturating_sub(1));
                film.add_splat(x, y, connection.contribution * connection.weight);
                splats += 1;
            }
        }
    }
    splats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::Accel;
    use crate::bsdf::{Bsdf, Diffuse};
    use crate::emitter::{AreaLight, Emitter};
    use crate::math::{Normal3, Point3, Vector3};
    use crate::mesh::TriangleMesh;
    use crate::primitive::Primitive;
    use crate::sensor::Pinhole;
    use crate::spectrum::Spectrum;
    use std::sync::Arc;

    #[test]
    fn light_tracing_never_panics_on_a_simple_scene() {
        let n = Normal3::new(0.0, 1.0, 0.0);
        let positions = vec![
            Point3::new(-5.0, 0.0, -5.0),
            Point3::new(5.0, 0.0, -5.0),
            Point3::new(5.0, 0.0, 5.0),
            Point3::new(-5.0, 0.0, 5.0),
        ];
        let mesh = Arc::new(TriangleMesh::new(positions, vec![n, n, n, n], vec![[0, 1, 2], [0, 2, 3]]));
        let floor = Primitive::new(mesh, Bsdf::Diffuse(Diffuse { albedo: Spectrum::grey(0.8) }), None);

        let light_n = Normal3::new(0.0, -1.0, 0.0);
        let light_positions = vec![
            Point3::new(-1.0, 3.0, -1.0),
            Point3::new(1.0, 3.0, -1.0),
            Point3::new(1.0, 3.0, 1.0),
            Point3::new(-1.0, 3.0, 1.0),
        ];
        let light_mesh = Arc::new(TriangleMesh::new(light_positions, vec![light_n, light_n, light_n, light_n], vec![[0, 1, 2], [0, 2, 3]]));
        let area_light = Arc::new(Emitter::Area(AreaLight::new(Arc::clone(&light_mesh), Spectrum::grey(10.0), false)));
        let light_prim = Primitive::new(light_mesh, Bsdf::Diffuse(Diffuse { albedo: Spectrum::black() }), Some(Arc::clone(&area_light)));

        let primitives = vec![floor, light_prim];
        let accel = Accel::build_bvh(&primitives);
        let scene = Scene::new(primitives, vec![area_light], accel);
        let sensor = Sensor::Pinhole(Pinhole::new(
            Point3::new(0.0, 1.0, -4.0),
            Point3::new(0.0, 1.0, 1.0),
            Vector3::new(0.0, 1.0, 0.0),
            60.0,
            (32, 32),
        ));
        let film = Film::new(32, 32);
        let mut rng = Rng::for_stream(3, 0);
        for _ in 0..16 {
            trace_and_splat(&scene, &sensor, &mut rng, 8, &film);
        }
    }
}
