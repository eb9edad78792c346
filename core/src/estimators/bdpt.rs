//! Bidirectional path tracing: traces one light subpath and one eye subpath
//! per sample, then tries every `(s, t)` vertex-connection strategy with
//! `2 <= s + t <= max_vertices`, splatting `f * weight` at each legal one.
//! Grounded on
//! `original_source/src/liblightmetrica/renderer/renderer_vcmref.cpp`'s
//! `connect=true, merge=false` configuration (VCM specializes to BDPT when
//! photon merging is disabled, spec.md's S6 scenario).

use crate::film::Film;
use crate::math::Point2;
use crate::pathspace::{connect, connect_to_sensor, mis_weight_connect, trace_eye_subpath_fixed_raster_pos, trace_light_subpath};
use crate::rng::Rng;
use crate::scene::Scene;
use crate::sensor::Sensor;

/// Traces one (light, eye) subpath pair for pixel `(x, y)` / raster
/// position `p_film`, and splats every legal `(s, t)` connection strategy
/// into `film`. `t == 1` connections (direct light sampling at the first
/// eye vertex) and `s == 0` (implicit emitter hits, added during the eye
/// walk itself) land at `(x, y)`; `t == 0` connections (pure light tracing)
/// land wherever `connect_to_sensor` projects them.
pub fn render_sample(scene: &Scene, sensor: &Sensor, rng: &mut Rng, x: u32, y: u32, p_film: Point2, max_vertices: usize, film: &Film) {
    let light = trace_light_subpath(scene, rng, max_vertices);
    let eye = trace_eye_subpath_fixed_raster_pos(scene, sensor, rng, max_vertices, p_film);

    // s == 0: the eye subpath hit an emitter directly (already contributes
    // `throughput * Le` during the walk itself); value is folded in here
    // rather than in `subpath::walk` since it depends on the emitter field
    // set on the hit vertex, which `pathspace::vertex::PathVertex` stores.
    // This is just the `s' == 0` term of the same strategy space every
    // `(s, t)` connection below competes in, so it's weighted the same way.
    for i in 1..eye.len() {
        let ev = &eye.vertices[i];
        let Some(emitter) = &ev.emitter else { continue };
        let prev = &eye.vertices[i - 1];
        let wo = (prev.geom.p - ev.geom.p).normalize();
        let le = emitter.l(&ev.geom, wo);
        if !le.is_black() {
            let weight = mis_weight_connect(sensor, &light, &eye, 0, i + 1);
            film.add_sample(x, y, ev.throughput * le * weight, 1.0);
        }
    }

    for s in 1..=light.len() {
        for t in 1..=eye.len() {
            if s + t < 2 || s + t > max_vertices {
                continue;
            }
            if let Some(c) = connect(scene, sensor, &light, &eye, s, t) {
                film.add_sample(x, y, c.contribution * c.weight, 1.0);
            }
        }
    }

    for s in 1..=light.len() {
        if let Some(c) = connect_to_sensor(scene, sensor, &light, s) {
            if let Some(p) = c.raster_pos {
                let sx = (p.x as u32).min(film.width.saturating_sub(1));
                let sy = (p.y as u32).min(film.height.saturating_sub(1));
                film.add_splat(sx, sy, c.contribution * c.weight);
            }
        }
    }
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

    fn lit_floor_scene() -> (Scene, Sensor) {
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
        (scene, sensor)
    }

    #[test]
    fn render_sample_never_panics_and_accumulates_finite_values() {
        let (scene, sensor) = lit_floor_scene();
        let film = Film::new(32, 32);
        let mut rng = Rng::for_stream(13, 0);
        for _ in 0..32 {
            render_sample(&scene, &sensor, &mut rng, 16, 20, Point2::new(16.0, 20.0), 8, &film);
        }
        let buf = film.to_srgb_buffer(1.0);
        assert!(buf.iter().all(|&b| b <= 255));
    }
}
