//! Plain path tracing: walk an eye subpath via BSDF sampling, add emitted
//! radiance whenever the walk lands on an emitter, no next-event
//! estimation. Grounded on
//! `original_source/src/liblightmetrica/renderer/renderer_pt.cpp`.

use crate::math::{offset_ray_origin, Point2, Ray, Vector3};
use crate::rng::Rng;
use crate::scene::Scene;
use crate::sensor::{Sensor, SensorSample};
use crate::spectrum::Spectrum;
use crate::Float;

const RUSSIAN_ROULETTE_START_INDEX: usize = 3;

/// Estimates radiance arriving at `p_film` with a single eye-subpath sample.
pub fn estimate(scene: &Scene, sensor: &Sensor, rng: &mut Rng, p_film: Point2, max_vertices: usize) -> Spectrum {
    let (px, py) = (rng.next_float(), rng.next_float());
    let sample = SensorSample { p_film, p_lens: Point2::new(px, py) };
    let mut ray = sensor.generate_ray(sample);
    let mut throughput = Spectrum::white();
    let mut l = Spectrum::black();
    let mut vertex_count = 1usize;

    while vertex_count < max_vertices {
        let hit = match scene.intersect(&ray) {
            Some(h) => h,
            None => break,
        };
        vertex_count += 1;

        let primitive = &scene.primitives[hit.primitive_index];
        if let Some(emitter) = &primitive.emitter {
            l = l + throughput * emitter.l(&hit.geom, -ray.d);
        }

        let wo_local = hit.geom.to_local(-ray.d);
        let u = Point2::new(rng.next_float(), rng.next_float());
        let bsdf_sample = match primitive.bsdf.sample(wo_local, u, rng) {
            Some(s) if s.pdf > 0.0 && !s.f.is_black() => s,
            _ => break,
        };
        let wi_world = hit.geom.to_world(bsdf_sample.wi);
        let cos = bsdf_sample.wi.z.abs();
        throughput = throughput * bsdf_sample.f * (cos / bsdf_sample.pdf);

        if vertex_count >= RUSSIAN_ROULETTE_START_INDEX {
            let continue_prob = throughput.max_component().min(1.0).max(0.0);
            if continue_prob <= 0.0 || rng.next_float() >= continue_prob {
                break;
            }
            throughput = throughput * (1.0 / continue_prob);
        }

        let origin = offset_ray_origin(hit.geom.p, Vector3::new(0.0, 0.0, 0.0), hit.geom.n, wi_world);
        ray = Ray::new(origin, wi_world, Float::INFINITY);
    }

    l
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::Accel;
    use crate::bsdf::{Bsdf, Diffuse};
    use crate::emitter::{AreaLight, Emitter};
    use crate::math::{Normal3, Point3};
    use crate::mesh::TriangleMesh;
    use crate::primitive::Primitive;
    use crate::sensor::Pinhole;
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
    fn averaged_estimate_is_nonnegative_and_finite() {
        let (scene, sensor) = lit_floor_scene();
        let mut rng = Rng::for_stream(7, 0);
        let mut sum = Spectrum::black();
        for _ in 0..64 {
            sum = sum + estimate(&scene, &sensor, &mut rng, Point2::new(16.0, 20.0), 8);
        }
        assert!(!sum.has_nan());
        assert!(sum.max_component() >= 0.0);
    }
}
