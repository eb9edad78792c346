//! Path tracing with next-event estimation and MIS against BSDF sampling.
//! At every non-specular eye vertex, samples one light directly and also
//! keeps the BSDF-sampled continuation's potential emitter hit, combining
//! both with the (two-strategy) power heuristic. Grounded on
//! `original_source/src/liblightmetrica/renderer/renderer_ptmis.cpp`.

use crate::math::{offset_ray_origin, Point2, Ray, Vector3};
use crate::pdf::power_heuristic;
use crate::rng::Rng;
use crate::scene::Scene;
use crate::sensor::{Sensor, SensorSample};
use crate::spectrum::Spectrum;
use crate::Float;

const RUSSIAN_ROULETTE_START_INDEX: usize = 3;

fn sample_direct_light(scene: &Scene, rng: &mut Rng, p: crate::math::Point3, n: crate::math::Normal3, wo_local: Vector3, geom: &crate::surface_geometry::SurfaceGeometry, bsdf: &crate::bsdf::Bsdf) -> Spectrum {
    if scene.lights.is_empty() {
        return Spectrum::black();
    }
    let n_lights = scene.lights.len();
    let light_index = ((rng.next_float() * n_lights as Float) as usize).min(n_lights - 1);
    let p_choice = 1.0 / n_lights as Float;
    let light = &scene.lights[light_index];

    let u = Point2::new(rng.next_float(), rng.next_float());
    let li_sample = light.sample_li(p, u);
    if li_sample.pdf <= 0.0 || li_sample.li.is_black() {
        return Spectrum::black();
    }

    let wi_local = geom.to_local(li_sample.wi);
    let f = bsdf.f(wo_local, wi_local) * wi_local.z.abs();
    if f.is_black() {
        return Spectrum::black();
    }

    let origin = offset_ray_origin(p, Vector3::new(0.0, 0.0, 0.0), n, li_sample.wi);
    let dist = (li_sample.p_light - origin).length();
    let shadow_ray = Ray::new(origin, li_sample.wi, dist * (1.0 - 1e-3));
    if scene.intersect_p(&shadow_ray) {
        return Spectrum::black();
    }

    let p_area = li_sample.pdf * p_choice;
    if light.is_delta() {
        f * li_sample.li / p_area
    } else {
        let scattering_pdf = bsdf.pdf(wo_local, wi_local);
        let weight = power_heuristic(1, p_area, 1, scattering_pdf);
        f * li_sample.li * weight / p_area
    }
}

pub fn estimate(scene: &Scene, sensor: &Sensor, rng: &mut Rng, p_film: Point2, max_vertices: usize) -> Spectrum {
    let (px, py) = (rng.next_float(), rng.next_float());
    let sample = SensorSample { p_film, p_lens: Point2::new(px, py) };
    let mut ray = sensor.generate_ray(sample);
    let mut throughput = Spectrum::white();
    let mut l = Spectrum::black();
    let mut vertex_count = 1usize;
    let mut prev_bsdf_pdf: Option<Float> = None;

    while vertex_count < max_vertices {
        let hit = match scene.intersect(&ray) {
            Some(h) => h,
            None => break,
        };
        vertex_count += 1;

        let primitive = &scene.primitives[hit.primitive_index];
        if let Some(emitter) = &primitive.emitter {
            let le = emitter.l(&hit.geom, -ray.d);
            if !le.is_black() {
                let weight = match prev_bsdf_pdf {
                    Some(bsdf_pdf) => {
                        let light_pdf = emitter.pdf_li(ray.o, ray.d) / scene.lights.len().max(1) as Float;
                        power_heuristic(1, bsdf_pdf, 1, light_pdf)
                    }
                    None => 1.0,
                };
                l = l + throughput * le * weight;
            }
        }

        if primitive.bsdf.is_specular() {
            // Delta BSDFs can't be sampled by NEE; fall straight through to
            // BSDF-sampled continuation below.
        } else {
            let wo_local = hit.geom.to_local(-ray.d);
            l = l + throughput * sample_direct_light(scene, rng, hit.geom.p, hit.geom.n, wo_local, &hit.geom, &primitive.bsdf);
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
        prev_bsdf_pdf = Some(bsdf_sample.pdf);

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
        let mut rng = Rng::for_stream(11, 0);
        let mut sum = Spectrum::black();
        for _ in 0..64 {
            sum = sum + estimate(&scene, &sensor, &mut rng, Point2::new(16.0, 20.0), 8);
        }
        assert!(!sum.has_nan());
        assert!(sum.max_component() >= 0.0);
    }

    #[test]
    fn direct_light_sampling_finds_the_visible_area_light() {
        let (scene, _sensor) = lit_floor_scene();
        let mut rng = Rng::for_stream(5, 0);
        let p = Point3::new(0.0, 0.0, 0.0);
        let n = Normal3::new(0.0, 1.0, 0.0);
        let geom = crate::surface_geometry::SurfaceGeometry {
            p,
            n,
            shading_n: n,
            u: n.to_vector().coordinate_system().0,
            v: n.to_vector().coordinate_system().1,
            degenerate: false,
        };
        let bsdf = Bsdf::Diffuse(Diffuse { albedo: Spectrum::grey(0.8) });
        let wo_local = geom.to_local(Vector3::new(0.0, 1.0, 0.0));
        let mut sum = Spectrum::black();
        for _ in 0..32 {
            sum = sum + sample_direct_light(&scene, &mut rng, p, n, wo_local, &geom, &bsdf);
        }
        assert!(!sum.has_nan());
        assert!(sum.max_component() > 0.0);
    }
}
