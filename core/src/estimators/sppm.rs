//! Stochastic progressive photon mapping: per iteration, trace one eye
//! subpath per pixel down to its first non-specular hit (the *measurement
//! point*), trace a batch of photons from the lights, build a k-d tree over
//! them, then gather photons within each measurement point's current radius
//! and apply the paper's shrinking-radius update rule. Grounded on
//! `original_source/src/liblightmetrica/renderer/renderer_ppm.cpp` (the
//! `N_i`/`tau_i`/`r_i` recurrence in spec.md §4.4 matches this file's loop).

use crate::math::{Point2, Vector3};
use crate::pathspace::{trace_eye_subpath_fixed_raster_pos, trace_light_subpath, PathVertex};
use crate::photonmap::PhotonMap;
use crate::rng::Rng;
use crate::scene::Scene;
use crate::sensor::Sensor;
use crate::spectrum::Spectrum;
use crate::Float;

/// One pixel's accumulated photon-mapping state, carried across iterations.
pub struct MeasurementPoint {
    pub vertex: Option<PathVertex>,
    /// Direction from the measurement vertex towards its predecessor on the
    /// eye subpath — fixed for the vertex's `Bsdf::f`'s `wo` argument across
    /// every photon gathered against it.
    pub wo_world: Vector3,
    pub direct_emission: Spectrum,
    pub n_photons: Float,
    pub tau: Spectrum,
    pub radius: Float,
}

impl MeasurementPoint {
    pub fn new(initial_radius: Float) -> MeasurementPoint {
        MeasurementPoint {
            vertex: None,
            wo_world: Vector3::new(0.0, 0.0, 0.0),
            direct_emission: Spectrum::black(),
            n_photons: 0.0,
            tau: Spectrum::black(),
            radius: initial_radius,
        }
    }
}

/// Traces the eye subpath for one pixel down to its first non-specular
/// surface hit (or an emitter hit, recorded as direct emission) and stores
/// it in `mp` for the gather step.
pub fn trace_measurement_point(scene: &Scene, sensor: &Sensor, rng: &mut Rng, p_film: Point2, max_vertices: usize, mp: &mut MeasurementPoint) {
    let eye = trace_eye_subpath_fixed_raster_pos(scene, sensor, rng, max_vertices, p_film);
    mp.vertex = None;
    for i in 1..eye.len() {
        let v = &eye.vertices[i];
        if let Some(emitter) = &v.emitter {
            let prev = &eye.vertices[i - 1];
            let wo = (prev.geom.p - v.geom.p).normalize();
            mp.direct_emission = mp.direct_emission + v.throughput * emitter.l(&v.geom, wo);
        }
        if v.is_connectable() {
            let prev = &eye.vertices[i - 1];
            mp.wo_world = (prev.geom.p - v.geom.p).normalize();
            mp.vertex = Some(v.clone());
            break;
        }
    }
}

/// Traces `num_photons` light subpaths and returns them as the raw material
/// for a `PhotonMap::build` call.
pub fn trace_photons(scene: &Scene, rng: &mut Rng, num_photons: u32, max_vertices: usize) -> Vec<crate::pathspace::Subpath> {
    (0..num_photons).map(|_| trace_light_subpath(scene, rng, max_vertices)).collect()
}

/// Gathers photons around `mp`'s measurement point and applies the SPPM
/// shrinking-radius update. `alpha` is the paper's `0 < alpha < 1` radius
/// reduction factor. No-op if this pixel has no non-specular measurement
/// point this iteration.
pub fn gather_and_update(mp: &mut MeasurementPoint, photon_subpaths: &[crate::pathspace::Subpath], photon_map: &PhotonMap, alpha: Float) {
    let Some(vertex) = &mp.vertex else { return };
    let Some(bsdf) = &vertex.bsdf else { return };

    let mut delta_tau = Spectrum::black();
    let mut count = 0.0_f32;
    let wo_local = vertex.geom.to_local(mp.wo_world);
    photon_map.range_query(vertex.geom.p, mp.radius, |si, vi, _d2| {
        let photon = &photon_subpaths[si as usize].vertices[vi as usize];
        let prev = &photon_subpaths[si as usize].vertices[vi as usize - 1];
        // incident direction at the photon vertex, reversed to get the
        // direction radiance arrived *from* at the measurement point.
        let wi_world = (prev.geom.p - photon.geom.p).normalize();
        let wi_local = vertex.geom.to_local(wi_world);
        let f = bsdf.f(wo_local, wi_local);
        if !f.is_black() {
            delta_tau = delta_tau + f * photon.throughput;
            count += 1.0;
        }
    });

    if count > 0.0 {
        let n_new = mp.n_photons + alpha * count;
        mp.tau = (mp.tau + vertex.throughput * delta_tau) * ((n_new) / (mp.n_photons + count));
        mp.radius *= ((n_new) / (mp.n_photons + count)).sqrt();
        mp.n_photons = n_new;
    }
}

/// Resolves a measurement point's accumulated state into a final pixel
/// value, per spec.md §4.4's `tau_i / (pi r_i^2 * total_photon_samples) +
/// direct_emission_i / iteration_count`.
pub fn resolve_pixel(mp: &MeasurementPoint, total_photon_samples: Float, iteration_count: Float) -> Spectrum {
    let photon_term = if mp.radius > 0.0 && total_photon_samples > 0.0 {
        mp.tau * (1.0 / (std::f32::consts::PI * mp.radius * mp.radius * total_photon_samples))
    } else {
        Spectrum::black()
    };
    photon_term + mp.direct_emission * (1.0 / iteration_count.max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::Accel;
    use crate::bsdf::{Bsdf, Diffuse};
    use crate::emitter::{AreaLight, Emitter};
    use crate::math::{Normal3, Point3};
    use crate::mesh::TriangleMesh;
    use crate::photonmap::PhotonMap;
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
            crate::math::Vector3::new(0.0, 1.0, 0.0),
            60.0,
            (32, 32),
        ));
        (scene, sensor)
    }

    #[test]
    fn gather_and_update_shrinks_radius_and_accumulates_tau() {
        let (scene, sensor) = lit_floor_scene();
        let mut rng = Rng::for_stream(17, 0);

        let mut mp = MeasurementPoint::new(1.0);
        trace_measurement_point(&scene, &sensor, &mut rng, Point2::new(16.0, 20.0), 8, &mut mp);
        assert!(mp.vertex.is_some(), "eye ray should hit the diffuse floor");

        let photons = trace_photons(&scene, &mut rng, 256, 8);
        let map = PhotonMap::build(&photons);

        let radius_before = mp.radius;
        gather_and_update(&mut mp, &photons, &map, 0.7);
        assert!(mp.radius <= radius_before);
        assert!(!mp.tau.has_nan());

        let pixel = resolve_pixel(&mp, 256.0, 1.0);
        assert!(!pixel.has_nan());
        assert!(pixel.max_component() >= 0.0);
    }
}
