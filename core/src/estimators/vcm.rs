//! Vertex connection and merging: runs BDPT's connection strategies and
//! additionally, at every non-specular eye vertex, gathers nearby
//! light-subpath vertices from a shared photon map and splats the merge
//! contribution `Bsdf::f(eye, photon) * photon.throughput / (pi * radius^2)`.
//! Grounded on
//! `original_source/src/liblightmetrica/renderer/renderer_vcm_bdpm_nopathreuse.cpp`
//! and `vcmutils.cpp`'s `Path::MergeSubpaths`/`EvaluateMISWeight_VCM`. With
//! `num_photon_trace_samples == 0` this degenerates to plain BDPT (spec.md's
//! S6 scenario), since the photon map built from zero subpaths has no merge
//! candidates and every weight below reduces to `mis_weight_connect`'s.
//!
//! Every splat here (implicit hits, connections, merges) is weighted by
//! `mis_weight_vcm`, whose denominator sums both connect *and* merge
//! candidates at every split — the joint MIS combination spec.md §4.4
//! requires so that connect and merge don't double-count the same path.

use crate::film::Film;
use crate::math::Point2;
use crate::pathspace::{connect, connect_to_sensor, mis_weight_vcm, trace_eye_subpath_fixed_raster_pos, Subpath};
use crate::photonmap::PhotonMap;
use crate::rng::Rng;
use crate::scene::Scene;
use crate::sensor::Sensor;
use crate::Float;

/// Splats every BDPT connection strategy for one eye subpath against a
/// per-sample light subpath (picked by `sample_index`, wrapping around the
/// batch the way the batch's size was chosen for — `scheduler` arranges for
/// there to be as many light subpaths as pixels per iteration) and its
/// shared photon map, plus the merge strategy at each non-specular eye
/// vertex within `radius`. Mirrors `estimators::bdpt::render_sample`'s
/// connection loop, with an added merge pass.
#[allow(clippy::too_many_arguments)]
pub fn render_sample(
    scene: &Scene,
    sensor: &Sensor,
    rng: &mut Rng,
    x: u32,
    y: u32,
    p_film: Point2,
    max_vertices: usize,
    light_subpaths: &[Subpath],
    sample_index: usize,
    photon_map: &PhotonMap,
    radius: Float,
    num_photon_trace_samples: u32,
    film: &Film,
) {
    let eye = trace_eye_subpath_fixed_raster_pos(scene, sensor, rng, max_vertices, p_film);

    let light = if light_subpaths.is_empty() { None } else { Some(&light_subpaths[sample_index % light_subpaths.len()]) };

    for i in 1..eye.len() {
        let ev = &eye.vertices[i];
        if let Some(emitter) = &ev.emitter {
            let prev = &eye.vertices[i - 1];
            let wo = (prev.geom.p - ev.geom.p).normalize();
            let le = emitter.l(&ev.geom, wo);
            if !le.is_black() {
                let weight = match light {
                    Some(l) => mis_weight_vcm(sensor, l, &eye, 0, i + 1, false, radius, num_photon_trace_samples),
                    None => 1.0,
                };
                film.add_sample(x, y, ev.throughput * le * weight, 1.0);
            }
        }
    }

    // Connection strategies: this sample's own light subpath (not a shared
    // batch-wide one — every pixel gets a distinct subpath so the estimator
    // is genuinely per-sample, matching `bdpt::render_sample`'s contract).
    if let Some(light) = light {
        for s in 1..=light.len() {
            for t in 1..=eye.len() {
                if s + t < 2 || s + t > max_vertices {
                    continue;
                }
                if let Some(c) = connect(scene, sensor, light, &eye, s, t) {
                    let weight = mis_weight_vcm(sensor, light, &eye, s, t, false, radius, num_photon_trace_samples);
                    film.add_sample(x, y, c.contribution * weight, 1.0);
                }
            }
        }
        for s in 1..=light.len() {
            if let Some(c) = connect_to_sensor(scene, sensor, light, s) {
                if let Some(p) = c.raster_pos {
                    let empty_eye = Subpath { vertices: Vec::new() };
                    let weight = mis_weight_vcm(sensor, light, &empty_eye, s, 0, false, radius, num_photon_trace_samples);
                    let sx = (p.x as u32).min(film.width.saturating_sub(1));
                    let sy = (p.y as u32).min(film.height.saturating_sub(1));
                    film.add_splat(sx, sy, c.contribution * weight);
                }
            }
        }
    }

    if num_photon_trace_samples == 0 {
        return;
    }

    for i in 1..eye.len() {
        let ev = &eye.vertices[i];
        if ev.is_specular() || !ev.is_connectable() {
            continue;
        }
        let Some(bsdf) = &ev.bsdf else { continue };
        let prev = &eye.vertices[i - 1];
        let wo_local = ev.geom.to_local((prev.geom.p - ev.geom.p).normalize());
        let t = i + 1;

        let mut contribution = crate::spectrum::Spectrum::black();
        let area = std::f32::consts::PI * radius * radius;
        photon_map.range_query(ev.geom.p, radius, |si, vi, _d2| {
            let photon_subpath = &light_subpaths[si as usize];
            let photon = &photon_subpath.vertices[vi as usize];
            let photon_prev = &photon_subpath.vertices[vi as usize - 1];
            let wi_world = (photon_prev.geom.p - photon.geom.p).normalize();
            let wi_local = ev.geom.to_local(wi_world);
            let f = bsdf.f(wo_local, wi_local);
            if f.is_black() {
                return;
            }
            let s = vi as usize + 1;
            let weight = mis_weight_vcm(sensor, photon_subpath, &eye, s, t, true, radius, num_photon_trace_samples);
            if weight <= 0.0 {
                return;
            }
            contribution = contribution + f * photon.throughput * (weight / (area * num_photon_trace_samples as Float));
        });
        if !contribution.is_black() {
            film.add_sample(x, y, ev.throughput * contribution, 1.0);
        }
    }
}
