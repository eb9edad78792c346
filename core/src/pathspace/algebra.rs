//! Path algebra: connects a light-subpath vertex to an eye-subpath vertex
//! (bidirectional path tracing's vertex-connection strategies) and merges a
//! light-subpath vertex with a nearby photon (vertex merging, used by
//! SPPM/VCM). Grounded on `original_source/include/lightmetrica/detail/
//! vcmutils.h`'s `Path::ConnectSubpaths`/`EvaluateF`/`EvaluatePathPDF`/
//! `EvaluateMISWeight_BDPT`/`EvaluateMISWeight_VCM`.
//!
//! The MIS weight of the strategy that actually produced a complete path is
//! the full power-heuristic denominator: for every `s' in 0..=n` (and, for
//! VCM, every `merge' in {false, true}`) that could have produced the same
//! vertex sequence, `path_pdf` recomputes that candidate's pdf from scratch
//! by walking the assembled sequence, exactly as `EvaluatePathPDF` does —
//! no running `pdfRev` state is kept on `PathVertex` between connections,
//! since `original_source` doesn't keep any either.

use crate::math::{Point2, Vector3};
use crate::pdf::{Measure, PDFVal};
use crate::scene::Scene;
use crate::sensor::Sensor;
use crate::spectrum::Spectrum;
use crate::surface_geometry::SurfaceGeometry;
use crate::Float;
use crate::{bsdf, pdf};

use super::subpath::Subpath;
use super::vertex::PathVertex;

pub struct Connection {
    /// Unweighted contribution of this `(s, t)` strategy (throughput of both
    /// subpaths times the connecting BSDF/geometry terms), before the MIS
    /// weight is applied.
    pub contribution: Spectrum,
    pub weight: Float,
    /// Set when `t == 0`: the light-subpath vertex projects onto the film at
    /// this raster position instead of the pixel the eye subpath was traced
    /// from (used by light tracing).
    pub raster_pos: Option<Point2>,
}

fn direction(from: &SurfaceGeometry, to: &SurfaceGeometry) -> Vector3 {
    (to.p - from.p).normalize()
}

fn visible(scene: &Scene, a: &SurfaceGeometry, b: &SurfaceGeometry) -> bool {
    let d = b.p - a.p;
    let dist = d.length();
    if dist <= 1e-6 {
        return true;
    }
    let dir = d * (1.0 / dist);
    let origin = crate::math::offset_ray_origin(a.p, Vector3::new(0.0, 0.0, 0.0), a.n, dir);
    let ray = crate::math::Ray::new(origin, dir, dist * (1.0 - 1e-3));
    !scene.intersect_p(&ray)
}

/// Evaluates the BSDF (or emitter/sensor boundary term) at vertex `v`,
/// between the direction towards `prev` (if any) and the direction towards
/// `next`. `apply_correction` is set on light-subpath vertices per Veach's
/// shading-normal asymmetry correction.
fn eval_vertex_f(v: &PathVertex, prev: Option<&SurfaceGeometry>, next: &SurfaceGeometry, apply_correction: bool) -> Spectrum {
    match (&v.bsdf, &v.emitter) {
        (Some(b), _) => {
            let wo_world = prev.map(|p| direction(&v.geom, p)).unwrap_or_else(|| v.geom.shading_n.to_vector());
            let wi_world = direction(&v.geom, next);
            let wo_local = v.geom.to_local(wo_world);
            let wi_local = v.geom.to_local(wi_world);
            let mut f = b.f(wo_local, wi_local);
            if apply_correction {
                let c = bsdf::shading_normal_correction(v.geom.shading_n, v.geom.n, wo_world, wi_world);
                f = f * c;
            }
            f
        }
        (None, Some(e)) => {
            let wo_world = direction(&v.geom, next);
            e.l(&v.geom, wo_world)
        }
        (None, None) => Spectrum::white(),
    }
}

/// Connects `light.vertices[s - 1]` to `eye.vertices[t - 1]` (both `s, t >=
/// 1`), the general-purpose BDPT vertex-connection strategy. Returns `None`
/// if the strategy is not legal (a specular vertex on either side) or the
/// connecting segment is occluded. `Connection::weight` is the full
/// `n + 1`-term BDPT power-heuristic weight (`mis_weight_connect`); VCM
/// discards it and substitutes `mis_weight_vcm`'s merge-inclusive weight
/// instead.
pub fn connect(scene: &Scene, sensor: &Sensor, light: &Subpath, eye: &Subpath, s: usize, t: usize) -> Option<Connection> {
    debug_assert!(s >= 1 && t >= 1);
    let vl = &light.vertices[s - 1];
    let ve = &eye.vertices[t - 1];
    if vl.is_specular() || ve.is_specular() {
        return None;
    }
    if !visible(scene, &vl.geom, &ve.geom) {
        return None;
    }

    let prev_l = if s >= 2 { Some(&light.vertices[s - 2].geom) } else { None };
    let prev_e = if t >= 2 { Some(&eye.vertices[t - 2].geom) } else { None };

    let fs_l = eval_vertex_f(vl, prev_l, &ve.geom, true);
    let fs_e = eval_vertex_f(ve, prev_e, &vl.geom, false);
    if fs_l.is_black() || fs_e.is_black() {
        return None;
    }

    let g = PDFVal::geometry_term(&vl.geom, &ve.geom);
    let contribution = vl.throughput * fs_l * g * fs_e * ve.throughput;
    if contribution.is_black() {
        return None;
    }

    let weight = mis_weight_connect(sensor, light, eye, s, t);
    Some(Connection { contribution, weight, raster_pos: None })
}

/// Projects `light.vertices[s - 1]` onto the sensor (light tracing, `t ==
/// 0`). Returns `None` if the vertex is specular, off-screen, or occluded.
pub fn connect_to_sensor(scene: &Scene, sensor: &Sensor, light: &Subpath, s: usize) -> Option<Connection> {
    let vl = &light.vertices[s - 1];
    if vl.is_specular() {
        return None;
    }
    let sensor_geom = sensor.geom();
    if !visible(scene, &vl.geom, &sensor_geom) {
        return None;
    }

    let wi_world = direction(&vl.geom, &sensor_geom);
    let raster_pos = sensor.raster_position(-wi_world)?;
    let (pdf_pos, pdf_dir) = sensor.pdf_we(-wi_world);
    if pdf_pos <= 0.0 || pdf_dir <= 0.0 {
        return None;
    }

    let prev_l = if s >= 2 { Some(&light.vertices[s - 2].geom) } else { None };
    let fs_l = eval_vertex_f(vl, prev_l, &sensor_geom, true);
    if fs_l.is_black() {
        return None;
    }

    let g = PDFVal::geometry_term(&vl.geom, &sensor_geom);
    let we = pdf_dir; // pinhole importance is uniform across the aperture; cosine terms already live in `g`.
    let contribution = vl.throughput * fs_l * g * we;

    // `t == 0`: there's no eye subpath on this strategy's side, so the empty
    // slice stands in for it — `mis_weight_connect` only reads `eye.vertices
    // [0..0]`, which is legal regardless of what `eye` actually contains.
    let empty_eye = Subpath { vertices: Vec::new() };
    let weight = mis_weight_connect(sensor, light, &empty_eye, s, 0);

    Some(Connection { contribution, weight, raster_pos: Some(raster_pos) })
}

/// Concatenates `light.vertices[0..s]` with `eye.vertices[0..t]` reversed,
/// mirroring `original_source`'s `Path::ConnectSubpaths` vertex layout: a
/// single fixed sequence describing one complete light-transport path,
/// independent of which `(s', t')` split is later hypothesized to have
/// produced it.
fn assemble<'a>(light: &'a Subpath, eye: &'a Subpath, s: usize, t: usize) -> Vec<&'a PathVertex> {
    let mut path = Vec::with_capacity(s + t);
    path.extend(light.vertices[0..s].iter());
    path.extend(eye.vertices[0..t].iter().rev());
    path
}

/// Directional sampling pdf (solid angle, converted to area measure at
/// `to`) of vertex `v`'s continuation towards `to`, having arrived from
/// `from` (`None` at a path endpoint). Dispatches on which boundary `v` is:
/// an interior BSDF vertex, a light endpoint (the emitter's directional
/// pdf), or an eye endpoint (the sensor's), mirroring `original_source`'s
/// unified `Surface::EvaluateDirectionPDF` that treats emitters, sensors and
/// BSDFs through the same interface.
fn vertex_dir_pdf(sensor: &Sensor, v: &PathVertex, from: Option<&PathVertex>, to: &PathVertex) -> Float {
    let wi_world = direction(&v.geom, &to.geom);
    if let Some(b) = &v.bsdf {
        let wo_world = from.map(|p| direction(&v.geom, &p.geom)).unwrap_or_else(|| v.geom.shading_n.to_vector());
        let pdf_dir = b.pdf(v.geom.to_local(wo_world), v.geom.to_local(wi_world));
        PDFVal::new(Measure::SolidAngle, pdf_dir).convert_to_area(&v.geom, &to.geom).value
    } else if let Some(e) = &v.emitter {
        let pdf_dir = e.pdf_li(to.geom.p, -wi_world);
        PDFVal::new(Measure::SolidAngle, pdf_dir).convert_to_area(&v.geom, &to.geom).value
    } else {
        let (_pdf_pos, pdf_dir) = sensor.pdf_we(wi_world);
        PDFVal::new(Measure::SolidAngle, pdf_dir).convert_to_area(&v.geom, &to.geom).value
    }
}

/// Pdf of the fixed, already-assembled complete path `path` (length `n`)
/// having been produced by strategy `(s, merge)`: `s` vertices sampled from
/// the light side, the remaining `n - s` from the eye side, connected either
/// by a deterministic BSDF-to-BSDF segment (`merge == false`) or a
/// kernel-scaled photon merge (`merge == true`). Zero wherever a vertex the
/// strategy needs to have sampled through is specular (its `Bsdf::pdf`
/// returns zero for any direction, so no separate delta check is needed) or
/// where a merge is requested at either path endpoint. Mirrors
/// `original_source`'s `Path::EvaluatePathPDF`.
fn path_pdf(sensor: &Sensor, path: &[&PathVertex], s: usize, merge: bool, radius: Float) -> Float {
    let n = path.len();
    if merge && (s == 0 || s == n) {
        return 0.0;
    }

    let mut value = 1.0;

    if s > 0 {
        value *= path[0].pdf_fwd.value;
        let last = if merge { s } else { s.saturating_sub(1) };
        for i in 0..last {
            let from = if i >= 1 { Some(path[i - 1]) } else { None };
            let d = vertex_dir_pdf(sensor, path[i], from, path[i + 1]);
            if d <= 0.0 {
                return 0.0;
            }
            value *= d;
        }
    }

    if s < n {
        value *= path[n - 1].pdf_fwd.value;
        for i in (s + 1..n).rev() {
            let from = if i + 1 < n { Some(path[i + 1]) } else { None };
            let d = vertex_dir_pdf(sensor, path[i], from, path[i - 1]);
            if d <= 0.0 {
                return 0.0;
            }
            value *= d;
        }
    }

    if merge {
        value *= std::f32::consts::PI * radius * radius;
    }
    value
}

/// The full `n + 1`-term BDPT power heuristic (spec.md §4.3): sums
/// `path_pdf(s')^2` over every connect-only strategy `s' in 0..=n` that
/// could have produced this exact complete path, and weighs the strategy
/// that actually produced it (`s`) against that sum. Used for every BDPT
/// splat (including the `s == 0` implicit emitter hit and the `t == 0`
/// light-tracing connection) so invariant 7 (weights over all strategies sum
/// to one) holds.
pub fn mis_weight_connect(sensor: &Sensor, light: &Subpath, eye: &Subpath, s: usize, t: usize) -> Float {
    let path = assemble(light, eye, s, t);
    let n = path.len();
    let p_used = path_pdf(sensor, &path, s, false, 0.0);
    if p_used <= 0.0 {
        return 0.0;
    }
    let mut denom = 0.0;
    for sp in 0..=n {
        let p = path_pdf(sensor, &path, sp, false, 0.0);
        denom += p * p;
    }
    if denom <= 0.0 {
        return 0.0;
    }
    (p_used * p_used) / denom
}

/// As `mis_weight_connect`, but the denominator also sums a merge candidate
/// at every split (spec.md §4.4: VCM's weight "sum[s] over all connection
/// strategies and all merge strategies jointly"), each scaled by
/// `num_photon_trace_samples` the way `EvaluateMISWeight_VCM` scales merge
/// terms by the number of photon-trace trials per eye sample. `merge_used`
/// selects whether the strategy actually used to produce this contribution
/// (`s`, `t`) was itself a connect or a merge.
#[allow(clippy::too_many_arguments)]
pub fn mis_weight_vcm(sensor: &Sensor, light: &Subpath, eye: &Subpath, s: usize, t: usize, merge_used: bool, radius: Float, num_photon_trace_samples: u32) -> Float {
    let path = assemble(light, eye, s, t);
    let n = path.len();
    let p_used = path_pdf(sensor, &path, s, merge_used, radius);
    if p_used <= 0.0 {
        return 0.0;
    }
    // Scaling by the trial count directly (not `max(1)`) means a zero
    // photon-trace budget drops every merge candidate from the sum, so this
    // reduces exactly to `mis_weight_connect`'s sum — `num_photon_trace_samples
    // == 0` must degenerate to plain BDPT bit-for-bit (spec.md's S6 scenario).
    let m = num_photon_trace_samples as Float;
    let mut denom = 0.0;
    for sp in 0..=n {
        let p_connect = path_pdf(sensor, &path, sp, false, 0.0);
        denom += p_connect * p_connect;
        let p_merge = path_pdf(sensor, &path, sp, true, radius);
        denom += p_merge * p_merge * m;
    }
    if denom <= 0.0 {
        return 0.0;
    }
    (p_used * p_used) / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::Accel;
    use crate::bsdf::{Bsdf, Diffuse};
    use crate::emitter::{AreaLight, Emitter};
    use crate::math::{Normal3, Point3};
    use crate::mesh::TriangleMesh;
    use crate::pathspace::{trace_eye_subpath_fixed_raster_pos, trace_light_subpath};
    use crate::primitive::Primitive;
    use crate::rng::Rng;
    use crate::sensor::Pinhole;
    use std::sync::Arc;

    #[test]
    fn weight_is_one_when_alternate_is_zero() {
        assert!((pdf::power_heuristic(1, 2.0, 1, 0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn weight_splits_evenly_when_equal() {
        assert!((pdf::power_heuristic(1, 1.0, 1, 1.0) - 0.5).abs() < 1e-6);
    }

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

    /// Testable invariant 7: summing `mis_weight_connect` over every legal
    /// `s' in 0..=n` for a fixed assembled path must total 1 within 1e-9.
    #[test]
    fn connect_weights_sum_to_one_across_every_split() {
        let (scene, sensor) = lit_floor_scene();
        let mut rng = Rng::for_stream(77, 0);
        let light = trace_light_subpath(&scene, &mut rng, 6);
        let eye = trace_eye_subpath_fixed_raster_pos(&scene, &sensor, &mut rng, 6, Point2::new(16.0, 16.0));
        if light.len() < 2 || eye.len() < 2 {
            return;
        }

        let path = assemble(&light, &eye, light.len(), eye.len());
        let n = path.len();
        let mut total = 0.0;
        let mut any_legal = false;
        for sp in 0..=n {
            let p = path_pdf(&sensor, &path, sp, false, 0.0);
            if p <= 0.0 {
                continue;
            }
            any_legal = true;
            total += mis_weight_connect(&sensor, &light, &eye, sp, n - sp);
        }
        if any_legal {
            assert!((total - 1.0).abs() < 1e-6, "weights should sum to ~1, got {}", total);
        }
    }

    #[test]
    fn vcm_weight_accounts_for_merge_candidates_in_its_denominator() {
        let (scene, sensor) = lit_floor_scene();
        let mut rng = Rng::for_stream(88, 0);
        let light = trace_light_subpath(&scene, &mut rng, 6);
        let eye = trace_eye_subpath_fixed_raster_pos(&scene, &sensor, &mut rng, 6, Point2::new(16.0, 16.0));
        if light.len() < 2 || eye.len() < 2 {
            return;
        }
        let s = light.len();
        let t = eye.len();
        let connect_only = mis_weight_connect(&sensor, &light, &eye, s, t);
        let vcm_weight = mis_weight_vcm(&sensor, &light, &eye, s, t, false, 0.5, 64);
        // Adding merge candidates to the denominator can only shrink (never
        // grow) the weight of a strategy that didn't itself use a merge.
        assert!(vcm_weight <= connect_only + 1e-6);
    }
}
