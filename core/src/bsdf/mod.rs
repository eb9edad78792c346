//! Closed, compile-time-checked BSDF union: `Diffuse`, `RoughConductor`
//! (Beckmann microfacet), `SpecularDielectric`. Replaces the teacher's open
//! `BxDF` trait object / `BxDFHolder` arena allocation with a plain enum —
//! the path-space estimators need to pattern-match on delta-ness (is this
//! vertex connectable?) far more often than they need open extensibility.

mod diffuse;
mod fresnel;
mod microfacet;
mod specular;

pub use self::diffuse::{cosine_sample_hemisphere, Diffuse};
pub use self::fresnel::{fr_conductor, fr_dielectric};
pub use self::microfacet::{BeckmannDistribution, RoughConductor};
pub use self::specular::SpecularDielectric;

use crate::math::{Point2, Vector3};
use crate::rng::Rng;
use crate::spectrum::Spectrum;
use crate::Float;

/// Evaluated BSDF sample: outgoing direction, value already divided by its
/// own pdf is NOT done here (estimators need `f`, `pdf` and `wi` separately
/// to combine with MIS weights), so `f` is the raw BSDF value and `pdf` the
/// density of `wi` with respect to solid angle.
pub struct BsdfSample {
    pub wi: Vector3,
    pub f: Spectrum,
    pub pdf: Float,
    pub specular: bool,
}

#[derive(Clone, Debug)]
pub enum Bsdf {
    Diffuse(Diffuse),
    RoughConductor(RoughConductor),
    SpecularDielectric(SpecularDielectric),
}

impl Bsdf {
    pub fn is_specular(&self) -> bool {
        matches!(self, Bsdf::SpecularDielectric(_))
    }

    /// Evaluates `f(wo, wi)` in the local shading frame (both directions with
    /// `z` along the shading normal). Zero for specular BSDFs: there, `f` has
    /// no well-defined value except as a delta distribution reached only
    /// through `sample`. The shading/geometric-normal asymmetry correction
    /// for light-traced vertices is applied by the caller
    /// (`pathspace::algebra`), which has both normals in hand; this method
    /// only evaluates the local BSDF model.
    pub fn f(&self, wo: Vector3, wi: Vector3) -> Spectrum {
        match self {
            Bsdf::Diffuse(d) => d.f(wo, wi),
            Bsdf::RoughConductor(r) => r.f(wo, wi),
            Bsdf::SpecularDielectric(_) => Spectrum::black(),
        }
        .clamp_zero()
    }

    pub fn pdf(&self, wo: Vector3, wi: Vector3) -> Float {
        match self {
            Bsdf::Diffuse(d) => d.pdf(wo, wi),
            Bsdf::RoughConductor(r) => r.pdf(wo, wi),
            Bsdf::SpecularDielectric(_) => 0.0,
        }
    }

    pub fn sample(&self, wo: Vector3, u: Point2, rng: &mut Rng) -> Option<BsdfSample> {
        match self {
            Bsdf::Diffuse(d) => d.sample(wo, u),
            Bsdf::RoughConductor(r) => r.sample(wo, u),
            Bsdf::SpecularDielectric(s) => s.sample(wo, rng),
        }
    }
}

/// Shading/geometric-normal asymmetry correction for BSDF evaluations along
/// a light-traced (importance) subpath, per Veach's thesis §5.3.2. `ns`/`ng`
/// are the shading and geometric normals at the vertex, `wo`/`wi` the two
/// world-space directions the BSDF was evaluated between.
pub fn shading_normal_correction(
    ns: crate::math::Normal3,
    ng: crate::math::Normal3,
    wo: Vector3,
    wi: Vector3,
) -> Float {
    let num = wo.dot(ns.to_vector()).abs() * wi.dot(ng.to_vector()).abs();
    let denom = wo.dot(ng.to_vector()).abs() * wi.dot(ns.to_vector()).abs();
    if denom <= 0.0 {
        0.0
    } else {
        num / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Normal3;

    #[test]
    fn shading_normal_correction_is_identity_when_normals_match() {
        let n = Normal3::new(0.0, 0.0, 1.0);
        let wo = Vector3::new(0.0, 0.0, 1.0);
        let wi = Vector3::new(0.3, 0.1, 0.9).normalize();
        let c = shading_normal_correction(n, n, wo, wi);
        assert!((c - 1.0).abs() < 1e-5);
    }
}
