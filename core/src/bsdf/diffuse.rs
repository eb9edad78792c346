use std::f32::consts::{FRAC_1_PI, PI};

use super::BsdfSample;
use crate::math::{abs_cos_theta, same_hemisphere, Point2, Vector3};
use crate::spectrum::Spectrum;
use crate::Float;

/// Lambertian reflection. Ported from the teacher's `LambertianReflection`
/// BxDF, cosine-weighted importance sampling via `cosine_sample_hemisphere`.
#[derive(Clone, Debug)]
pub struct Diffuse {
    pub albedo: Spectrum,
}

impl Diffuse {
    pub fn new(albedo: Spectrum) -> Diffuse {
        Diffuse { albedo }
    }

    pub fn f(&self, wo: Vector3, wi: Vector3) -> Spectrum {
        if same_hemisphere(&wo, &wi) {
            self.albedo * FRAC_1_PI
        } else {
            Spectrum::black()
        }
    }

    pub fn pdf(&self, wo: Vector3, wi: Vector3) -> Float {
        if same_hemisphere(&wo, &wi) {
            abs_cos_theta(&wi) * FRAC_1_PI
        } else {
            0.0
        }
    }

    pub fn sample(&self, wo: Vector3, u: Point2) -> Option<BsdfSample> {
        let mut wi = cosine_sample_hemisphere(u);
        if wo.z < 0.0 {
            wi.z = -wi.z;
        }
        let pdf = self.pdf(wo, wi);
        if pdf <= 0.0 {
            return None;
        }
        Some(BsdfSample { wi, f: self.f(wo, wi), pdf, specular: false })
    }
}

/// Concentric disk-to-hemisphere cosine-weighted sample, Shirley-Chiu mapping.
pub fn cosine_sample_hemisphere(u: Point2) -> Vector3 {
    let d = concentric_sample_disk(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vector3::new(d.x, d.y, z)
}

fn concentric_sample_disk(u: Point2) -> crate::math::Point2 {
    use crate::math::Point2 as P2;
    let ux = 2.0 * u.x - 1.0;
    let uy = 2.0 * u.y - 1.0;
    if ux == 0.0 && uy == 0.0 {
        return P2::new(0.0, 0.0);
    }
    let (r, theta) = if ux.abs() > uy.abs() {
        (ux, (PI / 4.0) * (uy / ux))
    } else {
        (uy, PI / 2.0 - (PI / 4.0) * (ux / uy))
    };
    P2::new(r * theta.cos(), r * theta.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_stays_in_same_hemisphere_as_wo() {
        let d = Diffuse::new(Spectrum::white());
        let wo = Vector3::new(0.0, 0.0, 1.0);
        let sample = d.sample(wo, Point2::new(0.25, 0.75)).unwrap();
        assert!(sample.wi.z > 0.0);
        assert!((sample.pdf - d.pdf(wo, sample.wi)).abs() < 1e-6);
    }
}
