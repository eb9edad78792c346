//! Beckmann microfacet distribution with visible-normal sampling, and the
//! `RoughConductor` BRDF built on top of it. Ported near-verbatim from the
//! teacher's `bsdf::microfacet::BeckmannDistribution`/`MicrofacetReflection`.

use std::f32::consts::{self, PI};

use super::fresnel::fr_conductor;
use super::BsdfSample;
use crate::math::{
    abs_cos_theta, cos_theta, same_hemisphere, Point2, Vector3,
};
use crate::spectrum::Spectrum;
use crate::Float;

fn cos_phi(w: &Vector3) -> Float {
    let st = crate::math::sin_theta(w);
    if st == 0.0 {
        0.0
    } else {
        crate::clamp(w.x / st, -1.0, 1.0)
    }
}

fn sin_phi(w: &Vector3) -> Float {
    let st = crate::math::sin_theta(w);
    if st == 0.0 {
        0.0
    } else {
        crate::clamp(w.y / st, -1.0, 1.0)
    }
}

fn tan2_theta(w: &Vector3) -> Float {
    crate::math::sin2_theta(w) / crate::math::cos2_theta(w)
}

fn spherical_direction(sin_theta: Float, cos_theta: Float, phi: Float) -> Vector3 {
    Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Polynomial approximation of the inverse Gauss error function, used by the
/// Beckmann visible-normal sampling routine.
fn erf_inv(x: Float) -> Float {
    let x = crate::clamp(x, -0.99999, 0.99999);
    let mut w = -((1.0 - x) * (1.0 + x)).ln();
    let p;
    if w < 5.0 {
        w -= 2.5;
        let mut pp = 2.810_226_36e-08;
        pp = 3.432_739_39e-07 + pp * w;
        pp = -3.523_387_7e-06 + pp * w;
        pp = -4.391_506_54e-06 + pp * w;
        pp = 0.000_218_580_87 + pp * w;
        pp = -0.001_253_725_03 + pp * w;
        pp = -0.004_177_681_64 + pp * w;
        pp = 0.246_640_727 + pp * w;
        p = 1.501_409_41 + pp * w;
    } else {
        w = w.sqrt() - 3.0;
        let mut pp = -0.000_200_214_257;
        pp = 0.000_100_950_558 + pp * w;
        pp = 0.001_349_343_22 + pp * w;
        pp = -0.003_673_428_44 + pp * w;
        pp = 0.005_739_507_73 + pp * w;
        pp = -0.007_622_461_3 + pp * w;
        pp = 0.009_438_870_47 + pp * w;
        pp = 1.001_674_06 + pp * w;
        p = 2.832_976_82 + pp * w;
    }
    p * x
}

fn erf(x: Float) -> Float {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

#[derive(Clone, Debug)]
pub struct BeckmannDistribution {
    pub alpha_x: Float,
    pub alpha_y: Float,
}

impl BeckmannDistribution {
    pub fn isotropic(alpha: Float) -> BeckmannDistribution {
        BeckmannDistribution { alpha_x: alpha, alpha_y: alpha }
    }

    /// Walter et al.'s empirical mapping from a user-facing `[0, 1]`
    /// roughness to the Beckmann alpha parameter.
    pub fn roughness_to_alpha(roughness: Float) -> Float {
        let roughness = roughness.max(1e-3);
        let x = roughness.ln();
        1.62142 + 0.819955 * x + 0.1734 * x * x + 0.0171201 * x * x * x
            + 0.000640711 * x * x * x * x
    }

    pub fn d(&self, wh: &Vector3) -> Float {
        let tan2theta = tan2_theta(wh);
        if tan2theta.is_infinite() {
            return 0.0;
        }
        let cos4_theta = crate::math::cos2_theta(wh) * crate::math::cos2_theta(wh);
        (-tan2theta
            * (cos_phi(wh) * cos_phi(wh) / (self.alpha_x * self.alpha_x)
                + sin_phi(wh) * sin_phi(wh) / (self.alpha_y * self.alpha_y)))
            .exp()
            / (PI * self.alpha_x * self.alpha_y * cos4_theta)
    }

    fn lambda(&self, w: &Vector3) -> Float {
        let abs_tan_theta = crate::math::tan_theta(w).abs();
        if abs_tan_theta.is_infinite() {
            return 0.0;
        }
        let alpha = (cos_phi(w) * cos_phi(w) * self.alpha_x * self.alpha_x
            + sin_phi(w) * sin_phi(w) * self.alpha_y * self.alpha_y)
            .sqrt();
        let a = 1.0 / (alpha * abs_tan_theta);
        if a >= 1.6 {
            0.0
        } else {
            (1.0 - 1.259 * a + 0.396 * a * a) / (3.535 * a + 2.181 * a * a)
        }
    }

    pub fn g1(&self, w: &Vector3) -> Float {
        1.0 / (1.0 + self.lambda(w))
    }

    pub fn g(&self, wo: &Vector3, wi: &Vector3) -> Float {
        1.0 / (1.0 + self.lambda(wo) + self.lambda(wi))
    }

    pub fn pdf(&self, wo: &Vector3, wh: &Vector3) -> Float {
        self.d(wh) * self.g1(wo) * wo.dot(*wh).abs() / abs_cos_theta(wo)
    }

    /// Samples a half-vector from the distribution of visible normals
    /// (Heitz & D'Eon), via a numerically inverted slope-space CDF.
    pub fn sample_wh(&self, wo: &Vector3, u: Point2) -> Vector3 {
        let flip = wo.z < 0.0;
        let wo_s = if flip { Vector3::new(-wo.x, -wo.y, -wo.z) } else { *wo };
        let wh = self.sample_visible(&wo_s, u.x, u.y);
        if flip {
            Vector3::new(-wh.x, -wh.y, -wh.z)
        } else {
            wh
        }
    }

    fn sample_visible(&self, wi: &Vector3, u1: Float, u2: Float) -> Vector3 {
        let wi_stretched =
            Vector3::new(self.alpha_x * wi.x, self.alpha_y * wi.y, wi.z).normalize();
        let (mut slope_x, mut slope_y) = self.sample11(cos_theta(&wi_stretched), u1, u2);
        let tmp = cos_phi(&wi_stretched) * slope_x - sin_phi(&wi_stretched) * slope_y;
        slope_y = sin_phi(&wi_stretched) * slope_x + cos_phi(&wi_stretched) * slope_y;
        slope_x = tmp;
        slope_x *= self.alpha_x;
        slope_y *= self.alpha_y;
        Vector3::new(-slope_x, -slope_y, 1.0).normalize()
    }

    fn sample11(&self, cos_theta_i: Float, u1: Float, u2: Float) -> (Float, Float) {
        if cos_theta_i > 0.9999 {
            let r = (-(1.0 - u1).ln()).sqrt();
            let phi = 2.0 * consts::PI * u2;
            return (r * phi.cos(), r * phi.sin());
        }

        let sin_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0).sqrt();
        let tan_theta_i = sin_theta_i / cos_theta_i;
        let cot_theta_i = 1.0 / tan_theta_i;

        let mut a = -1.0;
        let mut c = erf(cot_theta_i);
        let sample_x = u1.max(1e-6);

        let theta_i = cos_theta_i.acos();
        let fit = 1.0 + theta_i * (-0.876 + theta_i * (0.4265 - 0.0594 * theta_i));
        let mut b = c - (1.0 + c) * (1.0 - sample_x).powf(fit);

        const SQRT_PI_INV: Float = consts::FRAC_2_SQRT_PI * 0.5;
        let normalization =
            1.0 / (1.0 + c + SQRT_PI_INV * tan_theta_i * (-cot_theta_i * cot_theta_i).exp());

        for _ in 0..10 {
            if !(b >= a && b <= c) {
                b = 0.5 * (a + c);
            }
            let inv_erf = erf_inv(b);
            let value = normalization
                * (1.0 + b + SQRT_PI_INV * tan_theta_i * (-inv_erf * inv_erf).exp())
                - sample_x;
            let derivative = normalization * (1.0 - inv_erf * tan_theta_i);
            if value.abs() < 1e-5 {
                break;
            }
            if value > 0.0 {
                c = b;
            } else {
                a = b;
            }
            b -= value / derivative;
        }

        let slope_x = erf_inv(b);
        let slope_y = erf_inv(2.0 * u2.max(1e-6) - 1.0);
        (slope_x, slope_y)
    }
}

/// Rough conductor BRDF: a Beckmann microfacet reflection lobe with a
/// spectral Fresnel term. Ported from the teacher's `MicrofacetReflection`.
#[derive(Clone, Debug)]
pub struct RoughConductor {
    pub reflectance: Spectrum,
    pub distribution: BeckmannDistribution,
    pub eta: Spectrum,
    pub k: Spectrum,
}

impl RoughConductor {
    pub fn new(reflectance: Spectrum, roughness: Float, eta: Spectrum, k: Spectrum) -> Self {
        let alpha = BeckmannDistribution::roughness_to_alpha(roughness);
        RoughConductor {
            reflectance,
            distribution: BeckmannDistribution::isotropic(alpha),
            eta,
            k,
        }
    }

    pub fn f(&self, wo: Vector3, wi: Vector3) -> Spectrum {
        let cos_theta_o = abs_cos_theta(&wo);
        let cos_theta_i = abs_cos_theta(&wi);
        if cos_theta_o == 0.0 || cos_theta_i == 0.0 {
            return Spectrum::black();
        }
        let mut wh = wi + wo;
        if wh.length_squared() == 0.0 {
            return Spectrum::black();
        }
        wh = wh.normalize();
        let f = fr_conductor(wo.dot(wh), Spectrum::white(), self.eta, self.k);
        self.reflectance * self.distribution.d(&wh) * self.distribution.g(&wo, &wi) * f
            * (1.0 / (4.0 * cos_theta_i * cos_theta_o))
    }

    pub fn pdf(&self, wo: Vector3, wi: Vector3) -> Float {
        if !same_hemisphere(&wo, &wi) {
            return 0.0;
        }
        let wh = (wo + wi).normalize();
        self.distribution.pdf(&wo, &wh) / (4.0 * wo.dot(wh).abs())
    }

    pub fn sample(&self, wo: Vector3, u: Point2) -> Option<BsdfSample> {
        if wo.z == 0.0 {
            return None;
        }
        let wh = self.distribution.sample_wh(&wo, u);
        let wi = reflect(wo, wh);
        if !same_hemisphere(&wo, &wi) {
            return None;
        }
        let pdf = self.distribution.pdf(&wo, &wh) / (4.0 * wo.dot(wh));
        if pdf <= 0.0 || !pdf.is_finite() {
            return None;
        }
        Some(BsdfSample { wi, f: self.f(wo, wi), pdf, specular: false })
    }
}

fn reflect(wo: Vector3, n: Vector3) -> Vector3 {
    -wo + n * 2.0 * wo.dot(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d_integrates_close_to_one_over_cos_theta() {
        let dist = BeckmannDistribution::isotropic(0.3);
        let n = 64;
        let mut sum = 0.0;
        for i in 0..n {
            for j in 0..n {
                let theta = (i as Float + 0.5) / n as Float * std::f32::consts::FRAC_PI_2;
                let phi = (j as Float + 0.5) / n as Float * std::f32::consts::TAU;
                let (s, c) = theta.sin_cos();
                let wh = Vector3::new(s * phi.cos(), s * phi.sin(), c);
                sum += dist.d(&wh) * c * s;
            }
        }
        let dtheta = std::f32::consts::FRAC_PI_2 / n as Float;
        let dphi = std::f32::consts::TAU / n as Float;
        let integral = sum * dtheta * dphi;
        assert!((integral - 1.0).abs() < 0.1, "integral = {}", integral);
    }
}
