//! Fresnel reflectance terms, ported from the teacher's legacy
//! `bsdf::fresnel` module (`fr_dielectric`/`fr_conductor`).

use crate::clamp;
use crate::spectrum::Spectrum;
use crate::Float;

/// Unpolarized Fresnel reflectance at a dielectric interface.
pub fn fr_dielectric(cos_theta_i: Float, eta_i: Float, eta_t: Float) -> Float {
    let mut cos_theta_i = clamp(cos_theta_i, -1.0, 1.0);
    let (mut eta_i, mut eta_t) = (eta_i, eta_t);
    if cos_theta_i <= 0.0 {
        std::mem::swap(&mut eta_i, &mut eta_t);
        cos_theta_i = cos_theta_i.abs();
    }

    let sin_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0).sqrt();
    let sin_theta_t = eta_i / eta_t * sin_theta_i;
    if sin_theta_t >= 1.0 {
        return 1.0;
    }
    let cos_theta_t = (1.0 - sin_theta_t * sin_theta_t).max(0.0).sqrt();
    let r_parl = ((eta_t * cos_theta_i) - (eta_i * cos_theta_t))
        / ((eta_t * cos_theta_i) + (eta_i * cos_theta_t));
    let r_perp = ((eta_i * cos_theta_i) - (eta_t * cos_theta_t))
        / ((eta_i * cos_theta_i) + (eta_t * cos_theta_t));
    0.5 * (r_parl * r_parl + r_perp * r_perp)
}

/// Spectral Fresnel reflectance at a conductor interface (used by `RoughConductor`).
pub fn fr_conductor(cos_theta_i: Float, eta_i: Spectrum, eta_t: Spectrum, k: Spectrum) -> Spectrum {
    let cos_theta_i = clamp(cos_theta_i, -1.0, 1.0);

    fn per_channel(cos_theta_i: Float, eta_i: Float, eta_t: Float, k: Float) -> Float {
        let eta = eta_t / eta_i;
        let eta_k = k / eta_i;
        let cos2_theta_i = cos_theta_i * cos_theta_i;
        let sin2_theta_i = 1.0 - cos2_theta_i;
        let eta2 = eta * eta;
        let eta_k2 = eta_k * eta_k;

        let t0 = eta2 - eta_k2 - sin2_theta_i;
        let a2plusb2 = (t0 * t0 + 4.0 * eta2 * eta_k2).max(0.0).sqrt();
        let t1 = a2plusb2 + cos2_theta_i;
        let a = (0.5 * (a2plusb2 + t0).max(0.0)).sqrt();
        let t2 = 2.0 * cos_theta_i * a;
        let r_s = (t1 - t2) / (t1 + t2);

        let t3 = cos2_theta_i * a2plusb2 + sin2_theta_i * sin2_theta_i;
        let t4 = t2 * sin2_theta_i;
        let r_p = r_s * (t3 - t4) / (t3 + t4);

        0.5 * (r_p + r_s)
    }

    Spectrum::rgb(
        per_channel(cos_theta_i, eta_i.r, eta_t.r, k.r),
        per_channel(cos_theta_i, eta_i.g, eta_t.g, k.g),
        per_channel(cos_theta_i, eta_i.b, eta_t.b, k.b),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_incidence_matches_schlick_r0() {
        let eta = 1.5;
        let r = fr_dielectric(1.0, 1.0, eta);
        let r0 = ((eta - 1.0) / (eta + 1.0)).powi(2);
        assert!((r - r0).abs() < 1e-4);
    }

    #[test]
    fn grazing_incidence_approaches_total_reflection() {
        let r = fr_dielectric(0.001, 1.0, 1.5);
        assert!(r > 0.9);
    }
}
