use super::fresnel::fr_dielectric;
use super::BsdfSample;
use crate::math::{abs_cos_theta, cos_theta, Vector3};
use crate::rng::Rng;
use crate::spectrum::Spectrum;
use crate::Float;

/// Perfect specular reflection + refraction through a dielectric interface,
/// chosen stochastically by the Fresnel reflectance. Ported from the
/// teacher's `material::glass` construction (`FresnelSpecular`/
/// `SpecularReflection`/`SpecularTransmission`) collapsed into a single
/// sampled BxDF, since both lobes are delta distributions that can never be
/// evaluated via `f`/`pdf` — only reached through `sample`.
#[derive(Clone, Debug)]
pub struct SpecularDielectric {
    pub reflectance: Spectrum,
    pub transmittance: Spectrum,
    pub eta_a: Float,
    pub eta_b: Float,
}

impl SpecularDielectric {
    pub fn new(reflectance: Spectrum, transmittance: Spectrum, eta_a: Float, eta_b: Float) -> Self {
        SpecularDielectric { reflectance, transmittance, eta_a, eta_b }
    }

    pub fn sample(&self, wo: Vector3, rng: &mut Rng) -> Option<BsdfSample> {
        let f = fr_dielectric(cos_theta(&wo), self.eta_a, self.eta_b);
        if rng.next_float() < f {
            let wi = Vector3::new(-wo.x, -wo.y, wo.z);
            let spectrum = self.reflectance * (f / abs_cos_theta(&wi));
            Some(BsdfSample { wi, f: spectrum, pdf: f, specular: true })
        } else {
            let entering = cos_theta(&wo) > 0.0;
            let (eta_i, eta_t) = if entering {
                (self.eta_a, self.eta_b)
            } else {
                (self.eta_b, self.eta_a)
            };
            let n = if entering {
                Vector3::new(0.0, 0.0, 1.0)
            } else {
                Vector3::new(0.0, 0.0, -1.0)
            };
            let wi = refract(wo, n, eta_i / eta_t)?;
            let ft = self.transmittance * (1.0 - f);
            // radiance transport scales by (eta_i/eta_t)^2 when crossing an
            // interface; omitted for importance (light-traced) transport,
            // matching the teacher's `FresnelSpecular::sample_f` `mode` flag.
            let spectrum = ft * (1.0 / abs_cos_theta(&wi));
            Some(BsdfSample { wi, f: spectrum, pdf: 1.0 - f, specular: true })
        }
    }
}

fn refract(wi: Vector3, n: Vector3, eta: Float) -> Option<Vector3> {
    let cos_theta_i = n.dot(wi);
    let sin2_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0);
    let sin2_theta_t = eta * eta * sin2_theta_i;
    if sin2_theta_t >= 1.0 {
        return None;
    }
    let cos_theta_t = (1.0 - sin2_theta_t).sqrt();
    Some(wi * -eta + n * (eta * cos_theta_i - cos_theta_t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_internal_reflection_has_no_transmission() {
        // at a steep enough angle, exiting a dense medium always reflects
        let wo = Vector3::new(0.99, 0.0, 0.141).normalize();
        let wo = Vector3::new(wo.x, wo.y, -wo.z.abs());
        assert!(refract(wo, Vector3::new(0.0, 0.0, -1.0), 1.5).is_none());
    }
}
