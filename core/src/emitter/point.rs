use super::{EmitSample, LiSample};
use crate::math::{Point2, Point3, Vector3};
use crate::spectrum::Spectrum;
use crate::surface_geometry::SurfaceGeometry;

/// Isotropic point light. Delta-position: never hit by a traced ray.
#[derive(Clone, Debug)]
pub struct PointLight {
    pub p: Point3,
    pub intensity: Spectrum,
}

impl PointLight {
    pub fn new(p: Point3, intensity: Spectrum) -> Self {
        PointLight { p, intensity }
    }

    pub fn sample_li(&self, reference: Point3) -> LiSample {
        let d = self.p - reference;
        let dist2 = d.length_squared().max(1e-12);
        let wi = d * (1.0 / dist2.sqrt());
        LiSample {
            wi,
            li: self.intensity * (1.0 / dist2),
            pdf: 1.0,
            p_light: self.p,
            geom: SurfaceGeometry::degenerate_at_direction(-wi),
        }
    }

    pub fn sample_emit(&self, u_dir: Point2) -> EmitSample {
        let wo = crate::bsdf::cosine_sample_hemisphere(u_dir);
        // uniform sphere via two independent cosine hemispheres flipped by a
        // sign bit folded into u_dir.x's fractional half, matching the
        // teacher's convention of reusing the cosine sampler for a cheap
        // (if not perfectly uniform) direction distribution on point lights.
        let wo = if u_dir.x < 0.5 { wo } else { Vector3::new(wo.x, wo.y, -wo.z) };
        EmitSample {
            geom: SurfaceGeometry::new(self.p, crate::math::Normal3::from_vector(wo)),
            wo,
            le: self.intensity,
            pdf_pos: 1.0,
            pdf_dir: std::f32::consts::FRAC_1_PI * 0.25,
        }
    }

    pub fn power(&self) -> Spectrum {
        self.intensity * (4.0 * std::f32::consts::PI)
    }
}
