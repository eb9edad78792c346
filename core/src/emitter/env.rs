use super::{EmitSample, LiSample};
use crate::distribution1d::Distribution1D;
use crate::math::{Point2, Point3, Vector3};
use crate::rng::Rng;
use crate::spectrum::Spectrum;
use crate::surface_geometry::SurfaceGeometry;
use crate::Float;

/// Image-based infinite environment light with importance sampling via a
/// 2D marginal/conditional distribution pair built from luminance, the
/// standard pbrt/lightmetrica construction (two `Distribution1D`s rather
/// than a bespoke 2D table, matching the teacher's habit of composing
/// `distribution1d::Distribution1D`).
#[derive(Clone, Debug)]
pub struct EnvLight {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Spectrum>,
    marginal: Distribution1D,
    conditional: Vec<Distribution1D>,
}

impl EnvLight {
    pub fn new(width: usize, height: usize, pixels: Vec<Spectrum>) -> EnvLight {
        let mut conditional = Vec::with_capacity(height);
        let mut marginal_func = Vec::with_capacity(height);
        for y in 0..height {
            let row: Vec<Float> = (0..width).map(|x| pixels[y * width + x].y()).collect();
            let dist = Distribution1D::new(&row);
            marginal_func.push(dist.func_int());
            conditional.push(dist);
        }
        let marginal = Distribution1D::new(&marginal_func);
        EnvLight { width, height, pixels, marginal, conditional }
    }

    fn lookup(&self, u: Float, v: Float) -> Spectrum {
        let x = ((u * self.width as Float) as usize).min(self.width - 1);
        let y = ((v * self.height as Float) as usize).min(self.height - 1);
        self.pixels[y * self.width + x]
    }

    fn direction_to_uv(d: Vector3) -> (Float, Float) {
        let theta = crate::math::spherical_theta(&d);
        let phi = crate::math::spherical_phi(&d);
        (phi * std::f32::consts::FRAC_1_PI * 0.5, theta * std::f32::consts::FRAC_1_PI)
    }

    fn uv_to_direction(u: Float, v: Float) -> Vector3 {
        let phi = u * std::f32::consts::TAU;
        let theta = v * std::f32::consts::PI;
        let (sin_theta, cos_theta) = theta.sin_cos();
        Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
    }

    pub fn sample_li(&self, _reference: Point3, u: Point2) -> LiSample {
        let (v, pdf_v, row) = self.marginal.sample_continuous(u.y);
        let (u_coord, pdf_u, _) = self.conditional[row].sample_continuous(u.x);
        let d = Self::uv_to_direction(u_coord, v);
        let sin_theta = (1.0 - d.z * d.z).max(0.0).sqrt();
        if sin_theta == 0.0 {
            return LiSample { wi: d, li: Spectrum::black(), pdf: 0.0, p_light: _reference + d * 1e7, geom: SurfaceGeometry::degenerate_at_direction(-d) };
        }
        let pdf = pdf_u * pdf_v / (2.0 * std::f32::consts::PI * std::f32::consts::PI * sin_theta);
        LiSample {
            wi: d,
            li: self.lookup(u_coord, v),
            pdf,
            p_light: _reference + d * 1e7,
            geom: SurfaceGeometry::degenerate_at_direction(-d),
        }
    }

    pub fn pdf_li(&self, wi: Vector3) -> Float {
        let (u, v) = Self::direction_to_uv(wi);
        let sin_theta = (1.0 - wi.z * wi.z).max(0.0).sqrt();
        if sin_theta == 0.0 {
            return 0.0;
        }
        let row = ((v * self.height as Float) as usize).min(self.height - 1);
        let map_pdf = self.conditional[row].discrete_pdf(((u * self.width as Float) as usize).min(self.width - 1))
            * self.marginal.discrete_pdf(row);
        map_pdf / (2.0 * std::f32::consts::PI * std::f32::consts::PI * sin_theta)
    }

    pub fn sample_emit(&self, u_pos: Point2, u_dir: Point2, rng: &mut Rng) -> EmitSample {
        let li_sample = self.sample_li(Point3::new(0.0, 0.0, 0.0), u_dir);
        let _ = (u_pos, rng);
        EmitSample {
            geom: li_sample.geom,
            wo: -li_sample.wi,
            le: li_sample.li,
            pdf_pos: 1.0,
            pdf_dir: li_sample.pdf,
        }
    }

    pub fn power(&self, scene_radius: Float) -> Spectrum {
        let mut sum = Spectrum::black();
        for p in &self.pixels {
            sum += *p;
        }
        let avg = sum * (1.0 / self.pixels.len().max(1) as Float);
        avg * (std::f32::consts::PI * scene_radius * scene_radius * std::f32::consts::PI)
    }
}
