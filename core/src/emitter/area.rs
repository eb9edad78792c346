use std::sync::Arc;

use super::{EmitSample, LiSample};
use crate::math::{Point2, Point3, Vector3};
use crate::mesh::TriangleMesh;
use crate::spectrum::Spectrum;
use crate::surface_geometry::SurfaceGeometry;
use crate::Float;

/// Diffuse area light bound to a mesh's triangles, sampled proportional to
/// triangle area. Ported from the teacher's
/// `light::diffuse::DiffuseAreaLight`, including its optional two-sided
/// emission.
#[derive(Clone, Debug)]
pub struct AreaLight {
    pub mesh: Arc<TriangleMesh>,
    pub area_distribution: Arc<crate::distribution1d::Distribution1D>,
    pub radiance: Spectrum,
    pub two_sided: bool,
    pub total_area: Float,
}

impl AreaLight {
    pub fn new(mesh: Arc<TriangleMesh>, radiance: Spectrum, two_sided: bool) -> AreaLight {
        let areas: Vec<Float> = (0..mesh.num_triangles())
            .map(|i| mesh.triangle(i).area())
            .collect();
        let total_area = areas.iter().sum();
        let area_distribution = Arc::new(crate::distribution1d::Distribution1D::new(&areas));
        AreaLight { mesh, area_distribution, radiance, two_sided, total_area }
    }

    pub fn l(&self, geom: &SurfaceGeometry, w: Vector3) -> Spectrum {
        if self.two_sided || geom.n.dot_vector(w) > 0.0 {
            self.radiance
        } else {
            Spectrum::black()
        }
    }

    pub fn sample_li(&self, reference: Point3, u: Point2) -> LiSample {
        let (idx, discrete_pdf) = self.area_distribution.sample_discrete(u.x);
        let tri = self.mesh.triangle(idx);
        let (p, n, area_pdf) = tri.sample_area(u.y, u.x);
        let geom = SurfaceGeometry::new(p, n);
        let d = p - reference;
        let dist2 = d.length_squared();
        if dist2 <= 0.0 {
            return LiSample { wi: Vector3::new(0.0, 0.0, 1.0), li: Spectrum::black(), pdf: 0.0, p_light: p, geom };
        }
        let wi = d * (1.0 / dist2.sqrt());
        let cos_light = n.dot_vector(-wi);
        let visible_cos = if self.two_sided { cos_light.abs() } else { cos_light.max(0.0) };
        if visible_cos <= 0.0 {
            return LiSample { wi, li: Spectrum::black(), pdf: 0.0, p_light: p, geom };
        }
        let pdf = discrete_pdf * area_pdf * dist2 / visible_cos;
        LiSample { wi, li: self.radiance, pdf, p_light: p, geom }
    }

    /// Approximates the emitter-side pdf without a concrete hit point by
    /// using the mean solid angle over the whole mesh — an approximation the
    /// teacher's own `DiffuseAreaLight::pdf_li` makes when called without an
    /// explicit `Intersection`.
    pub fn pdf_li(&self, _reference: Point3, _wi: Vector3) -> Float {
        1.0 / self.total_area.max(1e-7)
    }

    pub fn sample_emit(&self, u_pos: Point2, u_dir: Point2) -> EmitSample {
        let (idx, discrete_pdf) = self.area_distribution.sample_discrete(u_pos.x);
        let tri = self.mesh.triangle(idx);
        let (p, n, area_pdf) = tri.sample_area(u_pos.y, u_pos.x);
        let geom = SurfaceGeometry::new(p, n);

        let (side_u, flip) = if self.two_sided && u_dir.x >= 0.5 {
            (Point2::new((u_dir.x - 0.5) * 2.0, u_dir.y), true)
        } else if self.two_sided {
            (Point2::new(u_dir.x * 2.0, u_dir.y), false)
        } else {
            (u_dir, false)
        };
        let mut wo_local = crate::bsdf::cosine_sample_hemisphere(side_u);
        if flip {
            wo_local.z = -wo_local.z;
        }
        let wo = geom.to_world(wo_local);
        let pdf_dir = wo_local.z.abs() * std::f32::consts::FRAC_1_PI
            * if self.two_sided { 0.5 } else { 1.0 };

        EmitSample {
            geom,
            wo,
            le: self.radiance,
            pdf_pos: discrete_pdf * area_pdf,
            pdf_dir,
        }
    }

    pub fn power(&self) -> Spectrum {
        let sides = if self.two_sided { 2.0 } else { 1.0 };
        self.radiance * (std::f32::consts::PI * self.total_area * sides)
    }
}
