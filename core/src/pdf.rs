//! Measure-tagged PDF values, so path-space code can't silently mix a
//! solid-angle density with an area density. Ported from Lightmetrica's
//! `PDFVal`/`PDFMeasure` (no equivalent in the teacher, which folds pdf
//! conversion inline).

use std::ops::Mul;

use crate::surface_geometry::SurfaceGeometry;
use crate::Float;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Measure {
    Area,
    SolidAngle,
    ProjectedSolidAngle,
    /// Product of two area-measure densities (s-subpath pdf * t-subpath pdf),
    /// the only legal target of `PDFVal * PDFVal`.
    ProdArea,
    Discrete,
}

#[derive(Copy, Clone, Debug)]
pub struct PDFVal {
    pub measure: Measure,
    pub value: Float,
}

impl PDFVal {
    pub fn new(measure: Measure, value: Float) -> PDFVal {
        PDFVal { measure, value }
    }

    pub fn zero(measure: Measure) -> PDFVal {
        PDFVal::new(measure, 0.0)
    }

    /// `G(x, y) = |cos(theta_x) cos(theta_y)| / ||x - y||^2`, the geometry term
    /// converting between area and projected-solid-angle measures at a pair of
    /// path vertices.
    pub fn geometry_term(from: &SurfaceGeometry, to: &SurfaceGeometry) -> Float {
        let d = to.p - from.p;
        let len2 = d.length_squared();
        if len2 <= 0.0 {
            return 0.0;
        }
        let len = len2.sqrt();
        let dir = d * (1.0 / len);
        let cos_from = if from.degenerate { 1.0 } else { from.shading_n.dot_vector(dir).abs() };
        let cos_to = if to.degenerate { 1.0 } else { to.shading_n.dot_vector(-dir).abs() };
        cos_from * cos_to / len2
    }

    /// Converts a solid-angle or projected-solid-angle density measured at
    /// `from` into an area density measured at `to`.
    pub fn convert_to_area(&self, from: &SurfaceGeometry, to: &SurfaceGeometry) -> PDFVal {
        match self.measure {
            Measure::Area | Measure::ProdArea => *self,
            Measure::SolidAngle => {
                let d = to.p - from.p;
                let len2 = d.length_squared();
                if len2 <= 0.0 {
                    return PDFVal::zero(Measure::Area);
                }
                let dir = d * (1.0 / len2.sqrt());
                let cos_to = if to.degenerate { 1.0 } else { to.shading_n.dot_vector(-dir).abs() };
                PDFVal::new(Measure::Area, self.value * cos_to / len2)
            }
            Measure::ProjectedSolidAngle => {
                PDFVal::new(Measure::Area, self.value * Self::geometry_term(from, to))
            }
            Measure::Discrete => *self,
        }
    }

    /// Converts an area density into a projected-solid-angle density.
    pub fn convert_to_proj_solid_angle(&self, from: &SurfaceGeometry, to: &SurfaceGeometry) -> PDFVal {
        match self.measure {
            Measure::Area => {
                let g = Self::geometry_term(from, to);
                if g <= 0.0 {
                    return PDFVal::zero(Measure::ProjectedSolidAngle);
                }
                PDFVal::new(Measure::ProjectedSolidAngle, self.value / g)
            }
            Measure::ProjectedSolidAngle => *self,
            _ => *self,
        }
    }
}

impl Mul for PDFVal {
    type Output = PDFVal;
    /// Only legal between two area-measure (or already-product) densities;
    /// this is how `Path::evaluate_pdf` combines the light- and eye-subpath
    /// vertex pdfs into a single path pdf.
    fn mul(self, rhs: PDFVal) -> PDFVal {
        debug_assert!(matches!(self.measure, Measure::Area | Measure::ProdArea));
        debug_assert!(matches!(rhs.measure, Measure::Area | Measure::ProdArea));
        PDFVal::new(Measure::ProdArea, self.value * rhs.value)
    }
}

impl Mul<Float> for PDFVal {
    type Output = PDFVal;
    fn mul(self, s: Float) -> PDFVal {
        PDFVal::new(self.measure, self.value * s)
    }
}

/// Power-heuristic (exponent 2) combination weight for two competing
/// sampling strategies with `nf`/`ng` trials each. Ported from the
/// teacher's `sampling::power_heuristic`.
pub fn power_heuristic(nf: u32, f_pdf: Float, ng: u32, g_pdf: Float) -> Float {
    let f = nf as Float * f_pdf;
    let g = ng as Float * g_pdf;
    if f <= 0.0 && g <= 0.0 {
        return 0.0;
    }
    (f * f) / (f * f + g * g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Normal3, Point3};

    fn geom_at(p: Point3) -> SurfaceGeometry {
        SurfaceGeometry {
            p,
            n: Normal3::new(0.0, 0.0, 1.0),
            shading_n: Normal3::new(0.0, 0.0, 1.0),
            u: crate::math::Vector3::new(1.0, 0.0, 0.0),
            v: crate::math::Vector3::new(0.0, 1.0, 0.0),
            degenerate: false,
        }
    }

    #[test]
    fn area_to_proj_solid_angle_roundtrip() {
        let from = geom_at(Point3::new(0.0, 0.0, 0.0));
        let to = geom_at(Point3::new(0.0, 0.0, 1.0));
        let area = PDFVal::new(Measure::Area, 0.5);
        let psa = area.convert_to_proj_solid_angle(&from, &to);
        let back = psa.convert_to_area(&from, &to);
        assert!((back.value - area.value).abs() < 1e-5);
    }
}
