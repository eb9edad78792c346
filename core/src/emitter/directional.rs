use super::{EmitSample, LiSample};
use crate::math::{Point2, Point3, Vector3};
use crate::rng::Rng;
use crate::spectrum::Spectrum;
use crate::surface_geometry::SurfaceGeometry;
use crate::Float;

/// Light arriving from a single fixed direction at infinity, e.g. a sun.
/// Delta-direction: never hit by a traced ray, only connectable.
#[derive(Clone, Debug)]
pub struct DirectionalLight {
    /// Direction the light travels *towards* the scene.
    pub direction: Vector3,
    pub radiance: Spectrum,
}

impl DirectionalLight {
    pub fn new(direction: Vector3, radiance: Spectrum) -> Self {
        DirectionalLight { direction: direction.normalize(), radiance }
    }

    pub fn sample_li(&self, reference: Point3) -> LiSample {
        let wi = -self.direction;
        LiSample {
            wi,
            li: self.radiance,
            pdf: 1.0,
            p_light: reference + wi * 1.0e7,
            geom: SurfaceGeometry::degenerate_at_direction(self.direction),
        }
    }

    pub fn sample_emit(&self, u_pos: Point2, rng: &mut Rng) -> EmitSample {
        // Position a virtual emission disk outside the scene bounds, along
        // the plane perpendicular to `direction`; the scheduler rescales
        // this by the scene's bounding sphere before use (see `scene.rs`).
        let _ = (u_pos, rng);
        let geom = SurfaceGeometry::degenerate_at_direction(self.direction);
        EmitSample {
            geom,
            wo: self.direction,
            le: self.radiance,
            pdf_pos: 1.0,
            pdf_dir: 1.0,
        }
    }

    pub fn power(&self, scene_radius: Float) -> Spectrum {
        self.radiance * (std::f32::consts::PI * scene_radius * scene_radius)
    }
}
