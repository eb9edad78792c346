//! Closed `Sensor` union: `Pinhole`, `ThinLens`. Ray-generation math ported
//! from the teacher's legacy `camera::PerspectiveCamera`, rewritten against
//! this crate's own `math::Transform` instead of `na`, and against a raster
//! resolution known up front rather than pbrt's raster/screen-window
//! matrix chain.

mod pinhole;
mod thin_lens;

pub use self::pinhole::Pinhole;
pub use self::thin_lens::ThinLens;

use crate::math::{Point2, Ray, Vector3};
use crate::surface_geometry::SurfaceGeometry;
use crate::Float;

/// A sample on the sensor: raster-space pixel coordinate plus a lens sample
/// for depth-of-field sensors (ignored by `Pinhole`).
#[derive(Copy, Clone, Debug)]
pub struct SensorSample {
    pub p_film: Point2,
    pub p_lens: Point2,
}

#[derive(Clone, Debug)]
pub enum Sensor {
    Pinhole(Pinhole),
    ThinLens(ThinLens),
}

impl Sensor {
    pub fn generate_ray(&self, sample: SensorSample) -> Ray {
        match self {
            Sensor::Pinhole(s) => s.generate_ray(sample),
            Sensor::ThinLens(s) => s.generate_ray(sample),
        }
    }

    pub fn resolution(&self) -> (u32, u32) {
        match self {
            Sensor::Pinhole(s) => s.resolution,
            Sensor::ThinLens(s) => s.resolution,
        }
    }

    pub fn geom(&self) -> SurfaceGeometry {
        match self {
            Sensor::Pinhole(s) => SurfaceGeometry::new(s.eye, crate::math::Normal3::from_vector(s.forward)),
            Sensor::ThinLens(s) => SurfaceGeometry::new(s.eye, crate::math::Normal3::from_vector(s.forward)),
        }
    }

    /// Importance-sampling pdf for the given outgoing direction, in solid
    /// angle measure — the projective-area-weighted pinhole pdf used by the
    /// light-tracing (`lt`) estimator when connecting a light subpath
    /// vertex back to the sensor.
    pub fn pdf_we(&self, w: Vector3) -> (Float, Float) {
        match self {
            Sensor::Pinhole(s) => s.pdf_we(w),
            Sensor::ThinLens(s) => s.pdf_we(w),
        }
    }

    /// Raster position a world-space direction from the eye projects to, or
    /// `None` if it falls outside the image or behind the camera.
    pub fn raster_position(&self, w: Vector3) -> Option<Point2> {
        match self {
            Sensor::Pinhole(s) => s.raster_position(w),
            Sensor::ThinLens(s) => s.raster_position(w),
        }
    }
}
