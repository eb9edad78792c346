//! Closed `Emitter` union: `AreaLight`, `DirectionalLight`, `EnvLight`,
//! `PointLight`. Generalizes the teacher's open `Light` trait
//! (`light::Light`, `LightFlags` bitflags, `VisibilityTester`) into an enum
//! matching the uniform sample/evaluate/pdf contract all scene components
//! share per the data model.

mod area;
mod directional;
mod env;
mod point;

pub use self::area::AreaLight;
pub use self::directional::DirectionalLight;
pub use self::env::EnvLight;
pub use self::point::PointLight;

use crate::math::{Point2, Point3, Vector3};
use crate::rng::Rng;
use crate::spectrum::Spectrum;
use crate::surface_geometry::SurfaceGeometry;
use crate::Float;

bitflags::bitflags! {
    /// Mirrors the teacher's `LightFlags` (`DeltaPosition`/`DeltaDirection`/
    /// `Area`/`Infinite`), used to decide which connection strategies in the
    /// bidirectional estimators are legal for a given emitter.
    pub struct EmitterFlags: u8 {
        const DELTA_POSITION  = 1 << 0;
        const DELTA_DIRECTION = 1 << 1;
        const AREA            = 1 << 2;
        const INFINITE         = 1 << 3;
    }
}

/// Result of sampling an emitter towards a reference point `ref_p`.
pub struct LiSample {
    pub wi: Vector3,
    pub li: Spectrum,
    pub pdf: Float,
    pub p_light: Point3,
    pub geom: SurfaceGeometry,
}

/// Result of sampling a point+direction pair on an emitter for light-traced
/// (emitter-to-scene) subpaths.
pub struct EmitSample {
    pub geom: SurfaceGeometry,
    pub wo: Vector3,
    pub le: Spectrum,
    pub pdf_pos: Float,
    pub pdf_dir: Float,
}

#[derive(Clone, Debug)]
pub enum Emitter {
    Area(AreaLight),
    Directional(DirectionalLight),
    Env(EnvLight),
    Point(PointLight),
}

impl Emitter {
    pub fn flags(&self) -> EmitterFlags {
        match self {
            Emitter::Area(_) => EmitterFlags::AREA,
            Emitter::Directional(_) => EmitterFlags::DELTA_DIRECTION,
            Emitter::Env(_) => EmitterFlags::INFINITE,
            Emitter::Point(_) => EmitterFlags::DELTA_POSITION,
        }
    }

    pub fn is_delta(&self) -> bool {
        self.flags()
            .intersects(EmitterFlags::DELTA_POSITION | EmitterFlags::DELTA_DIRECTION)
    }

    pub fn is_infinite(&self) -> bool {
        self.flags().contains(EmitterFlags::INFINITE)
    }

    pub fn sample_li(&self, reference: Point3, u: Point2) -> LiSample {
        match self {
            Emitter::Area(l) => l.sample_li(reference, u),
            Emitter::Directional(l) => l.sample_li(reference),
            Emitter::Env(l) => l.sample_li(reference, u),
            Emitter::Point(l) => l.sample_li(reference),
        }
    }

    pub fn pdf_li(&self, reference: Point3, wi: Vector3) -> Float {
        match self {
            Emitter::Area(l) => l.pdf_li(reference, wi),
            Emitter::Directional(_) | Emitter::Point(_) => 0.0,
            Emitter::Env(l) => l.pdf_li(wi),
        }
    }

    pub fn sample_emit(&self, u_pos: Point2, u_dir: Point2, rng: &mut Rng) -> EmitSample {
        match self {
            Emitter::Area(l) => l.sample_emit(u_pos, u_dir),
            Emitter::Directional(l) => l.sample_emit(u_pos, rng),
            Emitter::Env(l) => l.sample_emit(u_pos, u_dir, rng),
            Emitter::Point(l) => l.sample_emit(u_dir),
        }
    }

    /// Emitted radiance leaving a point on the emitter in direction `w`
    /// (area lights only — delta lights have no `L` to evaluate post hoc).
    pub fn l(&self, geom: &SurfaceGeometry, w: Vector3) -> Spectrum {
        match self {
            Emitter::Area(l) => l.l(geom, w),
            _ => Spectrum::black(),
        }
    }

    pub fn power(&self, scene_radius: Float) -> Spectrum {
        match self {
            Emitter::Area(l) => l.power(),
            Emitter::Directional(l) => l.power(scene_radius),
            Emitter::Env(l) => l.power(scene_radius),
            Emitter::Point(l) => l.power(),
        }
    }
}
