use crate::math::{Normal3, Point3, Vector3};

/// A point on a surface plus the local shading frame built from it. Grounded
/// on the teacher's `Interaction` (`p`, `p_error`, `wo`, `n`) generalized with
/// an explicit tangent frame, the way `bsdf::BSDF::world_to_local` builds one
/// ad hoc from `shading_n`/`dpdu`.
#[derive(Copy, Clone, Debug)]
pub struct SurfaceGeometry {
    pub p: Point3,
    pub n: Normal3,
    pub shading_n: Normal3,
    /// Tangent (world-space `x` axis of the shading frame).
    pub u: Vector3,
    /// Bitangent (world-space `y` axis of the shading frame).
    pub v: Vector3,
    /// Set for directional/environment emitter vertices, which have no
    /// physical surface and thus no meaningful cosine term.
    pub degenerate: bool,
}

impl SurfaceGeometry {
    pub fn new(p: Point3, n: Normal3) -> SurfaceGeometry {
        let nv = n.to_vector();
        let (u, v) = nv.coordinate_system();
        SurfaceGeometry {
            p,
            n,
            shading_n: n,
            u,
            v,
            degenerate: false,
        }
    }

    pub fn degenerate_at_direction(d: Vector3) -> SurfaceGeometry {
        let (u, v) = d.coordinate_system();
        SurfaceGeometry {
            p: Point3::new(0.0, 0.0, 0.0),
            n: Normal3::from_vector(d),
            shading_n: Normal3::from_vector(d),
            u,
            v,
            degenerate: true,
        }
    }

    pub fn to_local(&self, w: Vector3) -> Vector3 {
        Vector3::new(
            w.dot(self.u),
            w.dot(self.v),
            w.dot(self.shading_n.to_vector()),
        )
    }

    pub fn to_world(&self, w: Vector3) -> Vector3 {
        self.u * w.x + self.v * w.y + self.shading_n.to_vector() * w.z
    }
}
