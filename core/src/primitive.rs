use std::sync::Arc;

use crate::bsdf::Bsdf;
use crate::emitter::Emitter;
use crate::math::{Bounds3, Ray};
use crate::mesh::TriangleMesh;
use crate::surface_geometry::SurfaceGeometry;
use crate::Float;

/// A shading-ready piece of scene geometry: a mesh, world-space (transforms
/// are pre-baked into vertex data at scene-load time, so there is no nested
/// `TransformedPrimitive` wrapper as in the teacher's `primitive` module),
/// its BSDF, and an optional attached area light.
#[derive(Clone)]
pub struct Primitive {
    pub mesh: Arc<TriangleMesh>,
    pub bsdf: Bsdf,
    pub emitter: Option<Arc<Emitter>>,
}

pub struct SurfaceHit {
    pub t: Float,
    pub geom: SurfaceGeometry,
    pub primitive_index: usize,
    pub triangle_index: usize,
}

impl Primitive {
    pub fn new(mesh: Arc<TriangleMesh>, bsdf: Bsdf, emitter: Option<Arc<Emitter>>) -> Primitive {
        Primitive { mesh, bsdf, emitter }
    }

    pub fn bounds(&self) -> Bounds3 {
        let mut b = Bounds3::empty();
        for i in 0..self.mesh.num_triangles() {
            b = b.union(&self.mesh.triangle(i).bounds());
        }
        b
    }

    pub fn intersect_triangle(&self, triangle_index: usize, ray: &Ray) -> Option<(Float, SurfaceGeometry)> {
        let tri = self.mesh.triangle(triangle_index);
        let hit = tri.intersect(ray)?;
        let geom = SurfaceGeometry {
            p: hit.p,
            n: hit.n,
            shading_n: hit.shading_n,
            u: hit.shading_n.to_vector().coordinate_system().0,
            v: hit.shading_n.to_vector().coordinate_system().1,
            degenerate: false,
        };
        Some((hit.t, geom))
    }
}
