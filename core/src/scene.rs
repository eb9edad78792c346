//! Owns the primitive list, the light list split into finite/infinite, and
//! the chosen acceleration structure; forwards ray queries to it. Grounded
//! on the teacher's `scene::Scene` (aggregate + lights + infinite_lights
//! split, `intersect`/`intersect_p`/`world_bounds` shape), minus its
//! per-call `stat_counter!` instrumentation — this crate has no stats
//! subsystem, see SPEC_FULL.md's ambient logging section for what replaces
//! it (structured `log::trace!` at the estimator layer instead).

use std::sync::Arc;

use crate::accel::Accel;
use crate::emitter::Emitter;
use crate::math::{Bounds3, Ray};
use crate::primitive::{Primitive, SurfaceHit};

pub struct Scene {
    pub primitives: Vec<Primitive>,
    pub lights: Vec<Arc<Emitter>>,
    pub infinite_lights: Vec<Arc<Emitter>>,
    accel: Accel,
}

impl Scene {
    pub fn new(primitives: Vec<Primitive>, lights: Vec<Arc<Emitter>>, accel: Accel) -> Scene {
        let infinite_lights = lights.iter().filter(|l| l.is_infinite()).cloned().collect();
        Scene { primitives, lights, infinite_lights, accel }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<SurfaceHit> {
        let hit = self.accel.intersect(&self.primitives, ray)?;
        let (t, geom) = self.primitives[hit.primitive as usize]
            .intersect_triangle(hit.triangle as usize, ray)?;
        Some(SurfaceHit {
            t,
            geom,
            primitive_index: hit.primitive as usize,
            triangle_index: hit.triangle as usize,
        })
    }

    pub fn intersect_p(&self, ray: &Ray) -> bool {
        self.accel.intersect_p(&self.primitives, ray)
    }

    pub fn world_bounds(&self) -> Bounds3 {
        self.accel.world_bounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsdf::{Bsdf, Diffuse};
    use crate::math::{Normal3, Point3, Vector3};
    use crate::mesh::TriangleMesh;
    use crate::spectrum::Spectrum;
    use crate::Float;

    fn quad(center: Point3) -> Primitive {
        let n = Normal3::new(0.0, 0.0, 1.0);
        let positions = vec![
            center + Vector3::new(-0.5, -0.5, 0.0),
            center + Vector3::new(0.5, -0.5, 0.0),
            center + Vector3::new(0.5, 0.5, 0.0),
            center + Vector3::new(-0.5, 0.5, 0.0),
        ];
        let mesh = TriangleMesh::new(positions, vec![n, n, n, n], vec![[0, 1, 2], [0, 2, 3]]);
        Primitive::new(Arc::new(mesh), Bsdf::Diffuse(Diffuse { albedo: Spectrum::grey(0.5) }), None)
    }

    #[test]
    fn intersects_nearest_primitive() {
        let primitives = vec![quad(Point3::new(0.0, 0.0, 4.0))];
        let accel = Accel::build_bvh(&primitives);
        let scene = Scene::new(primitives, Vec::new(), accel);
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0), Float::INFINITY);
        let hit = scene.intersect(&ray).expect("should hit quad");
        assert!((hit.t - 4.0).abs() < 1e-3);
    }
}
