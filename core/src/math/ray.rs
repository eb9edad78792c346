use super::{Point3, Vector3};
use crate::Float;

/// A ray has no differential/motion-blur payload: this renderer does not
/// filter textures or blur across shutter time.
#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub o: Point3,
    pub d: Vector3,
    pub t_max: Float,
}

impl Ray {
    pub fn new(o: Point3, d: Vector3, t_max: Float) -> Ray {
        Ray { o, d, t_max }
    }

    pub fn segment(o: Point3, d: Vector3, t_max: Float) -> Ray {
        Ray::new(o, d, t_max)
    }

    pub fn at(&self, t: Float) -> Point3 {
        self.o + self.d * t
    }
}
