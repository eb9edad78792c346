use std::ops::Index;

use super::{Point3, Ray, Vector3};
use crate::Float;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Axis-aligned bounding box, ported from the teacher's `Bounds3<T>` fixed to `f32`.
#[derive(Copy, Clone, Debug)]
pub struct Bounds3 {
    pub p_min: Point3,
    pub p_max: Point3,
}

impl Default for Bounds3 {
    fn default() -> Self {
        Bounds3::empty()
    }
}

impl Index<usize> for Bounds3 {
    type Output = Point3;
    fn index(&self, i: usize) -> &Point3 {
        match i {
            0 => &self.p_min,
            1 => &self.p_max,
            _ => panic!("Bounds3 index out of range: {}", i),
        }
    }
}

impl Bounds3 {
    pub fn empty() -> Bounds3 {
        Bounds3 {
            p_min: Point3::new(Float::INFINITY, Float::INFINITY, Float::INFINITY),
            p_max: Point3::new(Float::NEG_INFINITY, Float::NEG_INFINITY, Float::NEG_INFINITY),
        }
    }

    pub fn from_point(p: Point3) -> Bounds3 {
        Bounds3 { p_min: p, p_max: p }
    }

    pub fn from_points(p1: Point3, p2: Point3) -> Bounds3 {
        Bounds3 {
            p_min: Point3::new(p1.x.min(p2.x), p1.y.min(p2.y), p1.z.min(p2.z)),
            p_max: Point3::new(p1.x.max(p2.x), p1.y.max(p2.y), p1.z.max(p2.z)),
        }
    }

    pub fn union_point(&self, p: Point3) -> Bounds3 {
        Bounds3 {
            p_min: Point3::new(
                self.p_min.x.min(p.x),
                self.p_min.y.min(p.y),
                self.p_min.z.min(p.z),
            ),
            p_max: Point3::new(
                self.p_max.x.max(p.x),
                self.p_max.y.max(p.y),
                self.p_max.z.max(p.z),
            ),
        }
    }

    pub fn union(&self, other: &Bounds3) -> Bounds3 {
        Bounds3 {
            p_min: Point3::new(
                self.p_min.x.min(other.p_min.x),
                self.p_min.y.min(other.p_min.y),
                self.p_min.z.min(other.p_min.z),
            ),
            p_max: Point3::new(
                self.p_max.x.max(other.p_max.x),
                self.p_max.y.max(other.p_max.y),
                self.p_max.z.max(other.p_max.z),
            ),
        }
    }

    pub fn diagonal(&self) -> Vector3 {
        self.p_max - self.p_min
    }

    pub fn surface_area(&self) -> Float {
        let d = self.diagonal();
        if d.x < 0.0 || d.y < 0.0 || d.z < 0.0 {
            return 0.0;
        }
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    pub fn centroid(&self) -> Point3 {
        Point3::new(
            0.5 * (self.p_min.x + self.p_max.x),
            0.5 * (self.p_min.y + self.p_max.y),
            0.5 * (self.p_min.z + self.p_max.z),
        )
    }

    pub fn maximum_extent(&self) -> Axis {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            Axis::X
        } else if d.y > d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Returns `p`'s position inside the box as a fraction in `[0, 1]` per axis,
    /// used by the SAH binning pass to bucket primitive centroids.
    pub fn offset(&self, p: Point3) -> Vector3 {
        let mut o = p - self.p_min;
        let d = self.diagonal();
        if d.x > 0.0 {
            o.x /= d.x;
        }
        if d.y > 0.0 {
            o.y /= d.y;
        }
        if d.z > 0.0 {
            o.z /= d.z;
        }
        o
    }

    /// Standard slab test. Returns the entry/exit `t` range on hit.
    pub fn intersect_p(&self, ray: &Ray) -> Option<(Float, Float)> {
        let mut t0 = 0.0;
        let mut t1 = ray.t_max;
        for axis in 0..3 {
            let inv_d = 1.0 / ray.d[axis];
            let mut t_near = (self.p_min[axis] - ray.o[axis]) * inv_d;
            let mut t_far = (self.p_max[axis] - ray.o[axis]) * inv_d;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }
            t0 = if t_near > t0 { t_near } else { t0 };
            t1 = if t_far < t1 { t_far } else { t1 };
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_contains_both() {
        let a = Bounds3::from_point(Point3::new(0.0, 0.0, 0.0));
        let b = Bounds3::from_point(Point3::new(1.0, 2.0, 3.0));
        let u = a.union(&b);
        assert_eq!(u.p_min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(u.p_max, Point3::new(1.0, 2.0, 3.0));
    }
}
