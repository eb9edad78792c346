use std::ops::{Add, Index, Sub};

use super::Vector3;
use crate::Float;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point2 {
    pub x: Float,
    pub y: Float,
}

impl Point2 {
    pub fn new(x: Float, y: Float) -> Self {
        Point2 { x, y }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point3 {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Point3 {
    pub const fn new(x: Float, y: Float, z: Float) -> Self {
        Point3 { x, y, z }
    }

    pub fn to_vector(&self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn lerp(t: Float, a: Point3, b: Point3) -> Point3 {
        a + (b - a).to_vector() * t
    }
}

impl Index<usize> for Point3 {
    type Output = Float;
    fn index(&self, i: usize) -> &Float {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Point3 index out of range: {}", i),
        }
    }
}

impl Add<Vector3> for Point3 {
    type Output = Point3;
    fn add(self, v: Vector3) -> Point3 {
        Point3::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }
}

impl Sub<Vector3> for Point3 {
    type Output = Point3;
    fn sub(self, v: Vector3) -> Point3 {
        Point3::new(self.x - v.x, self.y - v.y, self.z - v.z)
    }
}

impl Sub<Point3> for Point3 {
    type Output = Vector3;
    fn sub(self, rhs: Point3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

pub fn distance(p1: Point3, p2: Point3) -> Float {
    (p2 - p1).length()
}

pub fn distance_squared(p1: Point3, p2: Point3) -> Float {
    (p2 - p1).length_squared()
}
