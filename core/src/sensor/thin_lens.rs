use super::{Pinhole, SensorSample};
use crate::math::{Point2, Point3, Ray, Vector3};
use crate::Float;

/// Depth-of-field sensor: a pinhole with a finite circular aperture and a
/// focal plane, jittering the ray origin over the lens and re-aiming it
/// through the same point on the focal plane the pinhole ray would have hit.
/// Ported from the teacher's `lens_radius`/`focal_distance` handling in
/// `camera::PerspectiveCamera::generate_ray`.
#[derive(Clone, Debug)]
pub struct ThinLens {
    pub pinhole: Pinhole,
    pub eye: Point3,
    pub forward: Vector3,
    pub resolution: (u32, u32),
    pub lens_radius: Float,
    pub focal_distance: Float,
}

impl ThinLens {
    pub fn new(pinhole: Pinhole, lens_radius: Float, focal_distance: Float) -> Self {
        ThinLens {
            eye: pinhole.eye,
            forward: pinhole.forward,
            resolution: pinhole.resolution,
            pinhole,
            lens_radius,
            focal_distance,
        }
    }

    fn sample_lens(&self, p_lens: Point2) -> Point2 {
        let ux = 2.0 * p_lens.x - 1.0;
        let uy = 2.0 * p_lens.y - 1.0;
        if ux == 0.0 && uy == 0.0 {
            return Point2::new(0.0, 0.0);
        }
        let (r, theta) = if ux.abs() > uy.abs() {
            (ux, std::f32::consts::FRAC_PI_4 * (uy / ux))
        } else {
            (uy, std::f32::consts::FRAC_PI_2 - std::f32::consts::FRAC_PI_4 * (ux / uy))
        };
        Point2::new(r * theta.cos() * self.lens_radius, r * theta.sin() * self.lens_radius)
    }

    pub fn generate_ray(&self, sample: SensorSample) -> Ray {
        let pinhole_ray = self.pinhole.generate_ray(sample);
        if self.lens_radius <= 0.0 {
            return pinhole_ray;
        }
        let lens = self.sample_lens(sample.p_lens);
        let ft = self.focal_distance / pinhole_ray.d.dot(self.pinhole.forward).max(1e-6);
        let p_focus = pinhole_ray.at(ft);
        let origin = self.eye + self.pinhole.right * lens.x + self.pinhole.up * lens.y;
        Ray::new(origin, (p_focus - origin).normalize(), Float::INFINITY)
    }

    pub fn pdf_we(&self, w: Vector3) -> (Float, Float) {
        self.pinhole.pdf_we(w)
    }

    pub fn raster_position(&self, w: Vector3) -> Option<Point2> {
        self.pinhole.raster_position(w)
    }
}
