use super::SensorSample;
use crate::math::{Point2, Point3, Ray, Vector3};
use crate::Float;

/// Ideal pinhole (no depth of field). Ported from the teacher's
/// `camera::PerspectiveCamera` with `lens_radius = 0`, using a field-of-view
/// directly rather than pbrt's screen-window/raster matrix chain.
#[derive(Clone, Debug)]
pub struct Pinhole {
    pub eye: Point3,
    pub forward: Vector3,
    pub right: Vector3,
    pub up: Vector3,
    pub resolution: (u32, u32),
    pub tan_half_fov: Float,
}

impl Pinhole {
    pub fn new(eye: Point3, look_at: Point3, up: Vector3, fov_deg: Float, resolution: (u32, u32)) -> Self {
        let forward = (look_at - eye).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);
        Pinhole {
            eye,
            forward,
            right,
            up,
            resolution,
            tan_half_fov: (fov_deg.to_radians() * 0.5).tan(),
        }
    }

    fn aspect(&self) -> Float {
        self.resolution.0 as Float / self.resolution.1 as Float
    }

    /// Maps a raster-space film sample in `[0, w] x [0, h]` to a camera-space
    /// direction on the screen plane at `z = 1`.
    fn screen_dir(&self, p_film: Point2) -> Vector3 {
        let (w, h) = (self.resolution.0 as Float, self.resolution.1 as Float);
        let ndc_x = (2.0 * (p_film.x / w) - 1.0) * self.aspect() * self.tan_half_fov;
        let ndc_y = (1.0 - 2.0 * (p_film.y / h)) * self.tan_half_fov;
        (self.forward + self.right * ndc_x + self.up * ndc_y).normalize()
    }

    pub fn generate_ray(&self, sample: SensorSample) -> Ray {
        let d = self.screen_dir(sample.p_film);
        Ray::new(self.eye, d, Float::INFINITY)
    }

    pub fn pdf_we(&self, w: Vector3) -> (Float, Float) {
        let cos_theta = w.dot(self.forward);
        if cos_theta <= 0.0 {
            return (0.0, 0.0);
        }
        let (width, height) = (self.resolution.0 as Float, self.resolution.1 as Float);
        let area = 4.0 * self.tan_half_fov * self.tan_half_fov * self.aspect();
        let pdf_dir = 1.0 / (area * cos_theta * cos_theta * cos_theta);
        let _ = (width, height);
        (1.0, pdf_dir)
    }

    pub fn raster_position(&self, w: Vector3) -> Option<Point2> {
        let cos_theta = w.dot(self.forward);
        if cos_theta <= 1e-6 {
            return None;
        }
        let local = w * (1.0 / cos_theta);
        let x = local.dot(self.right);
        let y = local.dot(self.up);
        let ndc_x = x / (self.aspect() * self.tan_half_fov);
        let ndc_y = y / self.tan_half_fov;
        if !(-1.0..=1.0).contains(&ndc_x) || !(-1.0..=1.0).contains(&ndc_y) {
            return None;
        }
        let (w_res, h_res) = (self.resolution.0 as Float, self.resolution.1 as Float);
        Some(Point2::new(
            (ndc_x + 1.0) * 0.5 * w_res,
            (1.0 - ndc_y) * 0.5 * h_res,
        ))
    }
}
