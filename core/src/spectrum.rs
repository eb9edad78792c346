use std::ops::{Add, AddAssign, Div, Index, Mul, MulAssign, Sub};

use crate::{clamp, Float};

/// Linear RGB radiometric quantity, fixed at three channels at build time.
/// Ported from the teacher's `spectrum::Spectrum`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Spectrum {
    pub r: Float,
    pub g: Float,
    pub b: Float,
}

impl Spectrum {
    pub fn rgb(r: Float, g: Float, b: Float) -> Spectrum {
        Spectrum { r, g, b }
    }

    pub fn grey(v: Float) -> Spectrum {
        Spectrum { r: v, g: v, b: v }
    }

    pub fn black() -> Spectrum {
        Spectrum::grey(0.0)
    }

    pub fn white() -> Spectrum {
        Spectrum::grey(1.0)
    }

    pub fn is_black(&self) -> bool {
        self.r == 0.0 && self.g == 0.0 && self.b == 0.0
    }

    pub fn has_nan(&self) -> bool {
        self.r.is_nan() || self.g.is_nan() || self.b.is_nan()
    }

    pub fn has_inf(&self) -> bool {
        self.r.is_infinite() || self.g.is_infinite() || self.b.is_infinite()
    }

    /// Relative luminance (Rec. 709 weights), used for importance-sampling
    /// emitter selection and Russian-roulette termination probability.
    pub fn y(&self) -> Float {
        0.212671 * self.r + 0.715160 * self.g + 0.072169 * self.b
    }

    pub fn max_component(&self) -> Float {
        self.r.max(self.g).max(self.b)
    }

    pub fn sqrt(&self) -> Spectrum {
        Spectrum::rgb(self.r.sqrt(), self.g.sqrt(), self.b.sqrt())
    }

    /// Linear RGB to gamma-2.2-ish sRGB byte encoding (used by `Film::save`).
    pub fn to_srgb(self) -> [u8; 3] {
        let a = 0.055;
        let inv_gamma = 1.0 / 2.4;
        let mut srgb = [0u8; 3];
        for i in 0..3 {
            let v = if self[i] <= 0.0031308 {
                12.92 * self[i]
            } else {
                (1.0 + a) * self[i].max(0.0).powf(inv_gamma) - a
            };
            srgb[i] = clamp(v * 255.0 + 0.5, 0.0, 255.0) as u8;
        }
        srgb
    }

    pub fn from_srgb(rgb: [u8; 3]) -> Spectrum {
        fn inv_gamma(v: Float) -> Float {
            if v <= 0.04045 {
                v / 12.92
            } else {
                ((v + 0.055) / 1.055).powf(2.4)
            }
        }
        Spectrum::rgb(
            inv_gamma(rgb[0] as Float / 255.0),
            inv_gamma(rgb[1] as Float / 255.0),
            inv_gamma(rgb[2] as Float / 255.0),
        )
    }

    pub fn from_xyz(xyz: [Float; 3]) -> Spectrum {
        Spectrum::rgb(
            3.240479 * xyz[0] - 1.537150 * xyz[1] - 0.498535 * xyz[2],
            -0.969256 * xyz[0] + 1.875991 * xyz[1] + 0.041556 * xyz[2],
            0.055648 * xyz[0] - 0.204043 * xyz[1] + 1.057311 * xyz[2],
        )
    }

    pub fn to_xyz(self) -> [Float; 3] {
        [
            0.412453 * self.r + 0.357580 * self.g + 0.180423 * self.b,
            0.212671 * self.r + 0.715160 * self.g + 0.072169 * self.b,
            0.019334 * self.r + 0.119193 * self.g + 0.950227 * self.b,
        ]
    }

    pub fn clamp_zero(&self) -> Spectrum {
        Spectrum::rgb(self.r.max(0.0), self.g.max(0.0), self.b.max(0.0))
    }
}

impl Index<usize> for Spectrum {
    type Output = Float;
    fn index(&self, i: usize) -> &Float {
        match i {
            0 => &self.r,
            1 => &self.g,
            2 => &self.b,
            _ => panic!("Spectrum index out of range: {}", i),
        }
    }
}

impl Add for Spectrum {
    type Output = Spectrum;
    fn add(self, rhs: Spectrum) -> Spectrum {
        Spectrum::rgb(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl AddAssign for Spectrum {
    fn add_assign(&mut self, rhs: Spectrum) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
    }
}

impl Sub for Spectrum {
    type Output = Spectrum;
    fn sub(self, rhs: Spectrum) -> Spectrum {
        Spectrum::rgb(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b)
    }
}

impl Mul for Spectrum {
    type Output = Spectrum;
    fn mul(self, rhs: Spectrum) -> Spectrum {
        Spectrum::rgb(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b)
    }
}

impl Mul<Float> for Spectrum {
    type Output = Spectrum;
    fn mul(self, s: Float) -> Spectrum {
        Spectrum::rgb(self.r * s, self.g * s, self.b * s)
    }
}

impl Mul<Spectrum> for Float {
    type Output = Spectrum;
    fn mul(self, s: Spectrum) -> Spectrum {
        s * self
    }
}

impl MulAssign<Float> for Spectrum {
    fn mul_assign(&mut self, s: Float) {
        self.r *= s;
        self.g *= s;
        self.b *= s;
    }
}

impl Div<Float> for Spectrum {
    type Output = Spectrum;
    fn div(self, s: Float) -> Spectrum {
        Spectrum::rgb(self.r / s, self.g / s, self.b / s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_roundtrip_is_close() {
        let c = Spectrum::rgb(0.5, 0.25, 0.75);
        let bytes = c.to_srgb();
        let back = Spectrum::from_srgb(bytes);
        assert!((back.r - c.r).abs() < 0.01);
        assert!((back.g - c.g).abs() < 0.01);
        assert!((back.b - c.b).abs() < 0.01);
    }
}
