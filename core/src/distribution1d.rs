//! CDF-based piecewise-constant 1D distribution, ported near-verbatim from
//! the teacher's `sampling::Distribution1D`. Used for emitter-selection
//! (power-weighted) and triangle-area-weighted sampling within a mesh.

use crate::Float;

#[derive(Debug, Clone)]
pub struct Distribution1D {
    func: Vec<Float>,
    cdf: Vec<Float>,
    func_int: Float,
}

fn find_interval(size: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut first, mut len) = (0usize, size);
    while len > 0 {
        let half = len >> 1;
        let middle = first + half;
        if pred(middle) {
            first = middle + 1;
            len -= half + 1;
        } else {
            len = half;
        }
    }
    first.saturating_sub(1).min(size.saturating_sub(2))
}

impl Distribution1D {
    pub fn new(f: &[Float]) -> Distribution1D {
        let n = f.len();
        let func = Vec::from(f);
        let mut cdf = vec![0.0; n + 1];
        for i in 1..=n {
            cdf[i] = cdf[i - 1] + func[i - 1] / n as Float;
        }
        let func_int = cdf[n];
        if func_int == 0.0 {
            for (i, v) in cdf.iter_mut().enumerate().skip(1) {
                *v = i as Float / n as Float;
            }
        } else {
            for v in cdf.iter_mut().skip(1) {
                *v /= func_int;
            }
        }
        Distribution1D { func, cdf, func_int }
    }

    pub fn count(&self) -> usize {
        self.func.len()
    }

    pub fn func_int(&self) -> Float {
        self.func_int
    }

    pub fn sample_continuous(&self, u: Float) -> (Float, Float, usize) {
        let offset = find_interval(self.cdf.len(), |i| self.cdf[i] <= u);
        let mut du = u - self.cdf[offset];
        if self.cdf[offset + 1] - self.cdf[offset] > 0.0 {
            du /= self.cdf[offset + 1] - self.cdf[offset];
        }
        let pdf = if self.func_int > 0.0 {
            self.func[offset] / self.func_int
        } else {
            0.0
        };
        let x = (offset as Float + du) / self.count() as Float;
        (x, pdf, offset)
    }

    pub fn sample_discrete(&self, u: Float) -> (usize, Float) {
        let offset = find_interval(self.cdf.len(), |i| self.cdf[i] <= u);
        let pdf = if self.func_int > 0.0 {
            self.func[offset] / (self.func_int * self.count() as Float)
        } else {
            0.0
        };
        (offset, pdf)
    }

    pub fn discrete_pdf(&self, index: usize) -> Float {
        if self.func_int > 0.0 {
            self.func[index] / (self.func_int * self.count() as Float)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_matches_teacher_reference_case() {
        let func = [0.0, 1.0, 0.0, 3.0];
        let distrib = Distribution1D::new(&func);
        assert_eq!(4, distrib.count());
        assert_eq!((1, 0.25), distrib.sample_discrete(0.0));
        assert_eq!((1, 0.25), distrib.sample_discrete(0.125));
        assert_eq!((3, 0.75), distrib.sample_discrete(0.250001));
        assert_eq!((3, 0.75), distrib.sample_discrete(0.625));
    }

    #[test]
    fn continuous_pdf_integrates_to_one() {
        let func = [1.0, 1.0, 1.0, 1.0];
        let distrib = Distribution1D::new(&func);
        let (_, pdf, _) = distrib.sample_continuous(0.5);
        assert!((pdf - 1.0).abs() < 1e-5);
    }
}
