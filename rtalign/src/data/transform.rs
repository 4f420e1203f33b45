use serde::{Deserialize, Serialize};

use crate::error::{AlignmentError, Result};

/// Linear retention time model: `aligned_rt = slope * rt + intercept`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearTransform {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearTransform {
    pub fn new(slope: f64, intercept: f64) -> Self {
        LinearTransform { slope, intercept }
    }

    pub fn identity() -> Self {
        LinearTransform::new(1.0, 0.0)
    }

    /// Build the transform through the images of the two ends of the RT interval.
    ///
    /// `rt_low`/`rt_high` are mapped onto `low_image`/`high_image`. Fails if the resulting
    /// slope or intercept is not finite, which happens when one of the boundary histograms
    /// ended up without any support.
    pub fn from_boundary_images(
        rt_low: f64,
        rt_high: f64,
        low_image: f64,
        high_image: f64,
    ) -> Result<Self> {
        let slope = (high_image - low_image) / (rt_high - rt_low);
        let intercept = low_image - rt_low * slope;

        if !slope.is_finite() || !intercept.is_finite() {
            return Err(AlignmentError::InvalidValue {
                message: "Superimposer could not compute an initial transformation! \
                          You can try to increase 'num_used_points' to solve this."
                    .to_string(),
                value: intercept * slope,
            });
        }

        Ok(LinearTransform { slope, intercept })
    }

    #[inline]
    pub fn apply(&self, rt: f64) -> f64 {
        self.slope * rt + self.intercept
    }

    pub fn apply_all(&self, rt: &[f64]) -> Vec<f64> {
        rt.iter().map(|&x| self.apply(x)).collect()
    }

    /// The reverse mapping, `None` for a constant (zero slope) model.
    pub fn inverse(&self) -> Option<Self> {
        if self.slope == 0.0 || !self.slope.is_finite() {
            return None;
        }
        Some(LinearTransform {
            slope: 1.0 / self.slope,
            intercept: -self.intercept / self.slope,
        })
    }
}

impl Default for LinearTransform {
    fn default() -> Self {
        LinearTransform::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_boundary_images() {
        // 100 -> 150 and 1100 -> 1350: slope 1.2, intercept 30
        let t = LinearTransform::from_boundary_images(100.0, 1100.0, 150.0, 1350.0).unwrap();
        assert!((t.slope - 1.2).abs() < 1e-12);
        assert!((t.intercept - 30.0).abs() < 1e-9);
        assert!((t.apply(100.0) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_rejected() {
        let result = LinearTransform::from_boundary_images(100.0, 1100.0, f64::NAN, 1350.0);
        match result {
            Err(AlignmentError::InvalidValue { message, value }) => {
                assert!(message.contains("num_used_points"));
                assert!(value.is_nan());
            }
            other => panic!("unexpected result: {:?}", other),
        }

        // collapsed RT interval
        assert!(LinearTransform::from_boundary_images(10.0, 10.0, 5.0, 6.0).is_err());
    }

    #[test]
    fn test_inverse() {
        let t = LinearTransform::new(2.0, 10.0);
        let inv = t.inverse().unwrap();
        assert!((inv.apply(t.apply(37.5)) - 37.5).abs() < 1e-12);
        assert!(LinearTransform::new(0.0, 3.0).inverse().is_none());
    }

    #[test]
    fn test_apply_all() {
        let t = LinearTransform::new(0.5, -1.0);
        assert_eq!(t.apply_all(&[2.0, 4.0]), vec![0.0, 1.0]);
        assert_eq!(LinearTransform::default(), LinearTransform::identity());
    }
}
