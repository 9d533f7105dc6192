//! Summary statistics of an inertial window.

use serde::Serialize;

/// Features the knock model is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowFeatures {
    pub max: f32,
    pub min: f32,
    /// Peak-to-peak swing, `max - min`.
    pub ptp: f32,
    pub rms: f32,
    /// Population variance.
    pub variance: f32,
}

impl WindowFeatures {
    /// Compute features over `window`. Returns `None` for an empty window.
    pub fn compute(window: &[f32]) -> Option<Self> {
        let first = *window.first()?;
        let n = window.len() as f64;

        let (mut max, mut min) = (first, first);
        let mut sum = 0.0f64;
        let mut sum_squares = 0.0f64;
        for &v in window {
            max = max.max(v);
            min = min.min(v);
            sum += v as f64;
            sum_squares += (v as f64) * (v as f64);
        }

        let mean = sum / n;
        let variance = (sum_squares / n - mean * mean).max(0.0);

        Some(Self {
            max,
            min,
            ptp: max - min,
            rms: (sum_squares / n).sqrt() as f32,
            variance: variance as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_has_no_features() {
        assert!(WindowFeatures::compute(&[]).is_none());
    }

    #[test]
    fn test_constant_window() {
        let f = WindowFeatures::compute(&[9.8; 10]).unwrap();
        assert_eq!(f.max, 9.8);
        assert_eq!(f.min, 9.8);
        assert_eq!(f.ptp, 0.0);
        assert!((f.rms - 9.8).abs() < 1e-5);
        assert!(f.variance < 1e-6);
    }

    #[test]
    fn test_known_values() {
        let f = WindowFeatures::compute(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(f.max, 4.0);
        assert_eq!(f.min, 1.0);
        assert_eq!(f.ptp, 3.0);
        assert!((f.rms - 7.5f32.sqrt()).abs() < 1e-6);
        assert!((f.variance - 1.25).abs() < 1e-6);
    }
}
