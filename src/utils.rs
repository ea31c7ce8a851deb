use ndarray::Array2;
use std::fmt;
use tracing::info;

/// Summary of the valid (non-NaN) cells of a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub valid: usize,
    pub total: usize,
}

impl SurfaceStats {
    pub fn of(values: &Array2<f64>) -> Self {
        let valid_values: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();

        Self {
            min: valid_values.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
            max: valid_values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
            mean: if valid_values.is_empty() {
                f64::NAN
            } else {
                valid_values.iter().sum::<f64>() / valid_values.len() as f64
            },
            valid: valid_values.len(),
            total: values.len(),
        }
    }

    pub fn valid_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.valid as f64 / self.total as f64
        }
    }
}

impl fmt::Display for SurfaceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid == 0 {
            return write!(f, "no valid cells out of {}", self.total);
        }
        write!(
            f,
            "min {:.2}, max {:.2}, mean {:.2}, valid cells {} / {} ({:.1}%)",
            self.min,
            self.max,
            self.mean,
            self.valid,
            self.total,
            100.0 * self.valid_ratio()
        )
    }
}

pub fn log_surface_statistics(name: &str, values: &Array2<f64>) -> SurfaceStats {
    let stats = SurfaceStats::of(values);
    info!("{}: {}", name, stats);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_stats_skip_nan() {
        let values = array![[1.0, f64::NAN], [3.0, 0.0]];
        let stats = SurfaceStats::of(&values);

        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.mean - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!((stats.valid, stats.total), (3, 4));
        assert_eq!(stats.valid_ratio(), 0.75);
    }

    #[test]
    fn test_all_nan_surface() {
        let values = Array2::from_elem((2, 2), f64::NAN);
        let stats = SurfaceStats::of(&values);
        assert!(stats.mean.is_nan());
        assert_eq!(stats.to_string(), "no valid cells out of 4");
    }
}
