// ============================================================
// Layer 3 — Intensity Statistics
// ============================================================
// MR and CT intensities live on very different scales (arbitrary
// scanner units vs Hounsfield-like units), so each volume is
// z-scored before it reaches the network:
//
//   normalised = (x - mean) / std
//
// The same stats must be kept around to undo the transform on
// the network output, because the quality metrics and the
// exported volumes are only meaningful in the original units.

use serde::{Deserialize, Serialize};

/// Mean and standard deviation of one volume's voxel intensities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormStats {
    pub mean: f32,
    pub std: f32,
}

impl NormStats {
    /// Compute population mean/std over a voxel buffer.
    ///
    /// A constant volume has zero variance; its std is clamped to 1
    /// so normalisation never divides by zero.
    pub fn from_values(values: &[f32]) -> Self {
        if values.is_empty() {
            return Self { mean: 0.0, std: 1.0 };
        }

        let n = values.len() as f64;
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = values
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        let std = var.sqrt();

        Self {
            mean: mean as f32,
            std: if std > f32::EPSILON as f64 { std as f32 } else { 1.0 },
        }
    }

    /// Map a raw intensity into z-scored space.
    pub fn normalize(&self, x: f32) -> f32 {
        (x - self.mean) / self.std
    }

    /// Map a z-scored intensity back into the original units.
    pub fn denormalize(&self, x: f32) -> f32 {
        x * self.std + self.mean
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_is_identity() {
        let stats = NormStats::from_values(&[1.0, 2.0, 3.0, 4.0]);
        for x in [0.5f32, 2.5, 100.0, -3.0] {
            let back = stats.denormalize(stats.normalize(x));
            assert!((back - x).abs() < 1e-4, "{back} != {x}");
        }
    }

    #[test]
    fn test_known_mean_and_std() {
        // mean 2.5, population std of [1,2,3,4] = sqrt(1.25)
        let stats = NormStats::from_values(&[1.0, 2.0, 3.0, 4.0]);
        assert!((stats.mean - 2.5).abs() < 1e-6);
        assert!((stats.std - 1.25f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_constant_volume_does_not_divide_by_zero() {
        let stats = NormStats::from_values(&[7.0; 32]);
        assert_eq!(stats.std, 1.0);
        assert_eq!(stats.normalize(7.0), 0.0);
    }

    #[test]
    fn test_empty_buffer() {
        let stats = NormStats::from_values(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std, 1.0);
    }
}
