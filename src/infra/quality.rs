// ============================================================
// Layer 6 — Reconstruction Quality Metrics
// ============================================================
// The five numbers the harness reports per case, computed on
// un-normalised (CT-unit) voxels:
//
//   MSE / RMSE / MAE — voxelwise error
//   SSIM             — structural similarity, uniform 7x7 window,
//                      K1 = 0.01, K2 = 0.03, caller-provided data
//                      range (CT default 4000)
//   PSNR             — scaled form 55 * log10(255 / rmse), with an
//                      epsilon guard for a perfect reconstruction
//
// Everything here is plain ndarray/f64 maths so it is testable
// without a GPU. Accumulation happens in f64 regardless of the
// f32 voxel type.
//
// Reference: Wang et al. (2004) SSIM

use anyhow::Result;
use ndarray::{Array3, ArrayView2, Axis};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::domain::report::CaseMetrics;

/// SSIM regularisation constants from Wang et al.
const SSIM_K1: f64 = 0.01;
const SSIM_K2: f64 = 0.03;
/// Square window side used for local SSIM statistics.
const SSIM_WINDOW: usize = 7;

pub fn mean_squared_error(reference: &[f32], predicted: &[f32]) -> f64 {
    debug_assert_eq!(reference.len(), predicted.len());
    if reference.is_empty() {
        return 0.0;
    }
    reference
        .iter()
        .zip(predicted)
        .map(|(&r, &p)| {
            let d = r as f64 - p as f64;
            d * d
        })
        .sum::<f64>()
        / reference.len() as f64
}

pub fn mean_absolute_error(reference: &[f32], predicted: &[f32]) -> f64 {
    debug_assert_eq!(reference.len(), predicted.len());
    if reference.is_empty() {
        return 0.0;
    }
    reference
        .iter()
        .zip(predicted)
        .map(|(&r, &p)| (r as f64 - p as f64).abs())
        .sum::<f64>()
        / reference.len() as f64
}

pub fn root_mean_squared_error(reference: &[f32], predicted: &[f32]) -> f64 {
    mean_squared_error(reference, predicted).sqrt()
}

/// Scaled peak signal-to-noise ratio: `55 * log10(255 / rmse)`.
///
/// A perfect reconstruction has rmse 0; the epsilon guard keeps
/// the result finite instead of dividing by zero.
pub fn psnr(reference: &[f32], predicted: &[f32]) -> f64 {
    let mut rmse = root_mean_squared_error(reference, predicted);
    if rmse == 0.0 {
        rmse = f64::EPSILON;
    }
    55.0 * (255.0 / rmse).log10()
}

/// Mean structural similarity over one slice.
///
/// Local means/variances/covariance are taken over a uniform
/// square window at every position where the full window fits
/// (uniform filter, valid region only). Images smaller than the
/// window fall back to a single whole-image window.
pub fn ssim(reference: ArrayView2<f32>, predicted: ArrayView2<f32>, data_range: f64) -> f64 {
    debug_assert_eq!(reference.dim(), predicted.dim());
    let (h, w) = reference.dim();
    if h == 0 || w == 0 {
        return 1.0;
    }

    // Shrink (keeping it odd) when the image is smaller than 7x7.
    let mut win = SSIM_WINDOW.min(h).min(w);
    if win % 2 == 0 {
        win -= 1;
    }

    let n = (win * win) as f64;
    // Sample (not population) normalisation for variances
    let cov_norm = n / (n - 1.0).max(1.0);

    let c1 = (SSIM_K1 * data_range) * (SSIM_K1 * data_range);
    let c2 = (SSIM_K2 * data_range) * (SSIM_K2 * data_range);

    let mut total = 0.0;
    let mut count = 0usize;

    for i in 0..=(h - win) {
        for j in 0..=(w - win) {
            let mut sx = 0.0;
            let mut sy = 0.0;
            let mut sxx = 0.0;
            let mut syy = 0.0;
            let mut sxy = 0.0;

            for di in 0..win {
                for dj in 0..win {
                    let x = reference[(i + di, j + dj)] as f64;
                    let y = predicted[(i + di, j + dj)] as f64;
                    sx += x;
                    sy += y;
                    sxx += x * x;
                    syy += y * y;
                    sxy += x * y;
                }
            }

            let ux = sx / n;
            let uy = sy / n;
            let vx = cov_norm * (sxx / n - ux * ux);
            let vy = cov_norm * (syy / n - uy * uy);
            let vxy = cov_norm * (sxy / n - ux * uy);

            total += ((2.0 * ux * uy + c1) * (2.0 * vxy + c2))
                / ((ux * ux + uy * uy + c1) * (vx + vy + c2));
            count += 1;
        }
    }

    total / count as f64
}

/// SSIM over a volume: the mean of the per-slice values.
pub fn volume_ssim(reference: &Array3<f32>, predicted: &Array3<f32>, data_range: f64) -> f64 {
    let depth = reference.dim().0;
    if depth == 0 {
        return 1.0;
    }

    let total: f64 = reference
        .axis_iter(Axis(0))
        .zip(predicted.axis_iter(Axis(0)))
        .map(|(r, p)| ssim(r, p, data_range))
        .sum();

    total / depth as f64
}

/// All five metrics for one evaluated case.
pub fn compute_case_metrics(
    case: &str,
    reference: &Array3<f32>,
    predicted: &Array3<f32>,
    data_range: f64,
) -> CaseMetrics {
    // Fall back to an owned copy if a view is not contiguous
    let r_owned: Vec<f32>;
    let r = match reference.as_slice() {
        Some(s) => s,
        None => {
            r_owned = reference.iter().copied().collect();
            &r_owned
        }
    };
    let p_owned: Vec<f32>;
    let p = match predicted.as_slice() {
        Some(s) => s,
        None => {
            p_owned = predicted.iter().copied().collect();
            &p_owned
        }
    };

    let mse = mean_squared_error(r, p);
    CaseMetrics {
        case: case.to_string(),
        mse,
        rmse: mse.sqrt(),
        mae: mean_absolute_error(r, p),
        ssim: volume_ssim(reference, predicted, data_range),
        psnr: psnr(r, p),
    }
}

// ─── MetricsLogger ────────────────────────────────────────────────────────────
/// Appends one CSV row per evaluated case to `{dir}/metrics.csv`,
/// writing the header only when the file is new so repeated runs
/// keep appending.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "case,mse,rmse,mae,ssim,psnr")?;
            tracing::debug!("created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &CaseMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.case, m.mse, m.rmse, m.mae, m.ssim, m.psnr,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_mse_and_mae_on_known_values() {
        let reference = [0.0f32, 0.0];
        let predicted = [1.0f32, 3.0];
        assert!((mean_squared_error(&reference, &predicted) - 5.0).abs() < 1e-12);
        assert!((mean_absolute_error(&reference, &predicted) - 2.0).abs() < 1e-12);
        assert!(
            (root_mean_squared_error(&reference, &predicted) - 5.0f64.sqrt()).abs() < 1e-12
        );
    }

    #[test]
    fn test_psnr_known_value() {
        // rmse is exactly 255 → log10(1) → 0
        let reference = [0.0f32; 4];
        let predicted = [255.0f32; 4];
        assert!(psnr(&reference, &predicted).abs() < 1e-9);
    }

    #[test]
    fn test_psnr_perfect_reconstruction_stays_finite() {
        let x = [1.0f32, 2.0, 3.0];
        let value = psnr(&x, &x);
        assert!(value.is_finite());
        assert!(value > 100.0);
    }

    fn ramp(h: usize, w: usize) -> Array2<f32> {
        Array2::from_shape_fn((h, w), |(i, j)| (i * w + j) as f32)
    }

    #[test]
    fn test_ssim_identical_is_one() {
        let img = ramp(16, 16);
        let value = ssim(img.view(), img.view(), 255.0);
        assert!((value - 1.0).abs() < 1e-9, "got {value}");
    }

    #[test]
    fn test_ssim_degrades_under_perturbation() {
        let img = ramp(16, 16);
        let noisy = img.mapv(|v| v + if v as usize % 2 == 0 { 40.0 } else { -40.0 });
        let value = ssim(img.view(), noisy.view(), 255.0);
        assert!(value < 0.99, "got {value}");
    }

    #[test]
    fn test_ssim_small_image_falls_back_to_global_window() {
        let img = ramp(4, 4);
        let value = ssim(img.view(), img.view(), 255.0);
        assert!((value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_volume_ssim_averages_slices() {
        let volume = Array3::from_shape_fn((3, 8, 8), |(d, i, j)| (d + i * 8 + j) as f32);
        let value = volume_ssim(&volume, &volume, 255.0);
        assert!((value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_compute_case_metrics_fills_every_field() {
        let reference = Array3::from_shape_fn((1, 8, 8), |(_, i, j)| (i * 8 + j) as f32);
        let predicted = reference.mapv(|v| v + 1.0);
        let m = compute_case_metrics("p01", &reference, &predicted, 4000.0);
        assert_eq!(m.case, "p01");
        assert!((m.mse - 1.0).abs() < 1e-9);
        assert!((m.rmse - 1.0).abs() < 1e-9);
        assert!((m.mae - 1.0).abs() < 1e-9);
        assert!(m.ssim > 0.9);
        assert!(m.psnr > 0.0);
    }

    #[test]
    fn test_logger_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap().to_string();

        let row = CaseMetrics {
            case: "p01".into(),
            mse: 1.0,
            rmse: 1.0,
            mae: 1.0,
            ssim: 0.9,
            psnr: 30.0,
        };

        let logger = MetricsLogger::new(path.clone()).unwrap();
        logger.log(&row).unwrap();
        // A second logger over the same dir must append, not rewrite
        let logger = MetricsLogger::new(path).unwrap();
        logger.log(&row).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("case,mse,rmse,mae,ssim,psnr"));
    }
}
