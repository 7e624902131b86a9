// ============================================================
// Layer 3 — Evaluation Report Types
// ============================================================
// One CaseMetrics row per evaluated case, and a MetricsSummary
// that aggregates the rows into mean ± std per metric — the
// numbers the harness prints at the end of a run.
//
// The std is the population standard deviation (ddof = 0),
// matching what numpy's `std` reports by default.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reconstruction-quality metrics for a single case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseMetrics {
    pub case: String,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub ssim: f64,
    pub psnr: f64,
}

/// Mean and spread of one metric across the validation set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricStat {
    pub mean: f64,
    pub std: f64,
}

impl MetricStat {
    fn over(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        Self { mean, std: var.sqrt() }
    }
}

/// Aggregate report over every evaluated case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub cases: usize,
    pub mse: MetricStat,
    pub rmse: MetricStat,
    pub mae: MetricStat,
    pub ssim: MetricStat,
    pub psnr: MetricStat,
}

impl MetricsSummary {
    /// Aggregate per-case rows; None when there is nothing to report.
    pub fn from_rows(rows: &[CaseMetrics]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }

        let collect = |f: fn(&CaseMetrics) -> f64| -> Vec<f64> { rows.iter().map(f).collect() };

        Some(Self {
            cases: rows.len(),
            mse: MetricStat::over(&collect(|r| r.mse)),
            rmse: MetricStat::over(&collect(|r| r.rmse)),
            mae: MetricStat::over(&collect(|r| r.mae)),
            ssim: MetricStat::over(&collect(|r| r.ssim)),
            psnr: MetricStat::over(&collect(|r| r.psnr)),
        })
    }
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "evaluated {} cases", self.cases)?;
        writeln!(f, "mean mse  is : {:.6} ± {:.6}", self.mse.mean, self.mse.std)?;
        writeln!(f, "mean rmse is : {:.6} ± {:.6}", self.rmse.mean, self.rmse.std)?;
        writeln!(f, "mean mae  is : {:.6} ± {:.6}", self.mae.mean, self.mae.std)?;
        writeln!(f, "mean ssim is : {:.6} ± {:.6}", self.ssim.mean, self.ssim.std)?;
        write!(f, "mean psnr is : {:.6} ± {:.6}", self.psnr.mean, self.psnr.std)
    }
}
