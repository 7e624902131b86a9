// ============================================================
// Layer 3 — Scan Case Domain Type
// ============================================================
// One evaluation case: a paired MR/CT acquisition of the same
// patient, already z-scored, with the stats kept alongside so
// the pipeline can undo the normalisation later.
//
// Volumes are stored depth-first: axis 0 is the slice (z) axis,
// axes 1 and 2 are the in-plane rows and columns. A single 2D
// slice is simply a volume with depth 1 — this keeps the planar
// and volumetric code paths on one data type.

use ndarray::Array3;

use crate::domain::stats::NormStats;

/// A paired, normalised MR/CT case ready for evaluation.
#[derive(Debug, Clone)]
pub struct ScanCase {
    /// Case identifier, taken from the file stem — kept so the
    /// exported volumes and metric rows can be traced back
    pub name: String,

    /// z-scored MR volume, shape [depth, height, width]
    pub mr: Array3<f32>,

    /// z-scored reference CT volume, same shape as `mr`
    pub ct: Array3<f32>,

    /// Stats that z-scored `mr` (needed to export the raw MR)
    pub mr_stats: NormStats,

    /// Stats that z-scored `ct` (needed to bring the prediction
    /// and the reference back into CT units)
    pub ct_stats: NormStats,
}

impl ScanCase {
    /// Volume dimensions as (depth, height, width).
    pub fn dims(&self) -> (usize, usize, usize) {
        let d = self.mr.dim();
        (d.0, d.1, d.2)
    }
}
