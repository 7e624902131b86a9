// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the pipeline and the filesystem.
//
// By programming against traits instead of concrete types, the
// application layer never learns which file format backs the
// dataset. Today both traits are implemented over NIfTI files;
// a DICOM-series implementation would slot in without touching
// the evaluation workflow.

use anyhow::Result;
use ndarray::Array3;

use crate::domain::scan::ScanCase;

// ─── SliceSource ──────────────────────────────────────────────────────────────
/// Any component that can load paired MR/CT cases.
///
/// Implementations:
///   - NiftiLoader → paired `<case>_mr.nii` / `<case>_ct.nii` files
pub trait SliceSource {
    /// Load every available case, normalised and paired.
    fn load_all(&self) -> Result<Vec<ScanCase>>;
}

// ─── VolumeSink ───────────────────────────────────────────────────────────────
/// Any component that can persist a volume for later inspection.
///
/// Implementations:
///   - NiftiStore → writes `.nii` files into the output directory
pub trait VolumeSink {
    /// Write one volume under the given name (no extension).
    fn write_volume(&self, name: &str, volume: &Array3<f32>) -> Result<()>;
}
