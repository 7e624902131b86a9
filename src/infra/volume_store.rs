// ============================================================
// Layer 6 — NIfTI Volume Store
// ============================================================
// Persists volumes for visual inspection. For every evaluated
// case the harness writes three files into the output directory:
//
//   <case>-ct.nii      — the reference CT, back in CT units
//   <case>-ct_pre.nii  — the synthesised CT
//   <case>-mr.nii      — the input MR, back in scanner units
//
// Implements the VolumeSink trait from Layer 3 so the evaluation
// workflow never learns about the nifti crate.

use anyhow::{Context, Result};
use ndarray::Array3;
use nifti::writer::WriterOptions;
use std::{fs, path::PathBuf};

use crate::domain::traits::VolumeSink;

pub struct NiftiStore {
    dir: PathBuf,
}

impl NiftiStore {
    /// Point at an output directory, creating it if needed.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }
}

impl VolumeSink for NiftiStore {
    fn write_volume(&self, name: &str, volume: &Array3<f32>) -> Result<()> {
        let path = self.dir.join(format!("{name}.nii"));

        WriterOptions::new(&path)
            .write_nifti(volume)
            .map_err(|e| anyhow::anyhow!("cannot write '{}': {e}", path.display()))?;

        tracing::debug!("wrote '{}'", path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
// The write/read round trip is covered in data::loader::tests,
// which exercises this store against the loader's reader.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_nii_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = NiftiStore::new(dir.path().to_str().unwrap()).unwrap();

        let volume = Array3::from_shape_fn((1, 4, 4), |(_, h, w)| (h * 4 + w) as f32);
        store.write_volume("p01-ct_pre", &volume).unwrap();

        assert!(dir.path().join("p01-ct_pre.nii").exists());
    }

    #[test]
    fn test_creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("show").join("run1");
        assert!(NiftiStore::new(nested.to_str().unwrap().to_string()).is_ok());
        assert!(nested.exists());
    }
}
