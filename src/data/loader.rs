// ============================================================
// Layer 4 — NIfTI Pair Loader
// ============================================================
// Loads paired MR/CT cases from a dataset directory using the
// nifti crate.
//
// Expected layout: for every case there are two files,
//
//   <case>_mr.nii   (or .nii.gz)   — the input MR volume
//   <case>_ct.nii   (or .nii.gz)   — the reference CT volume
//
// Volumes are read as f32, z-scored per volume, and returned
// together with the stats that produced them. A 2D image file
// becomes a volume of depth 1, so downstream code only ever
// sees [depth, height, width] arrays.
//
// Unpaired, unreadable, or shape-mismatched cases are skipped
// with a warning — one bad file must not abort a whole run.

use anyhow::{Context, Result};
use ndarray::Array3;
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::scan::ScanCase;
use crate::domain::stats::NormStats;
use crate::domain::traits::SliceSource;

/// Suffixes (without compression extension) that mark the MR half
/// of a case pair.
const MR_SUFFIXES: [&str; 2] = ["_mr.nii.gz", "_mr.nii"];

pub struct NiftiLoader {
    dir: String,
}

impl NiftiLoader {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SliceSource for NiftiLoader {
    fn load_all(&self) -> Result<Vec<ScanCase>> {
        let dir = Path::new(&self.dir);
        anyhow::ensure!(
            dir.exists(),
            "dataset directory '{}' does not exist",
            self.dir
        );

        let mut cases = Vec::new();

        for entry in fs::read_dir(dir)
            .with_context(|| format!("cannot read dataset directory '{}'", self.dir))?
        {
            let path = entry?.path();
            let Some((case_name, ct_path)) = match_pair(&path) else {
                continue;
            };

            if !ct_path.exists() {
                tracing::warn!(
                    "skipping '{}': no matching CT file '{}'",
                    path.display(),
                    ct_path.display()
                );
                continue;
            }

            match load_pair(&case_name, &path, &ct_path) {
                Ok(case) => {
                    let (d, h, w) = case.dims();
                    tracing::debug!("loaded case '{}' ({d}x{h}x{w})", case.name);
                    cases.push(case);
                }
                Err(e) => {
                    tracing::warn!("skipping '{}': {e:#}", path.display());
                }
            }
        }

        // Directory iteration order is platform-dependent; sort so
        // runs are reproducible.
        cases.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::info!("loaded {} paired cases from '{}'", cases.len(), self.dir);
        Ok(cases)
    }
}

/// If `path` is the MR half of a pair, return the case name and the
/// path where the CT half must live.
fn match_pair(path: &Path) -> Option<(String, PathBuf)> {
    let file_name = path.file_name()?.to_str()?;
    for suffix in MR_SUFFIXES {
        if let Some(stem) = file_name.strip_suffix(suffix) {
            let ct_name = format!("{stem}{}", suffix.replace("_mr", "_ct"));
            return Some((stem.to_string(), path.with_file_name(ct_name)));
        }
    }
    None
}

fn load_pair(name: &str, mr_path: &Path, ct_path: &Path) -> Result<ScanCase> {
    let mr_raw = read_volume(mr_path)?;
    let ct_raw = read_volume(ct_path)?;

    anyhow::ensure!(
        mr_raw.dim() == ct_raw.dim(),
        "MR shape {:?} does not match CT shape {:?}",
        mr_raw.dim(),
        ct_raw.dim()
    );

    // read_volume guarantees standard layout, so as_slice cannot fail
    let mr_stats = NormStats::from_values(mr_raw.as_slice().context("non-contiguous volume")?);
    let ct_stats = NormStats::from_values(ct_raw.as_slice().context("non-contiguous volume")?);

    Ok(ScanCase {
        name: name.to_string(),
        mr: mr_raw.mapv(|v| mr_stats.normalize(v)),
        ct: ct_raw.mapv(|v| ct_stats.normalize(v)),
        mr_stats,
        ct_stats,
    })
}

/// Read one NIfTI file into a [depth, height, width] f32 array.
/// 2D images are promoted to single-slice volumes.
pub(crate) fn read_volume(path: &Path) -> Result<Array3<f32>> {
    let object = ReaderOptions::new()
        .read_file(path)
        .map_err(|e| anyhow::anyhow!("nifti parse error in '{}': {e}", path.display()))?;

    let data = object
        .into_volume()
        .into_ndarray::<f32>()
        .map_err(|e| anyhow::anyhow!("cannot decode '{}' as f32: {e}", path.display()))?;

    let shape = match data.ndim() {
        2 => (1, data.shape()[0], data.shape()[1]),
        3 => (data.shape()[0], data.shape()[1], data.shape()[2]),
        n => anyhow::bail!("'{}' has unsupported rank {n}", path.display()),
    };

    // NIfTI voxels arrive in Fortran memory order; rebuild into a
    // standard-layout array so downstream flattening is row-major.
    let values: Vec<f32> = data.iter().copied().collect();
    Array3::from_shape_vec(shape, values)
        .map_err(|e| anyhow::anyhow!("reshape error in '{}': {e}", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::VolumeSink;
    use crate::infra::volume_store::NiftiStore;

    fn ramp_volume(depth: usize, side: usize, offset: f32) -> Array3<f32> {
        Array3::from_shape_fn((depth, side, side), |(d, h, w)| {
            offset + (d * side * side + h * side + w) as f32
        })
    }

    #[test]
    fn test_match_pair_recognises_mr_files() {
        let (name, ct) = match_pair(Path::new("/data/p01_mr.nii")).unwrap();
        assert_eq!(name, "p01");
        assert_eq!(ct, PathBuf::from("/data/p01_ct.nii"));

        let (name, ct) = match_pair(Path::new("/data/p02_mr.nii.gz")).unwrap();
        assert_eq!(name, "p02");
        assert_eq!(ct, PathBuf::from("/data/p02_ct.nii.gz"));
    }

    #[test]
    fn test_match_pair_ignores_other_files() {
        assert!(match_pair(Path::new("/data/p01_ct.nii")).is_none());
        assert!(match_pair(Path::new("/data/readme.txt")).is_none());
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = NiftiStore::new(dir.path().to_str().unwrap()).unwrap();

        let volume = ramp_volume(2, 4, 0.0);
        store.write_volume("probe", &volume).unwrap();

        let back = read_volume(&dir.path().join("probe.nii")).unwrap();
        assert_eq!(back.dim(), volume.dim());
        assert!(back
            .iter()
            .zip(volume.iter())
            .all(|(a, b)| (a - b).abs() < 1e-5));
    }

    #[test]
    fn test_load_all_pairs_and_normalises() {
        let dir = tempfile::tempdir().unwrap();
        let store = NiftiStore::new(dir.path().to_str().unwrap()).unwrap();

        store.write_volume("p01_mr", &ramp_volume(1, 4, 10.0)).unwrap();
        store.write_volume("p01_ct", &ramp_volume(1, 4, 500.0)).unwrap();
        // Unpaired MR — must be skipped, not fail the run
        store.write_volume("p02_mr", &ramp_volume(1, 4, 0.0)).unwrap();

        let loader = NiftiLoader::new(dir.path().to_str().unwrap());
        let cases = loader.load_all().unwrap();

        assert_eq!(cases.len(), 1);
        let case = &cases[0];
        assert_eq!(case.name, "p01");

        // z-scored volumes have (near) zero mean
        let mean: f32 = case.mr.iter().sum::<f32>() / case.mr.len() as f32;
        assert!(mean.abs() < 1e-4);

        // stats reflect the raw data, not the normalised one
        assert!((case.ct_stats.mean - (500.0 + 7.5)).abs() < 1e-3);
    }
}
