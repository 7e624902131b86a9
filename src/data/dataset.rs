// ============================================================
// Layer 4 — Evaluation Dataset
// ============================================================
// Implements Burn's Dataset trait over evaluation items.
//
// An item is the unit the network sees in one forward pass:
//   - planar mode:     one axial slice  (dims [1, H, W])
//   - volumetric mode: one whole volume (dims [D, H, W])
//
// Multi-slice cases are flattened into per-slice items for the
// planar network, with the slice index folded into the name so
// exported files stay traceable. Both normalisation stats ride
// along with every item — the evaluation loop needs them to undo
// the z-scoring after the forward pass.

use burn::data::dataset::Dataset;
use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::domain::scan::ScanCase;
use crate::domain::stats::NormStats;

/// One network-ready evaluation item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalItem {
    pub name: String,
    /// [depth, height, width]; depth == 1 for planar items
    pub dims: [usize; 3],
    /// z-scored MR voxels, row-major
    pub mr: Vec<f32>,
    /// z-scored reference CT voxels, row-major
    pub ct: Vec<f32>,
    pub mr_stats: NormStats,
    pub ct_stats: NormStats,
}

impl EvalItem {
    pub fn voxel_count(&self) -> usize {
        self.dims.iter().product()
    }
}

/// Flatten cases into one item per axial slice (planar mode).
pub fn planar_items(cases: Vec<ScanCase>) -> Vec<EvalItem> {
    let mut items = Vec::new();

    for case in cases {
        let (depth, height, width) = case.dims();
        for z in 0..depth {
            // Single-slice cases keep their bare name so outputs
            // match the input files one-to-one.
            let name = if depth == 1 {
                case.name.clone()
            } else {
                format!("{}_z{z:03}", case.name)
            };

            items.push(EvalItem {
                name,
                dims: [1, height, width],
                mr: case.mr.index_axis(Axis(0), z).to_owned().into_raw_vec(),
                ct: case.ct.index_axis(Axis(0), z).to_owned().into_raw_vec(),
                mr_stats: case.mr_stats,
                ct_stats: case.ct_stats,
            });
        }
    }

    items
}

/// One item per whole case (volumetric mode).
pub fn volumetric_items(cases: Vec<ScanCase>) -> Vec<EvalItem> {
    cases
        .into_iter()
        .map(|case| {
            let (depth, height, width) = case.dims();
            EvalItem {
                name: case.name,
                dims: [depth, height, width],
                mr: case.mr.into_raw_vec(),
                ct: case.ct.into_raw_vec(),
                mr_stats: case.mr_stats,
                ct_stats: case.ct_stats,
            }
        })
        .collect()
}

pub struct EvalDataset {
    items: Vec<EvalItem>,
}

impl EvalDataset {
    pub fn new(items: Vec<EvalItem>) -> Self {
        Self { items }
    }
}

impl Dataset<EvalItem> for EvalDataset {
    fn get(&self, index: usize) -> Option<EvalItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn case(name: &str, depth: usize) -> ScanCase {
        let volume = Array3::from_shape_fn((depth, 4, 4), |(d, h, w)| {
            (d * 16 + h * 4 + w) as f32
        });
        ScanCase {
            name: name.into(),
            mr: volume.clone(),
            ct: volume,
            mr_stats: NormStats { mean: 1.0, std: 2.0 },
            ct_stats: NormStats { mean: 3.0, std: 4.0 },
        }
    }

    #[test]
    fn test_planar_items_flatten_depth() {
        let items = planar_items(vec![case("p01", 3)]);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].name, "p01_z000");
        assert_eq!(items[2].name, "p01_z002");
        assert_eq!(items[1].dims, [1, 4, 4]);
        // slice 1 starts at voxel value 16
        assert_eq!(items[1].mr[0], 16.0);
    }

    #[test]
    fn test_planar_single_slice_keeps_bare_name() {
        let items = planar_items(vec![case("p01", 1)]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "p01");
    }

    #[test]
    fn test_volumetric_items_keep_whole_volume() {
        let items = volumetric_items(vec![case("p01", 3)]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].dims, [3, 4, 4]);
        assert_eq!(items[0].voxel_count(), 48);
    }

    #[test]
    fn test_stats_ride_along() {
        let items = planar_items(vec![case("p01", 2)]);
        assert_eq!(items[0].ct_stats, NormStats { mean: 3.0, std: 4.0 });
    }

    #[test]
    fn test_dataset_trait() {
        let dataset = EvalDataset::new(planar_items(vec![case("p01", 2)]));
        assert_eq!(dataset.len(), 2);
        assert!(dataset.get(1).is_some());
        assert!(dataset.get(2).is_none());
    }
}
