// ============================================================
// Layer 4 — Evaluation Batchers
// ============================================================
// Implements Burn's Batcher trait to convert Vec<EvalItem> into
// device tensors.
//
// Two batchers, one per dimensionality:
//   SliceBatcher  → [N, 1, H, W]    (planar network input)
//   VolumeBatcher → [N, 1, D, H, W] (volumetric network input)
//
// Besides the MR/CT tensors, a batch carries the case names and
// both normalisation stats — the evaluation loop needs them after
// the forward pass to undo the z-scoring and name the exports.
//
// All items in one batch must share dims; the use case batches
// with size 1, so this holds trivially.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::EvalItem;
use crate::domain::stats::NormStats;

// ─── SliceBatch ───────────────────────────────────────────────────────────────
/// A batch of axial slices ready for the planar forward pass.
#[derive(Debug, Clone)]
pub struct SliceBatch<B: Backend> {
    /// z-scored MR input — shape [N, 1, H, W]
    pub mr: Tensor<B, 4>,
    /// z-scored reference CT — shape [N, 1, H, W]
    pub ct: Tensor<B, 4>,
    pub names: Vec<String>,
    pub mr_stats: Vec<NormStats>,
    pub ct_stats: Vec<NormStats>,
}

#[derive(Clone, Default, Debug)]
pub struct SliceBatcher;

impl SliceBatcher {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, EvalItem, SliceBatch<B>> for SliceBatcher {
    fn batch(&self, items: Vec<EvalItem>, device: &B::Device) -> SliceBatch<B> {
        let n = items.len();
        // The dataloader never hands out an empty batch
        let [_, h, w] = items.first().expect("batch must not be empty").dims;

        let mr_flat: Vec<f32> = items.iter().flat_map(|s| s.mr.iter().copied()).collect();
        let ct_flat: Vec<f32> = items.iter().flat_map(|s| s.ct.iter().copied()).collect();

        SliceBatch {
            mr: Tensor::<B, 1>::from_floats(mr_flat.as_slice(), device).reshape([n, 1, h, w]),
            ct: Tensor::<B, 1>::from_floats(ct_flat.as_slice(), device).reshape([n, 1, h, w]),
            names: items.iter().map(|s| s.name.clone()).collect(),
            mr_stats: items.iter().map(|s| s.mr_stats).collect(),
            ct_stats: items.iter().map(|s| s.ct_stats).collect(),
        }
    }
}

// ─── VolumeBatch ──────────────────────────────────────────────────────────────
/// A batch of whole volumes ready for the volumetric forward pass.
#[derive(Debug, Clone)]
pub struct VolumeBatch<B: Backend> {
    /// z-scored MR input — shape [N, 1, D, H, W]
    pub mr: Tensor<B, 5>,
    /// z-scored reference CT — shape [N, 1, D, H, W]
    pub ct: Tensor<B, 5>,
    pub names: Vec<String>,
    pub mr_stats: Vec<NormStats>,
    pub ct_stats: Vec<NormStats>,
}

#[derive(Clone, Default, Debug)]
pub struct VolumeBatcher;

impl VolumeBatcher {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, EvalItem, VolumeBatch<B>> for VolumeBatcher {
    fn batch(&self, items: Vec<EvalItem>, device: &B::Device) -> VolumeBatch<B> {
        let n = items.len();
        let [d, h, w] = items.first().expect("batch must not be empty").dims;

        let mr_flat: Vec<f32> = items.iter().flat_map(|s| s.mr.iter().copied()).collect();
        let ct_flat: Vec<f32> = items.iter().flat_map(|s| s.ct.iter().copied()).collect();

        VolumeBatch {
            mr: Tensor::<B, 1>::from_floats(mr_flat.as_slice(), device).reshape([n, 1, d, h, w]),
            ct: Tensor::<B, 1>::from_floats(ct_flat.as_slice(), device).reshape([n, 1, d, h, w]),
            names: items.iter().map(|s| s.name.clone()).collect(),
            mr_stats: items.iter().map(|s| s.mr_stats).collect(),
            ct_stats: items.iter().map(|s| s.ct_stats).collect(),
        }
    }
}
