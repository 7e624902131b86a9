// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw NIfTI files to GPU-ready tensor batches.
//
// The pipeline flows in this order:
//
//   <case>_mr.nii / <case>_ct.nii pairs
//       │
//       ▼
//   NiftiLoader       → reads paired volumes, z-scores each one,
//       │               keeps the stats for later un-normalisation
//       ▼
//   EvalDataset       → implements Burn's Dataset trait; planar
//       │               mode flattens volumes into per-slice items
//       ▼
//   SliceBatcher /    → stacks items into [N,1,H,W] or [N,1,D,H,W]
//   VolumeBatcher       tensors, carrying names and stats through
//       │
//       ▼
//   DataLoader        → feeds batches to the evaluation loop
//
// Each module is responsible for exactly one step.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Loads paired MR/CT volumes from a directory of .nii files
pub mod loader;

/// Implements Burn's Dataset trait for evaluation items
pub mod dataset;

/// Implements Burn's Batcher trait for slice and volume batches
pub mod batcher;
