// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly except the data
// batchers — only this layer defines network modules.
//
// Why isolate Burn code here?
//   - If Burn's API changes, we only update this layer
//   - Domain types and metrics are testable without a GPU
//   - The model architecture is clearly separated from
//     data loading and application logic
//
// What's in this layer:
//
//   model.rs      — The recombination-block U-Net
//                   Encoder-decoder with skip connections:
//                   • 1x1 stem conv to 16 channels
//                   • four Down stages (recombination + max-pool)
//                   • bridge recombination block
//                   • four Up stages (transposed conv + concat)
//                   • 1x1 synthesis head
//                   Runs in planar (2D) or volumetric (3D) mode.
//
//   inferencer.rs — The inference engine
//                   Loads a checkpoint, rebuilds the exact
//                   architecture, and synthesises CT from MR
//                   without autodiff overhead.
//
// Reference: Burn Book §3 (Building Blocks)
//            Ronneberger et al. (2015) U-Net

/// Recombination-block U-Net architecture
pub mod model;

/// Inference engine — loads a checkpoint and synthesises CT
pub mod inferencer;
