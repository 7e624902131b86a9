// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong to any one business
// layer:
//
//   checkpoint.rs   — Saving and loading model weights.
//                     Uses Burn's CompactRecorder to serialise
//                     model parameters to disk, and saves/loads
//                     the UNetConfig as JSON so inference can
//                     rebuild the exact architecture.
//
//   quality.rs      — Reconstruction-quality metrics (MSE, RMSE,
//                     MAE, SSIM, PSNR) plus the per-case CSV
//                     logger. Pure ndarray maths, no framework.
//
//   volume_store.rs — Writes predicted/reference volumes to the
//                     output directory as .nii files.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Image-quality metrics and the per-case CSV logger
pub mod quality;

/// NIfTI volume export
pub mod volume_store;
