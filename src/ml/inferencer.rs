// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Loads a trained checkpoint and exposes the forward pass to the
// evaluation workflow.
//
// Inference runs on the plain WGPU backend — no Autodiff wrapper —
// so no gradient state is tracked and batch norm uses its running
// statistics, which is exactly the eval-mode behaviour wanted here.

use anyhow::Result;
use burn::prelude::*;

use crate::domain::mode::NetMode;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::UNet;

pub type InferBackend = burn::backend::Wgpu;
pub type InferDevice = burn::backend::wgpu::WgpuDevice;

pub struct Inferencer {
    model: UNet<InferBackend>,
    mode: NetMode,
    device: InferDevice,
}

impl Inferencer {
    /// Rebuild the network from the saved config and restore its
    /// weights from the checkpoint directory.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager) -> Result<Self> {
        let device = InferDevice::default();

        let config = ckpt_manager.load_config()?;
        let model: UNet<InferBackend> = config.init(&device);
        let model = ckpt_manager.load_model(model, &device)?;

        tracing::info!(
            "model loaded from checkpoint ({} mode, filters {:?})",
            config.mode,
            config.filters
        );

        Ok(Self { model, mode: config.mode, device })
    }

    pub fn mode(&self) -> NetMode {
        self.mode
    }

    pub fn device(&self) -> &InferDevice {
        &self.device
    }

    /// Synthesise CT slices from MR slices: [N, 1, H, W] → [N, 1, H, W].
    pub fn synthesize_slices(&self, mr: Tensor<InferBackend, 4>) -> Tensor<InferBackend, 4> {
        self.model.forward_planar(mr)
    }

    /// Synthesise CT volumes from MR volumes: [N, 1, D, H, W] → [N, 1, D, H, W].
    pub fn synthesize_volumes(&self, mr: Tensor<InferBackend, 5>) -> Tensor<InferBackend, 5> {
        self.model.forward_volumetric(mr)
    }
}
