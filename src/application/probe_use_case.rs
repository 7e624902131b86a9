// ============================================================
// Layer 2 — ProbeUseCase
// ============================================================
// Architecture smoke test: build a fresh (untrained) network from
// the given parameters, push a random tensor through it, and
// return the output shape. Useful for checking that a filter
// configuration and input size fit together before committing to
// a training run elsewhere.

use anyhow::Result;
use burn::tensor::{Distribution, Tensor};

use crate::domain::mode::NetMode;
use crate::ml::inferencer::{InferBackend, InferDevice};
use crate::ml::model::{UNet, UNetConfig};

/// Depth used for the random volume in volumetric mode.
const PROBE_DEPTH: usize = 16;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub in_channels: usize,
    pub class_num: usize,
    pub mode: NetMode,
    /// In-plane side length of the random input
    pub size: usize,
    pub filters: [usize; 5],
}

pub struct ProbeUseCase {
    config: ProbeConfig,
}

impl ProbeUseCase {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Forward a random input and return the output dims.
    pub fn execute(&self) -> Result<Vec<usize>> {
        let cfg = &self.config;
        anyhow::ensure!(
            cfg.size % 16 == 0,
            "--size must be divisible by 16 (got {})",
            cfg.size
        );

        let device = InferDevice::default();
        let model: UNet<InferBackend> =
            UNetConfig::new(cfg.in_channels, cfg.filters, cfg.class_num, cfg.mode)
                .init(&device);

        tracing::info!(
            "probing {} network, filters {:?}, input side {}",
            cfg.mode,
            cfg.filters,
            cfg.size
        );

        let dims = match cfg.mode {
            NetMode::Planar => {
                let x = Tensor::<InferBackend, 4>::random(
                    [1, cfg.in_channels, cfg.size, cfg.size],
                    Distribution::Default,
                    &device,
                );
                model.forward_planar(x).dims().to_vec()
            }
            NetMode::Volumetric => {
                let x = Tensor::<InferBackend, 5>::random(
                    [1, cfg.in_channels, PROBE_DEPTH, cfg.size, cfg.size],
                    Distribution::Default,
                    &device,
                );
                model.forward_volumetric(x).dims().to_vec()
            }
        };

        Ok(dims)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_indivisible_size() {
        let probe = ProbeUseCase::new(ProbeConfig {
            in_channels: 1,
            class_num: 1,
            mode: NetMode::Planar,
            size: 100,
            filters: [4, 6, 8, 12, 16],
        });
        assert!(probe.execute().is_err());
    }
}
