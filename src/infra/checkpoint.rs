// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// Files in a checkpoint directory:
//   weights.mpk.gz     — all learned parameters (MessagePack + gzip)
//   model_config.json  — the UNetConfig that built the network
//
// Why save the config separately?
//   Loading weights requires a model with the exact architecture
//   (filter counts, channels, mode) the weights were trained with.
//   Without the config, the model cannot be reconstructed.
//
// Burn's CompactRecorder is type-safe: loading fails if the
// architecture doesn't match the stored record.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{fs, path::PathBuf};

use crate::ml::model::{UNet, UNetConfig};

/// Base name of the weights file (the recorder adds .mpk.gz).
const WEIGHTS_STEM: &str = "weights";
const CONFIG_FILE: &str = "model_config.json";

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Point at a checkpoint directory, creating it if needed.
    pub fn new(dir: impl Into<String>) -> Self {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Save model weights to `{dir}/weights.mpk.gz`.
    pub fn save_model<B: Backend>(&self, model: &UNet<B>) -> Result<()> {
        let path = self.dir.join(WEIGHTS_STEM);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("failed to save weights to '{}'", path.display()))?;

        tracing::debug!("saved weights to '{}'", path.display());
        Ok(())
    }

    /// Load weights into a freshly built model.
    ///
    /// The model must have been built from the same config the
    /// weights were saved with, or loading fails.
    pub fn load_model<B: Backend>(&self, model: UNet<B>, device: &B::Device) -> Result<UNet<B>> {
        let path = self.dir.join(WEIGHTS_STEM);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "cannot load weights from '{}'. Place a trained checkpoint \
                     (weights.mpk.gz + model_config.json) in the checkpoint directory.",
                    path.display()
                )
            })?;

        Ok(model.load_record(record))
    }

    /// Save the network config so inference can rebuild the model.
    pub fn save_config(&self, config: &UNetConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(config)?;

        fs::write(&path, json)
            .with_context(|| format!("cannot write config to '{}'", path.display()))?;

        tracing::debug!("saved model config to '{}'", path.display());
        Ok(())
    }

    /// Load the network config saved next to the weights.
    pub fn load_config(&self) -> Result<UNetConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "cannot read '{}'. A checkpoint directory must contain the \
                 model_config.json saved alongside the weights.",
                path.display()
            )
        })?;

        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mode::NetMode;

    type TB = burn::backend::NdArray;

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().to_str().unwrap());

        let config = UNetConfig::new(1, [32, 48, 64, 96, 128], 1, NetMode::Planar);
        manager.save_config(&config).unwrap();

        let loaded = manager.load_config().unwrap();
        assert_eq!(loaded.in_channels, 1);
        assert_eq!(loaded.filters, [32, 48, 64, 96, 128]);
        assert_eq!(loaded.class_num, 1);
        assert_eq!(loaded.mode, NetMode::Planar);
    }

    #[test]
    fn test_weights_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().to_str().unwrap());
        let device = Default::default();

        let config = UNetConfig::new(1, [2, 3, 4, 5, 6], 1, NetMode::Planar);
        let model: UNet<TB> = config.init(&device);
        manager.save_model(&model).unwrap();

        let fresh: UNet<TB> = config.init(&device);
        let restored = manager.load_model(fresh, &device).unwrap();

        // Same weights must produce the same output
        let x = burn::tensor::Tensor::<TB, 4>::random(
            [1, 1, 16, 16],
            burn::tensor::Distribution::Default,
            &device,
        );
        let a = model.forward_planar(x.clone()).into_data().to_vec::<f32>().unwrap();
        let b = restored.forward_planar(x).into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().to_str().unwrap());
        assert!(manager.load_config().is_err());

        let device = Default::default();
        let model: UNet<TB> =
            UNetConfig::new(1, [2, 3, 4, 5, 6], 1, NetMode::Planar).init(&device);
        assert!(manager.load_model(model, &device).is_err());
    }
}
