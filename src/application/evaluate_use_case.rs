// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// The full evaluation pipeline, in order:
//
//   Step 1: Load config + weights      (Layer 6 - infra)
//   Step 2: Load paired MR/CT cases    (Layer 4 - data)
//   Step 3: Validate spatial dims      (here)
//   Step 4: Build dataset + loader     (Layer 4 - data)
//   Step 5: Forward pass per item      (Layer 5 - ml)
//   Step 6: Un-normalise, metrics      (Layer 6 - infra)
//   Step 7: Export volumes + CSV row   (Layer 6 - infra)
//   Step 8: Aggregate mean ± std       (Layer 3 - domain)
//
// Items are processed in deterministic (name) order with batch
// size 1 — every item is one case (planar mode: one slice), so
// metric rows map one-to-one onto exported volumes.

use anyhow::{Context, Result};
use burn::data::dataloader::DataLoaderBuilder;
use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::{SliceBatcher, VolumeBatcher},
    dataset::{planar_items, volumetric_items, EvalDataset},
    loader::NiftiLoader,
};
use crate::domain::{
    mode::NetMode,
    report::{CaseMetrics, MetricsSummary},
    scan::ScanCase,
    traits::{SliceSource, VolumeSink},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    quality::{compute_case_metrics, MetricsLogger},
    volume_store::NiftiStore,
};
use crate::ml::inferencer::{InferBackend, Inferencer};

/// Four pooling levels — spatial dims must divide this.
const POOL_FACTOR: usize = 16;

// ─── Evaluation Configuration ─────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Directory with paired `<case>_mr.nii` / `<case>_ct.nii` files
    pub data_dir: String,
    /// Directory holding weights.mpk.gz and model_config.json
    pub checkpoint_dir: String,
    /// Directory the volumes and metrics.csv are written to
    pub output_dir: String,
    /// SSIM data range in CT units
    pub data_range: f64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/val".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            output_dir: "show".to_string(),
            data_range: 4000.0,
        }
    }
}

// ─── EvaluateUseCase ──────────────────────────────────────────────────────────
pub struct EvaluateUseCase {
    config: EvalConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    /// Run the whole evaluation and return the aggregate report.
    pub fn execute(&self) -> Result<MetricsSummary> {
        let cfg = &self.config;

        // ── Step 1: Restore the trained network ──────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        let inferencer = Inferencer::from_checkpoint(&ckpt_manager)?;

        // ── Step 2: Load the validation set ──────────────────────────────────
        tracing::info!("loading validation cases from '{}'", cfg.data_dir);
        let cases = NiftiLoader::new(&cfg.data_dir).load_all()?;
        anyhow::ensure!(
            !cases.is_empty(),
            "no paired MR/CT cases found in '{}'",
            cfg.data_dir
        );

        // ── Step 3: Validate before spending GPU time ─────────────────────────
        validate_dims(&cases, inferencer.mode())?;

        // ── Steps 4-7: Per-case loop, one path per dimensionality ─────────────
        let sink = NiftiStore::new(&cfg.output_dir)?;
        let logger = MetricsLogger::new(&cfg.output_dir)?;

        let rows = match inferencer.mode() {
            NetMode::Planar => self.run_planar(&inferencer, cases, &sink, &logger)?,
            NetMode::Volumetric => self.run_volumetric(&inferencer, cases, &sink, &logger)?,
        };

        // ── Step 8: Aggregate ─────────────────────────────────────────────────
        MetricsSummary::from_rows(&rows).context("no cases were evaluated")
    }

    fn run_planar(
        &self,
        inferencer: &Inferencer,
        cases: Vec<ScanCase>,
        sink: &NiftiStore,
        logger: &MetricsLogger,
    ) -> Result<Vec<CaseMetrics>> {
        let dataset = EvalDataset::new(planar_items(cases));
        let loader = DataLoaderBuilder::<InferBackend, _, _>::new(SliceBatcher::new())
            .batch_size(1)
            .num_workers(1)
            .set_device(inferencer.device().clone())
            .build(dataset);

        let mut rows = Vec::new();

        for batch in loader.iter() {
            let predicted = inferencer.synthesize_slices(batch.mr.clone());
            let [_, _, h, w] = predicted.dims();

            let name = batch.names[0].clone();
            let mr_stats = batch.mr_stats[0];
            let ct_stats = batch.ct_stats[0];

            // Back into CT / scanner units before metrics and export
            let predicted = plane_from_tensor(predicted, h, w)?
                .mapv(|v| ct_stats.denormalize(v));
            let reference = plane_from_tensor(batch.ct, h, w)?
                .mapv(|v| ct_stats.denormalize(v));
            let mr_input = plane_from_tensor(batch.mr, h, w)?
                .mapv(|v| mr_stats.denormalize(v));

            rows.push(self.report_case(
                &name,
                &single_slice_volume(reference),
                &single_slice_volume(predicted),
                &single_slice_volume(mr_input),
                sink,
                logger,
            )?);
        }

        Ok(rows)
    }

    fn run_volumetric(
        &self,
        inferencer: &Inferencer,
        cases: Vec<ScanCase>,
        sink: &NiftiStore,
        logger: &MetricsLogger,
    ) -> Result<Vec<CaseMetrics>> {
        let dataset = EvalDataset::new(volumetric_items(cases));
        let loader = DataLoaderBuilder::<InferBackend, _, _>::new(VolumeBatcher::new())
            .batch_size(1)
            .num_workers(1)
            .set_device(inferencer.device().clone())
            .build(dataset);

        let mut rows = Vec::new();

        for batch in loader.iter() {
            let predicted = inferencer.synthesize_volumes(batch.mr.clone());
            let [_, _, d, h, w] = predicted.dims();

            let name = batch.names[0].clone();
            let mr_stats = batch.mr_stats[0];
            let ct_stats = batch.ct_stats[0];

            let predicted = volume_from_tensor(predicted, d, h, w)?
                .mapv(|v| ct_stats.denormalize(v));
            let reference = volume_from_tensor(batch.ct, d, h, w)?
                .mapv(|v| ct_stats.denormalize(v));
            let mr_input = volume_from_tensor(batch.mr, d, h, w)?
                .mapv(|v| mr_stats.denormalize(v));

            rows.push(self.report_case(&name, &reference, &predicted, &mr_input, sink, logger)?);
        }

        Ok(rows)
    }

    /// Export the three volumes for one case, log its CSV row, and
    /// return the metric row for aggregation.
    fn report_case(
        &self,
        name: &str,
        reference: &Array3<f32>,
        predicted: &Array3<f32>,
        mr_input: &Array3<f32>,
        sink: &NiftiStore,
        logger: &MetricsLogger,
    ) -> Result<CaseMetrics> {
        sink.write_volume(&format!("{name}-ct"), reference)?;
        sink.write_volume(&format!("{name}-ct_pre"), predicted)?;
        sink.write_volume(&format!("{name}-mr"), mr_input)?;

        let row = compute_case_metrics(name, reference, predicted, self.config.data_range);
        logger.log(&row)?;

        tracing::debug!(
            "case '{}': mse={:.4} ssim={:.4} psnr={:.4}",
            name,
            row.mse,
            row.ssim,
            row.psnr
        );
        Ok(row)
    }
}

/// Four pooling stages halve each spatial dim four times; reject
/// cases the network cannot round-trip back to the input shape.
fn validate_dims(cases: &[ScanCase], mode: NetMode) -> Result<()> {
    for case in cases {
        let (d, h, w) = case.dims();
        let planar_ok = h % POOL_FACTOR == 0 && w % POOL_FACTOR == 0;
        let ok = match mode {
            NetMode::Planar => planar_ok,
            NetMode::Volumetric => planar_ok && d % POOL_FACTOR == 0,
        };
        anyhow::ensure!(
            ok,
            "case '{}' has shape {d}x{h}x{w}; the {mode} network needs spatial \
             dims divisible by {POOL_FACTOR}",
            case.name
        );
    }
    Ok(())
}

/// Read a [1, 1, H, W] batch tensor back into a 2D array.
fn plane_from_tensor(
    tensor: burn::tensor::Tensor<InferBackend, 4>,
    h: usize,
    w: usize,
) -> Result<Array2<f32>> {
    let data = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("tensor readback failed: {e:?}"))?;
    Array2::from_shape_vec((h, w), data).map_err(Into::into)
}

/// Read a [1, 1, D, H, W] batch tensor back into a 3D array.
fn volume_from_tensor(
    tensor: burn::tensor::Tensor<InferBackend, 5>,
    d: usize,
    h: usize,
    w: usize,
) -> Result<Array3<f32>> {
    let data = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("tensor readback failed: {e:?}"))?;
    Array3::from_shape_vec((d, h, w), data).map_err(Into::into)
}

fn single_slice_volume(plane: Array2<f32>) -> Array3<f32> {
    plane.insert_axis(Axis(0))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stats::NormStats;
    use ndarray::Array3;

    fn case(name: &str, d: usize, h: usize, w: usize) -> ScanCase {
        let volume = Array3::zeros((d, h, w));
        ScanCase {
            name: name.into(),
            mr: volume.clone(),
            ct: volume,
            mr_stats: NormStats { mean: 0.0, std: 1.0 },
            ct_stats: NormStats { mean: 0.0, std: 1.0 },
        }
    }

    #[test]
    fn test_validate_dims_planar() {
        // depth does not matter in planar mode
        assert!(validate_dims(&[case("a", 3, 32, 32)], NetMode::Planar).is_ok());
        assert!(validate_dims(&[case("a", 1, 30, 32)], NetMode::Planar).is_err());
    }

    #[test]
    fn test_validate_dims_volumetric() {
        assert!(validate_dims(&[case("a", 16, 32, 32)], NetMode::Volumetric).is_ok());
        assert!(validate_dims(&[case("a", 3, 32, 32)], NetMode::Volumetric).is_err());
    }

    #[test]
    fn test_error_names_offending_case() {
        let err = validate_dims(&[case("p07", 1, 30, 32)], NetMode::Planar).unwrap_err();
        assert!(err.to_string().contains("p07"));
    }
}
