// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the `evaluate` and `probe` subcommands and their flags.
//
// clap's derive macros generate help text, missing-argument
// errors, and type conversion. The network mode flag parses
// through NetMode's FromStr, so an unsupported dimensionality is
// rejected before anything is loaded.

use clap::{Args, Subcommand};

use crate::application::evaluate_use_case::EvalConfig;
use crate::domain::mode::NetMode;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a trained checkpoint over a validation set
    Evaluate(EvaluateArgs),

    /// Forward a random tensor through a fresh network and print
    /// the output shape
    Probe(ProbeArgs),
}

/// All arguments for the `evaluate` command.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory with paired <case>_mr.nii / <case>_ct.nii files
    #[arg(long, default_value = "data/val")]
    pub data_dir: String,

    /// Directory holding weights.mpk.gz and model_config.json
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Directory the predicted/reference volumes and metrics.csv
    /// are written to
    #[arg(long, default_value = "show")]
    pub output_dir: String,

    /// SSIM data range in CT units
    #[arg(long, default_value_t = 4000.0)]
    pub data_range: f64,
}

/// Boundary between Layer 1 and Layer 2 — the application layer
/// never sees clap types.
impl From<EvaluateArgs> for EvalConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvalConfig {
            data_dir: a.data_dir,
            checkpoint_dir: a.checkpoint_dir,
            output_dir: a.output_dir,
            data_range: a.data_range,
        }
    }
}

/// All arguments for the `probe` command.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input channel count (1 for a single MR sequence)
    #[arg(long, default_value_t = 1)]
    pub in_channels: usize,

    /// Output channel count (1 for CT synthesis)
    #[arg(long, default_value_t = 1)]
    pub classes: usize,

    /// Network dimensionality: 2d or 3d
    #[arg(long, default_value = "2d")]
    pub mode: NetMode,

    /// In-plane side length of the random input (divisible by 16)
    #[arg(long, default_value_t = 256)]
    pub size: usize,

    /// Five encoder filter counts
    #[arg(
        long,
        value_delimiter = ',',
        num_args = 5,
        default_values_t = [32usize, 48, 64, 96, 128]
    )]
    pub filters: Vec<usize>,
}
