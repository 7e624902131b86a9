// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `evaluate` — runs a trained checkpoint over a validation
//                   set, writes volumes, prints aggregate metrics
//   2. `probe`    — forwards a random tensor through a fresh
//                   network and prints the output shape

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, ProbeArgs};

#[derive(Parser, Debug)]
#[command(
    name = "mr2ct",
    version = "0.1.0",
    about = "Synthesise CT volumes from MR scans with a recombination-block U-Net."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// The CLI layer only routes, never computes.
    pub fn run(self) -> Result<()> {
        let Cli { command } = self;
        match command {
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Probe(args) => run_probe(args),
        }
    }
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    tracing::info!("evaluating checkpoint '{}'", args.checkpoint_dir);

    let output_dir = args.output_dir.clone();
    let use_case = EvaluateUseCase::new(args.into());
    let summary = use_case.execute()?;

    println!("{summary}");
    println!("volumes and metrics.csv written to '{output_dir}'");
    Ok(())
}

fn run_probe(args: ProbeArgs) -> Result<()> {
    use crate::application::probe_use_case::{ProbeConfig, ProbeUseCase};

    // clap already enforces five values; this makes it a typed array
    let filters: [usize; 5] = args
        .filters
        .clone()
        .try_into()
        .map_err(|_| anyhow::anyhow!("--filters needs exactly five values"))?;

    let use_case = ProbeUseCase::new(ProbeConfig {
        in_channels: args.in_channels,
        class_num: args.classes,
        mode: args.mode,
        size: args.size,
        filters,
    });

    let dims = use_case.execute()?;
    println!("output shape: {dims:?}");
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_probe_with_defaults() {
        let cli = Cli::try_parse_from(["mr2ct", "probe"]).unwrap();
        match cli.command {
            Commands::Probe(args) => {
                assert_eq!(args.size, 256);
                assert_eq!(args.filters, vec![32, 48, 64, 96, 128]);
            }
            other => panic!("parsed wrong command: {other:?}"),
        }
    }

    #[test]
    fn test_run_consumes_cli_and_surfaces_argument_errors() {
        // 100 is not divisible by 16, so dispatch must return the
        // use case's error without touching any device
        let cli = Cli::try_parse_from(["mr2ct", "probe", "--size", "100"]).unwrap();
        assert!(cli.run().is_err());
    }

    #[test]
    fn test_rejects_bad_mode_at_parse_time() {
        assert!(Cli::try_parse_from(["mr2ct", "probe", "--mode", "4d"]).is_err());
    }
}
