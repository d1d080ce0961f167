//! Command-line driver for the power study.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ordpower::config::StudyConfig;
use ordpower::csvout::write_csv;
use ordpower::fit::AnalyticEstimator;
use ordpower::power::run_study;
use ordpower::report::format_report;
use ordpower::simulate::generate_dataset;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ordpower",
    about = "Monte Carlo power study for ordinal cumulative-link mixed models",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one simulated dataset and write it as long-format CSV
    Generate {
        #[arg(long, default_value_t = 123)]
        seed: u64,
        #[arg(long, default_value_t = 30)]
        participants: usize,
        #[arg(long = "test-items", default_value_t = 15)]
        test_items: usize,
        #[arg(long = "mindiff-items", default_value_t = 20)]
        mindiff_items: usize,
        #[arg(long, default_value = "dataset.csv")]
        out: PathBuf,
    },
    /// Run the full replication study and print the aggregated report
    Study {
        #[arg(long, default_value_t = 100)]
        replications: usize,
        #[arg(long = "base-seed", default_value_t = 123)]
        base_seed: u64,
        #[arg(long, default_value_t = 0.05)]
        alpha: f64,
        /// Also write the full study report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Generate {
            seed,
            participants,
            test_items,
            mindiff_items,
            out,
        } => {
            let cfg = StudyConfig {
                n_participants: participants,
                n_test_items: test_items,
                n_mindiff_items: mindiff_items,
                ..StudyConfig::default()
            };
            let dataset = generate_dataset(seed, &cfg)?;
            write_csv(&out, &dataset)
                .with_context(|| format!("failed to write {}", out.display()))?;

            println!("✓ Generated: {}", out.display());
            println!("  Seed: {}", seed);
            println!("  Participants: {}", dataset.participants.len());
            println!("  Items: {}", dataset.items.len());
            println!("  Rows: {}", dataset.n_rows());
            println!("  Response histogram:");
            for (k, count) in dataset.response_histogram().iter().enumerate() {
                println!("    y={}: {}", k + 1, count);
            }
        }
        Command::Study {
            replications,
            base_seed,
            alpha,
            json,
        } => {
            let cfg = StudyConfig {
                n_replications: replications,
                base_seed,
                alpha,
                ..StudyConfig::default()
            };
            println!(
                "Running {} replications ({} participants x {} items each)...",
                cfg.n_replications,
                cfg.n_participants,
                cfg.n_items()
            );
            println!();

            let report = run_study(&cfg, &AnalyticEstimator)?;
            print!("{}", format_report(&report));

            if let Some(path) = json {
                let body = serde_json::to_string_pretty(&report)
                    .context("failed to serialize study report")?;
                fs::write(&path, body)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!();
                println!("✓ Results saved to: {}", path.display());
            }
        }
    }
    Ok(())
}
