//! Biomarker Fusion CLI Module
//!
//! Command-line interface for running, validating and generating demo data.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::pipeline::{run_with_options, PipelineResult, RunOptions};
use crate::synthetic::{write_dataset, SyntheticConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(&format!("{:<20}", key)), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "biomarker-fusion")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-omics integration and biomarker model training")]
#[command(long_about = None)]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline from a YAML configuration
    Run {
        /// Pipeline configuration (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Skip writing artifacts to results_dir
        #[arg(long)]
        no_write: bool,
    },

    /// Parse and validate a configuration without loading data
    Validate {
        /// Pipeline configuration (YAML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Write a synthetic multi-omics cohort and a matching configuration
    Generate {
        /// Output directory for the CSV files
        #[arg(short, long, default_value = "data/demo")]
        out: PathBuf,

        /// Where to write the YAML configuration
        #[arg(long, default_value = "configs/demo_config.yaml")]
        config_out: PathBuf,

        /// results_dir recorded in the configuration
        #[arg(long, default_value = "results/demo")]
        results_dir: PathBuf,

        /// Skip writing the configuration file
        #[arg(long)]
        no_config: bool,

        #[arg(long, default_value = "17")]
        seed: u64,

        /// Number of samples
        #[arg(long, default_value = "80")]
        samples: usize,

        /// Number of RNA genes
        #[arg(long, default_value = "200")]
        rna: usize,

        /// Number of methylation sites
        #[arg(long, default_value = "120")]
        methylation: usize,

        /// Number of mutation genes
        #[arg(long, default_value = "80")]
        mutation: usize,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(config_path: &Path, write_outputs: bool) -> anyhow::Result<()> {
    section("Run");

    step_run("Reading configuration");
    let config = PipelineConfig::from_path(config_path)?;
    step_done(&config_path.display().to_string());

    step_run("Running pipeline");
    let start = Instant::now();
    let options = RunOptions::default().with_write_outputs(write_outputs);
    let result = run_with_options(&config, options)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    print_report(&result);
    Ok(())
}

fn print_report(result: &PipelineResult) {
    let config = &result.config;
    let model = &result.model;
    let combined = &result.integration.combined_features;

    println!();
    line_box_top();
    line_box(&kv("Estimator", &model.estimator_name));
    line_box(&kv("Samples", &combined.n_samples().to_string()));
    line_box(&kv("Features", &combined.n_features().to_string()));
    line_box_sep();
    for row in &result.feature_summary {
        line_box(&kv(
            &row.modality,
            &format!("{} features, sparsity {:.3}", row.n_features, row.sparsity),
        ));
    }
    line_box_sep();
    for (name, value) in &model.metrics {
        let cv = model.cv_metrics.get(name).copied().unwrap_or(f64::NAN);
        let label = if *name == config.modeling.scoring {
            format!("{} *", name)
        } else {
            name.clone()
        };
        line_box(&kv(&label, &format!("test {:.4}   cv {:.4}", value, cv)));
    }
    line_box_bottom();

    let n_top = config.visualization.n_top_features.min(model.feature_importances.len()).min(10);
    if n_top > 0 {
        section("Top features");
        for (rank, fi) in model.feature_importances.iter().take(n_top).enumerate() {
            println!("  {:>3}. {:<40} {}", rank + 1, fi.feature, format!("{:.4}", fi.importance).white());
        }
    }

    if !result.outputs.is_empty() {
        section("Artifacts");
        for (id, path) in &result.outputs {
            step_ok(&format!("{:<22} {}", id, dim(&path.display().to_string())));
        }
    }
    println!();
}

pub fn cmd_validate(config_path: &Path) -> anyhow::Result<()> {
    section("Validate");

    step_run("Reading configuration");
    let config = PipelineConfig::from_path(config_path)?;
    step_done(&config_path.display().to_string());

    step_run("Checking options");
    config.validate()?;
    step_done("");

    for (name, table) in config.modalities() {
        step_ok(&format!("{:<12} {}", name, dim(&table.path.display().to_string())));
    }
    step_ok(&format!("{:<12} {}", "clinical", dim(&config.clinical.path.display().to_string())));
    step_ok(&format!(
        "{:<12} {} ({} folds, scoring {})",
        "modeling",
        config.modeling.estimator.cyan(),
        config.modeling.cv_folds,
        config.modeling.scoring
    ));
    println!();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_generate(
    out: &Path,
    config_out: Option<&Path>,
    results_dir: &Path,
    seed: u64,
    samples: usize,
    rna: usize,
    methylation: usize,
    mutation: usize,
) -> anyhow::Result<()> {
    section("Generate");

    let synthetic = SyntheticConfig::default()
        .with_seed(seed)
        .with_samples(samples)
        .with_features(rna, methylation, mutation);

    step_run(&format!("Writing cohort → {}", out.display()));
    let start = Instant::now();
    write_dataset(out, &synthetic, config_out, results_dir)?;
    step_done(&format!("{} samples in {:.2?}", samples, start.elapsed()));

    if let Some(path) = config_out {
        step_ok(&format!("config {}", dim(&path.display().to_string())));
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["biomarker-fusion", "run", "--config", "c.yaml", "--no-write", "--verbose"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run { config, no_write } => {
                assert_eq!(config, PathBuf::from("c.yaml"));
                assert!(no_write);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_generate_defaults() {
        let cli = Cli::try_parse_from(["biomarker-fusion", "generate", "--out", "d", "--seed", "3"]).unwrap();
        match cli.command {
            Commands::Generate { out, seed, samples, rna, .. } => {
                assert_eq!(out, PathBuf::from("d"));
                assert_eq!(seed, 3);
                assert_eq!(samples, 80);
                assert_eq!(rna, 200);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_strip_ansi() {
        let colored = format!("{}", "abc".truecolor(1, 2, 3));
        assert_eq!(strip_ansi(&colored), "abc");
    }
}
