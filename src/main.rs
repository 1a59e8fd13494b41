//! Biomarker Fusion - Main Entry Point

use clap::Parser;
use biomarker_fusion::cli::{cmd_generate, cmd_run, cmd_validate, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "biomarker_fusion=debug"
    } else {
        "biomarker_fusion=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { config, no_write } => {
            cmd_run(&config, !no_write)?;
        }
        Commands::Validate { config } => {
            cmd_validate(&config)?;
        }
        Commands::Generate {
            out,
            config_out,
            results_dir,
            no_config,
            seed,
            samples,
            rna,
            methylation,
            mutation,
        } => {
            let config_out = (!no_config).then_some(config_out.as_path());
            cmd_generate(&out, config_out, &results_dir, seed, samples, rna, methylation, mutation)?;
        }
    }

    Ok(())
}
