use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use emberfield::{EngineConfig, Simulation};

/// Ember Field particle demo.
///
/// Keys: Enter starts the enter transition, A shows the avatar stage,
/// R restarts, P returns to preferences, Esc quits.
#[derive(Parser)]
#[command(name = "emberfield")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the particle count
    #[arg(short, long)]
    particles: Option<u32>,

    /// Override the RNG seed for seeds and palette
    #[arg(short, long)]
    seed: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("emberfield={}", default_level)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(count) = cli.particles {
        config = config.with_particle_count(count);
    }
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }

    Simulation::new()
        .with_config(config)
        .on_stage_changed(|stage| println!("{}", stage))
        .run()
        .context("simulation failed")?;

    Ok(())
}
