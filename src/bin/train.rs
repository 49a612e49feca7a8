#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use dqn_tictactoe::ai::DqnAgent;
use dqn_tictactoe::checkpoint::{CheckpointStore, LoadOutcome};
use dqn_tictactoe::config::AppConfig;
use dqn_tictactoe::training::Trainer;

/// Train a tic-tac-toe DQN agent via self-play.
#[derive(Parser)]
#[command(name = "train", about = "Train a tic-tac-toe DQN agent via self-play")]
struct Cli {
    /// Continue from the checkpoint instead of starting fresh
    #[arg(long)]
    resume: bool,

    /// Load the checkpoint, or run the bootstrap episodes if there is none,
    /// then exit
    #[arg(long, conflicts_with = "resume")]
    bootstrap: bool,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Override checkpoint path
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    // Load configuration
    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(episodes) = cli.episodes {
        app_config.training.num_episodes = episodes;
    }
    if let Some(lr) = cli.lr {
        app_config.dqn.learning_rate = lr;
    }
    if let Some(path) = cli.checkpoint {
        app_config.checkpoint.path = path;
    }
    if cli.seed.is_some() {
        app_config.dqn.seed = cli.seed;
    }
    app_config.validate().context("invalid configuration")?;

    let store = CheckpointStore::from_config(&app_config.checkpoint);
    let mut agent = DqnAgent::new(app_config.dqn.clone()).context("building agent")?;

    if cli.resume {
        match store.load(&mut agent).context("loading checkpoint")? {
            LoadOutcome::Loaded(report) => {
                if let Some(meta) = report.metadata {
                    info!("resumed checkpoint written at UNIX time {}", meta.timestamp);
                }
            }
            LoadOutcome::NotFound => info!("no checkpoint found, starting fresh"),
        }
    }

    let trainer = Trainer::new(app_config.training.clone()).with_store(store);

    if cli.bootstrap {
        let outcome = trainer
            .load_or_bootstrap(&mut agent)
            .context("bootstrapping agent")?;
        if outcome.is_loaded() {
            info!("checkpoint already present, nothing to bootstrap");
        }
        return Ok(());
    }

    let summary = trainer.train(&mut agent).context("training")?;
    info!(
        "{} episodes, {} plies, {} updates, epsilon {:.3}",
        summary.episodes, summary.plies, summary.train_updates, summary.final_epsilon
    );
    Ok(())
}
