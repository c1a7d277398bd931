//! ---
//! sts_section: "03-simulation-runtime"
//! sts_subsection: "binary"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Binary entrypoint for the STS daemon."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sts_common::config::AppConfig;
use sts_common::logging::init_tracing;
use sts_core::{LogSink, Simulator};
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "STS substation telemetry simulator daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Override the publish interval in seconds")]
    interval: Option<u64>,

    #[arg(long, help = "Override the active broker profile note")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the simulator until interrupted")]
    Run,
    #[command(about = "Validate the configuration and list broker profiles")]
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/stsd.toml"));

    let env_override = std::env::var(AppConfig::ENV_CONFIG_PATH)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    let mut config = if env_override || candidates.iter().any(|path| path.exists()) {
        AppConfig::load(&candidates)?
    } else {
        eprintln!("no configuration file found; using built-in defaults");
        AppConfig::default()
    };
    if let Some(interval) = cli.interval {
        config.simulation.interval = Duration::from_secs(interval);
    }
    if let Some(note) = cli.profile {
        config.active_profile = Some(note);
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::CheckConfig => {
            for profile in &config.profiles {
                println!(
                    "{}\t{}:{}\t{}\t{}",
                    profile.note, profile.broker, profile.port, profile.topic, profile.username
                );
            }
            println!("active: {}", config.active_profile()?.note);
            Ok(())
        }
        Commands::Run => run(config).await,
    }
}

async fn run(config: AppConfig) -> Result<()> {
    init_tracing("stsd", &config.logging)?;

    let simulator = Simulator::from_config(&config, Arc::new(LogSink::new()))?;
    simulator.start()?;
    info!(
        station = %config.station_name,
        interval_s = config.simulation.interval.as_secs(),
        "simulator running; press ctrl-c to stop"
    );

    signal::ctrl_c().await?;
    warn!("interrupt received; stopping simulation loop");
    simulator.stop().await?;
    Ok(())
}
