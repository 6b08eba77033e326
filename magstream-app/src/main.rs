//! magstream binary: load config, open the host window, run the capture
//! loop, exit with the loop's status code.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use magstream_core::CaptureConfig;

#[cfg(target_os = "windows")]
mod host;
#[cfg(target_os = "windows")]
mod presenter;

#[derive(Debug, Parser)]
#[command(name = "magstream", version, about = "Real-time screen magnifier")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "magstream.toml")]
    config: PathBuf,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args = Args::parse();
    let config = CaptureConfig::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    tracing::info!(
        config_path = %args.config.display(),
        display_width = config.display_width,
        display_height = config.display_height,
        zoom = config.zoom_factor,
        behaviour = ?config.behaviour,
        "configuration loaded"
    );

    #[cfg(target_os = "windows")]
    {
        let status = host::run(&config)?;
        std::process::exit(status.exit_code());
    }

    #[cfg(not(target_os = "windows"))]
    {
        let _ = config;
        anyhow::bail!("magstream uses DXGI desktop duplication and only runs on Windows");
    }
}
