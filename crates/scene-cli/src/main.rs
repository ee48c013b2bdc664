//! Scene clustering CLI
//!
//! Groups sampled video frames into temporal segments.
//!
//! # Usage
//!
//! ```bash
//! scenectl cluster --input frames.json [--output report.json] [-k 50] [--worker]
//! scenectl config
//! scenectl clock --fps 25 --frames 1000 [--stride 5]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/scene-cluster/config.toml)
//! 3. Environment variables (SCENE_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use scene_cli::{
    handle_cluster, init_logging, load_settings, show_clock, show_config, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings)?;

    match cli.command {
        Commands::Cluster(args) => {
            handle_cluster(&settings, &args).await?;
        }
        Commands::Config => {
            show_config(&settings)?;
        }
        Commands::Clock {
            fps,
            frames,
            stride,
        } => {
            show_clock(&settings, fps, frames, stride)?;
        }
    }

    Ok(())
}
