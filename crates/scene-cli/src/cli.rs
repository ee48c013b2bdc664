//! CLI argument parsing for scenectl.
//!
//! CLI flags override every other configuration source.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Scene clustering
///
/// Groups sampled video frames into temporal segments by density
/// clustering their embedding neighborhoods.
#[derive(Parser, Debug)]
#[command(name = "scenectl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/scene-cluster/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cluster frames from an input document and print the segments
    Cluster(ClusterArgs),

    /// Print the effective settings as TOML
    Config,

    /// Print the sampled frame timestamps for a video
    Clock {
        /// Frames per second of the video
        #[arg(long)]
        fps: f64,

        /// Number of decoded frames
        #[arg(long)]
        frames: u64,

        /// Keep every n-th frame (default from config)
        #[arg(long)]
        stride: Option<u64>,
    },
}

/// Arguments of `scenectl cluster`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ClusterArgs {
    /// Input JSON document (neighbor batches or embeddings)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override neighbors queried per item (K)
    #[arg(short = 'k', long)]
    pub neighbor_count: Option<usize>,

    /// Override HDBSCAN min_samples
    #[arg(long)]
    pub min_samples: Option<usize>,

    /// Override HDBSCAN min_cluster_size
    #[arg(long)]
    pub min_cluster_size: Option<usize>,

    /// Override store query batch size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Run clustering on the blocking worker pool
    #[arg(long)]
    pub worker: bool,
}
