//! scenectl library exports.
//!
//! This crate provides the command-line front end of the scene clustering
//! workspace.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (cluster, config, clock)
//! - `input`: Input document formats
//! - `report`: JSON run report

pub mod cli;
pub mod commands;
pub mod input;
pub mod report;

pub use cli::{Cli, ClusterArgs, Commands};
pub use commands::{
    handle_cluster, init_logging, load_settings, render_config, run_cluster, show_clock,
    show_config,
};
pub use input::ClusterInput;
pub use report::{LabelledItem, RunReport, SegmentEntry};
