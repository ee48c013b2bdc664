//! Command implementations for scenectl.
//!
//! Handles:
//! - cluster: load settings and input, run the pipeline, write the report
//! - config: print the effective settings
//! - clock: print sampled frame timestamps

use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use scene_cluster::{ClusterOutcome, ClusterPipeline};
use scene_store::{FlatL2Store, StoreSession, VectorStore};
use scene_types::{FrameClock, SceneError, Settings};

use crate::cli::ClusterArgs;
use crate::input::ClusterInput;
use crate::report::RunReport;

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn apply_overrides(settings: &mut Settings, args: &ClusterArgs) -> Result<()> {
    let cluster = &mut settings.cluster;
    if let Some(k) = args.neighbor_count {
        cluster.neighbor_count = k;
    }
    if let Some(min_samples) = args.min_samples {
        cluster.min_samples = min_samples;
    }
    if let Some(size) = args.min_cluster_size {
        cluster.min_cluster_size = size;
    }
    if let Some(size) = args.batch_size {
        cluster.batch_size = size;
    }
    settings
        .validate()
        .context("Invalid settings after CLI overrides")
}

/// Run the pipeline for one input document.
pub async fn run_cluster(settings: &Settings, args: &ClusterArgs) -> Result<ClusterOutcome> {
    let mut settings = settings.clone();
    apply_overrides(&mut settings, args)?;

    let input = ClusterInput::from_path(&args.input)?;
    let pipeline =
        ClusterPipeline::new(settings.cluster.clone()).context("Invalid cluster configuration")?;

    let outcome = match input {
        ClusterInput::Neighbors { batches, frames } => {
            info!(batches = batches.len(), frames = frames.len(), "Loaded neighbor input");
            if args.worker {
                pipeline.run_on_worker(batches, frames).await?
            } else {
                pipeline.run(batches, &frames)?
            }
        }
        ClusterInput::Embeddings {
            fps,
            stride,
            embeddings,
        } => {
            let stride = stride.unwrap_or(settings.frame_stride);
            let mut session = open_store(&settings, fps, stride, embeddings)?;
            let frames = session
                .frame_records(settings.cluster.batch_size)
                .context("Failed to read frame records")?;
            let outcome = pipeline.run_from_store(&session, &frames)?;
            session.close().context("Failed to close store session")?;
            outcome
        }
    };

    Ok(outcome)
}

/// Load embeddings into an in-memory store, one per sampled frame.
fn open_store(
    settings: &Settings,
    fps: f64,
    stride: u64,
    embeddings: Vec<Vec<f32>>,
) -> Result<StoreSession<FlatL2Store>> {
    let clock = FrameClock::new(fps, stride).context("Invalid frame clock")?;
    let dimension = embeddings
        .first()
        .map(Vec::len)
        .context("Input has no embeddings")?;
    let expected = settings.embedding_dimension();
    if dimension != expected {
        return Err(SceneError::Config(format!(
            "embeddings have dimension {dimension}, model {:?} produces {expected}",
            settings.embedding_model
        ))
        .into());
    }

    let frames = clock
        .first_frames(embeddings.len() as u64)
        .context("Invalid frame sampling")?;
    let mut store = FlatL2Store::new(dimension).context("Failed to create store")?;
    store
        .insert_batch(embeddings.into_iter().zip(frames).collect())
        .context("Failed to load embeddings")?;
    info!(items = store.len(), dimension, fps, stride, "Loaded embeddings");

    Ok(StoreSession::open(store))
}

/// `scenectl cluster`: run and write the report to the output file or
/// stdout.
pub async fn handle_cluster(settings: &Settings, args: &ClusterArgs) -> Result<RunReport> {
    let outcome = run_cluster(settings, args).await?;
    let report = RunReport::from_outcome(&outcome, &settings.output_dir);
    let json = report.to_json().context("Failed to serialize report")?;

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).context("Failed to create output directory")?;
            }
            fs::write(path, json)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            info!(path = %path.display(), "Wrote report");
        }
        None => println!("{}", json),
    }

    Ok(report)
}

/// Effective settings as TOML.
pub fn render_config(settings: &Settings) -> Result<String> {
    toml::to_string_pretty(settings).context("Failed to render settings")
}

/// `scenectl config`
pub fn show_config(settings: &Settings) -> Result<()> {
    print!("{}", render_config(settings)?);
    Ok(())
}

/// `scenectl clock`: one line per kept frame, `frame_index<TAB>timestamp`.
pub fn show_clock(settings: &Settings, fps: f64, frames: u64, stride: Option<u64>) -> Result<()> {
    let clock = FrameClock::new(fps, stride.unwrap_or(settings.frame_stride))
        .context("Invalid frame clock")?;
    for frame in clock.sample(frames) {
        println!("{}\t{:.3}", frame.frame_index, frame.timestamp);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_applied_and_validated() {
        let mut settings = Settings::default();
        let args = ClusterArgs {
            neighbor_count: Some(12),
            min_samples: Some(2),
            ..Default::default()
        };
        apply_overrides(&mut settings, &args).unwrap();
        assert_eq!(settings.cluster.neighbor_count, 12);
        assert_eq!(settings.cluster.min_samples, 2);
        assert_eq!(settings.cluster.min_cluster_size, 24);

        let bad = ClusterArgs {
            min_cluster_size: Some(1),
            ..Default::default()
        };
        assert!(apply_overrides(&mut settings, &bad).is_err());
    }

    #[test]
    fn test_render_config() {
        let rendered = render_config(&Settings::default()).unwrap();
        assert!(rendered.contains("log_level = \"info\""));
        assert!(rendered.contains("[cluster]"));
        assert!(rendered.contains("min_cluster_size = 24"));
    }

    #[test]
    fn test_show_clock_rejects_bad_fps() {
        assert!(show_clock(&Settings::default(), 0.0, 10, None).is_err());
        assert!(show_clock(&Settings::default(), 25.0, 10, Some(5)).is_ok());
    }
}
