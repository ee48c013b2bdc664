//! Configuration loading for scene clustering.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/scene-cluster/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SceneError;

/// Embedding model producing the frame vectors.
///
/// Only the vector dimension matters to the pipeline; the model itself is
/// an external collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingModel {
    /// 2048-dimensional image embeddings
    JanusPro1B,
    /// 4096-dimensional image embeddings
    #[default]
    JanusPro7B,
}

impl EmbeddingModel {
    /// Length of the vectors produced by this model.
    pub fn dimension(&self) -> usize {
        match self {
            EmbeddingModel::JanusPro1B => 2048,
            EmbeddingModel::JanusPro7B => 4096,
        }
    }
}

/// Parameters of one clustering run.
///
/// Every value is explicit so the pipeline can be exercised at any scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Neighbors requested per item (K)
    #[serde(default = "default_neighbor_count")]
    pub neighbor_count: usize,

    /// Neighborhood size used for core distances
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Smallest group reported as a cluster rather than noise
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,

    /// Distance stored for pairs without a neighbor edge.
    /// Must be greater than any real distance.
    #[serde(default = "default_unreachable_distance")]
    pub unreachable_distance: f64,

    /// Items fetched and queried per store round trip
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound on the dense distance matrix allocation (bytes)
    #[serde(default = "default_max_matrix_bytes")]
    pub max_matrix_bytes: u64,
}

fn default_neighbor_count() -> usize {
    50
}

fn default_min_samples() -> usize {
    3
}

fn default_min_cluster_size() -> usize {
    24
}

fn default_unreachable_distance() -> f64 {
    f64::INFINITY
}

fn default_batch_size() -> usize {
    10
}

fn default_max_matrix_bytes() -> u64 {
    4 * 1024 * 1024 * 1024
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            neighbor_count: default_neighbor_count(),
            min_samples: default_min_samples(),
            min_cluster_size: default_min_cluster_size(),
            unreachable_distance: default_unreachable_distance(),
            batch_size: default_batch_size(),
            max_matrix_bytes: default_max_matrix_bytes(),
        }
    }
}

impl ClusterConfig {
    /// Set the number of neighbors requested per item.
    pub fn with_neighbor_count(mut self, k: usize) -> Self {
        self.neighbor_count = k;
        self
    }

    /// Set the core distance neighborhood size.
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Set the minimum cluster size.
    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    /// Set the sentinel stored for unreachable pairs.
    pub fn with_unreachable_distance(mut self, distance: f64) -> Self {
        self.unreachable_distance = distance;
        self
    }

    /// Set the store batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the matrix memory budget.
    pub fn with_max_matrix_bytes(mut self, bytes: u64) -> Self {
        self.max_matrix_bytes = bytes;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.neighbor_count == 0 {
            return Err("neighbor_count must be > 0".to_string());
        }
        if self.min_samples == 0 {
            return Err("min_samples must be > 0".to_string());
        }
        if self.min_cluster_size < 2 {
            return Err(format!(
                "min_cluster_size must be >= 2, got {}",
                self.min_cluster_size
            ));
        }
        if self.unreachable_distance.is_nan() || self.unreachable_distance <= 0.0 {
            return Err(format!(
                "unreachable_distance must be > 0, got {}",
                self.unreachable_distance
            ));
        }
        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }
        if self.max_matrix_bytes == 0 {
            return Err("max_matrix_bytes must be > 0".to_string());
        }
        Ok(())
    }
}

/// Environment source. Format: SCENE_LOG_LEVEL, SCENE_CLUSTER__MIN_SAMPLES, ...
fn scene_environment() -> Environment {
    Environment::with_prefix("SCENE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Model whose vectors are clustered
    #[serde(default)]
    pub embedding_model: EmbeddingModel,

    /// Keep every n-th decoded frame
    #[serde(default = "default_frame_stride")]
    pub frame_stride: u64,

    /// Directory receiving exported segments
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Clustering parameters
    #[serde(default)]
    pub cluster: ClusterConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_frame_stride() -> u64 {
    1
}

fn default_output_dir() -> String {
    "./output/segments".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            embedding_model: EmbeddingModel::default(),
            frame_stride: default_frame_stride(),
            output_dir: default_output_dir(),
            cluster: ClusterConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/scene-cluster/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (SCENE_*, nested keys with `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, SceneError> {
        let config_dir = ProjectDirs::from("", "", "scene-cluster")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Self::load_layered(
            &config_dir.join("config"),
            cli_config_path,
            scene_environment(),
        )
    }

    fn load_layered(
        default_config_path: &Path,
        cli_config_path: Option<&str>,
        environment: Environment,
    ) -> Result<Self, SceneError> {
        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| SceneError::Config(e.to_string()))?
            .set_default("frame_stride", default_frame_stride() as i64)
            .map_err(|e| SceneError::Config(e.to_string()))?
            .set_default("output_dir", default_output_dir())
            .map_err(|e| SceneError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(environment);

        let config = builder
            .build()
            .map_err(|e| SceneError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| SceneError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), SceneError> {
        if self.frame_stride == 0 {
            return Err(SceneError::Config("frame_stride must be > 0".to_string()));
        }
        self.cluster.validate().map_err(SceneError::Config)
    }

    /// Vector dimension expected from the configured model.
    pub fn embedding_dimension(&self) -> usize {
        self.embedding_model.dimension()
    }
}
