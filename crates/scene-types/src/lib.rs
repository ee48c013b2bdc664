//! # scene-types
//!
//! Shared domain types for the scene clustering workspace.
//!
//! This crate defines the data exchanged between the pipeline stages and
//! their external collaborators:
//! - Neighbors and query batches: results of approximate k-NN queries
//! - Frames: sampled frame records and the sampler clock
//! - Segments: contiguous runs of frames sharing a cluster label
//! - Settings: layered configuration (defaults, file, env)
//!
//! ## Usage
//!
//! ```rust
//! use scene_types::{ClusterConfig, Neighbor, QueryBatch};
//!
//! let batch = QueryBatch::new(vec![1], vec![vec![Neighbor::new(2, 0.5)]]);
//! assert_eq!(batch.len(), 1);
//! assert_eq!(ClusterConfig::default().neighbor_count, 50);
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod neighbor;
pub mod segment;

pub use config::{ClusterConfig, EmbeddingModel, Settings};
pub use error::SceneError;
pub use frame::{FrameClock, FrameRecord, SampledFrame};
pub use neighbor::{ItemId, Neighbor, QueryBatch};
pub use segment::{Segment, SegmentSummary, NOISE_LABEL};
