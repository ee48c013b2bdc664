//! # scene-cluster
//!
//! Groups sampled video frames into temporal scene segments.
//!
//! The pipeline takes batched k-NN query results for every stored frame,
//! builds a dense (possibly asymmetric) distance matrix over the item
//! population, clusters it with HDBSCAN and cuts the time-ordered labels
//! into segments:
//!
//! ```text
//! QueryBatch* -> NeighborGraph -> DistanceMatrix -> ClusterLabels -> Segment*
//! ```
//!
//! ## Example
//!
//! ```
//! use scene_cluster::ClusterPipeline;
//! use scene_types::{ClusterConfig, FrameRecord, Neighbor, QueryBatch};
//!
//! let config = ClusterConfig::default()
//!     .with_min_samples(1)
//!     .with_min_cluster_size(2);
//! let pipeline = ClusterPipeline::new(config).unwrap();
//!
//! let batch = QueryBatch::new(
//!     vec![1, 2],
//!     vec![
//!         vec![Neighbor::new(1, 0.0), Neighbor::new(2, 0.1)],
//!         vec![Neighbor::new(2, 0.0), Neighbor::new(1, 0.1)],
//!     ],
//! );
//! let frames = vec![FrameRecord::new(1, 0, 0.0), FrameRecord::new(2, 1, 0.04)];
//!
//! let outcome = pipeline.run(vec![batch], &frames).unwrap();
//! assert_eq!(outcome.labels.len(), 2);
//! ```

pub mod density;
pub mod error;
pub mod ingest;
pub mod matrix;
pub mod pipeline;
pub mod segments;

pub use density::{ClusterLabels, DensityClusterer, Hdbscan, HdbscanParams};
pub use error::{ClusterError, ErrorKind, PipelineError, Stage};
pub use ingest::{ingest_batches, NeighborGraph, NeighborIngestor, Population};
pub use matrix::{required_bytes, DistanceMatrix, MatrixBuilder};
pub use pipeline::{ClusterOutcome, ClusterPipeline};
pub use segments::{reconstruct_segments, segments_from_labels, TimedLabel};

// Re-export the shared types callers need alongside the pipeline
pub use scene_types::{ClusterConfig, FrameRecord, Neighbor, QueryBatch, Segment, NOISE_LABEL};
