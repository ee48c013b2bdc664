//! Error types for the clustering pipeline.

use std::fmt;

use scene_store::StoreError;
use scene_types::ItemId;
use thiserror::Error;

/// Errors raised by the pipeline stages.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Invalid parameters
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No items were ingested
    #[error("Item population is empty")]
    EmptyPopulation,

    /// An id was queried more than once
    #[error("Item id {0} appears in more than one query result")]
    DuplicateId(ItemId),

    /// A query batch has a different number of ids and neighbor lists
    #[error("Query batch has {ids} ids but {lists} neighbor lists")]
    BatchShape { ids: usize, lists: usize },

    /// More neighbors than the configured K
    #[error("Item {id} returned {count} neighbors, limit is {limit}")]
    TooManyNeighbors { id: ItemId, count: usize, limit: usize },

    /// Distance that cannot be stored in the matrix
    #[error("Invalid distance {distance} on edge {from} -> {to}")]
    InvalidDistance {
        from: ItemId,
        to: ItemId,
        distance: f64,
    },

    /// Edge source missing from the population
    #[error("Edge source {0} is not in the item population")]
    UnknownId(ItemId),

    /// Edge target missing from the population
    #[error("Edge {from} -> {to} references an item outside the population")]
    UnknownNeighbor { from: ItemId, to: ItemId },

    /// Population item without a frame record
    #[error("No frame record for item {0}")]
    MissingFrame(ItemId),

    /// Frame record listed twice
    #[error("Frame record for item {0} appears more than once")]
    DuplicateFrame(ItemId),

    /// Timestamps going backwards in capture order
    #[error("Timestamp at index {index} is {current}, previous was {previous}")]
    TimestampOrder {
        index: usize,
        previous: f64,
        current: f64,
    },

    /// Labels and timestamps of different lengths
    #[error("Got {labels} labels for {timestamps} timestamps")]
    LengthMismatch { labels: usize, timestamps: usize },

    /// Dense matrix would exceed the memory budget
    #[error("Distance matrix for {items} items needs {bytes} bytes, budget is {budget}")]
    MatrixTooLarge { items: usize, bytes: u64, budget: u64 },

    /// Dense matrix allocation refused
    #[error("Could not allocate distance matrix for {items} items ({bytes} bytes)")]
    AllocationFailed { items: usize, bytes: u64 },

    /// Clustering primitive failure, reported as-is
    #[error("Clustering error: {0}")]
    Algorithm(String),

    /// Vector store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Broad error class, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Consistency,
    Resource,
    Algorithm,
    Store,
}

impl ClusterError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClusterError::Config(_) | ClusterError::EmptyPopulation => ErrorKind::Configuration,
            ClusterError::DuplicateId(_)
            | ClusterError::BatchShape { .. }
            | ClusterError::TooManyNeighbors { .. }
            | ClusterError::InvalidDistance { .. }
            | ClusterError::UnknownId(_)
            | ClusterError::UnknownNeighbor { .. }
            | ClusterError::MissingFrame(_)
            | ClusterError::DuplicateFrame(_)
            | ClusterError::TimestampOrder { .. }
            | ClusterError::LengthMismatch { .. } => ErrorKind::Consistency,
            ClusterError::MatrixTooLarge { .. } | ClusterError::AllocationFailed { .. } => {
                ErrorKind::Resource
            }
            ClusterError::Algorithm(_) => ErrorKind::Algorithm,
            ClusterError::Store(_) => ErrorKind::Store,
        }
    }
}

/// Pipeline stage, used to report where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Store,
    Ingest,
    Matrix,
    Clustering,
    Segments,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Store => "store",
            Stage::Ingest => "ingest",
            Stage::Matrix => "matrix",
            Stage::Clustering => "clustering",
            Stage::Segments => "segments",
        };
        f.write_str(name)
    }
}

/// A failed pipeline run: the stage and the underlying error.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: ClusterError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: impl Into<ClusterError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClusterError::DuplicateId(42);
        assert_eq!(
            err.to_string(),
            "Item id 42 appears in more than one query result"
        );

        let err = ClusterError::UnknownNeighbor { from: 1, to: 9 };
        assert_eq!(
            err.to_string(),
            "Edge 1 -> 9 references an item outside the population"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ClusterError::Config("k".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(ClusterError::EmptyPopulation.kind(), ErrorKind::Configuration);
        assert_eq!(ClusterError::UnknownId(3).kind(), ErrorKind::Consistency);
        assert_eq!(
            ClusterError::MatrixTooLarge {
                items: 10,
                bytes: 800,
                budget: 8
            }
            .kind(),
            ErrorKind::Resource
        );
        assert_eq!(
            ClusterError::Algorithm("bad".into()).kind(),
            ErrorKind::Algorithm
        );
        assert_eq!(
            ClusterError::from(StoreError::Closed).kind(),
            ErrorKind::Store
        );
    }

    #[test]
    fn test_pipeline_error_names_stage() {
        let err = PipelineError::new(Stage::Matrix, ClusterError::UnknownId(7));
        assert_eq!(
            err.to_string(),
            "matrix stage failed: Edge source 7 is not in the item population"
        );
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }
}
