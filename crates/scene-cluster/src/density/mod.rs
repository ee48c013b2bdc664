//! Density clustering over a precomputed distance matrix.
//!
//! [`Hdbscan`] implements hierarchical density-based clustering: core
//! distances, mutual reachability, a minimum spanning tree, the
//! single-linkage hierarchy, the condensed tree and excess-of-mass cluster
//! selection. Points outside every selected cluster get [`NOISE_LABEL`].
//!
//! The input matrix may be asymmetric and may contain unreachable entries
//! (at or above its sentinel). A pair is treated as being as far apart as
//! its farther direction, and the diagonal is ignored.

mod condense;
mod tree;

use scene_types::{ClusterConfig, NOISE_LABEL};
use tracing::{debug, instrument};

use crate::error::ClusterError;
use crate::matrix::DistanceMatrix;

/// Common interface for clustering a distance matrix into one label per row.
pub trait DensityClusterer: Send + Sync {
    /// Algorithm name, for logs.
    fn name(&self) -> &str;

    /// Cluster the matrix rows.
    fn fit_predict(&self, matrix: &DistanceMatrix) -> Result<ClusterLabels, ClusterError>;
}

/// One label per matrix row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterLabels {
    labels: Vec<i32>,
    cluster_count: usize,
}

impl ClusterLabels {
    /// Wrap raw labels, counting the distinct non-noise values.
    pub fn new(labels: Vec<i32>) -> Self {
        let mut distinct: Vec<i32> = labels
            .iter()
            .copied()
            .filter(|&l| l != NOISE_LABEL)
            .collect();
        distinct.sort_unstable();
        distinct.dedup();
        Self {
            cluster_count: distinct.len(),
            labels,
        }
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Distinct non-noise labels.
    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    /// Positions labelled noise.
    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE_LABEL).count()
    }

    /// Positions carrying `label`, ascending.
    pub fn members(&self, label: i32) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == label)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn into_vec(self) -> Vec<i32> {
        self.labels
    }
}

/// HDBSCAN parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HdbscanParams {
    /// Neighbors (excluding self) defining a point's core distance
    pub min_samples: usize,
    /// Smallest group that counts as a cluster
    pub min_cluster_size: usize,
}

impl Default for HdbscanParams {
    fn default() -> Self {
        Self {
            min_samples: 3,
            min_cluster_size: 24,
        }
    }
}

impl HdbscanParams {
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    pub fn validate(&self) -> Result<(), ClusterError> {
        if self.min_samples == 0 {
            return Err(ClusterError::Config("min_samples must be >= 1".to_string()));
        }
        if self.min_cluster_size < 2 {
            return Err(ClusterError::Config(format!(
                "min_cluster_size must be >= 2, got {}",
                self.min_cluster_size
            )));
        }
        Ok(())
    }
}

impl From<&ClusterConfig> for HdbscanParams {
    fn from(config: &ClusterConfig) -> Self {
        Self {
            min_samples: config.min_samples,
            min_cluster_size: config.min_cluster_size,
        }
    }
}

/// HDBSCAN over a precomputed matrix.
#[derive(Debug, Clone)]
pub struct Hdbscan {
    params: HdbscanParams,
}

impl Hdbscan {
    pub fn new(params: HdbscanParams) -> Result<Self, ClusterError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &HdbscanParams {
        &self.params
    }
}

/// Reject entries the engine cannot order.
fn check_entries(matrix: &DistanceMatrix) -> Result<(), ClusterError> {
    let n = matrix.len();
    if let Some(pos) = matrix
        .as_slice()
        .iter()
        .position(|d| d.is_nan() || *d < 0.0)
    {
        return Err(ClusterError::Algorithm(format!(
            "invalid matrix entry {} at [{}][{}]",
            matrix.as_slice()[pos],
            pos / n,
            pos % n
        )));
    }
    Ok(())
}

impl DensityClusterer for Hdbscan {
    fn name(&self) -> &str {
        "hdbscan"
    }

    #[instrument(skip(self, matrix), fields(items = matrix.len()))]
    fn fit_predict(&self, matrix: &DistanceMatrix) -> Result<ClusterLabels, ClusterError> {
        let n = matrix.len();
        match n {
            0 => return Ok(ClusterLabels::default()),
            1 => return Ok(ClusterLabels::new(vec![NOISE_LABEL])),
            _ => {}
        }
        check_entries(matrix)?;

        let core = tree::core_distances(matrix, self.params.min_samples);
        let spanning = tree::minimum_spanning_tree(matrix, &core);
        let hierarchy = tree::single_linkage(n, spanning);
        let condensed = condense::condense(&hierarchy, n, self.params.min_cluster_size);
        let selected = condense::select_clusters(&condensed, n);
        let labels = ClusterLabels::new(condense::assign_labels(&condensed, n, &selected));

        debug!(
            clusters = labels.cluster_count(),
            noise = labels.noise_count(),
            "HDBSCAN complete"
        );
        Ok(labels)
    }
}
