//! Dense pairwise distance matrix.
//!
//! Entry `[i][j]` holds the distance the store reported from item `i` to
//! item `j`, or the sentinel when `j` was not among `i`'s neighbors. The
//! matrix is never symmetrized and the diagonal is whatever the store
//! reported for self.

use scene_types::{ItemId, Neighbor};
use tracing::{debug, instrument};

use crate::error::ClusterError;
use crate::ingest::{NeighborGraph, Population};

const CELL_BYTES: u64 = std::mem::size_of::<f64>() as u64;

/// Bytes needed for an `n x n` matrix, `None` on overflow.
pub fn required_bytes(n: usize) -> Option<u64> {
    let n = u64::try_from(n).ok()?;
    n.checked_mul(n)?.checked_mul(CELL_BYTES)
}

/// Square row-major `f64` matrix over population positions.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
    sentinel: f64,
}

impl DistanceMatrix {
    /// Build from explicit rows. Every row must have one entry per row.
    pub fn from_rows(rows: Vec<Vec<f64>>, sentinel: f64) -> Result<Self, ClusterError> {
        check_sentinel(sentinel)?;
        let n = rows.len();
        if let Some(bad) = rows.iter().position(|row| row.len() != n) {
            return Err(ClusterError::Algorithm(format!(
                "matrix is not square: row {} has {} entries, expected {}",
                bad,
                rows[bad].len(),
                n
            )));
        }
        Ok(Self {
            n,
            data: rows.into_iter().flatten().collect(),
            sentinel,
        })
    }

    /// Number of rows (and columns).
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Entry `[i][j]`.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is out of range.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(j < self.n, "column {j} out of range for {} columns", self.n);
        self.data[i * self.n + j]
    }

    /// Row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    pub fn sentinel(&self) -> f64 {
        self.sentinel
    }

    /// Whether `[i][j]` marks an unobserved pair.
    pub fn is_unreachable(&self, i: usize, j: usize) -> bool {
        self.get(i, j) >= self.sentinel
    }

    /// Memory held by the entries.
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64 * CELL_BYTES
    }

    /// All entries, row-major.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

fn check_sentinel(sentinel: f64) -> Result<(), ClusterError> {
    if sentinel.is_nan() || sentinel <= 0.0 {
        return Err(ClusterError::Config(format!(
            "unreachable_distance must be > 0, got {sentinel}"
        )));
    }
    Ok(())
}

/// Builds [`DistanceMatrix`] values under a memory budget.
#[derive(Debug, Clone, Copy)]
pub struct MatrixBuilder {
    sentinel: f64,
    max_bytes: u64,
}

impl MatrixBuilder {
    pub fn new(sentinel: f64, max_bytes: u64) -> Result<Self, ClusterError> {
        check_sentinel(sentinel)?;
        Ok(Self {
            sentinel,
            max_bytes,
        })
    }

    /// Build the matrix for an ingested neighbor graph.
    pub fn build_graph(&self, graph: &NeighborGraph) -> Result<DistanceMatrix, ClusterError> {
        self.build(graph.population(), graph.iter())
    }

    /// Build the matrix for a population and its `(source, neighbors)` edges.
    ///
    /// Edges are validated first, then the budget is checked and the matrix
    /// allocated; nothing is written before all checks pass.
    #[instrument(skip(self, population, edges), fields(items = population.len()))]
    pub fn build<'a, I>(
        &self,
        population: &Population,
        edges: I,
    ) -> Result<DistanceMatrix, ClusterError>
    where
        I: IntoIterator<Item = (ItemId, &'a [Neighbor])>,
    {
        let n = population.len();
        let cells = self.resolve_edges(population, edges)?;

        let bytes = required_bytes(n).ok_or(ClusterError::MatrixTooLarge {
            items: n,
            bytes: u64::MAX,
            budget: self.max_bytes,
        })?;
        if bytes > self.max_bytes {
            return Err(ClusterError::MatrixTooLarge {
                items: n,
                bytes,
                budget: self.max_bytes,
            });
        }

        let len = n * n;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| ClusterError::AllocationFailed { items: n, bytes })?;
        data.resize(len, self.sentinel);

        for &(row, col, distance) in &cells {
            data[row * n + col] = distance;
        }

        debug!(items = n, edges = cells.len(), bytes, "Built distance matrix");
        Ok(DistanceMatrix {
            n,
            data,
            sentinel: self.sentinel,
        })
    }

    fn resolve_edges<'a, I>(
        &self,
        population: &Population,
        edges: I,
    ) -> Result<Vec<(usize, usize, f64)>, ClusterError>
    where
        I: IntoIterator<Item = (ItemId, &'a [Neighbor])>,
    {
        let mut cells = Vec::new();
        for (source, neighbors) in edges {
            let row = population
                .index_of(source)
                .ok_or(ClusterError::UnknownId(source))?;
            for neighbor in neighbors {
                let col =
                    population
                        .index_of(neighbor.id)
                        .ok_or(ClusterError::UnknownNeighbor {
                            from: source,
                            to: neighbor.id,
                        })?;
                let distance = neighbor.distance;
                if distance.is_nan() || distance < 0.0 || distance >= self.sentinel {
                    return Err(ClusterError::InvalidDistance {
                        from: source,
                        to: neighbor.id,
                        distance,
                    });
                }
                cells.push((row, col, distance));
            }
        }
        Ok(cells)
    }
}
