//! Neighbor result ingestion.
//!
//! Collects the k-NN results of a batched store scan into a neighbor graph
//! and fixes the item population (ids in first-seen order, each mapped to a
//! dense position).

use std::collections::HashMap;

use scene_types::{ItemId, Neighbor, QueryBatch};
use tracing::debug;

use crate::error::ClusterError;

/// Items ingested between progress log lines.
const PROGRESS_INTERVAL: usize = 100;

/// Ordered snapshot of item ids with a dense id <-> position mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Population {
    ids: Vec<ItemId>,
    positions: HashMap<ItemId, usize>,
}

impl Population {
    /// Build a population from ids in order. Duplicates are rejected.
    pub fn from_ids(ids: impl IntoIterator<Item = ItemId>) -> Result<Self, ClusterError> {
        let mut population = Self::default();
        for id in ids {
            population.push(id)?;
        }
        Ok(population)
    }

    fn push(&mut self, id: ItemId) -> Result<usize, ClusterError> {
        let position = self.ids.len();
        if self.positions.insert(id, position).is_some() {
            return Err(ClusterError::DuplicateId(id));
        }
        self.ids.push(id);
        Ok(position)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Position of an id, if it belongs to the population.
    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Id at a position.
    pub fn id_at(&self, position: usize) -> Option<ItemId> {
        self.ids.get(position).copied()
    }

    /// Ids in position order.
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }
}

/// Neighbor lists of every ingested item, aligned with the population.
#[derive(Debug, Clone, Default)]
pub struct NeighborGraph {
    population: Population,
    edges: Vec<Vec<Neighbor>>,
}

impl NeighborGraph {
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Neighbor list of an item, in engine order.
    pub fn neighbors_of(&self, id: ItemId) -> Option<&[Neighbor]> {
        self.population
            .index_of(id)
            .map(|position| self.edges[position].as_slice())
    }

    /// Total number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// `(source id, neighbor list)` in population order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &[Neighbor])> {
        self.population
            .ids()
            .iter()
            .copied()
            .zip(self.edges.iter().map(Vec::as_slice))
    }

    pub fn into_population(self) -> Population {
        self.population
    }
}

/// Accumulates query batches into a [`NeighborGraph`].
#[derive(Debug)]
pub struct NeighborIngestor {
    neighbor_count: usize,
    population: Population,
    edges: Vec<Vec<Neighbor>>,
}

impl NeighborIngestor {
    /// Create an ingestor accepting at most `neighbor_count` neighbors per item.
    pub fn new(neighbor_count: usize) -> Result<Self, ClusterError> {
        if neighbor_count == 0 {
            return Err(ClusterError::Config(
                "neighbor_count must be > 0".to_string(),
            ));
        }
        Ok(Self {
            neighbor_count,
            population: Population::default(),
            edges: Vec::new(),
        })
    }

    /// Number of items ingested so far.
    pub fn ingested(&self) -> usize {
        self.population.len()
    }

    /// Add one batch of query results.
    pub fn ingest_batch(&mut self, batch: &QueryBatch) -> Result<(), ClusterError> {
        if batch.ids.len() != batch.neighbors.len() {
            return Err(ClusterError::BatchShape {
                ids: batch.ids.len(),
                lists: batch.neighbors.len(),
            });
        }

        for (id, neighbors) in batch.iter() {
            if neighbors.len() > self.neighbor_count {
                return Err(ClusterError::TooManyNeighbors {
                    id,
                    count: neighbors.len(),
                    limit: self.neighbor_count,
                });
            }
            if let Some(bad) = neighbors
                .iter()
                .find(|n| !n.distance.is_finite() || n.distance < 0.0)
            {
                return Err(ClusterError::InvalidDistance {
                    from: id,
                    to: bad.id,
                    distance: bad.distance,
                });
            }

            self.population.push(id)?;
            self.edges.push(neighbors.to_vec());

            if self.population.len() % PROGRESS_INTERVAL == 0 {
                debug!(ingested = self.population.len(), "Ingest progress");
            }
        }

        Ok(())
    }

    /// Finish ingestion. An empty population is an error.
    pub fn finish(self) -> Result<NeighborGraph, ClusterError> {
        if self.population.is_empty() {
            return Err(ClusterError::EmptyPopulation);
        }
        debug!(
            items = self.population.len(),
            "Ingest complete"
        );
        Ok(NeighborGraph {
            population: self.population,
            edges: self.edges,
        })
    }
}

/// Ingest every batch of an iterator.
pub fn ingest_batches<I>(neighbor_count: usize, batches: I) -> Result<NeighborGraph, ClusterError>
where
    I: IntoIterator<Item = QueryBatch>,
{
    let mut ingestor = NeighborIngestor::new(neighbor_count)?;
    for batch in batches {
        ingestor.ingest_batch(&batch)?;
    }
    ingestor.finish()
}
