//! Approximate nearest-neighbor query results.
//!
//! A vector store answers a batch of k-NN queries with, per queried item,
//! an ordered list of neighbors. Order is whatever the search engine
//! returned; ties in distance are never re-sorted here.

use serde::{Deserialize, Serialize};

/// Stable identity of a stored frame, assigned by the vector store.
pub type ItemId = u64;

/// One neighbor returned by a k-NN query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Id of the neighboring item
    pub id: ItemId,
    /// Distance from the queried item (metric of the store)
    pub distance: f64,
}

impl Neighbor {
    pub fn new(id: ItemId, distance: f64) -> Self {
        Self { id, distance }
    }
}

/// Results of querying one batch of items.
///
/// `neighbors[i]` holds the neighbors of `ids[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryBatch {
    /// Queried item ids, in iteration order
    pub ids: Vec<ItemId>,
    /// Neighbor list per queried id
    pub neighbors: Vec<Vec<Neighbor>>,
}

impl QueryBatch {
    pub fn new(ids: Vec<ItemId>, neighbors: Vec<Vec<Neighbor>>) -> Self {
        Self { ids, neighbors }
    }

    /// Number of queried ids in the batch.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate `(id, neighbors)` pairs.
    ///
    /// Stops at the shorter of the two lists; callers that need to detect
    /// a length mismatch should compare `ids.len()` and `neighbors.len()`.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &[Neighbor])> {
        self.ids
            .iter()
            .copied()
            .zip(self.neighbors.iter().map(Vec::as_slice))
    }
}
