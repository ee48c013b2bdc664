//! Vector store trait and types.
//!
//! Defines what the clustering pipeline needs from a vector store.

use scene_types::{FrameRecord, ItemId, Neighbor, SampledFrame};

use crate::error::StoreError;

/// An item as returned by a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    /// Id assigned at insert
    pub id: ItemId,
    /// Frame the vector was computed from
    pub frame: SampledFrame,
    /// Frame embedding
    pub embedding: Vec<f32>,
}

impl StoredItem {
    /// Frame record (id plus position in the video) for this item.
    pub fn record(&self) -> FrameRecord {
        FrameRecord::new(self.id, self.frame.frame_index, self.frame.timestamp)
    }
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of stored items
    pub item_count: usize,
    /// Embedding dimension
    pub dimension: usize,
}

/// Trait for vector stores.
///
/// Implementations must be thread-safe for concurrent read access.
pub trait VectorStore: Send + Sync {
    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the number of stored items
    fn len(&self) -> usize;

    /// Check if the store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a frame embedding and return its new id.
    fn insert(&mut self, embedding: Vec<f32>, frame: SampledFrame) -> Result<ItemId, StoreError>;

    /// Store several frames in order.
    fn insert_batch(
        &mut self,
        items: Vec<(Vec<f32>, SampledFrame)>,
    ) -> Result<Vec<ItemId>, StoreError> {
        items
            .into_iter()
            .map(|(embedding, frame)| self.insert(embedding, frame))
            .collect()
    }

    /// Items with id greater than `after`, ascending by id, at most `limit`.
    fn scan(&self, after: Option<ItemId>, limit: usize) -> Result<Vec<StoredItem>, StoreError>;

    /// Search the `k` nearest stored items for each query vector.
    /// Each result list is sorted nearest first.
    fn search(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<Vec<Neighbor>>, StoreError>;

    /// Get store statistics
    fn stats(&self) -> StoreStats {
        StoreStats {
            item_count: self.len(),
            dimension: self.dimension(),
        }
    }
}
