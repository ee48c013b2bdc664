//! In-memory flat store.
//!
//! Exhaustive search with the squared Euclidean ("L2") metric, the same
//! metric a flat index in an external vector database reports. Results are
//! ordered by distance, then by id, so repeated queries are identical.

use std::collections::BTreeMap;
use std::ops::Bound;

use scene_types::{ItemId, Neighbor, SampledFrame};
use tracing::debug;

use crate::error::StoreError;
use crate::store::{StoredItem, VectorStore};

/// Flat (brute force) squared-L2 store.
pub struct FlatL2Store {
    dimension: usize,
    items: BTreeMap<ItemId, StoredItem>,
    next_id: ItemId,
}

impl FlatL2Store {
    /// Create an empty store for vectors of `dimension` values.
    pub fn new(dimension: usize) -> Result<Self, StoreError> {
        if dimension == 0 {
            return Err(StoreError::InvalidInput(
                "dimension must be > 0".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            items: BTreeMap::new(),
            next_id: 1,
        })
    }

    /// Look up a stored item.
    pub fn get(&self, id: ItemId) -> Result<&StoredItem, StoreError> {
        self.items.get(&id).ok_or(StoreError::NotFound(id))
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Squared Euclidean distance.
fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x as f64) - (*y as f64);
            d * d
        })
        .sum()
}

impl VectorStore for FlatL2Store {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn insert(&mut self, embedding: Vec<f32>, frame: SampledFrame) -> Result<ItemId, StoreError> {
        self.check_dimension(&embedding)?;
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(StoreError::InvalidInput(format!(
                "embedding for frame {} has non-finite values",
                frame.frame_index
            )));
        }

        let id = self.next_id;
        self.items.insert(
            id,
            StoredItem {
                id,
                frame,
                embedding,
            },
        );
        self.next_id += 1;
        Ok(id)
    }

    fn scan(&self, after: Option<ItemId>, limit: usize) -> Result<Vec<StoredItem>, StoreError> {
        let items: Vec<StoredItem> = match after {
            Some(cursor) => self
                .items
                .range((Bound::Excluded(cursor), Bound::Unbounded))
                .take(limit)
                .map(|(_, item)| item.clone())
                .collect(),
            None => self.items.values().take(limit).cloned().collect(),
        };
        Ok(items)
    }

    fn search(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<Vec<Neighbor>>, StoreError> {
        for query in queries {
            self.check_dimension(query)?;
        }

        let results = queries
            .iter()
            .map(|query| {
                let mut scored: Vec<Neighbor> = self
                    .items
                    .values()
                    .map(|item| Neighbor::new(item.id, squared_l2(query, &item.embedding)))
                    .collect();
                scored.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
                scored.truncate(k);
                scored
            })
            .collect();

        debug!(queries = queries.len(), k = k, "Flat search complete");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn frame(i: u64) -> SampledFrame {
        SampledFrame {
            frame_index: i,
            timestamp: i as f64,
        }
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let mut store = FlatL2Store::new(2).unwrap();
        let a = store.insert(vec![0.0, 0.0], frame(0)).unwrap();
        let b = store.insert(vec![1.0, 0.0], frame(1)).unwrap();

        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(b).unwrap().frame.frame_index, 1);
    }

    #[test]
    fn test_insert_rejects_wrong_dimension() {
        let mut store = FlatL2Store::new(3).unwrap();
        let result = store.insert(vec![1.0, 2.0], frame(0));
        assert!(matches!(
            result,
            Err(StoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_insert_rejects_non_finite() {
        let mut store = FlatL2Store::new(1).unwrap();
        assert!(store.insert(vec![f32::NAN], frame(0)).is_err());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(FlatL2Store::new(0).is_err());
    }

    #[test]
    fn test_search_orders_by_squared_distance() {
        let mut store = FlatL2Store::new(1).unwrap();
        for x in [0.0, 3.0, 1.0, 10.0] {
            store.insert(vec![x], frame(0)).unwrap();
        }

        let results = store.search(&[vec![0.0]], 3).unwrap();
        let ids: Vec<ItemId> = results[0].iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert_eq!(results[0][0].distance, 0.0);
        assert_eq!(results[0][2].distance, 9.0);
    }

    #[test]
    fn test_search_breaks_ties_by_id() {
        let mut store = FlatL2Store::new(1).unwrap();
        store.insert(vec![1.0], frame(0)).unwrap();
        store.insert(vec![-1.0], frame(1)).unwrap();

        let results = store.search(&[vec![0.0]], 2).unwrap();
        assert_eq!(results[0][0].id, 1);
        assert_eq!(results[0][1].id, 2);
    }

    #[test]
    fn test_search_k_larger_than_store() {
        let mut store = FlatL2Store::new(2).unwrap();
        store.insert(vec![0.0, 0.0], frame(0)).unwrap();
        let results = store.search(&[vec![1.0, 1.0]], 50).unwrap();
        assert_eq!(results[0].len(), 1);
    }

    #[test]
    fn test_scan_pages_by_id() {
        let mut store = FlatL2Store::new(1).unwrap();
        for i in 0..5 {
            store.insert(vec![i as f32], frame(i)).unwrap();
        }

        let first = store.scan(None, 2).unwrap();
        assert_eq!(first.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 2]);

        let second = store.scan(Some(2), 2).unwrap();
        assert_eq!(second.iter().map(|i| i.id).collect::<Vec<_>>(), vec![3, 4]);

        let last = store.scan(Some(4), 2).unwrap();
        assert_eq!(last.len(), 1);
        assert!(store.scan(Some(5), 2).unwrap().is_empty());
    }

    #[test]
    fn test_random_vectors_nearest_is_self() {
        let mut rng = rand::rng();
        let mut store = FlatL2Store::new(8).unwrap();
        let vectors: Vec<Vec<f32>> = (0..20)
            .map(|_| (0..8).map(|_| rng.random_range(-1.0..1.0)).collect())
            .collect();
        for (i, v) in vectors.iter().enumerate() {
            store.insert(v.clone(), frame(i as u64)).unwrap();
        }

        let results = store.search(&vectors, 5).unwrap();
        for (i, neighbors) in results.iter().enumerate() {
            assert_eq!(neighbors.len(), 5);
            assert_eq!(neighbors[0].distance, 0.0);
            assert!(neighbors.windows(2).all(|w| w[0].distance <= w[1].distance));
            // Self is at distance zero; a duplicate vector could tie, so
            // only require that self is among the zero-distance hits.
            assert!(neighbors
                .iter()
                .take_while(|n| n.distance == 0.0)
                .any(|n| n.id == i as u64 + 1));
        }
    }
}
