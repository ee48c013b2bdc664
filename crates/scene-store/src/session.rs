//! Store sessions.
//!
//! A session is the only way the pipeline reaches a store. It is opened
//! explicitly, passed by reference to whoever needs it, and closed
//! explicitly; using it after close fails with [`StoreError::Closed`].

use scene_types::{FrameRecord, ItemId, QueryBatch};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::VectorStore;

/// Explicit handle on an open vector store.
pub struct StoreSession<S: VectorStore> {
    store: Option<S>,
}

impl<S: VectorStore> StoreSession<S> {
    /// Open a session over a store.
    pub fn open(store: S) -> Self {
        info!(
            items = store.len(),
            dimension = store.dimension(),
            "Opened store session"
        );
        Self { store: Some(store) }
    }

    /// Whether the session is still open.
    pub fn is_open(&self) -> bool {
        self.store.is_some()
    }

    /// Borrow the store.
    pub fn store(&self) -> Result<&S, StoreError> {
        self.store.as_ref().ok_or(StoreError::Closed)
    }

    /// Borrow the store mutably.
    pub fn store_mut(&mut self) -> Result<&mut S, StoreError> {
        self.store.as_mut().ok_or(StoreError::Closed)
    }

    /// Close the session and hand the store back.
    pub fn close(&mut self) -> Result<S, StoreError> {
        let store = self.store.take().ok_or(StoreError::Closed)?;
        info!(items = store.len(), "Closed store session");
        Ok(store)
    }

    /// Iterate the stored items in batches, querying `neighbor_count`
    /// neighbors for every item of each batch.
    pub fn query_batches(
        &self,
        batch_size: usize,
        neighbor_count: usize,
    ) -> Result<QueryIterator<'_, S>, StoreError> {
        if batch_size == 0 {
            return Err(StoreError::InvalidInput(
                "batch_size must be > 0".to_string(),
            ));
        }
        Ok(QueryIterator {
            store: self.store()?,
            cursor: None,
            batch_size,
            neighbor_count,
            done: false,
        })
    }

    /// Frame records of every stored item, ascending by id.
    pub fn frame_records(&self, page_size: usize) -> Result<Vec<FrameRecord>, StoreError> {
        let store = self.store()?;
        let page_size = page_size.max(1);
        let mut records = Vec::with_capacity(store.len());
        let mut cursor = None;

        loop {
            let page = store.scan(cursor, page_size)?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(last.id);
            records.extend(page.iter().map(|item| item.record()));
        }

        Ok(records)
    }
}

/// Batched scan + k-NN query over a store.
///
/// Yields one [`QueryBatch`] per scanned page until the store is exhausted.
pub struct QueryIterator<'a, S: VectorStore> {
    store: &'a S,
    cursor: Option<ItemId>,
    batch_size: usize,
    neighbor_count: usize,
    done: bool,
}

impl<S: VectorStore> Iterator for QueryIterator<'_, S> {
    type Item = Result<QueryBatch, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let page = match self.store.scan(self.cursor, self.batch_size) {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let Some(last) = page.last() else {
            self.done = true;
            return None;
        };
        self.cursor = Some(last.id);

        let ids: Vec<ItemId> = page.iter().map(|item| item.id).collect();
        let queries: Vec<Vec<f32>> = page.into_iter().map(|item| item.embedding).collect();

        match self.store.search(&queries, self.neighbor_count) {
            Ok(neighbors) => {
                debug!(batch = ids.len(), "Queried neighbor batch");
                Some(Ok(QueryBatch::new(ids, neighbors)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::FlatL2Store;
    use scene_types::SampledFrame;

    fn session_with(values: &[f32]) -> StoreSession<FlatL2Store> {
        let mut store = FlatL2Store::new(1).unwrap();
        for (i, v) in values.iter().enumerate() {
            store
                .insert(
                    vec![*v],
                    SampledFrame {
                        frame_index: i as u64,
                        timestamp: i as f64 * 0.5,
                    },
                )
                .unwrap();
        }
        StoreSession::open(store)
    }

    #[test]
    fn test_query_batches_cover_every_item_once() {
        let session = session_with(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let batches: Vec<QueryBatch> = session
            .query_batches(3, 2)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].ids, vec![1, 2, 3]);
        assert_eq!(batches[2].ids, vec![7]);
        for batch in &batches {
            assert_eq!(batch.ids.len(), batch.neighbors.len());
            for (id, neighbors) in batch.iter() {
                assert_eq!(neighbors.len(), 2);
                assert_eq!(neighbors[0].id, id);
            }
        }
    }

    #[test]
    fn test_query_batches_on_empty_store() {
        let session = session_with(&[]);
        assert_eq!(session.query_batches(10, 5).unwrap().count(), 0);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let session = session_with(&[1.0]);
        assert!(session.query_batches(0, 5).is_err());
    }

    #[test]
    fn test_frame_records_in_id_order() {
        let session = session_with(&[9.0, 8.0, 7.0]);
        let records = session.frame_records(2).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0], FrameRecord::new(1, 0, 0.0));
        assert_eq!(records[2], FrameRecord::new(3, 2, 1.0));
    }

    #[test]
    fn test_use_after_close_fails() {
        let mut session = session_with(&[1.0, 2.0]);
        let store = session.close().unwrap();
        assert_eq!(store.len(), 2);

        assert!(!session.is_open());
        assert!(matches!(session.store(), Err(StoreError::Closed)));
        assert!(matches!(session.query_batches(1, 1), Err(StoreError::Closed)));
        assert!(matches!(session.close(), Err(StoreError::Closed)));
    }
}
