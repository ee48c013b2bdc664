//! # scene-store
//!
//! Vector store boundary for scene clustering.
//!
//! The clustering core never talks to a store directly: it consumes query
//! results. This crate defines what a store must answer, an explicit
//! session handle with an open/use/close lifecycle, and an in-memory flat
//! store used by tests, demos and the CLI.
//!
//! ## Features
//! - [`VectorStore`] trait: insert, paged scan, batched k-NN search
//! - [`StoreSession`]: explicit handle, no process-wide connection
//! - [`QueryIterator`]: batched scan + neighbor query, one [`QueryBatch`] per page
//! - [`FlatL2Store`]: exhaustive squared-L2 search over in-memory vectors
//!
//! [`QueryBatch`]: scene_types::QueryBatch

pub mod error;
pub mod flat;
pub mod session;
pub mod store;

pub use error::StoreError;
pub use flat::FlatL2Store;
pub use session::{QueryIterator, StoreSession};
pub use store::{StoreStats, StoredItem, VectorStore};
