//! Input documents for `scenectl cluster`.
//!
//! Two shapes are accepted, tagged by `kind`:
//!
//! ```json
//! { "kind": "neighbors", "batches": [{ "ids": [..], "neighbors": [[{ "id": 1, "distance": 0.1 }]] }],
//!   "frames": [{ "id": 1, "frame_index": 0, "timestamp": 0.0 }] }
//! { "kind": "embeddings", "fps": 25.0, "stride": 5, "embeddings": [[0.1, 0.2], ..] }
//! ```
//!
//! Embeddings are loaded into an in-memory store and queried in batches,
//! one vector per sampled frame in capture order.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use scene_types::{FrameRecord, QueryBatch};

/// A clustering input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClusterInput {
    /// Already-queried k-NN results plus frame records
    Neighbors {
        batches: Vec<QueryBatch>,
        frames: Vec<FrameRecord>,
    },

    /// Raw frame embeddings, one per sampled frame
    Embeddings {
        fps: f64,
        /// Sampling stride (default from config)
        #[serde(default)]
        stride: Option<u64>,
        embeddings: Vec<Vec<f32>>,
    },
}

impl ClusterInput {
    /// Read and parse an input file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse input file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_types::Neighbor;

    #[test]
    fn test_parse_neighbors_document() {
        let json = r#"{
            "kind": "neighbors",
            "batches": [{ "ids": [1, 2], "neighbors": [[{ "id": 2, "distance": 0.5 }], []] }],
            "frames": [
                { "id": 1, "frame_index": 0, "timestamp": 0.0 },
                { "id": 2, "frame_index": 5, "timestamp": 0.2 }
            ]
        }"#;
        let input: ClusterInput = serde_json::from_str(json).unwrap();

        match input {
            ClusterInput::Neighbors { batches, frames } => {
                assert_eq!(batches[0].neighbors[0], vec![Neighbor::new(2, 0.5)]);
                assert_eq!(frames[1], FrameRecord::new(2, 5, 0.2));
            }
            _ => panic!("Expected neighbors input"),
        }
    }

    #[test]
    fn test_parse_embeddings_document() {
        let json = r#"{ "kind": "embeddings", "fps": 30.0, "embeddings": [[0.0, 1.0]] }"#;
        let input: ClusterInput = serde_json::from_str(json).unwrap();
        assert_eq!(
            input,
            ClusterInput::Embeddings {
                fps: 30.0,
                stride: None,
                embeddings: vec![vec![0.0, 1.0]],
            }
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let json = r#"{ "kind": "pixels", "data": [] }"#;
        assert!(serde_json::from_str::<ClusterInput>(json).is_err());
    }
}
