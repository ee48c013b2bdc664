//! Temporal segment type.
//!
//! A segment is a maximal run of frames, contiguous in capture time, that
//! the clustering assigned the same non-noise label. Segments are derived
//! from labels and timestamps on every run and never stored on their own.

use serde::{Deserialize, Serialize};

/// Label reserved for frames that belong to no cluster.
pub const NOISE_LABEL: i32 = -1;

/// A contiguous run of frames sharing one cluster label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Cluster label shared by every frame of the segment
    pub label: i32,

    /// Timestamp of the first frame (seconds)
    pub start_timestamp: f64,

    /// Timestamp of the last frame (seconds)
    pub end_timestamp: f64,

    /// Population positions of the member frames, in time order
    pub frame_indices: Vec<usize>,
}

impl Segment {
    /// Create a segment holding a single frame.
    pub fn starting_at(label: i32, index: usize, timestamp: f64) -> Self {
        Self {
            label,
            start_timestamp: timestamp,
            end_timestamp: timestamp,
            frame_indices: vec![index],
        }
    }

    /// Append the next frame of the run.
    pub fn extend(&mut self, index: usize, timestamp: f64) {
        self.frame_indices.push(index);
        self.end_timestamp = timestamp;
    }

    /// Number of frames in the segment.
    pub fn len(&self) -> usize {
        self.frame_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_indices.is_empty()
    }

    /// Duration covered, from first to last frame.
    pub fn duration(&self) -> f64 {
        self.end_timestamp - self.start_timestamp
    }

    /// File name used by the exporter when re-encoding this segment.
    pub fn export_file_name(&self) -> String {
        format!(
            "segment_{}_{:.1}-{:.1}.mp4",
            self.label, self.start_timestamp, self.end_timestamp
        )
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Counts describing one reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSummary {
    /// Number of segments emitted
    pub segment_count: usize,
    /// Distinct non-noise labels among the input
    pub cluster_count: usize,
    /// Positions labelled as noise
    pub noise_count: usize,
    /// Positions covered by some segment
    pub covered_positions: usize,
}

impl SegmentSummary {
    /// Summarize segments against the labels they were built from.
    pub fn from_labels(labels: &[i32], segments: &[Segment]) -> Self {
        let mut distinct: Vec<i32> = labels
            .iter()
            .copied()
            .filter(|&l| l != NOISE_LABEL)
            .collect();
        distinct.sort_unstable();
        distinct.dedup();

        Self {
            segment_count: segments.len(),
            cluster_count: distinct.len(),
            noise_count: labels.iter().filter(|&&l| l == NOISE_LABEL).count(),
            covered_positions: segments.iter().map(Segment::len).sum(),
        }
    }
}
