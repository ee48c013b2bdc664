//! JSON report written by `scenectl cluster`.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scene_cluster::ClusterOutcome;
use scene_types::{ItemId, Segment, SegmentSummary};

/// Label of one ingested item and the frame it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelledItem {
    pub id: ItemId,
    pub label: i32,
    pub frame_index: u64,
    pub timestamp: f64,
}

/// A segment plus what the exporter needs to cut it.
///
/// `frame_indices` of the segment are item positions; `video_frames` are
/// the matching frame indices in the decoded video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentEntry {
    #[serde(flatten)]
    pub segment: Segment,
    pub video_frames: Vec<u64>,
    pub duration: f64,
    pub export_path: String,
}

/// Result of one clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub summary: SegmentSummary,
    pub labels: Vec<LabelledItem>,
    pub segments: Vec<SegmentEntry>,
}

impl RunReport {
    /// Build a report; export paths are resolved under `output_dir`.
    pub fn from_outcome(outcome: &ClusterOutcome, output_dir: &str) -> Self {
        let labels = outcome
            .frames
            .iter()
            .zip(outcome.labels.as_slice())
            .map(|(frame, &label)| LabelledItem {
                id: frame.id,
                label,
                frame_index: frame.frame_index,
                timestamp: frame.timestamp,
            })
            .collect();

        let segments = outcome
            .segments
            .iter()
            .map(|segment| SegmentEntry {
                video_frames: segment
                    .frame_indices
                    .iter()
                    .map(|&position| outcome.frames[position].frame_index)
                    .collect(),
                duration: segment.duration(),
                export_path: Path::new(output_dir)
                    .join(segment.export_file_name())
                    .to_string_lossy()
                    .into_owned(),
                segment: segment.clone(),
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            summary: outcome.summary.clone(),
            labels,
            segments,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
