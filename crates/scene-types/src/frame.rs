//! Sampled frame types.
//!
//! The frame sampler decodes a video and keeps every `stride`-th frame.
//! Decoding is not modelled here; only the sampler's clock is, so that
//! timestamps handed to the pipeline follow the same rule the sampler uses.

use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::neighbor::ItemId;

/// A frame kept by the sampler, before it has a store id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampledFrame {
    /// Index of the frame in the decoded video
    pub frame_index: u64,
    /// Seconds since the start of the video
    pub timestamp: f64,
}

/// A stored frame: store id plus its position in the video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Id assigned by the vector store
    pub id: ItemId,
    /// Index of the frame in the decoded video
    pub frame_index: u64,
    /// Seconds since the start of the video
    pub timestamp: f64,
}

impl FrameRecord {
    pub fn new(id: ItemId, frame_index: u64, timestamp: f64) -> Self {
        Self {
            id,
            frame_index,
            timestamp,
        }
    }
}

/// Sampling clock: which frames are kept and at what time they occur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    fps: f64,
    stride: u64,
}

impl FrameClock {
    /// Create a clock for a video running at `fps`, keeping every
    /// `stride`-th frame.
    pub fn new(fps: f64, stride: u64) -> Result<Self, SceneError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(SceneError::Config(format!("fps must be > 0, got {fps}")));
        }
        if stride == 0 {
            return Err(SceneError::Config("frame stride must be > 0".to_string()));
        }
        Ok(Self { fps, stride })
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Timestamp in seconds of a decoded frame.
    pub fn timestamp_of(&self, frame_index: u64) -> f64 {
        frame_index as f64 / self.fps
    }

    /// Frames kept out of a video of `total_frames` frames.
    pub fn sample(&self, total_frames: u64) -> Vec<SampledFrame> {
        (0..total_frames)
            .step_by(usize::try_from(self.stride).unwrap_or(usize::MAX))
            .map(|frame_index| self.frame_at(frame_index))
            .collect()
    }

    /// The first `count` kept frames, for a video whose length is only
    /// known through the number of embeddings taken from it.
    pub fn first_frames(&self, count: u64) -> Result<Vec<SampledFrame>, SceneError> {
        (0..count)
            .map(|n| {
                n.checked_mul(self.stride)
                    .map(|frame_index| self.frame_at(frame_index))
                    .ok_or_else(|| {
                        SceneError::Config(format!(
                            "sampled frame {n} at stride {} is past the last frame index",
                            self.stride
                        ))
                    })
            })
            .collect()
    }

    fn frame_at(&self, frame_index: u64) -> SampledFrame {
        SampledFrame {
            frame_index,
            timestamp: self.timestamp_of(frame_index),
        }
    }
}
