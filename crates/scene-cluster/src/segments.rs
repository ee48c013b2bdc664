//! Temporal segment reconstruction.
//!
//! Walks labelled frames in capture order and cuts them into maximal runs
//! of one non-noise label. Noise frames belong to no segment and always
//! close the open one.

use scene_types::{Segment, NOISE_LABEL};

use crate::error::ClusterError;

/// A population position with its capture time and cluster label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedLabel {
    pub position: usize,
    pub timestamp: f64,
    pub label: i32,
}

/// Cut a timeline, sorted by timestamp, into segments.
///
/// Segments come out in ascending start time. Decreasing or NaN
/// timestamps are rejected with the offending timeline index.
pub fn reconstruct_segments(timeline: &[TimedLabel]) -> Result<Vec<Segment>, ClusterError> {
    let mut segments = Vec::new();
    let mut open: Option<Segment> = None;
    let mut previous = f64::NEG_INFINITY;

    for (index, point) in timeline.iter().enumerate() {
        if point.timestamp.is_nan() || point.timestamp < previous {
            return Err(ClusterError::TimestampOrder {
                index,
                previous,
                current: point.timestamp,
            });
        }
        previous = point.timestamp;

        if point.label == NOISE_LABEL {
            segments.extend(open.take());
            continue;
        }

        match open.as_mut() {
            Some(segment) if segment.label == point.label => {
                segment.extend(point.position, point.timestamp);
            }
            _ => {
                segments.extend(open.take());
                open = Some(Segment::starting_at(
                    point.label,
                    point.position,
                    point.timestamp,
                ));
            }
        }
    }

    segments.extend(open);
    Ok(segments)
}

/// Segments for labels and timestamps given per position, already in
/// capture order.
pub fn segments_from_labels(
    timestamps: &[f64],
    labels: &[i32],
) -> Result<Vec<Segment>, ClusterError> {
    if timestamps.len() != labels.len() {
        return Err(ClusterError::LengthMismatch {
            labels: labels.len(),
            timestamps: timestamps.len(),
        });
    }
    let timeline: Vec<TimedLabel> = timestamps
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(position, (&timestamp, &label))| TimedLabel {
            position,
            timestamp,
            label,
        })
        .collect();
    reconstruct_segments(&timeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(segments: &[Segment]) -> Vec<(i32, f64, f64, Vec<usize>)> {
        segments
            .iter()
            .map(|s| {
                (
                    s.label,
                    s.start_timestamp,
                    s.end_timestamp,
                    s.frame_indices.clone(),
                )
            })
            .collect()
    }

    #[test]
    fn test_runs_split_on_label_change() {
        let segments =
            segments_from_labels(&[0.0, 1.0, 2.0, 3.0, 4.0], &[0, 0, 1, 1, 0]).unwrap();

        assert_eq!(
            ranges(&segments),
            vec![
                (0, 0.0, 1.0, vec![0, 1]),
                (1, 2.0, 3.0, vec![2, 3]),
                (0, 4.0, 4.0, vec![4]),
            ]
        );
    }

    #[test]
    fn test_noise_closes_segment() {
        let segments =
            segments_from_labels(&[0.0, 0.5, 1.0, 1.5, 2.0], &[2, -1, 2, 2, -1]).unwrap();

        assert_eq!(
            ranges(&segments),
            vec![(2, 0.0, 0.0, vec![0]), (2, 1.0, 1.5, vec![2, 3])]
        );
    }

    #[test]
    fn test_all_noise_and_empty() {
        assert!(segments_from_labels(&[0.0, 1.0], &[-1, -1]).unwrap().is_empty());
        assert!(segments_from_labels(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_equal_timestamps_allowed() {
        let segments = segments_from_labels(&[1.0, 1.0, 1.0], &[0, 0, 0]).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].duration(), 0.0);
    }

    #[test]
    fn test_partition_law() {
        let labels = [0, 0, -1, 1, 1, 1, -1, -1, 0, 2, 2, 1];
        let timestamps: Vec<f64> = (0..labels.len()).map(|i| i as f64 * 0.25).collect();
        let segments = segments_from_labels(&timestamps, &labels).unwrap();

        let mut covered: Vec<usize> = segments
            .iter()
            .flat_map(|s| s.frame_indices.iter().copied())
            .collect();
        covered.sort_unstable();
        let expected: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] != -1).collect();
        assert_eq!(covered, expected);

        for segment in &segments {
            assert!(segment
                .frame_indices
                .iter()
                .all(|&i| labels[i] == segment.label));
        }
        assert!(segments
            .windows(2)
            .all(|w| w[0].start_timestamp <= w[1].start_timestamp));
    }

    #[test]
    fn test_decreasing_timestamp_rejected() {
        let err = segments_from_labels(&[0.0, 2.0, 1.0], &[0, 0, 0]).unwrap_err();
        assert!(matches!(err, ClusterError::TimestampOrder { index: 2, .. }));

        let err = segments_from_labels(&[0.0, f64::NAN], &[0, 0]).unwrap_err();
        assert!(matches!(err, ClusterError::TimestampOrder { index: 1, .. }));
    }

    #[test]
    fn test_length_mismatch() {
        let err = segments_from_labels(&[0.0], &[0, 1]).unwrap_err();
        assert!(matches!(
            err,
            ClusterError::LengthMismatch {
                labels: 2,
                timestamps: 1
            }
        ));
    }

    #[test]
    fn test_timeline_keeps_positions() {
        // Positions listed in time order, not position order.
        let timeline = [
            TimedLabel {
                position: 3,
                timestamp: 0.0,
                label: 1,
            },
            TimedLabel {
                position: 0,
                timestamp: 0.5,
                label: 1,
            },
            TimedLabel {
                position: 2,
                timestamp: 1.0,
                label: 0,
            },
        ];
        let segments = reconstruct_segments(&timeline).unwrap();
        assert_eq!(segments[0].frame_indices, vec![3, 0]);
        assert_eq!(segments[1].frame_indices, vec![2]);
    }
}
