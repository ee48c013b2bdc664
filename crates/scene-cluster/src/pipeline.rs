//! End-to-end clustering run.
//!
//! ingest -> distance matrix -> density clustering -> segments. Each stage
//! finishes before the next starts; the first failure aborts the run and
//! is reported with its stage.

use std::collections::HashMap;
use std::time::Instant;

use scene_store::{StoreSession, VectorStore};
use scene_types::{ClusterConfig, FrameRecord, ItemId, QueryBatch, Segment, SegmentSummary};
use tracing::{info, instrument};

use crate::density::{ClusterLabels, DensityClusterer, Hdbscan, HdbscanParams};
use crate::error::{ClusterError, PipelineError, Stage};
use crate::ingest::{NeighborGraph, NeighborIngestor, Population};
use crate::matrix::MatrixBuilder;
use crate::segments::{reconstruct_segments, TimedLabel};

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    /// Ingested items; labels are indexed by population position
    pub population: Population,
    pub labels: ClusterLabels,
    /// Frame record of each population position
    pub frames: Vec<FrameRecord>,
    /// Segments in ascending start time
    pub segments: Vec<Segment>,
    pub summary: SegmentSummary,
}

impl ClusterOutcome {
    pub fn cluster_count(&self) -> usize {
        self.labels.cluster_count()
    }

    /// Label assigned to an item.
    pub fn label_of(&self, id: ItemId) -> Option<i32> {
        self.population
            .index_of(id)
            .map(|position| self.labels.as_slice()[position])
    }
}

/// Clustering pipeline with a fixed configuration.
#[derive(Debug, Clone)]
pub struct ClusterPipeline<C: DensityClusterer = Hdbscan> {
    config: ClusterConfig,
    matrix: MatrixBuilder,
    clusterer: C,
}

impl ClusterPipeline<Hdbscan> {
    /// Create a pipeline using HDBSCAN with the configured parameters.
    pub fn new(config: ClusterConfig) -> Result<Self, ClusterError> {
        config.validate().map_err(ClusterError::Config)?;
        let clusterer = Hdbscan::new(HdbscanParams::from(&config))?;
        Self::with_clusterer(config, clusterer)
    }
}

impl<C: DensityClusterer> ClusterPipeline<C> {
    /// Create a pipeline with a custom clusterer.
    pub fn with_clusterer(config: ClusterConfig, clusterer: C) -> Result<Self, ClusterError> {
        config.validate().map_err(ClusterError::Config)?;
        let matrix = MatrixBuilder::new(config.unreachable_distance, config.max_matrix_bytes)?;
        Ok(Self {
            config,
            matrix,
            clusterer,
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Run over already-queried batches.
    #[instrument(skip(self, batches, frames), fields(clusterer = self.clusterer.name()))]
    pub fn run<I>(&self, batches: I, frames: &[FrameRecord]) -> Result<ClusterOutcome, PipelineError>
    where
        I: IntoIterator<Item = QueryBatch>,
    {
        let graph = self.ingest(batches.into_iter().map(Ok))?;
        self.cluster_graph(graph, frames)
    }

    /// Run over every item of a store session, querying it in batches.
    #[instrument(skip(self, session, frames), fields(clusterer = self.clusterer.name()))]
    pub fn run_from_store<S: VectorStore>(
        &self,
        session: &StoreSession<S>,
        frames: &[FrameRecord],
    ) -> Result<ClusterOutcome, PipelineError> {
        let batches = session
            .query_batches(self.config.batch_size, self.config.neighbor_count)
            .map_err(|e| PipelineError::new(Stage::Store, e))?;
        let graph =
            self.ingest(batches.map(|batch| batch.map_err(|e| PipelineError::new(Stage::Store, e))))?;
        self.cluster_graph(graph, frames)
    }

    /// Run on the blocking thread pool.
    pub async fn run_on_worker(
        self,
        batches: Vec<QueryBatch>,
        frames: Vec<FrameRecord>,
    ) -> Result<ClusterOutcome, PipelineError>
    where
        C: 'static,
    {
        tokio::task::spawn_blocking(move || self.run(batches, &frames))
            .await
            .map_err(|e| {
                PipelineError::new(
                    Stage::Clustering,
                    ClusterError::Algorithm(format!("Task error: {}", e)),
                )
            })?
    }

    fn ingest<I>(&self, batches: I) -> Result<NeighborGraph, PipelineError>
    where
        I: Iterator<Item = Result<QueryBatch, PipelineError>>,
    {
        let at_ingest = |e: ClusterError| PipelineError::new(Stage::Ingest, e);
        let mut ingestor = NeighborIngestor::new(self.config.neighbor_count).map_err(at_ingest)?;
        for batch in batches {
            ingestor.ingest_batch(&batch?).map_err(at_ingest)?;
        }
        ingestor.finish().map_err(at_ingest)
    }

    fn cluster_graph(
        &self,
        graph: NeighborGraph,
        frames: &[FrameRecord],
    ) -> Result<ClusterOutcome, PipelineError> {
        let started = Instant::now();

        let matrix = self
            .matrix
            .build_graph(&graph)
            .map_err(|e| PipelineError::new(Stage::Matrix, e))?;
        let labels = self
            .clusterer
            .fit_predict(&matrix)
            .map_err(|e| PipelineError::new(Stage::Clustering, e))?;
        drop(matrix);

        let population = graph.into_population();
        let at_segments = |e: ClusterError| PipelineError::new(Stage::Segments, e);
        let frames = align_frames(&population, frames).map_err(at_segments)?;
        let segments = build_timeline(&frames, &labels)
            .and_then(|timeline| reconstruct_segments(&timeline))
            .map_err(at_segments)?;
        let summary = SegmentSummary::from_labels(labels.as_slice(), &segments);

        info!(
            items = population.len(),
            clusters = summary.cluster_count,
            segments = summary.segment_count,
            noise = summary.noise_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Clustering run complete"
        );

        Ok(ClusterOutcome {
            population,
            labels,
            frames,
            segments,
            summary,
        })
    }
}

/// Frame record of every population position.
///
/// Frames must come in non-decreasing timestamp order with unique ids;
/// records for ids outside the population are ignored.
fn align_frames(
    population: &Population,
    frames: &[FrameRecord],
) -> Result<Vec<FrameRecord>, ClusterError> {
    let mut by_id: HashMap<ItemId, FrameRecord> = HashMap::with_capacity(frames.len());
    let mut previous = f64::NEG_INFINITY;
    for (index, frame) in frames.iter().enumerate() {
        if frame.timestamp.is_nan() || frame.timestamp < previous {
            return Err(ClusterError::TimestampOrder {
                index,
                previous,
                current: frame.timestamp,
            });
        }
        previous = frame.timestamp;
        if by_id.insert(frame.id, *frame).is_some() {
            return Err(ClusterError::DuplicateFrame(frame.id));
        }
    }

    population
        .ids()
        .iter()
        .map(|id| by_id.get(id).copied().ok_or(ClusterError::MissingFrame(*id)))
        .collect()
}

/// Attach timestamps to labelled positions and order them by
/// `(timestamp, position)`.
fn build_timeline(
    frames: &[FrameRecord],
    labels: &ClusterLabels,
) -> Result<Vec<TimedLabel>, ClusterError> {
    if labels.len() != frames.len() {
        return Err(ClusterError::LengthMismatch {
            labels: labels.len(),
            timestamps: frames.len(),
        });
    }

    let mut timeline: Vec<TimedLabel> = frames
        .iter()
        .zip(labels.as_slice())
        .enumerate()
        .map(|(position, (frame, &label))| TimedLabel {
            position,
            timestamp: frame.timestamp,
            label,
        })
        .collect();

    timeline.sort_by(|a, b| {
        a.timestamp
            .total_cmp(&b.timestamp)
            .then(a.position.cmp(&b.position))
    });
    Ok(timeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_types::Neighbor;

    fn batch(ids: &[ItemId], lists: Vec<Vec<(ItemId, f64)>>) -> QueryBatch {
        QueryBatch::new(
            ids.to_vec(),
            lists
                .into_iter()
                .map(|list| list.into_iter().map(|(id, d)| Neighbor::new(id, d)).collect())
                .collect(),
        )
    }

    fn frames(ids: &[ItemId]) -> Vec<FrameRecord> {
        ids.iter()
            .enumerate()
            .map(|(i, &id)| FrameRecord::new(id, i as u64, i as f64))
            .collect()
    }

    /// Every item only sees itself.
    fn isolated_batches(ids: &[ItemId]) -> Vec<QueryBatch> {
        vec![batch(
            ids,
            ids.iter().map(|&id| vec![(id, 0.0)]).collect(),
        )]
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ClusterConfig::default().with_min_cluster_size(1);
        assert!(matches!(
            ClusterPipeline::new(config),
            Err(ClusterError::Config(_))
        ));
    }

    #[test]
    fn test_stage_reported_on_failure() {
        let pipeline = ClusterPipeline::new(ClusterConfig::default()).unwrap();

        let err = pipeline.run(Vec::new(), &[]).unwrap_err();
        assert_eq!(err.stage, Stage::Ingest);

        let bad_edge = vec![batch(&[1], vec![vec![(2, 0.5)]])];
        let err = pipeline.run(bad_edge, &frames(&[1])).unwrap_err();
        assert_eq!(err.stage, Stage::Matrix);
        assert!(matches!(
            err.source,
            ClusterError::UnknownNeighbor { from: 1, to: 2 }
        ));

        let err = pipeline
            .run(isolated_batches(&[1, 2]), &frames(&[1]))
            .unwrap_err();
        assert_eq!(err.stage, Stage::Segments);
        assert!(matches!(err.source, ClusterError::MissingFrame(2)));
    }

    #[test]
    fn test_frames_must_be_ordered_and_unique() {
        let pipeline = ClusterPipeline::new(ClusterConfig::default()).unwrap();
        let out_of_order = vec![FrameRecord::new(1, 0, 1.0), FrameRecord::new(2, 1, 0.5)];
        let err = pipeline
            .run(isolated_batches(&[1, 2]), &out_of_order)
            .unwrap_err();
        assert!(matches!(
            err.source,
            ClusterError::TimestampOrder { index: 1, .. }
        ));

        let duplicated = vec![FrameRecord::new(1, 0, 0.0), FrameRecord::new(1, 1, 1.0)];
        let err = pipeline
            .run(isolated_batches(&[1]), &duplicated)
            .unwrap_err();
        assert!(matches!(err.source, ClusterError::DuplicateFrame(1)));
    }

    #[test]
    fn test_isolated_items_are_noise() {
        let pipeline = ClusterPipeline::new(
            ClusterConfig::default()
                .with_min_samples(1)
                .with_min_cluster_size(2),
        )
        .unwrap();
        let ids = [4, 5, 6];
        let outcome = pipeline.run(isolated_batches(&ids), &frames(&ids)).unwrap();

        assert_eq!(outcome.labels.as_slice(), &[-1, -1, -1]);
        assert!(outcome.segments.is_empty());
        assert_eq!(outcome.summary.noise_count, 3);
        assert_eq!(outcome.label_of(5), Some(-1));
        assert_eq!(outcome.label_of(9), None);
        assert_eq!(outcome.frames, frames(&ids));
    }

    #[test]
    fn test_timeline_orders_by_timestamp_then_position() {
        let population = Population::from_ids([10, 20, 30]).unwrap();
        let labels = ClusterLabels::new(vec![0, 0, 1]);
        let records = vec![
            FrameRecord::new(30, 0, 0.0),
            FrameRecord::new(20, 1, 1.0),
            FrameRecord::new(10, 2, 1.0),
        ];
        let aligned = align_frames(&population, &records).unwrap();
        let frame_indices: Vec<u64> = aligned.iter().map(|f| f.frame_index).collect();
        assert_eq!(frame_indices, vec![2, 1, 0]);

        let timeline = build_timeline(&aligned, &labels).unwrap();
        let positions: Vec<usize> = timeline.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![2, 0, 1]);
    }

    #[tokio::test]
    async fn test_run_on_worker() {
        let pipeline = ClusterPipeline::new(
            ClusterConfig::default()
                .with_min_samples(1)
                .with_min_cluster_size(2),
        )
        .unwrap();
        let ids = [1, 2];
        let outcome = pipeline
            .run_on_worker(isolated_batches(&ids), frames(&ids))
            .await
            .unwrap();
        assert_eq!(outcome.labels.len(), 2);
    }
}
