//! Progress-partitioned parallel exploration.
//!
//! The scheduler walks partitions in strictly decreasing progress order.
//! Within a batch it expands one depth layer at a time, fanning the
//! layer's shards across worker threads and joining before the next
//! layer. The join is load-bearing: successors inserted at depth `d - 1`
//! during step `d` must all be visible when step `d - 1` starts. Because
//! every cross-partition successor has a strictly smaller partition, a
//! batch never feeds work back into itself or into an earlier batch, and
//! the visited set can be dropped wholesale when the batch ends.

mod expand;
pub(crate) mod unseen;

use std::mem;
use std::thread;
use std::time::{Duration, Instant};

use shakmaty::{CastlingMode, Chess, Position};

use crate::db::OpeningDb;
use crate::error::ExploreError;
use crate::explore::expand::{expand_shard, ExpandContext};
use crate::explore::unseen::UnseenTracker;
use crate::fen::epd_string;
use crate::packed::{encode, PackedKey};
use crate::progress::{
    partition_pawn_progress, partition_piece_count, progress_index, PARTITIONS,
};
use crate::report::{memory_info, BatchLogger, BatchReport, StdoutReporter};
use crate::shard::{ShardedDepthMap, ShardedSet};
use crate::stats::{ExploreStats, StatsSnapshot};

/// Pending work, one depth map per progress partition.
///
/// The scheduler owns the array and moves a partition's map out when it
/// reaches it; workers concurrently upsert into strictly smaller
/// partitions through their shard locks.
pub(crate) struct WorkQueue {
    partitions: Vec<ShardedDepthMap>,
}

impl WorkQueue {
    fn new() -> Self {
        WorkQueue {
            partitions: (0..PARTITIONS).map(|_| ShardedDepthMap::new()).collect(),
        }
    }

    /// Queue a key into its partition, keeping the larger depth budget.
    pub(crate) fn upsert_max(&self, partition: u16, key: PackedKey, depth: i16) {
        self.partitions[partition as usize].upsert_max(key, depth);
    }

    fn take(&mut self, partition: usize) -> ShardedDepthMap {
        mem::take(&mut self.partitions[partition])
    }

    fn is_partition_empty(&self, partition: usize) -> bool {
        self.partitions[partition].is_empty()
    }

    fn pending_total(&self) -> u64 {
        self.partitions.iter().map(|map| map.len() as u64).sum()
    }
}

/// Knobs for one exploration run.
#[derive(Clone, Debug)]
pub struct ExploreConfig {
    /// Maximum ply depth from the seed
    pub depth: i16,
    /// Prune moves scored more than this below the best move
    pub max_cp_loss: i32,
    /// Worker threads per depth step
    pub threads: usize,
    /// Track positions with database-known but unlisted successors
    pub find_unseen: bool,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        ExploreConfig {
            depth: 8,
            max_cp_loss: i32::MAX,
            threads: default_thread_count(),
            find_unseen: false,
        }
    }
}

/// One worker per logical core unless overridden.
#[must_use]
pub fn default_thread_count() -> usize {
    thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

impl ExploreConfig {
    /// Set max depth
    #[must_use]
    pub fn depth(mut self, depth: i16) -> Self {
        self.depth = depth.max(0);
        self
    }

    /// Set the centipawn-loss pruning threshold
    #[must_use]
    pub fn max_cp_loss(mut self, max_cp_loss: i32) -> Self {
        self.max_cp_loss = max_cp_loss;
        self
    }

    /// Set worker thread count
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Enable unseen-edge tracking
    #[must_use]
    pub fn find_unseen(mut self, enabled: bool) -> Self {
        self.find_unseen = enabled;
        self
    }
}

/// Results of a completed run.
#[derive(Debug, Clone)]
pub struct ExploreSummary {
    /// Counter totals across all batches
    pub totals: StatsSnapshot,
    /// Newly visited positions per ply from the seed
    pub ply_counts: Vec<u64>,
    /// Number of non-empty partitions processed
    pub batches: usize,
    pub elapsed: Duration,
    /// Unseen-edge records, key-sorted; empty unless tracking was on
    pub unseen: Vec<(PackedKey, u32)>,
}

impl ExploreSummary {
    /// Distinct database positions visited.
    #[must_use]
    pub fn total_assigned(&self) -> u64 {
        self.totals.assigned
    }
}

/// Outcome of one sub-run in independent first-move mode.
#[derive(Debug, Clone)]
pub struct FirstMoveRun {
    /// The first move explored, in UCI form
    pub uci: String,
    /// The sub-run's results, absent when the successor is not in the
    /// database
    pub summary: Option<ExploreSummary>,
}

/// The progress-partitioned explorer.
pub struct Explorer<'a> {
    db: &'a dyn OpeningDb,
    config: ExploreConfig,
    reporter: &'a dyn BatchLogger,
}

impl<'a> Explorer<'a> {
    #[must_use]
    pub fn new(db: &'a dyn OpeningDb, config: ExploreConfig) -> Self {
        Explorer {
            db,
            config,
            reporter: &StdoutReporter,
        }
    }

    /// Replace the per-batch progress sink.
    #[must_use]
    pub fn with_reporter(mut self, reporter: &'a dyn BatchLogger) -> Self {
        self.reporter = reporter;
        self
    }

    /// Explore everything reachable from `seed` under the configured
    /// depth and pruning threshold.
    pub fn run(&self, seed: &Chess) -> Result<ExploreSummary, ExploreError> {
        let depth = self.config.depth.max(0);
        let t_start = Instant::now();

        let mut totals = StatsSnapshot::default();
        totals.gets += 1;
        let seed_probe = self.db.probe(&epd_string(seed))?;
        if !seed_probe.in_db() {
            return Err(ExploreError::SeedNotInDb);
        }
        totals.hits += 1;

        let mut queue = WorkQueue::new();
        queue.upsert_max(progress_index(seed), encode(seed), depth);

        let stats = ExploreStats::new();
        let tracker = UnseenTracker::new();
        let mut cumulative = vec![0u64; depth as usize + 1];
        let mut batches = 0usize;

        for partition in (0..PARTITIONS).rev() {
            if queue.is_partition_empty(partition) {
                continue;
            }

            let mut batch_work = queue.take(partition);
            batches += 1;
            stats.reset();
            let batch_start = Instant::now();

            let visited = ShardedSet::new();
            let mut buckets: Vec<ShardedSet> =
                (0..=depth).map(|_| ShardedSet::new()).collect();
            let entries = batch_work.take_entries();
            let batch_keys = entries.len() as u64;
            for (key, d) in entries {
                buckets[d.max(0) as usize].insert_if_absent(key);
            }

            let mut batch_counts = vec![0u64; depth as usize + 1];
            self.run_depth_layers(
                partition as u16,
                depth,
                &mut buckets,
                &visited,
                &queue,
                &stats,
                &tracker,
                &mut batch_counts,
            )?;

            let snapshot = stats.snapshot();
            totals.accumulate(snapshot);
            for (ply, count) in batch_counts.iter().enumerate() {
                cumulative[ply] += count;
            }

            self.reporter.batch(&BatchReport {
                index: batches,
                partition: partition as u16,
                piece_count: partition_piece_count(partition as u16),
                pawn_progress: partition_pawn_progress(partition as u16),
                batch_keys,
                pending: queue.pending_total(),
                memory: memory_info(),
                batch_counts,
                cumulative_counts: cumulative.clone(),
                stats: snapshot,
                batch_elapsed: batch_start.elapsed(),
                total_elapsed: t_start.elapsed(),
            });
        }

        Ok(ExploreSummary {
            totals,
            ply_counts: cumulative,
            batches,
            elapsed: t_start.elapsed(),
            unseen: tracker.into_entries(),
        })
    }

    /// Run one independent exploration per legal first move of `seed`.
    ///
    /// The sub-runs share no visited state, so a position reachable from
    /// two first moves is counted once per move; per-move totals must not
    /// be summed to estimate the full tree. First moves whose successor
    /// is not in the database are reported without a summary.
    pub fn run_independent_first_moves(
        &self,
        seed: &Chess,
    ) -> Result<Vec<FirstMoveRun>, ExploreError> {
        let mut runs = Vec::new();
        for mv in seed.legal_moves() {
            let uci = mv.to_uci(CastlingMode::Standard).to_string();
            let mut child = seed.clone();
            child.play_unchecked(&mv);

            let summary = match self.run(&child) {
                Ok(summary) => Some(summary),
                Err(ExploreError::SeedNotInDb) => None,
                Err(err) => return Err(err),
            };
            runs.push(FirstMoveRun { uci, summary });
        }
        Ok(runs)
    }

    /// Run the depth layers of one batch, highest remaining depth first,
    /// with a full join between layers.
    #[allow(clippy::too_many_arguments)]
    fn run_depth_layers(
        &self,
        partition: u16,
        depth: i16,
        buckets: &mut [ShardedSet],
        visited: &ShardedSet,
        queue: &WorkQueue,
        stats: &ExploreStats,
        tracker: &UnseenTracker,
        batch_counts: &mut [u64],
    ) -> Result<(), ExploreError> {
        for d in (0..=depth).rev() {
            let current = mem::take(&mut buckets[d as usize]);
            if current.is_empty() {
                continue;
            }
            let shard_lists = current.into_shards();

            let ctx = ExpandContext {
                db: self.db,
                visited,
                next_bucket: if d > 0 { Some(&buckets[d as usize - 1]) } else { None },
                future: queue,
                partition,
                depth: d,
                max_cp_loss: self.config.max_cp_loss,
                stats,
                unseen: self.config.find_unseen.then_some(tracker),
            };

            let before = visited.len() as u64;
            let threads = self.config.threads.max(1).min(shard_lists.len());
            let chunk_size = shard_lists.len().div_ceil(threads);

            let mut first_error: Option<ExploreError> = None;
            thread::scope(|scope| {
                let mut handles = Vec::with_capacity(threads);
                for (worker_id, chunk) in shard_lists.chunks(chunk_size).enumerate() {
                    let ctx = &ctx;
                    let handle = thread::Builder::new()
                        .name(format!("expand-{worker_id}"))
                        .spawn_scoped(scope, move || -> Result<(), ExploreError> {
                            for shard in chunk {
                                expand_shard(ctx, shard)?;
                            }
                            Ok(())
                        })
                        .expect("failed to spawn expander worker");
                    handles.push(handle);
                }

                for handle in handles {
                    match handle.join() {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => {
                            if first_error.is_none() {
                                first_error = Some(err);
                            }
                        }
                        Err(payload) => std::panic::resume_unwind(payload),
                    }
                }
            });
            if let Some(err) = first_error {
                return Err(err);
            }

            batch_counts[(depth - d) as usize] = visited.len() as u64 - before;
        }
        Ok(())
    }
}
