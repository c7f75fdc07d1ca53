//! Shared exploration counters.
//!
//! Updated by every worker with relaxed atomics; reads are eventually
//! consistent while workers run and exact at the join barriers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared across the workers of one batch.
#[derive(Debug, Default)]
pub struct ExploreStats {
    /// Keys pulled from the depth buckets
    nodes: AtomicU64,
    /// Database probes issued
    gets: AtomicU64,
    /// Probes that found the position in the database
    hits: AtomicU64,
    /// Positions newly claimed by the visited set
    assigned: AtomicU64,
}

impl ExploreStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_node(&self) {
        self.nodes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_assigned(&self) {
        self.assigned.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy out the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            nodes: self.nodes.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            assigned: self.assigned.load(Ordering::Relaxed),
        }
    }

    /// Zero all counters at the start of a batch.
    pub fn reset(&self) {
        self.nodes.store(0, Ordering::Relaxed);
        self.gets.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.assigned.store(0, Ordering::Relaxed);
    }
}

/// Plain counter values captured at a barrier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub nodes: u64,
    pub gets: u64,
    pub hits: u64,
    pub assigned: u64,
}

impl StatsSnapshot {
    /// Fold a batch snapshot into run totals.
    pub fn accumulate(&mut self, other: StatsSnapshot) {
        self.nodes += other.nodes;
        self.gets += other.gets;
        self.hits += other.hits;
        self.assigned += other.assigned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_counters_sum_across_threads() {
        let stats = ExploreStats::new();

        thread::scope(|s| {
            for _ in 0..4 {
                let stats = &stats;
                s.spawn(move || {
                    for _ in 0..1000 {
                        stats.add_node();
                        stats.add_get();
                    }
                    stats.add_hit();
                });
            }
        });

        let snap = stats.snapshot();
        assert_eq!(snap.nodes, 4000);
        assert_eq!(snap.gets, 4000);
        assert_eq!(snap.hits, 4);
        assert_eq!(snap.assigned, 0);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let stats = ExploreStats::new();
        stats.add_assigned();
        stats.add_get();
        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_accumulate_folds_batches() {
        let mut totals = StatsSnapshot::default();
        totals.accumulate(StatsSnapshot { nodes: 1, gets: 2, hits: 3, assigned: 4 });
        totals.accumulate(StatsSnapshot { nodes: 10, gets: 20, hits: 30, assigned: 40 });
        assert_eq!(totals, StatsSnapshot { nodes: 11, gets: 22, hits: 33, assigned: 44 });
    }
}
