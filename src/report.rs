//! Progress and summary reporting.
//!
//! Reports are the tool's primary output and go to stdout. The batch
//! logger is a seam so tests can run the explorer silently.

use std::time::Duration;

use crate::explore::ExploreSummary;
use crate::stats::StatsSnapshot;

/// Process memory usage in kilobytes.
#[derive(Debug, Clone, Copy)]
pub struct MemInfo {
    pub virtual_kb: u64,
    pub resident_kb: u64,
}

#[cfg(target_os = "linux")]
fn parse_kb(rest: &str) -> Option<u64> {
    rest.trim().trim_end_matches("kB").trim().parse().ok()
}

/// Snapshot of the process's virtual and resident size.
#[cfg(target_os = "linux")]
#[must_use]
pub fn memory_info() -> Option<MemInfo> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let mut virtual_kb = None;
    let mut resident_kb = None;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmSize:") {
            virtual_kb = parse_kb(rest);
        } else if let Some(rest) = line.strip_prefix("VmRSS:") {
            resident_kb = parse_kb(rest);
        }
    }
    Some(MemInfo {
        virtual_kb: virtual_kb?,
        resident_kb: resident_kb?,
    })
}

#[cfg(not(target_os = "linux"))]
#[must_use]
pub fn memory_info() -> Option<MemInfo> {
    None
}

/// Everything known about one finished batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// 1-based batch counter
    pub index: usize,
    /// Progress partition this batch processed
    pub partition: u16,
    /// Piece count encoded in the partition
    pub piece_count: u16,
    /// Pawn progress encoded in the partition
    pub pawn_progress: u16,
    /// Keys the batch started from
    pub batch_keys: u64,
    /// Keys still queued across all future partitions
    pub pending: u64,
    /// Memory snapshot, if available on this platform
    pub memory: Option<MemInfo>,
    /// Newly visited positions per ply, this batch
    pub batch_counts: Vec<u64>,
    /// Newly visited positions per ply, whole run so far
    pub cumulative_counts: Vec<u64>,
    /// Batch counters
    pub stats: StatsSnapshot,
    pub batch_elapsed: Duration,
    pub total_elapsed: Duration,
}

/// Sink for per-batch progress.
pub trait BatchLogger: Sync {
    fn batch(&self, report: &BatchReport);
}

/// Rate helper, rounded down, zero when no time has passed.
#[must_use]
pub fn per_second(count: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (count as f64 / secs) as u64
    } else {
        0
    }
}

/// Default logger printing one block per batch.
pub struct StdoutReporter;

impl BatchLogger for StdoutReporter {
    fn batch(&self, report: &BatchReport) {
        println!(
            "iteration {:>5}  partition {:>4}  pieces {:>2}  pawn progress {:>2}",
            report.index, report.partition, report.piece_count, report.pawn_progress
        );
        println!(
            "  batch keys {:>12}  pending {:>12}",
            report.batch_keys, report.pending
        );
        if let Some(mem) = report.memory {
            println!(
                "  memory (MB): virtual {:>8}  resident {:>8}",
                mem.virtual_kb / 1024,
                mem.resident_kb / 1024
            );
        }
        println!("  {:>4}   {:>12} {:>12}", "ply", "batch", "cumulative");
        for (ply, &count) in report.batch_counts.iter().enumerate() {
            let total = report.cumulative_counts.get(ply).copied().unwrap_or(0);
            if count == 0 && total == 0 {
                continue;
            }
            println!("  {ply:>4} : {count:>12} {total:>12}");
        }
        let elapsed = report.batch_elapsed;
        println!(
            "  time {:>8.3}s (total {:>8.3}s)  gets/s {:>9}  hits/s {:>9}  nodes/s {:>9}  assigned/s {:>9}",
            elapsed.as_secs_f64(),
            report.total_elapsed.as_secs_f64(),
            per_second(report.stats.gets, elapsed),
            per_second(report.stats.hits, elapsed),
            per_second(report.stats.nodes, elapsed),
            per_second(report.stats.assigned, elapsed),
        );
    }
}

/// Logger that discards batch reports, for tests and per-move sub-runs.
pub struct QuietReporter;

impl BatchLogger for QuietReporter {
    fn batch(&self, _report: &BatchReport) {}
}

/// Print the end-of-run debrief.
pub fn print_summary(summary: &ExploreSummary) {
    println!("Done!");
    println!("  Total number of DB gets: {}", summary.totals.gets);
    println!("  Total number of DB hits: {}", summary.totals.hits);
    println!("  Nodes processed: {}", summary.totals.nodes);
    println!("  Batches: {}", summary.batches);
    println!("  Duration (sec): {:.3}", summary.elapsed.as_secs_f64());
    println!(
        "  DB gets per second: {}",
        per_second(summary.totals.gets, summary.elapsed)
    );
    println!(
        "Number of db positions reachable from fen: {}",
        summary.totals.assigned
    );
    println!("Detailed stats:");
    println!("{:>4}     {:>12} {:>12}", "ply", "count", "cumulative");
    let mut total = 0u64;
    for (ply, &count) in summary.ply_counts.iter().enumerate() {
        total += count;
        println!("{ply:>4} : {count:>12} {total:>12}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_second() {
        assert_eq!(per_second(1000, Duration::from_secs(2)), 500);
        assert_eq!(per_second(1000, Duration::ZERO), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_memory_info_reads_proc() {
        let info = memory_info().expect("proc status readable");
        assert!(info.virtual_kb > 0);
        assert!(info.resident_kb > 0);
    }
}
