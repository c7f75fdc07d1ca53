//! Depth-layered expansion of one batch shard.
//!
//! Workers pull packed keys from a depth bucket, probe the database and
//! route every surviving successor either into the next depth bucket of
//! the same batch (same progress partition) or into the pending work of
//! a strictly smaller partition. The progress invariant guarantees no
//! successor ever lands in a partition at or above the current one.

use shakmaty::uci::UciMove;
use shakmaty::Position;
use tracing::warn;

use crate::db::OpeningDb;
use crate::error::ExploreError;
use crate::explore::unseen::{count_unseen, UnseenTracker};
use crate::explore::WorkQueue;
use crate::fen::epd_string;
use crate::packed::{decode, encode, PackedKey};
use crate::progress::progress_index;
use crate::shard::ShardedSet;
use crate::stats::ExploreStats;

/// Everything a worker needs while expanding one depth step.
pub(crate) struct ExpandContext<'a> {
    pub db: &'a dyn OpeningDb,
    pub visited: &'a ShardedSet,
    /// Bucket for same-partition successors; absent at the leaf step
    pub next_bucket: Option<&'a ShardedSet>,
    pub future: &'a WorkQueue,
    /// Partition this batch processes
    pub partition: u16,
    /// Remaining depth at this step
    pub depth: i16,
    pub max_cp_loss: i32,
    pub stats: &'a ExploreStats,
    pub unseen: Option<&'a UnseenTracker>,
}

/// Expand every key of one shard.
pub(crate) fn expand_shard(
    ctx: &ExpandContext<'_>,
    keys: &[PackedKey],
) -> Result<(), ExploreError> {
    for &key in keys {
        expand_key(ctx, key)?;
    }
    Ok(())
}

fn expand_key(ctx: &ExpandContext<'_>, key: PackedKey) -> Result<(), ExploreError> {
    ctx.stats.add_node();
    let pos = decode(&key)?;
    let fen = epd_string(&pos);

    ctx.stats.add_get();
    let probe = ctx.db.probe(&fen)?;
    // Successors are queued without being probed, so a queued key may
    // turn out to be unknown to the database.
    if !probe.in_db() {
        return Ok(());
    }
    ctx.stats.add_hit();

    if !ctx.visited.insert_if_absent(key) {
        return Ok(());
    }
    ctx.stats.add_assigned();

    if ctx.depth == 0 {
        return Ok(());
    }

    let p1 = progress_index(&pos);
    debug_assert_eq!(p1, ctx.partition);

    if let Some(tracker) = ctx.unseen {
        let count = count_unseen(ctx.db, &pos, &probe, ctx.stats)?;
        if count > 0 {
            tracker.record(key, count);
        }
    }

    let Some(best_score) = probe.best_score() else {
        return Ok(());
    };
    if probe.moves()[0].is_null_marker() {
        warn!(%fen, "probe best entry is the null marker; pruning against its score");
    }

    for entry in probe.moves() {
        if entry.is_null_marker() {
            continue;
        }
        // Entries are sorted by descending score, so everything after the
        // first failure is pruned too.
        if best_score - entry.score > ctx.max_cp_loss {
            break;
        }

        let mv = entry
            .uci
            .parse::<UciMove>()
            .ok()
            .and_then(|uci| uci.to_move(&pos).ok())
            .ok_or_else(|| ExploreError::MoveParse {
                uci: entry.uci.clone(),
                fen: fen.clone(),
            })?;

        let mut next = pos.clone();
        next.play_unchecked(&mv);
        let p2 = progress_index(&next);
        let next_key = encode(&next);
        debug_assert!(p2 <= p1);

        if p2 == p1 {
            if let Some(bucket) = ctx.next_bucket {
                bucket.insert_if_absent(next_key);
            }
        } else {
            ctx.future.upsert_max(p2, next_key, ctx.depth - 1);
        }
    }

    Ok(())
}
