use crate::counter::{Counter, StatsRecord};
use crate::error::Result;
use crate::layout::{CacheLayout, ShardId};
use crate::persist::merge_update;
use crate::quota;
use crate::quota::CleanupHook;

/// Process-local accumulation of counter deltas for one cache operation.
///
/// The buffer is owned by the top-level operation context, incremented freely
/// during the run, and consumed by [`flush`](PendingCounters::flush) exactly
/// once before the context ends. It is never read back from disk.
#[derive(Debug, Default)]
pub struct PendingCounters {
    updates: StatsRecord,
    shard: Option<ShardId>,
}

impl PendingCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment one named counter.
    pub fn record(&mut self, kind: Counter) {
        self.record_with_size(Some(kind), 0, 0);
    }

    /// Increment a counter (when `kind` is set) and record that `files` files
    /// totalling `size_kib` KiB were added to the cache. Pass `None` for
    /// operations that change the cache footprint without corresponding to a
    /// countable event.
    pub fn record_with_size(&mut self, kind: Option<Counter>, size_kib: u64, files: u64) {
        if let Some(kind) = kind {
            self.updates[kind] += 1;
        }
        self.updates[Counter::FilesInCache] += files;
        self.updates[Counter::CacheSizeKib] += size_kib;
    }

    /// The pending (unflushed) value of one counter.
    pub fn pending(&self, kind: Counter) -> u64 {
        self.updates[kind]
    }

    /// Pin the flush target to the shard serving the operation's cache key.
    pub fn set_shard(&mut self, shard: ShardId) {
        self.shard = Some(shard);
    }

    pub fn shard(&self) -> Option<ShardId> {
        self.shard
    }

    /// Merge the buffered deltas into the target shard's record and evaluate
    /// its quotas against the merged result.
    ///
    /// Returns immediately when statistics are disabled or nothing was
    /// recorded (no I/O, no lock contention). When no shard was established
    /// during the run, one is chosen deterministically from the current pid.
    /// Lock contention and temp-file failures abandon the update silently;
    /// only an unrecoverable write error is surfaced.
    pub fn flush(self, layout: &CacheLayout, cleanup: &dyn CleanupHook) -> Result<()> {
        if layout.stats_disabled() {
            return Ok(());
        }
        if self.updates.is_zero() {
            return Ok(());
        }

        let shard = self.shard.unwrap_or_else(ShardId::for_current_process);
        let shard_dir = layout.shard_dir(shard);
        if let Err(err) = std::fs::create_dir_all(&shard_dir) {
            tracing::debug!(
                target = "kiln.stats",
                shard_dir = %shard_dir.display(),
                error = %err,
                "failed to create shard directory, dropping stats update"
            );
            return Ok(());
        }

        let path = layout.shard_record_path(shard);
        let Some(merged) = merge_update(&path, &self.updates, layout.lock_staleness())? else {
            return Ok(());
        };

        quota::evaluate(&merged, &shard_dir, cleanup);
        Ok(())
    }
}
