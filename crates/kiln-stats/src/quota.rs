use crate::counter::{Counter, StatsRecord};
use std::path::Path;

/// External eviction routine invoked when a shard exceeds its quotas.
///
/// Invocation is fire-and-forget: this subsystem decides *whether* eviction
/// is warranted, never *what* to evict, and does not re-check the outcome.
pub trait CleanupHook {
    fn clean_shard(&self, shard_dir: &Path, max_files: u64, max_size_kib: u64);
}

/// A hook that does nothing, for callers that only want the counters updated.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCleanup;

impl CleanupHook for NoCleanup {
    fn clean_shard(&self, _shard_dir: &Path, _max_files: u64, _max_size_kib: u64) {}
}

/// Compare a freshly-merged shard record against its limits and trigger
/// cleanup when either is exceeded. A zero limit means "no quota" and never
/// triggers, regardless of the counter's value.
pub(crate) fn evaluate(record: &StatsRecord, shard_dir: &Path, hook: &dyn CleanupHook) {
    let max_files = record[Counter::MaxFiles];
    let max_size_kib = record[Counter::MaxSizeKib];

    let over_files = max_files != 0 && record[Counter::FilesInCache] > max_files;
    let over_size = max_size_kib != 0 && record[Counter::CacheSizeKib] > max_size_kib;
    if !over_files && !over_size {
        return;
    }

    tracing::debug!(
        target = "kiln.stats",
        shard_dir = %shard_dir.display(),
        files = record[Counter::FilesInCache],
        max_files,
        size_kib = record[Counter::CacheSizeKib],
        max_size_kib,
        "shard over quota, triggering cleanup"
    );
    hook.clean_shard(shard_dir, max_files, max_size_kib);
}
