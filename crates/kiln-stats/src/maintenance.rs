use crate::counter::Counter;
use crate::error::{Result, StatsError};
use crate::layout::{CacheLayout, ShardId, SHARD_COUNT};
use crate::lock::{LockOutcome, StatsLock};
use crate::persist::{overwrite_fields, read_record, write_record};
use crate::util::remove_file_best_effort;
use std::path::Path;
use std::time::Duration;

/// Zero every historical event counter across all shards.
///
/// The global record file is deleted outright. Each shard record is rewritten
/// under its lock with the event counters cleared; counters describing current
/// or desired state (file count, size, limits) survive. A shard whose lock
/// cannot be acquired is skipped.
pub fn zero_all(layout: &CacheLayout) -> Result<()> {
    remove_file_best_effort(&layout.root_record_path(), "zero_all.root_record");

    for shard in ShardId::all() {
        let path = layout.shard_record_path(shard);
        let lock = match StatsLock::acquire(&path, layout.lock_staleness()) {
            LockOutcome::Acquired(lock) => lock,
            LockOutcome::TimedOut => continue,
        };

        let mut record = read_record(&path);
        for kind in Counter::ALL {
            if !kind.survives_zero() {
                record[kind] = 0;
            }
        }

        write_record(&path, &record)?;
        drop(lock);
    }

    Ok(())
}

/// Distribute new whole-cache limits across every shard's record.
///
/// `None` leaves the corresponding limit unchanged; a set value is divided by
/// 16 (rounding down) before being written into each shard. The cache root
/// and every shard directory are created first; a directory-creation failure
/// aborts the whole operation, since limits cannot be set safely without a
/// guaranteed directory. Lock contention on an individual shard skips that
/// shard only.
pub fn set_limits(
    layout: &CacheLayout,
    max_files: Option<u64>,
    max_size_kib: Option<u64>,
) -> Result<()> {
    let per_shard_files = max_files.map(|v| v / SHARD_COUNT as u64);
    let per_shard_size = max_size_kib.map(|v| v / SHARD_COUNT as u64);

    create_dir(layout.root())?;

    for shard in ShardId::all() {
        let shard_dir = layout.shard_dir(shard);
        create_dir(&shard_dir)?;

        let mut fields = Vec::with_capacity(2);
        if let Some(files) = per_shard_files {
            fields.push((Counter::MaxFiles, files));
        }
        if let Some(size) = per_shard_size {
            fields.push((Counter::MaxSizeKib, size));
        }

        overwrite_fields(
            &layout.shard_record_path(shard),
            &fields,
            layout.lock_staleness(),
        )?;
    }

    Ok(())
}

/// Overwrite one shard's file-count and total-size counters.
///
/// Used after a full rescan of a shard directory has recounted its actual
/// contents; unlike a flush this replaces rather than adds. Contention skips
/// the update silently.
pub fn set_sizes(
    shard_dir: &Path,
    num_files: u64,
    total_size_kib: u64,
    staleness_limit: Duration,
) -> Result<()> {
    if let Err(err) = std::fs::create_dir_all(shard_dir) {
        tracing::debug!(
            target = "kiln.stats",
            shard_dir = %shard_dir.display(),
            error = %err,
            "failed to create shard directory for size rewrite"
        );
    }

    overwrite_fields(
        &shard_dir.join("stats"),
        &[
            (Counter::FilesInCache, num_files),
            (Counter::CacheSizeKib, total_size_kib),
        ],
        staleness_limit,
    )?;
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| StatsError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
