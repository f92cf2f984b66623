use crate::counter::{Counter, StatsRecord};
use crate::error::{Result, StatsError};
use crate::layout::SHARD_COUNT;
use crate::lock::{LockOutcome, StatsLock};
use crate::util::{open_unique_tmp_file, remove_file_best_effort};
use std::io::Write as _;
use std::path::Path;
use std::time::Duration;

/// Whole-cache default size quota in KiB (1 GiB), split evenly across the
/// shards when a record has to be synthesized.
pub const DEFAULT_MAX_SIZE_KIB: u64 = 1024 * 1024;

fn apply_defaults(record: &mut StatsRecord) {
    record[Counter::MaxSizeKib] += DEFAULT_MAX_SIZE_KIB / SHARD_COUNT as u64;
}

/// Read the record at `path` additively onto `record`.
///
/// A missing, unreadable, or empty file contributes defaults instead; this is
/// never an error. Takes no lock, so a reader may observe a record mid-update
/// (the atomic rename on the write side keeps any observed record internally
/// consistent).
pub(crate) fn read_onto(path: &Path, record: &mut StatsRecord) {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(
                    target = "kiln.stats",
                    path = %path.display(),
                    error = %err,
                    "failed to read stats record"
                );
            }
            apply_defaults(record);
            return;
        }
    };

    if record.decode_onto(&text) == 0 {
        apply_defaults(record);
    }
}

/// Read one record without side effects, filling defaults for anything the
/// file does not provide.
pub fn read_record(path: &Path) -> StatsRecord {
    let mut record = StatsRecord::default();
    read_onto(path, &mut record);
    record
}

/// Persist `record` at `path` via a uniquely-named temp file and an atomic
/// rename, so a concurrent reader never observes a partial write.
///
/// Returns `Ok(false)` when the temp file cannot be opened (the update is
/// logged and abandoned; the caller's cache operation must not fail over
/// bookkeeping). A write failure on the opened temp file is surfaced as
/// [`StatsError::WriteRecord`]: ignoring it would mean silent, undetectable
/// loss of accounting data.
pub(crate) fn write_record(path: &Path, record: &StatsRecord) -> Result<bool> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let (tmp_path, mut file) = match open_unique_tmp_file(path, parent) {
        Ok(opened) => opened,
        Err(err) => {
            tracing::warn!(
                target = "kiln.stats",
                path = %path.display(),
                error = %err,
                "failed to open temp file for stats record"
            );
            return Ok(false);
        }
    };

    let write_result = (|| {
        file.write_all(record.encode().as_bytes())?;
        file.sync_all()
    })();
    if let Err(err) = write_result {
        drop(file);
        remove_file_best_effort(&tmp_path, "write_record.write_failed");
        return Err(StatsError::WriteRecord {
            path: path.to_path_buf(),
            source: err,
        });
    }
    drop(file);

    if let Err(err) = std::fs::rename(&tmp_path, path) {
        remove_file_best_effort(&tmp_path, "write_record.rename_failed");
        return Err(StatsError::WriteRecord {
            path: path.to_path_buf(),
            source: err,
        });
    }

    Ok(true)
}

/// Merge `delta` into the record at `path` under that record's lock and
/// return the merged result.
///
/// Returns `Ok(None)` when the update was abandoned without harm: the lock
/// timed out, or the temp file could not be opened.
pub fn merge_update(
    path: &Path,
    delta: &StatsRecord,
    staleness_limit: Duration,
) -> Result<Option<StatsRecord>> {
    let _lock = match StatsLock::acquire(path, staleness_limit) {
        LockOutcome::Acquired(lock) => lock,
        LockOutcome::TimedOut => return Ok(None),
    };

    let mut record = read_record(path);
    record.merge(delta);

    if write_record(path, &record)? {
        Ok(Some(record))
    } else {
        Ok(None)
    }
}

/// Replace the named slots of the record at `path`, under lock, leaving every
/// other slot as loaded (or defaulted).
///
/// Returns `Ok(false)` when the update was abandoned (contention or temp-file
/// open failure).
pub fn overwrite_fields(
    path: &Path,
    fields: &[(Counter, u64)],
    staleness_limit: Duration,
) -> Result<bool> {
    let _lock = match StatsLock::acquire(path, staleness_limit) {
        LockOutcome::Acquired(lock) => lock,
        LockOutcome::TimedOut => return Ok(false),
    };

    let mut record = read_record(path);
    for &(counter, value) in fields {
        record[counter] = value;
    }

    write_record(path, &record)
}
