use kiln_stats::{
    aggregate, read_record, CacheLayout, CleanupHook, Counter, NoCleanup, PendingCounters, ShardId,
    StatsConfig, DEFAULT_MAX_SIZE_KIB, SHARD_COUNT,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

fn layout_at(root: PathBuf) -> CacheLayout {
    CacheLayout::new(StatsConfig {
        cache_root_override: Some(root),
        ..StatsConfig::default()
    })
    .unwrap()
}

#[derive(Default)]
struct RecordingCleanup {
    calls: Mutex<Vec<(PathBuf, u64, u64)>>,
}

impl CleanupHook for RecordingCleanup {
    fn clean_shard(&self, shard_dir: &Path, max_files: u64, max_size_kib: u64) {
        self.calls
            .lock()
            .unwrap()
            .push((shard_dir.to_path_buf(), max_files, max_size_kib));
    }
}

#[test]
fn flush_merges_into_target_shard_and_aggregate_sees_it() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = layout_at(tmp.path().to_path_buf());
    let shard = ShardId::from_key_hash(3);

    let mut pending = PendingCounters::new();
    pending.record_with_size(Some(Counter::Miss), 500, 1);
    pending.set_shard(shard);
    pending.flush(&layout, &NoCleanup).unwrap();

    let record = read_record(&layout.shard_record_path(shard));
    assert_eq!(record[Counter::Miss], 1);
    assert_eq!(record[Counter::CacheSizeKib], 500);
    assert_eq!(record[Counter::FilesInCache], 1);

    // The other 15 shards and the global record are missing and contribute
    // only defaults to the aggregate.
    let totals = aggregate(&layout);
    assert_eq!(totals[Counter::Miss], 1);
    assert_eq!(totals[Counter::CacheSizeKib], 500);
    assert_eq!(totals[Counter::FilesInCache], 1);
    assert_eq!(totals[Counter::MaxSizeKib], DEFAULT_MAX_SIZE_KIB);
}

#[test]
fn empty_buffer_flush_does_no_io() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = layout_at(tmp.path().join("cache"));

    PendingCounters::new().flush(&layout, &NoCleanup).unwrap();

    // Not even the cache root was created.
    assert!(!tmp.path().join("cache").exists());
}

#[test]
fn disabled_stats_flush_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = CacheLayout::new(StatsConfig {
        cache_root_override: Some(tmp.path().join("cache")),
        disabled: true,
        ..StatsConfig::default()
    })
    .unwrap();

    let mut pending = PendingCounters::new();
    pending.record(Counter::Miss);
    pending.flush(&layout, &NoCleanup).unwrap();

    assert!(!tmp.path().join("cache").exists());
}

#[test]
fn flush_without_shard_falls_back_to_pid_shard() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = layout_at(tmp.path().to_path_buf());

    let mut pending = PendingCounters::new();
    pending.record(Counter::InternalError);
    assert_eq!(pending.pending(Counter::InternalError), 1);
    pending.flush(&layout, &NoCleanup).unwrap();

    let written: Vec<ShardId> = ShardId::all()
        .filter(|&shard| layout.shard_record_path(shard).exists())
        .collect();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0], ShardId::for_current_process());
    assert_eq!(
        read_record(&layout.shard_record_path(written[0]))[Counter::InternalError],
        1
    );
}

#[test]
fn over_quota_flush_triggers_cleanup_once() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = layout_at(tmp.path().to_path_buf());
    let shard = ShardId::from_key_hash(7);

    // Seed the shard just below its file quota.
    std::fs::create_dir_all(layout.shard_dir(shard)).unwrap();
    kiln_stats::overwrite_fields(
        &layout.shard_record_path(shard),
        &[
            (Counter::FilesInCache, 49),
            (Counter::MaxFiles, 10),
            (Counter::MaxSizeKib, 100_000),
        ],
        layout.lock_staleness(),
    )
    .unwrap();

    let cleanup = RecordingCleanup::default();
    let mut pending = PendingCounters::new();
    pending.record_with_size(Some(Counter::Miss), 10, 1);
    pending.set_shard(shard);
    pending.flush(&layout, &cleanup).unwrap();

    let calls = cleanup.calls.lock().unwrap();
    assert_eq!(calls.as_slice(), [(layout.shard_dir(shard), 10, 100_000)]);
}

#[test]
fn at_or_below_quota_flush_triggers_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = layout_at(tmp.path().to_path_buf());
    let shard = ShardId::from_key_hash(2);

    std::fs::create_dir_all(layout.shard_dir(shard)).unwrap();
    kiln_stats::overwrite_fields(
        &layout.shard_record_path(shard),
        &[
            (Counter::FilesInCache, 9),
            (Counter::MaxFiles, 10),
            (Counter::MaxSizeKib, 100_000),
        ],
        layout.lock_staleness(),
    )
    .unwrap();

    let cleanup = RecordingCleanup::default();
    let mut pending = PendingCounters::new();
    pending.record_with_size(Some(Counter::Miss), 10, 1);
    pending.set_shard(shard);
    pending.flush(&layout, &cleanup).unwrap();

    // Exactly at the limit now: quotas trigger only when exceeded.
    let record = read_record(&layout.shard_record_path(shard));
    assert_eq!(record[Counter::FilesInCache], 10);
    assert!(cleanup.calls.lock().unwrap().is_empty());
}

#[test]
fn aggregate_of_empty_cache_is_all_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = layout_at(tmp.path().to_path_buf());

    let totals = aggregate(&layout);
    assert_eq!(totals[Counter::Miss], 0);
    // 16 missing shard records each contribute the per-shard default quota;
    // the missing global record's default is excluded.
    assert_eq!(
        totals[Counter::MaxSizeKib],
        (DEFAULT_MAX_SIZE_KIB / SHARD_COUNT as u64) * SHARD_COUNT as u64
    );
}
