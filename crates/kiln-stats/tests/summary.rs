use kiln_stats::{
    aggregate, format_summary, merge_update, CacheLayout, Counter, ShardId, StatsConfig,
    StatsRecord, DEFAULT_MAX_SIZE_KIB, SHARD_COUNT,
};

fn layout_at(root: std::path::PathBuf) -> CacheLayout {
    CacheLayout::new(StatsConfig {
        cache_root_override: Some(root),
        ..StatsConfig::default()
    })
    .unwrap()
}

#[test]
fn global_record_max_size_is_excluded_from_aggregate() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = layout_at(tmp.path().to_path_buf());

    // A global record whose quota slot would dwarf the real per-shard quotas
    // if it were (wrongly) counted.
    let mut global = StatsRecord::default();
    global[Counter::Miss] = 2;
    global[Counter::MaxSizeKib] = 999_999_999;
    std::fs::write(layout.root_record_path(), global.encode()).unwrap();

    let totals = aggregate(&layout);
    assert_eq!(totals[Counter::Miss], 2);
    assert_eq!(totals[Counter::MaxSizeKib], DEFAULT_MAX_SIZE_KIB);
}

#[test]
fn shard_quota_slots_do_count_in_the_aggregate() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = layout_at(tmp.path().to_path_buf());
    let shard = ShardId::from_key_hash(0);

    std::fs::create_dir_all(layout.shard_dir(shard)).unwrap();
    let mut record = StatsRecord::default();
    record[Counter::MaxSizeKib] = 12_345;
    std::fs::write(layout.shard_record_path(shard), record.encode()).unwrap();

    let totals = aggregate(&layout);
    let default_shard_quota = DEFAULT_MAX_SIZE_KIB / SHARD_COUNT as u64;
    assert_eq!(
        totals[Counter::MaxSizeKib],
        12_345 + default_shard_quota * (SHARD_COUNT as u64 - 1)
    );
}

#[test]
fn summary_lists_always_shown_counters_and_sizes() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = layout_at(tmp.path().to_path_buf());
    let shard = ShardId::from_key_hash(9);

    std::fs::create_dir_all(layout.shard_dir(shard)).unwrap();
    let mut delta = StatsRecord::default();
    delta[Counter::Miss] = 3;
    delta[Counter::CacheSizeKib] = 1536;
    merge_update(
        &layout.shard_record_path(shard),
        &delta,
        layout.lock_staleness(),
    )
    .unwrap()
    .unwrap();

    let summary = format_summary(&layout);
    let lines: Vec<&str> = summary.lines().collect();

    assert!(lines[0].starts_with("cache directory"));
    assert!(lines[0].ends_with(&layout.root().display().to_string()));

    // Always-shown counters appear even at zero.
    assert!(summary.contains("cache hit (direct)"));
    assert!(summary.contains("cache hit (preprocessed)"));
    assert!(summary.contains("cache miss"));

    // Size-valued counters render human-readably.
    assert!(summary.contains("1.5 MB"), "summary:\n{summary}");
    assert!(summary.contains("1.0 GB"), "summary:\n{summary}");

    // Zero-valued event counters that aren't always shown are skipped.
    assert!(!summary.contains("called for link"));
    assert!(!summary.contains("internal error"));
}
