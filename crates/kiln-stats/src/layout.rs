use crate::error::{Result, StatsError};
use crate::util::hash_of_u32;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Number of shard directories partitioning the cache.
pub const SHARD_COUNT: usize = 16;

/// Default staleness limit after which a held lock is presumed abandoned.
pub const DEFAULT_LOCK_STALENESS: Duration = Duration::from_secs(2);

/// One of the 16 shard directories, named by a single hex digit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShardId(u8);

impl ShardId {
    pub fn from_key_hash(hash: u64) -> Self {
        ShardId((hash % SHARD_COUNT as u64) as u8)
    }

    /// Deterministic shard for a run that never computed a cache key, so
    /// statistics from failed or aborted runs are not lost.
    pub fn for_current_process() -> Self {
        ShardId::from_key_hash(hash_of_u32(std::process::id()))
    }

    pub fn all() -> impl Iterator<Item = ShardId> {
        (0..SHARD_COUNT as u8).map(ShardId)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Configuration for the statistics subsystem.
#[derive(Clone, Debug)]
pub struct StatsConfig {
    /// Override the cache root directory.
    pub cache_root_override: Option<PathBuf>,
    /// Maximum age after which a held stats lock may be reclaimed.
    pub lock_staleness: Duration,
    /// When set, flushing is disabled entirely (reads still work).
    pub disabled: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            cache_root_override: None,
            lock_staleness: DEFAULT_LOCK_STALENESS,
            disabled: false,
        }
    }
}

impl StatsConfig {
    pub fn from_env() -> Self {
        Self {
            cache_root_override: std::env::var_os("KILN_CACHE_DIR").map(PathBuf::from),
            lock_staleness: DEFAULT_LOCK_STALENESS,
            disabled: std::env::var_os("KILN_NO_STATS").is_some(),
        }
    }
}

/// Resolved on-disk layout of the cache's statistics files: one `stats`
/// record per shard directory plus one at the cache root.
#[derive(Clone, Debug)]
pub struct CacheLayout {
    root: PathBuf,
    lock_staleness: Duration,
    disabled: bool,
}

impl CacheLayout {
    pub fn new(config: StatsConfig) -> Result<Self> {
        let root = match config.cache_root_override {
            Some(root) => root,
            None => default_cache_root()?,
        };
        Ok(Self {
            root,
            lock_staleness: config.lock_staleness,
            disabled: config.disabled,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn lock_staleness(&self) -> Duration {
        self.lock_staleness
    }

    pub fn stats_disabled(&self) -> bool {
        self.disabled
    }

    /// The global record at the cache root, used as a fallback location
    /// before a shard is known.
    pub fn root_record_path(&self) -> PathBuf {
        self.root.join("stats")
    }

    pub fn shard_dir(&self, shard: ShardId) -> PathBuf {
        self.root.join(shard.to_string())
    }

    pub fn shard_record_path(&self, shard: ShardId) -> PathBuf {
        self.shard_dir(shard).join("stats")
    }
}

fn default_cache_root() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .ok_or(StatsError::MissingHomeDir)?;

    Ok(home.join(".kiln").join("cache"))
}
