//! Statistics and quota enforcement for the Kiln build-artifact cache.
//!
//! Many independent Kiln processes write to the same cache concurrently with
//! no central coordinator; this crate keeps their shared counters (hits,
//! misses, error classes, file count, total size, configured limits) crash-
//! and concurrency-safe using only filesystem primitives, and decides when a
//! shard has outgrown its quota.
//!
//! ## On-disk layout (inventory)
//!
//! The cache root holds 16 shard directories named by a hex digit, plus one
//! global fallback record:
//! - `<cache_root>/stats`:
//!   - global [`StatsRecord`], written only before a shard is known
//! - `<cache_root>/<0-f>/stats`:
//!   - per-shard [`StatsRecord`], merged in place on every flush
//! - `<cache_root>/<0-f>/stats.lock`:
//!   - advisory lock file guarding the shard record ([`StatsLock`])
//!
//! A record is plain text, one unsigned decimal per line in [`Counter`] order.
//! Files are forward-compatible by truncation: readers ignore trailing lines
//! they don't know and default the ones a shorter file omits.
//!
//! ## Write discipline
//!
//! Every persisted update is a read-modify-write under the record's lock,
//! finished by a temp-file-plus-rename so a crash mid-write never exposes a
//! truncated record. Bookkeeping is best-effort by contract: contention and
//! missing files are absorbed, and only errors that would silently corrupt
//! accounting (or leave configuration half-applied) surface as [`StatsError`].

mod counter;
mod error;
mod layout;
mod lock;
mod maintenance;
mod pending;
mod persist;
mod quota;
mod summary;
mod util;

pub use counter::{Counter, Render, StatsRecord, DISPLAY_ORDER};
pub use error::{Result, StatsError};
pub use layout::{
    CacheLayout, ShardId, StatsConfig, DEFAULT_LOCK_STALENESS, SHARD_COUNT,
};
pub use lock::{LockOutcome, StatsLock};
pub use maintenance::{set_limits, set_sizes, zero_all};
pub use pending::PendingCounters;
pub use persist::{merge_update, overwrite_fields, read_record, DEFAULT_MAX_SIZE_KIB};
pub use quota::{CleanupHook, NoCleanup};
pub use summary::{aggregate, format_summary};
pub use util::format_size;
