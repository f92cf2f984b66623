use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, StatsError>;

/// Errors produced by statistics persistence and maintenance.
///
/// Bookkeeping failures that must never break a cache operation (lock
/// contention, missing or short record files, a temp file that cannot be
/// opened) are absorbed where they occur and do not appear here.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("failed to determine home directory for default cache path")]
    MissingHomeDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A write or sync failed on a temp file we already opened. Ignoring this
    /// would silently lose accounting data, so it is surfaced to the caller
    /// rather than absorbed.
    #[error("failed to write stats record {path}: {source}")]
    WriteRecord {
        path: PathBuf,
        source: std::io::Error,
    },
}
