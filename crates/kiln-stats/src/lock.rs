use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant, SystemTime};

/// Result of a lock acquisition attempt.
///
/// Contention is an expected condition, not an error: callers treat
/// `TimedOut` as "skip this shard and carry on".
#[derive(Debug)]
pub enum LockOutcome {
    Acquired(StatsLock),
    TimedOut,
}

/// An advisory cross-process lock on one stats record, backed by a
/// `<record>.lock` file created exclusively.
///
/// The lock file is removed when the returned value is dropped. A lock file
/// older than the staleness limit is presumed to belong to a crashed holder
/// and is reclaimed.
#[derive(Debug)]
pub struct StatsLock {
    lock_path: PathBuf,
    // Lock files don't exclude other threads in the same process (both would
    // observe their own `create_new` race the same way other processes do,
    // but an in-process mutex is cheaper and fair). Keep a per-path mutex
    // guard for thread exclusion; the lock file provides cross-process
    // coordination.
    _guard: MutexGuard<'static, ()>,
}

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

impl StatsLock {
    /// Acquire the lock guarding `record_path`, waiting up to the staleness
    /// limit for a live holder to release it.
    pub fn acquire(record_path: &Path, staleness_limit: Duration) -> LockOutcome {
        let lock_path = lock_path_for(record_path);
        let guard = process_lock_for_path(&lock_path)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let deadline = Instant::now() + staleness_limit.max(RETRY_INTERVAL);
        loop {
            match OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    // Holder pid, for post-mortem debugging only.
                    let _ = write!(file, "{}", std::process::id());
                    return LockOutcome::Acquired(StatsLock {
                        lock_path,
                        _guard: guard,
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if lock_is_stale(&lock_path, staleness_limit) {
                        remove_lock_file(&lock_path);
                        continue;
                    }
                }
                Err(err) => {
                    tracing::debug!(
                        target = "kiln.stats",
                        path = %lock_path.display(),
                        error = %err,
                        "failed to create lock file"
                    );
                    return LockOutcome::TimedOut;
                }
            }

            if Instant::now() >= deadline {
                tracing::debug!(
                    target = "kiln.stats",
                    path = %lock_path.display(),
                    "timed out waiting for stats lock"
                );
                return LockOutcome::TimedOut;
            }
            std::thread::sleep(RETRY_INTERVAL);
        }
    }
}

impl Drop for StatsLock {
    fn drop(&mut self) {
        remove_lock_file(&self.lock_path);
    }
}

fn lock_path_for(record_path: &Path) -> PathBuf {
    let mut name = record_path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

fn lock_is_stale(lock_path: &Path, staleness_limit: Duration) -> bool {
    let Ok(meta) = std::fs::metadata(lock_path) else {
        // Already gone (or unreadable): let the create_new retry decide.
        return false;
    };
    let Ok(mtime) = meta.modified() else {
        return false;
    };
    match SystemTime::now().duration_since(mtime) {
        Ok(age) => age > staleness_limit,
        Err(_) => false,
    }
}

fn remove_lock_file(lock_path: &Path) {
    match std::fs::remove_file(lock_path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::debug!(
                target = "kiln.stats",
                path = %lock_path.display(),
                error = %err,
                "failed to remove lock file"
            );
        }
    }
}

fn process_lock_for_path(path: &Path) -> &'static Mutex<()> {
    static PROCESS_LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();
    let locks = PROCESS_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));

    let mut map = locks
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(existing) = map.get(path) {
        return existing;
    }

    let mutex: &'static Mutex<()> = Box::leak(Box::new(Mutex::new(())));
    map.insert(path.to_path_buf(), mutex);
    mutex
}
