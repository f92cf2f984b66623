use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Render a KiB count as a human-readable size, e.g. `1.2 GB`.
pub fn format_size(kib: u64) -> String {
    const MIB: u64 = 1024;
    const GIB: u64 = 1024 * 1024;
    if kib >= GIB {
        format!("{:.1} GB", kib as f64 / GIB as f64)
    } else if kib >= MIB {
        format!("{:.1} MB", kib as f64 / MIB as f64)
    } else {
        format!("{kib} kB")
    }
}

/// Stable hash of a small integer, used to spread keyless runs across shards.
pub fn hash_of_u32(value: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(value.to_le_bytes());
    let digest = hasher.finalize();
    u64::from_le_bytes(digest[..8].try_into().unwrap_or([0; 8]))
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Open a uniquely-named temp file next to `dest`, returning its path and
/// handle. The name embeds the pid and a process-wide counter so concurrent
/// writers never collide.
pub(crate) fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("destination path has no file name"))?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

pub(crate) fn remove_file_best_effort(path: &Path, reason: &'static str) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::debug!(
                target = "kiln.stats",
                path = %path.display(),
                reason,
                error = %err,
                "failed to remove file"
            );
        }
    }
}
