//! Size-based rotation for the daemon's log files.
//!
//! The launchd agent appends to `daemon.log` / `daemon-err.log` forever, so
//! the runtime checks both periodically and rotates any file past the cap,
//! keeping a bounded trail of numbered backups
//! (`daemon.log` → `daemon.log.1` → … → `daemon.log.5`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Maximum log file size before rotation (10 MiB).
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum number of rotated backup files to keep.
pub const MAX_ROTATED_FILES: usize = 5;

/// Rotate both daemon log files under `home`.
///
/// A failure on one file does not block the other; both are logged.
pub fn rotate_logs(home: &Path) {
    let targets = [
        crate::paths::stdout_log_path(home),
        crate::paths::stderr_log_path(home),
    ];

    for log_path in &targets {
        match rotate_oversized(log_path, MAX_LOG_BYTES, MAX_ROTATED_FILES) {
            Ok(true) => tracing::info!(path = %log_path.display(), "log file rotated"),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(path = %log_path.display(), error = %err, "log rotation failed")
            }
        }
    }
}

/// Rotate `log_path` if it has grown past `max_bytes`.
///
/// Returns `true` if rotation occurred. A missing live file is a no-op, and
/// holes in the backup sequence are tolerated (renames skip absent files).
pub fn rotate_oversized(log_path: &Path, max_bytes: u64, max_files: usize) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < max_bytes {
        return Ok(false);
    }

    // Oldest backup falls off the end; the rest shift up by one.
    let oldest = numbered_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..max_files).rev() {
        let src = numbered_path(log_path, n);
        if src.exists() {
            fs::rename(&src, numbered_path(log_path, n + 1))?;
        }
    }

    fs::rename(log_path, numbered_path(log_path, 1))?;

    // Recreate the live file so launchd always has a writable target.
    fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(log_path)?;

    Ok(true)
}

/// Path of the `n`-th rotated backup (e.g. `daemon.log.2`).
fn numbered_path(base: &Path, n: usize) -> PathBuf {
    let name = base
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("daemon.log");
    base.with_file_name(format!("{name}.{n}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
