//! Existence and permission probes
//!
//! These never keep anything open. A probe that passes is only a hint: the
//! file can still vanish or change mode before the real open.

use std::fs::{self, File};
use std::path::Path;

/// True if `path` is a regular file that can be opened for reading
pub fn can_read(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => File::open(path).is_ok(),
        _ => false,
    }
}

/// True if `path` is a regular file whose permission bits allow writing
///
/// A missing file is never writable. Only the read-only flag is consulted
/// (on Unix: no write bit set for anyone), not whether the current user may
/// actually write. A file with only the owner write bit, owned by someone
/// else, reports writable; the later read-write open then fails and the
/// state degrades through `OpenWarning::OpenFailed`.
pub fn can_write(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_file() && !meta.permissions().readonly(),
        Err(_) => false,
    }
}

/// True if anything exists at `path`
pub fn exists(path: &Path) -> bool {
    path.exists()
}
