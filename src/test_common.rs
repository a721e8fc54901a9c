//! Shared helpers for the module test suites.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Create a unique temp file path in the OS temp dir.
pub(crate) fn temp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    // pid + time for uniqueness without extra crates
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    p.push(format!("edgeio_{pid}_{nanos}_{name}"));
    p
}

/// Create (or truncate) a file holding exactly `bytes`.
pub(crate) fn write_bytes(path: &Path, bytes: &[u8]) {
    let mut f = OpenOptions::new()
        .create(true)
        .truncate(true)
        .read(true)
        .write(true)
        .open(path)
        .expect("create tmp");
    f.write_all(bytes).expect("write");
    f.sync_all().ok();
}
