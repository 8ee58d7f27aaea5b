//! Atomic file operations
//!
//! The JSONL persistence adapter rewrites whole store files on mutation.
//! Writes go through a temp file:
//!
//! 1. Write to `<path>.tmp`
//! 2. `sync_all()` to flush to disk
//! 3. Rename over the final path (atomic on POSIX filesystems)
//!
//! A reader therefore sees either the old file or the new one, never a
//! partial write.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Atomically write content to a file, creating parent directories as needed.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> io::Result<()> {
    atomic_write_with(path, |file| file.write_all(content.as_bytes()))
}

/// Atomically write using a writer function.
///
/// Avoids building the whole content in memory for large stores:
///
/// ```ignore
/// atomic_write_with("data/chunks.jsonl", |file| {
///     for line in lines {
///         writeln!(file, "{}", line)?;
///     }
///     Ok(())
/// })?;
/// ```
pub fn atomic_write_with<P, F>(path: P, write_fn: F) -> io::Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let path = path.as_ref();
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&temp_path)?;
    write_fn(&mut file)?;

    // Durable before the rename makes it visible
    file.sync_all()?;

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Remove leftover `.tmp` files from interrupted writes.
///
/// Runs when a JSONL data directory is opened; returns how many stale files
/// were swept. A directory that does not exist yet yields zero.
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> io::Result<usize> {
    let entries = match fs::read_dir(dir.as_ref()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "tmp") {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
