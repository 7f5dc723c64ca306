//! # Crash-Safe File Writes
//!
//! Claims and seeds are replaced by writing a temporary sibling, syncing it
//! and renaming it over the target. After a crash the file holds either the
//! old content or the new content, never a partial write.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

fn temp_path(path: &Path) -> io::Result<(PathBuf, &Path)> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path has no parent directory: {}", path.display()),
        )
    })?;
    let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or("file");
    Ok((parent.join(format!(".{file_name}.tmp.{}", Uuid::new_v4())), parent))
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> io::Result<()> {
    File::open(path)?.sync_all()
}

#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Atomically replace `path` with `data`, creating parent directories.
pub fn atomic_write(path: impl AsRef<Path>, data: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let (temp, parent) = temp_path(path)?;
    fs::create_dir_all(parent)?;

    let result = (|| {
        let mut file = File::create(&temp)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result?;

    fsync_dir(parent)
}
