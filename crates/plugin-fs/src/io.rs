//! Atomic I/O operations with file locking

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use backoff::ExponentialBackoff;
use fs2::FileExt;

use crate::{Error, Result};

/// Tuning for [`write_atomic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// How long to keep retrying lock acquisition and the final rename.
    pub lock_timeout: Duration,
    /// Whether to `fsync` the temp file before renaming it into place.
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            enable_fsync: true,
        }
    }
}

impl RobustnessConfig {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(10),
            max_interval: Duration::from_millis(250),
            max_elapsed_time: Some(self.lock_timeout),
            ..ExponentialBackoff::default()
        }
    }
}

/// Path of the advisory lock file guarding `path`.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers never observe a partial file.
/// An exclusive advisory lock on `<path>.lock` serializes concurrent writers
/// of the same file; acquisition is retried until `config.lock_timeout`.
pub fn write_atomic(path: &Path, content: &[u8], config: RobustnessConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let lock_file_path = lock_path(path);
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_file_path)
        .map_err(|e| Error::io(&lock_file_path, e))?;

    backoff::retry(config.backoff(), || {
        FileExt::try_lock_exclusive(&lock_file).map_err(backoff::Error::transient)
    })
    .map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    let result = write_via_temp(path, content, config);

    FileExt::unlock(&lock_file).map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    result
}

fn write_via_temp(path: &Path, content: &[u8], config: RobustnessConfig) -> Result<()> {
    // Same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    if config.enable_fsync {
        temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
    }
    drop(temp_file);

    let renamed = backoff::retry(config.backoff(), || {
        fs::rename(&temp_path, path).map_err(backoff::Error::transient)
    });

    if let Err(err) = renamed {
        let _ = fs::remove_file(&temp_path);
        let source = match err {
            backoff::Error::Permanent(e) => e,
            backoff::Error::Transient { err, .. } => err,
        };
        return Err(Error::io(path, source));
    }

    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &Path, content: &str, config: RobustnessConfig) -> Result<()> {
    write_atomic(path, content.as_bytes(), config)
}

/// Recursively copy the contents of `from` into `to`, overwriting files.
///
/// Returns the destination path of every copied file.
pub fn copy_dir_all(from: &Path, to: &Path) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();
    copy_dir_into(from, to, &mut copied)?;
    Ok(copied)
}

fn copy_dir_into(from: &Path, to: &Path, copied: &mut Vec<PathBuf>) -> Result<()> {
    fs::create_dir_all(to).map_err(|e| Error::io(to, e))?;
    let entries = fs::read_dir(from).map_err(|e| Error::io(from, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| Error::io(from, e))?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| Error::io(&source, e))?;

        if file_type.is_dir() {
            copy_dir_into(&source, &target, copied)?;
        } else {
            fs::copy(&source, &target).map_err(|e| Error::io(&source, e))?;
            copied.push(target);
        }
    }

    Ok(())
}

/// Remove a directory tree, treating a missing directory as success.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}
