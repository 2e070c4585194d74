//! Atomic, per-path serialized file writer

use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::WriteError;

const TEMP_PREFIX: &str = ".promconf-";

/// Writes configuration files so readers only ever see complete content
///
/// Each call takes the lock for its path, creates the directory if needed,
/// writes a temp file next to the target and renames it into place. The
/// blocking work runs on tokio's blocking pool and keeps running if the
/// caller stops waiting, so a started write is never abandoned halfway.
#[derive(Clone)]
pub struct ConfigWriter {
    inner: Arc<WriterInner>,
}

struct WriterInner {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl ConfigWriter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(WriterInner {
                locks: DashMap::new(),
                timeout,
            }),
        }
    }

    /// Atomically replace `path` with `content`
    pub async fn write(&self, path: &Path, content: String) -> Result<(), WriteError> {
        let lock = self.lock_for(path);
        let target = path.to_path_buf();

        let task = tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            write_atomic(&target, content.as_bytes())
        });

        self.finish(path, task).await?;
        tracing::debug!(path = %path.display(), "Configuration file written");
        Ok(())
    }

    /// Remove `path` if it exists; returns whether a file was removed
    pub async fn remove(&self, path: &Path) -> Result<bool, WriteError> {
        let lock = self.lock_for(path);
        let target = path.to_path_buf();

        let task = tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            remove_if_exists(&target)
        });

        let removed = self.finish(path, task).await?;
        if removed {
            tracing::debug!(path = %path.display(), "Configuration file removed");
        }
        Ok(removed)
    }

    async fn finish<T>(
        &self,
        path: &Path,
        task: JoinHandle<io::Result<T>>,
    ) -> Result<T, WriteError> {
        match tokio::time::timeout(self.inner.timeout, task).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(source))) => Err(WriteError::Io {
                path: path.to_path_buf(),
                source,
            }),
            Ok(Err(join_error)) => Err(WriteError::Task(join_error.to_string())),
            Err(_) => Err(WriteError::Timeout {
                path: path.to_path_buf(),
                after: self.inner.timeout,
            }),
        }
    }

    pub(crate) fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let key = lock_key(path);
        Arc::clone(self.inner.locks.entry(key).or_default().value())
    }
}

impl Default for ConfigWriter {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

/// Write `content` to a temp file beside `path`, flush it and rename it over `path`
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    // temp files are created 0600
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }

    temp.persist(path).map_err(|e| e.error)?;
    sync_dir(dir)
}

fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn lock_key(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
