//! Pool references and the read/replace/size surface
//!
//! `PoolRef` is a tagged variant over the two pool media. Durable pools are
//! newline-delimited files: one record per line, blank lines skipped on
//! read, fully rewritten (never appended) on every mutation. All writes use
//! atomic temp-file + rename to prevent corruption on crash. A tokio Mutex
//! guards each in-memory sequence.
//!
//! Every `load` of a durable pool re-reads the backing file, so process-local
//! state can never diverge from the durable source of truth.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::Record;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Live record sequence backing an in-memory pool.
///
/// Clones share the underlying sequence, so a clone addresses the same pool
/// (same `PoolKey`, same contents).
#[derive(Debug, Clone, Default)]
pub struct MemPool(Arc<Mutex<Vec<Record>>>);

impl MemPool {
    pub fn new(records: Vec<Record>) -> Self {
        Self(Arc::new(Mutex::new(records)))
    }

    async fn snapshot(&self) -> Vec<Record> {
        self.0.lock().await.clone()
    }

    async fn replace(&self, records: Vec<Record>) {
        *self.0.lock().await = records;
    }

    async fn len(&self) -> usize {
        self.0.lock().await.len()
    }
}

/// Reference to one pool: a live in-memory sequence or a durable file.
#[derive(Debug, Clone)]
pub enum PoolRef {
    InMemory(MemPool),
    Durable(PathBuf),
}

/// Hashable pool identity, used to key lock and cursor tables.
///
/// In-memory pools are identified by their shared allocation, durable pools
/// by their path. Clones of the same `PoolRef` yield equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoolKey {
    Memory(usize),
    File(PathBuf),
}

impl PoolRef {
    /// Create an in-memory pool from initial records.
    pub fn in_memory(records: Vec<Record>) -> Self {
        PoolRef::InMemory(MemPool::new(records))
    }

    /// Create a durable pool backed by the given file path.
    pub fn durable(path: impl Into<PathBuf>) -> Self {
        PoolRef::Durable(path.into())
    }

    /// Identity for lock/cursor tables.
    pub fn key(&self) -> PoolKey {
        match self {
            PoolRef::InMemory(mem) => PoolKey::Memory(Arc::as_ptr(&mem.0) as usize),
            PoolRef::Durable(path) => PoolKey::File(path.clone()),
        }
    }

    /// Current records, in order.
    ///
    /// Durable pools re-read the backing file on every call. A missing file
    /// is an empty pool, and read errors degrade to an empty pool as well
    /// (logged, never surfaced to the caller).
    pub async fn load(&self) -> Vec<Record> {
        match self {
            PoolRef::InMemory(mem) => mem.snapshot().await,
            PoolRef::Durable(path) => read_records(path).await,
        }
    }

    /// Replace the pool's contents with a new sequence.
    ///
    /// Durable pools rewrite the whole file through an atomic rename; the
    /// prior contents stay visible until the rename commits. In-memory pools
    /// swap the live sequence in place.
    pub async fn replace(&self, records: Vec<Record>) -> Result<()> {
        match self {
            PoolRef::InMemory(mem) => {
                mem.replace(records).await;
                Ok(())
            }
            PoolRef::Durable(path) => write_atomic(path, &records).await,
        }
    }

    /// Current record count. Best-effort for stock reporting; callers take
    /// no lock, so the count may race benignly with concurrent draws.
    pub async fn size(&self) -> usize {
        match self {
            PoolRef::InMemory(mem) => mem.len().await,
            PoolRef::Durable(path) => read_records(path).await.len(),
        }
    }
}

/// Read non-blank lines from a pool file.
async fn read_records(path: &Path) -> Vec<Record> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(Record::new)
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read pool file, treating as empty");
            Vec::new()
        }
    }
}

/// Write records to a pool file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target, so a crash mid-write never corrupts the prior pool contents.
/// Sets 0600 permissions since the file holds credentials.
async fn write_atomic(path: &Path, records: &[Record]) -> Result<()> {
    let mut contents = records
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    if !records.is_empty() {
        contents.push('\n');
    }

    let dir = path
        .parent()
        .ok_or_else(|| Error::Persist("pool path has no parent directory".into()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pool".into());
    let tmp_path = dir.join(format!(".{name}.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, contents.as_bytes())
        .await
        .map_err(|e| Error::Persist(format!("writing temp pool file: {e}")))?;

    // 0600: the pool file contains account credentials (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Persist(format!("setting pool file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Persist(format!("renaming temp pool file: {e}")))?;

    debug!(path = %path.display(), records = records.len(), "persisted pool");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(lines: &[&str]) -> Vec<Record> {
        lines.iter().map(|l| Record::new(*l)).collect()
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let pool = PoolRef::durable(dir.path().join("absent.txt"));
        assert!(pool.load().await.is_empty());
        assert_eq!(pool.size().await, 0);
    }

    #[tokio::test]
    async fn load_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.txt");
        tokio::fs::write(&path, "a:1\n\n   \nb:2\n")
            .await
            .unwrap();

        let pool = PoolRef::durable(path);
        let loaded = pool.load().await;
        assert_eq!(loaded, records(&["a:1", "b:2"]));
    }

    #[tokio::test]
    async fn load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.txt");
        tokio::fs::write(&path, "a:1\nb:2\nc:3\n").await.unwrap();

        let pool = PoolRef::durable(path);
        let first = pool.load().await;
        let second = pool.load().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn replace_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.txt");
        let pool = PoolRef::durable(path.clone());

        pool.replace(records(&["x", "y", "z"])).await.unwrap();
        assert_eq!(pool.load().await, records(&["x", "y", "z"]));

        // Full newline-delimited rewrite with a trailing newline
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw, "x\ny\nz\n");
    }

    #[tokio::test]
    async fn replace_rewrites_never_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.txt");
        let pool = PoolRef::durable(path.clone());

        pool.replace(records(&["a:1", "b:2", "c:3"])).await.unwrap();
        pool.replace(records(&["b:2"])).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw, "b:2\n");
    }

    #[tokio::test]
    async fn replace_empty_truncates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.txt");
        let pool = PoolRef::durable(path.clone());

        pool.replace(records(&["only"])).await.unwrap();
        pool.replace(Vec::new()).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw, "");
        assert_eq!(pool.size().await, 0);
    }

    #[tokio::test]
    async fn stale_temp_file_never_shadows_pool_contents() {
        // Simulates a replace interrupted before the atomic rename: the temp
        // file exists but the pool file still holds the prior contents.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.txt");
        tokio::fs::write(&path, "committed:1\n").await.unwrap();
        tokio::fs::write(dir.path().join(".pool.txt.tmp.99999"), "torn write")
            .await
            .unwrap();

        let pool = PoolRef::durable(path);
        assert_eq!(pool.load().await, records(&["committed:1"]));
    }

    #[tokio::test]
    async fn replace_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let pool = PoolRef::durable(dir.path().join("nope").join("pool.txt"));

        let result = pool.replace(records(&["a:1"])).await;
        assert!(matches!(result, Err(Error::Persist(_))));
        // Nothing became visible at the target path
        assert_eq!(pool.size().await, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pool_file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.txt");
        let pool = PoolRef::durable(path.clone());
        pool.replace(records(&["a:1"])).await.unwrap();

        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "pool file must be 0600, got {mode:o}");
    }

    #[tokio::test]
    async fn in_memory_snapshot_and_replace() {
        let pool = PoolRef::in_memory(records(&["a:1", "b:2"]));
        assert_eq!(pool.load().await, records(&["a:1", "b:2"]));
        assert_eq!(pool.size().await, 2);

        pool.replace(records(&["c:3"])).await.unwrap();
        assert_eq!(pool.load().await, records(&["c:3"]));
        assert_eq!(pool.size().await, 1);
    }

    #[tokio::test]
    async fn in_memory_clone_shares_contents() {
        let pool = PoolRef::in_memory(records(&["a:1"]));
        let clone = pool.clone();

        pool.replace(records(&["b:2", "c:3"])).await.unwrap();
        assert_eq!(clone.load().await, records(&["b:2", "c:3"]));
    }

    #[tokio::test]
    async fn pool_key_tracks_identity() {
        let mem = PoolRef::in_memory(records(&["a:1"]));
        assert_eq!(mem.key(), mem.clone().key());

        let other = PoolRef::in_memory(records(&["a:1"]));
        assert_ne!(mem.key(), other.key());

        let durable = PoolRef::durable("/tmp/pool.txt");
        assert_eq!(durable.key(), PoolRef::durable("/tmp/pool.txt").key());
        assert_ne!(durable.key(), PoolRef::durable("/tmp/other.txt").key());
    }
}
