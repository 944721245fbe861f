//! JSONL-file graph backend with lock-scoped atomic mutation.
//!
//! Every update loads the graph, applies the change and rewrites the file
//! while holding an exclusive `<path>.lock` file, so one update is one
//! atomic step for every process sharing the file. Reads need no lock:
//! writes replace the file by rename.

use crate::error::StoreError;
use crate::graph::{GraphStore, GraphUpdate};
use crate::jsonl::{read_triples_from_path, write_triples_to_path};
use crate::term::{Triple, TriplePattern};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub fn graph_lock_path(graph_path: &Path) -> PathBuf {
    let mut path: OsString = graph_path.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

/// Execute one lock-scoped mutation against a graph file.
///
/// The mutator returns `(value, changed)`; the file is rewritten before the
/// lock is released only when `changed` is true.
pub fn mutate_graph_jsonl<T, F>(path: impl AsRef<Path>, mutator: F) -> Result<T, StoreError>
where
    F: FnOnce(&mut BTreeSet<Triple>) -> (T, bool),
{
    let path = path.as_ref();
    let _guard = GraphFileLockGuard::acquire(path)?;

    let mut facts = read_triples_from_path(path)?;
    let (value, changed) = mutator(&mut facts);
    if changed {
        write_triples_to_path(path, &facts)?;
    }
    Ok(value)
}

struct GraphFileLockGuard {
    lock_path: PathBuf,
    _file: File,
}

impl GraphFileLockGuard {
    fn acquire(path: &Path) -> Result<Self, StoreError> {
        let lock_path = graph_lock_path(path);
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("{}: {e}", parent.display())))?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                Ok(Self {
                    lock_path,
                    _file: file,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::LockBusy {
                    lock_path: lock_path.display().to_string(),
                })
            }
            Err(err) => Err(StoreError::Io(format!("{}: {err}", lock_path.display()))),
        }
    }
}

impl Drop for GraphFileLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// A named graph persisted as a JSONL file.
#[derive(Debug)]
pub struct FileGraphStore {
    graph: String,
    path: PathBuf,
    // Writers in this process queue here instead of failing on the lock file.
    writer: Mutex<()>,
}

impl FileGraphStore {
    pub fn new(graph: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            graph: graph.into(),
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeSet<Triple>, StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_triples_from_path(path))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl GraphStore for FileGraphStore {
    fn graph(&self) -> &str {
        &self.graph
    }

    async fn ask(&self, pattern: &TriplePattern) -> Result<bool, StoreError> {
        Ok(self.load().await?.iter().any(|t| pattern.matches(t)))
    }

    async fn select(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, StoreError> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|t| pattern.matches(t))
            .collect())
    }

    async fn update(&self, update: &GraphUpdate) -> Result<(), StoreError> {
        let _queued = self.writer.lock().await;
        let path = self.path.clone();
        let update = update.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            mutate_graph_jsonl(&path, |facts| match update.apply_checked(facts) {
                Ok(changed) => (Ok(changed), changed),
                Err(conflict) => (Err(conflict), false),
            })
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))??;
        let changed = outcome?;

        tracing::debug!(
            path = %self.path.display(),
            changed,
            "graph file updated"
        );
        Ok(())
    }
}
