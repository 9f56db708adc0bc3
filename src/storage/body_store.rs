//! Disk-backed store for full request/response bodies.
//!
//! The ledger keeps only a short preview of each body in memory; the
//! complete text lands here, one regular file per `(id, role)` pair inside a
//! dedicated cache subdirectory. No index file exists because every lookup
//! is id-keyed.
//!
//! Every operation funnels through one serial worker task, so a write, a
//! later read, and a delete for the same key are strictly ordered relative
//! to each other. Ordering across different keys is FIFO submission order,
//! which is enough because keys are independent. Disk failures are logged
//! and swallowed; a lost body degrades the caller to its in-memory preview.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{mpsc, oneshot};

use crate::config::Preferences;
use crate::models::BodyRole;

enum StoreJob {
    Save {
        id: String,
        role: BodyRole,
        body: String,
    },
    Load {
        id: String,
        role: BodyRole,
        reply: oneshot::Sender<Option<String>>,
    },
    Delete {
        ids: Vec<String>,
    },
    ClearAll,
    Flush {
        reply: oneshot::Sender<()>,
    },
}

/// Persistent key-value store for full bodies, keyed by `(id, role)`
pub struct BodyStore {
    dir: PathBuf,
    jobs: mpsc::UnboundedSender<StoreJob>,
}

impl BodyStore {
    /// Create a store rooted at `dir` and spawn its worker task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating body store directory {:?}", dir))?;
        let (jobs, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(dir.to_path_buf(), rx));
        Ok(Self {
            dir: dir.to_path_buf(),
            jobs,
        })
    }

    /// Directory holding the body files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Enqueue a write of `body` under `(id, role)`. No-op for empty bodies;
    /// write failures are swallowed.
    pub fn save(&self, id: &str, role: BodyRole, body: &str) {
        if body.is_empty() {
            return;
        }
        self.submit(StoreJob::Save {
            id: id.to_string(),
            role,
            body: body.to_string(),
        });
    }

    /// Read the body stored under `(id, role)`.
    ///
    /// Routed through the worker queue, so the result reflects every
    /// previously enqueued write or delete for the same key.
    pub async fn load(&self, id: &str, role: BodyRole) -> Option<String> {
        let (reply, rx) = oneshot::channel();
        self.submit(StoreJob::Load {
            id: id.to_string(),
            role,
            reply,
        });
        rx.await.unwrap_or(None)
    }

    /// Blocking variant of [`load`](Self::load) for callers that are not on
    /// the async runtime. Blocks for at most one queue drain plus one file
    /// read; must not be called from a runtime thread.
    pub fn load_blocking(&self, id: &str, role: BodyRole) -> Option<String> {
        let (reply, rx) = oneshot::channel();
        self.submit(StoreJob::Load {
            id: id.to_string(),
            role,
            reply,
        });
        rx.blocking_recv().unwrap_or(None)
    }

    /// Enqueue deletion of both role files for `id`; missing files are fine
    pub fn delete(&self, id: &str) {
        self.delete_many(vec![id.to_string()]);
    }

    /// Batched deletion, processed in submission order
    pub fn delete_many(&self, ids: Vec<String>) {
        if ids.is_empty() {
            return;
        }
        self.submit(StoreJob::Delete { ids });
    }

    /// Enqueue removal of the entire storage directory, then recreate it
    pub fn clear_all(&self) {
        self.submit(StoreJob::ClearAll);
    }

    /// At process start, wipe stale bodies unless the preserve-log
    /// preference is set.
    pub fn clear_on_launch_if_needed(&self, prefs: &Preferences) {
        if !prefs.preserve_log() {
            tracing::info!("Preserve log is off, clearing stored bodies from last session");
            self.clear_all();
        }
    }

    /// Wait until every job enqueued before this call has been processed
    pub async fn flush(&self) {
        let (reply, rx) = oneshot::channel();
        self.submit(StoreJob::Flush { reply });
        let _ = rx.await;
    }

    fn submit(&self, job: StoreJob) {
        if self.jobs.send(job).is_err() {
            tracing::warn!("Body store worker is gone, dropping storage operation");
        }
    }
}

fn body_path(dir: &Path, id: &str, role: BodyRole) -> PathBuf {
    dir.join(format!("{}.{}", id, role.file_ext()))
}

async fn run_worker(dir: PathBuf, mut rx: mpsc::UnboundedReceiver<StoreJob>) {
    while let Some(job) = rx.recv().await {
        match job {
            StoreJob::Save { id, role, body } => {
                let path = body_path(&dir, &id, role);
                if let Err(e) = fs::write(&path, body).await {
                    tracing::warn!("Failed to write body file {:?}: {}", path, e);
                }
            }
            StoreJob::Load { id, role, reply } => {
                let path = body_path(&dir, &id, role);
                let body = fs::read_to_string(&path).await.ok();
                let _ = reply.send(body);
            }
            StoreJob::Delete { ids } => {
                for id in ids {
                    for role in [BodyRole::Request, BodyRole::Response] {
                        let path = body_path(&dir, &id, role);
                        if let Err(e) = fs::remove_file(&path).await {
                            if e.kind() != std::io::ErrorKind::NotFound {
                                tracing::warn!("Failed to delete body file {:?}: {}", path, e);
                            }
                        }
                    }
                }
            }
            StoreJob::ClearAll => {
                if let Err(e) = fs::remove_dir_all(&dir).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!("Failed to clear body store {:?}: {}", dir, e);
                    }
                }
                if let Err(e) = fs::create_dir_all(&dir).await {
                    tracing::warn!("Failed to recreate body store {:?}: {}", dir, e);
                }
            }
            StoreJob::Flush { reply } => {
                let _ = reply.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempdir().expect("temp dir");
        let store = BodyStore::new(dir.path()).expect("store initializes");

        let body = "{\"answer\": 42}";
        store.save("req-1", BodyRole::Request, body);
        assert_eq!(
            store.load("req-1", BodyRole::Request).await.as_deref(),
            Some(body)
        );
    }

    #[tokio::test]
    async fn roles_are_stored_separately() {
        let dir = tempdir().expect("temp dir");
        let store = BodyStore::new(dir.path()).expect("store initializes");

        store.save("id", BodyRole::Request, "ping");
        store.save("id", BodyRole::Response, "pong");
        assert_eq!(
            store.load("id", BodyRole::Request).await.as_deref(),
            Some("ping")
        );
        assert_eq!(
            store.load("id", BodyRole::Response).await.as_deref(),
            Some("pong")
        );
    }

    #[tokio::test]
    async fn empty_body_is_never_written() {
        let dir = tempdir().expect("temp dir");
        let store = BodyStore::new(dir.path()).expect("store initializes");

        store.save("id", BodyRole::Request, "");
        store.flush().await;
        assert_eq!(store.load("id", BodyRole::Request).await, None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempdir().expect("temp dir");
        let store = BodyStore::new(dir.path()).expect("store initializes");
        assert_eq!(store.load("nope", BodyRole::Response).await, None);
    }

    #[tokio::test]
    async fn delete_removes_both_roles() {
        let dir = tempdir().expect("temp dir");
        let store = BodyStore::new(dir.path()).expect("store initializes");

        store.save("id", BodyRole::Request, "ping");
        store.save("id", BodyRole::Response, "pong");
        store.delete("id");
        assert_eq!(store.load("id", BodyRole::Request).await, None);
        assert_eq!(store.load("id", BodyRole::Response).await, None);
    }

    #[tokio::test]
    async fn clear_all_empties_and_recreates_directory() {
        let dir = tempdir().expect("temp dir");
        let store = BodyStore::new(dir.path()).expect("store initializes");

        store.save("a", BodyRole::Request, "one");
        store.save("b", BodyRole::Response, "two");
        store.clear_all();
        store.flush().await;

        assert!(dir.path().exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(store.load("a", BodyRole::Request).await, None);
    }

    #[tokio::test]
    async fn writes_after_clear_land_in_fresh_directory() {
        let dir = tempdir().expect("temp dir");
        let store = BodyStore::new(dir.path()).expect("store initializes");

        store.save("a", BodyRole::Request, "old");
        store.clear_all();
        store.save("a", BodyRole::Request, "new");
        assert_eq!(
            store.load("a", BodyRole::Request).await.as_deref(),
            Some("new")
        );
    }

    #[tokio::test]
    async fn launch_clear_respects_preserve_preference() {
        let dir = tempdir().expect("temp dir");
        let store = BodyStore::new(&dir.path().join("bodies")).expect("store initializes");
        let prefs = Preferences::load(dir.path()).expect("prefs load");

        store.save("keep", BodyRole::Request, "body");
        prefs.set_preserve_log(true);
        store.clear_on_launch_if_needed(&prefs);
        assert_eq!(
            store.load("keep", BodyRole::Request).await.as_deref(),
            Some("body")
        );

        prefs.set_preserve_log(false);
        store.clear_on_launch_if_needed(&prefs);
        assert_eq!(store.load("keep", BodyRole::Request).await, None);
    }

    #[test]
    fn load_blocking_round_trips_off_the_runtime() {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let dir = tempdir().expect("temp dir");
        let store = {
            let _guard = runtime.enter();
            BodyStore::new(dir.path()).expect("store initializes")
        };

        store.save("id", BodyRole::Response, "blocking read");
        assert_eq!(
            store.load_blocking("id", BodyRole::Response).as_deref(),
            Some("blocking read")
        );
    }
}
