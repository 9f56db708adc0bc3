//! Traffic ledger
//!
//! The bounded, ordered, observable record of captured exchanges. The ledger
//! owns the capture on/off gate, enforces the maximum-entry policy with FIFO
//! eviction, and coordinates with the body store: full bodies are written on
//! insert and deleted when their record is evicted or cleared.
//!
//! Mutations serialize through one writer lock; the body store serializes
//! its own disk work on its worker task. The two are deliberately not
//! ordered against each other: a record can appear in the ledger before its
//! full body has hit disk, because the embedded preview is already enough
//! for immediate display.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::config::{InspectorConfig, Preferences};
use crate::models::{BodyRole, CaptureRecord, RequestType};
use crate::storage::BodyStore;

const EVENT_CHANNEL_CAPACITY: usize = 512;

/// Change notification emitted on every ledger mutation.
///
/// Lagging subscribers miss events rather than blocking the ledger; they can
/// always resynchronize from [`TrafficLedger::snapshot`].
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    /// A new exchange was recorded
    Began(CaptureRecord),
    /// An existing exchange received its response or error
    Completed(CaptureRecord),
    /// The oldest record was evicted to make room
    Evicted(String),
    /// All records were removed
    Cleared,
}

/// Bounded, ordered collection of capture records
pub struct TrafficLedger {
    records: RwLock<VecDeque<CaptureRecord>>,
    capacity: usize,
    preview_len: usize,
    capturing: AtomicBool,
    store: Arc<BodyStore>,
    prefs: Arc<Preferences>,
    events: broadcast::Sender<LedgerEvent>,
}

impl TrafficLedger {
    /// Create a ledger backed by `store`, with capacity and preview length
    /// taken from `config`.
    pub fn new(config: &InspectorConfig, store: Arc<BodyStore>, prefs: Arc<Preferences>) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        // A ledger that can hold nothing is useless; treat 0 as 1
        let capacity = config.max_records.max(1);
        Self {
            records: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            preview_len: config.preview_len,
            capturing: AtomicBool::new(true),
            store,
            prefs,
            events,
        }
    }

    /// Subscribe to ledger change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Toggle capture. While off, `begin_request` records nothing; completions
    /// for already-recorded exchanges still apply.
    pub fn set_capturing(&self, enabled: bool) {
        self.capturing.store(enabled, Ordering::SeqCst);
    }

    /// Whether new requests are currently being recorded
    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    /// Record the start of an exchange.
    ///
    /// A malformed `id` is silently replaced with a fresh one. If the ledger
    /// is at capacity the single oldest record is evicted and its stored
    /// bodies are scheduled for deletion.
    pub async fn begin_request(
        &self,
        id: &str,
        method: &str,
        url: &str,
        request_type: &str,
        headers: Option<HashMap<String, String>>,
        body: Option<String>,
    ) {
        if !self.is_capturing() {
            return;
        }
        let id = normalize_id(id);
        if let Some(body) = body.as_deref() {
            self.store.save(&id, BodyRole::Request, body);
        }
        let preview = body.as_deref().map(|b| truncate(b, self.preview_len));
        let record = CaptureRecord::new(
            id,
            method,
            url,
            RequestType::from_str_lossy(request_type),
            headers,
            preview,
        );

        let mut records = self.records.write().await;
        while records.len() >= self.capacity {
            let Some(oldest) = records.pop_front() else {
                break;
            };
            self.store.delete(&oldest.id);
            let _ = self.events.send(LedgerEvent::Evicted(oldest.id));
        }
        records.push_back(record.clone());
        drop(records);
        let _ = self.events.send(LedgerEvent::Began(record));
    }

    /// Record the completion of an exchange.
    ///
    /// Unknown ids are silently dropped; the body write is scheduled before
    /// the lookup, so a completion racing an eviction may leave an orphaned
    /// body file behind until the next full clear. That file is harmless.
    pub async fn complete_request(
        &self,
        id: &str,
        status: Option<u16>,
        status_text: Option<String>,
        headers: Option<HashMap<String, String>>,
        body: Option<String>,
        error: Option<String>,
    ) {
        let id = normalize_id(id);
        if let Some(body) = body.as_deref() {
            self.store.save(&id, BodyRole::Response, body);
        }
        let preview = body.as_deref().map(|b| truncate(b, self.preview_len));

        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            tracing::debug!("Dropping completion for unknown request {}", id);
            return;
        };
        record.status = status;
        record.status_text = status_text;
        record.response_headers = headers;
        record.response_body_preview = preview;
        record.error = error;
        record.end_time = Some(chrono::Utc::now().timestamp_millis());
        let updated = record.clone();
        drop(records);
        let _ = self.events.send(LedgerEvent::Completed(updated));
    }

    /// Remove every record and wipe the body store directory
    pub async fn clear(&self) {
        let mut records = self.records.write().await;
        let removed = records.len();
        records.clear();
        drop(records);
        self.store.clear_all();
        let _ = self.events.send(LedgerEvent::Cleared);
        tracing::info!("Cleared {} captured requests", removed);
    }

    /// Clear unless the preserve-log preference is set
    pub async fn clear_if_not_preserved(&self) {
        if !self.prefs.preserve_log() {
            self.clear().await;
        }
    }

    /// Current records in insertion order
    pub async fn snapshot(&self) -> Vec<CaptureRecord> {
        self.records.read().await.iter().cloned().collect()
    }

    /// Number of records currently held
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the ledger holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Look up a single record by id
    pub async fn get(&self, id: &str) -> Option<CaptureRecord> {
        self.records.read().await.iter().find(|r| r.id == id).cloned()
    }

    /// Number of exchanges still waiting for a response or error
    pub async fn pending_count(&self) -> usize {
        self.records.read().await.iter().filter(|r| r.is_pending()).count()
    }

    /// Number of exchanges that failed, by explicit error or status >= 400
    pub async fn error_count(&self) -> usize {
        self.records.read().await.iter().filter(|r| r.is_failed()).count()
    }

    /// Number of insecure requests observed while the hosting page is secure
    pub async fn mixed_content_count(&self, page_url: &str) -> usize {
        if !page_url.starts_with("https://") {
            return 0;
        }
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.url.starts_with("http://"))
            .count()
    }

    /// Fetch the full body for a record, beyond its in-memory preview.
    /// Returns `None` if the body was never stored or failed to persist.
    pub async fn load_full_body(&self, id: &str, role: BodyRole) -> Option<String> {
        self.store.load(id, role).await
    }
}

/// Accept well-formed UUIDs as-is; substitute a fresh one otherwise.
/// Keeps ids filesystem-safe and never surfaces an error to the caller.
fn normalize_id(raw: &str) -> String {
    match Uuid::parse_str(raw) {
        Ok(uuid) => uuid.to_string(),
        Err(_) => Uuid::new_v4().to_string(),
    }
}

/// Character-bounded prefix of a body
fn truncate(body: &str, limit: usize) -> String {
    body.chars().take(limit).collect()
}
