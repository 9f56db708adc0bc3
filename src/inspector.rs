//! Composition root for the capture engine.
//!
//! Wires preferences, the body store, and the ledger together with explicit
//! dependency injection; the hosting application constructs one inspector
//! per process and hands it to both the network observer and the UI.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::{InspectorConfig, Preferences};
use crate::ledger::{LedgerEvent, TrafficLedger};
use crate::models::{BodyRole, CaptureRecord};
use crate::storage::BodyStore;

/// The assembled capture engine
pub struct NetworkInspector {
    config: InspectorConfig,
    prefs: Arc<Preferences>,
    store: Arc<BodyStore>,
    ledger: TrafficLedger,
}

impl NetworkInspector {
    /// Build the engine and apply the launch-time clear rule.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: InspectorConfig) -> anyhow::Result<Self> {
        let prefs = Arc::new(Preferences::load(&config.storage_path)?);
        let store = Arc::new(BodyStore::new(&config.storage_path.join("bodies"))?);
        store.clear_on_launch_if_needed(&prefs);
        let ledger = TrafficLedger::new(&config, Arc::clone(&store), Arc::clone(&prefs));
        tracing::info!(
            "Network inspector initialized, storing bodies under {:?}",
            store.dir()
        );
        Ok(Self {
            config,
            prefs,
            store,
            ledger,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Persisted preferences
    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// The underlying ledger, for consumers that want its full read surface
    pub fn ledger(&self) -> &TrafficLedger {
        &self.ledger
    }

    /// Subscribe to ledger change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.ledger.subscribe()
    }

    // Inbound interface, called by the network observer.

    /// Record the start of an exchange
    pub async fn begin_request(
        &self,
        id: &str,
        method: &str,
        url: &str,
        request_type: &str,
        headers: Option<HashMap<String, String>>,
        body: Option<String>,
    ) {
        self.ledger
            .begin_request(id, method, url, request_type, headers, body)
            .await;
    }

    /// Record the completion of an exchange
    pub async fn complete_request(
        &self,
        id: &str,
        status: Option<u16>,
        status_text: Option<String>,
        headers: Option<HashMap<String, String>>,
        body: Option<String>,
        error: Option<String>,
    ) {
        self.ledger
            .complete_request(id, status, status_text, headers, body, error)
            .await;
    }

    /// Toggle capture of new requests
    pub fn set_capturing(&self, enabled: bool) {
        self.ledger.set_capturing(enabled);
    }

    /// Drop all records and stored bodies
    pub async fn clear(&self) {
        self.ledger.clear().await;
    }

    /// Drop all records and bodies unless the preserve-log preference is set
    pub async fn clear_if_not_preserved(&self) {
        self.ledger.clear_if_not_preserved().await;
    }

    // Outbound interface, consumed by the presentation layer.

    /// Current records in insertion order
    pub async fn snapshot(&self) -> Vec<CaptureRecord> {
        self.ledger.snapshot().await
    }

    /// Fetch a record's full body, beyond its in-memory preview
    pub async fn load_full_body(&self, id: &str, role: BodyRole) -> Option<String> {
        self.store.load(id, role).await
    }

    /// Blocking variant of [`load_full_body`](Self::load_full_body) for
    /// callers off the async runtime
    pub fn load_full_body_blocking(&self, id: &str, role: BodyRole) -> Option<String> {
        self.store.load_blocking(id, role)
    }
}
