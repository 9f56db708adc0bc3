//! # NetLens Core
//!
//! Traffic-capture engine for the NetLens in-app network inspector: records
//! request/response exchanges observed from an embedded web view, keeps a
//! bounded ordered ledger of them in memory, offloads full bodies to a
//! disk-backed store, and classifies body content types.
//!
//! The browser shell feeds the engine discrete "request started" and
//! "request finished" events; the presentation layer reads snapshots and
//! change notifications back out. Nothing here intercepts traffic itself.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                Browser shell (observer)               │
//! ├──────────────────────────────────────────────────────┤
//! │                  NetLens Core (Rust)                  │
//! │  ┌───────────┐  ┌────────────┐  ┌────────────────┐   │
//! │  │  Traffic  │  │   Body     │  │    Content     │   │
//! │  │  Ledger   │──│   Store    │  │    Sniffer     │   │
//! │  └───────────┘  └────────────┘  └────────────────┘   │
//! ├──────────────────────────────────────────────────────┤
//! │              Presentation layer (reader)              │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod inspector;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod sniff;
pub mod storage;

pub use config::{InspectorConfig, Preferences};
pub use inspector::NetworkInspector;
pub use ledger::{LedgerEvent, TrafficLedger};
pub use models::{BodyRole, CaptureRecord, RequestType};
pub use sniff::ContentKind;
pub use storage::BodyStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
