// src/lib.rs

//! Extraction engine for a session-authenticated legacy listing site.
//!
//! The crate is embedded, not a CLI: the host environment owns the browser
//! page and the persistent blob store, and drives the engine through the
//! control messages in [`engine::ControlMessage`]. Progress, logs and the
//! terminal outcome come back on a bounded, best-effort event feed.
//!
//! The pipeline: the [`scanner`] discovers listing rows on the current page
//! and parses them through the [`patterns`] library, the [`pagination`]
//! controller walks the result pages, and the [`engine`] orchestrates the
//! whole run under fixed pacing with cooperative cancellation, handing the
//! accumulated set to the [`sink`] (CSV export or remote document store).

pub mod auth;
pub mod engine;
pub mod host;
pub mod models;
pub mod pagination;
pub mod patterns;
pub mod profile;
pub mod scanner;
pub mod sink;
pub mod storage;
pub mod utils;

pub use engine::events::{Event, EventSender, ProgressStats, Severity};
pub use engine::session::CancelToken;
pub use engine::{Ack, ControlMessage, Engine, EngineConfig, Outcome, SessionReport};
pub use host::SiteSession;
pub use models::{
    Credentials, Destination, ExtractionOptions, Record, RecordStatus, RemoteConfig,
    SessionStats, UploadTally,
};
pub use profile::{Pacing, SiteProfile};
pub use sink::SinkReport;
pub use storage::{BlobStore, FileStore, MemoryStore};
pub use utils::error::{EngineError, HostError, RemoteError, StorageError};
