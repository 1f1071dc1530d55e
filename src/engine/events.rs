// src/engine/events.rs
use crate::models::SessionStats;
use serde::Serialize;
use tokio::sync::mpsc;

/// Log levels mirrored to the UI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Progress snapshot recomputed on every record. Times are whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub extracted: usize,
    pub total: usize,
    pub phones: usize,
    pub elapsed_time: u64,
    pub estimated_time_remaining: u64,
    pub estimated_total_time: u64,
    pub progress: u8,
}

/// Messages on the orchestrator → UI feed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Event {
    UpdateStats { data: ProgressStats },
    Log { text: String, severity: Severity },
    ExtractionComplete { stats: SessionStats },
    ExtractionError { message: String },
}

/// Bounded, best-effort sender side of the event feed. Delivery is
/// fire-and-forget: a full or closed channel drops the event, it never
/// blocks or fails the extraction.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: Event) {
        let _ = self.tx.try_send(event);
    }

    /// Logs through `tracing` and mirrors the line onto the feed. The feed
    /// is best-effort, the log is not.
    pub fn log(&self, text: impl Into<String>, severity: Severity) {
        let text = text.into();
        match severity {
            Severity::Info | Severity::Success => tracing::info!("{text}"),
            Severity::Warning => tracing::warn!("{text}"),
            Severity::Error => tracing::error!("{text}"),
        }
        self.emit(Event::Log { text, severity });
    }
}
