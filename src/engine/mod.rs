// src/engine/mod.rs
pub mod events;
pub mod session;

use crate::auth;
use crate::host::SiteSession;
use crate::models::{ExtractionOptions, SessionStats};
use crate::pagination;
use crate::patterns;
use crate::profile::{Pacing, SiteProfile};
use crate::scanner::{self, ScannedRecord};
use crate::sink::{self, SinkReport};
use crate::storage::{self, keys, BlobStore};
use crate::utils::error::EngineError;
use events::{Event, EventSender, Severity};
use scraper::Html;
use serde::{Deserialize, Serialize};
use session::{CancelToken, ExtractionSession};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Control surface of the extraction engine, as received from the UI
/// collaborator.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlMessage {
    StartExtraction { options: ExtractionOptions },
    StopExtraction,
}

/// Synchronous acknowledgement of a control message.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

/// Terminal state of a session that ran to a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

/// What one session produced, reported alongside the completion event.
#[derive(Debug)]
pub struct SessionReport {
    pub outcome: Outcome,
    pub stats: SessionStats,
    pub sink: SinkReport,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub profile: SiteProfile,
    pub pacing: Pacing,
    /// Where CSV exports land.
    pub export_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: SiteProfile::default(),
            pacing: Pacing::default(),
            export_dir: PathBuf::from("."),
        }
    }
}

/// The extraction orchestrator. One engine drives at most one session at a
/// time over the single page the host has open; all session state lives
/// inside the running call, the engine itself only carries the running flag
/// and the cancel token.
pub struct Engine<H> {
    host: Arc<H>,
    store: Arc<dyn BlobStore>,
    events: EventSender,
    config: Arc<EngineConfig>,
    running: Arc<AtomicBool>,
    cancel: CancelToken,
}

impl<H> Clone for Engine<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            store: Arc::clone(&self.store),
            events: self.events.clone(),
            config: Arc::clone(&self.config),
            running: Arc::clone(&self.running),
            cancel: self.cancel.clone(),
        }
    }
}

impl<H: SiteSession> Engine<H> {
    pub fn new(
        host: H,
        store: Arc<dyn BlobStore>,
        events: EventSender,
        config: EngineConfig,
    ) -> Self {
        Self {
            host: Arc::new(host),
            store,
            events,
            config: Arc::new(config),
            running: Arc::new(AtomicBool::new(false)),
            cancel: CancelToken::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Shared handle to the underlying host, for embedders that drive the
    /// same page outside the engine.
    pub fn host_handle(&self) -> Arc<H> {
        Arc::clone(&self.host)
    }

    /// Runs one extraction session to its terminal state. Exactly one
    /// terminal event is emitted: `extractionComplete` for completed and
    /// cancelled sessions, `extractionError` otherwise.
    pub async fn start(
        &self,
        options: ExtractionOptions,
    ) -> Result<SessionReport, EngineError> {
        if self.running.swap(true, Ordering::SeqCst) {
            self.events
                .log("Extraction already in progress", Severity::Warning);
            return Err(EngineError::AlreadyRunning);
        }
        self.cancel.reset();

        let result = self.run_session(&options).await;
        self.running.store(false, Ordering::SeqCst);

        match result {
            Ok(report) => {
                if let Err(err) =
                    storage::save(self.store.as_ref(), keys::EXTRACTION_STATS, &report.stats)
                {
                    tracing::error!("Failed to store session stats: {err}");
                }
                self.events.log(
                    format!(
                        "Extraction finished: {} records, {} phones",
                        report.stats.extracted, report.stats.phones
                    ),
                    Severity::Success,
                );
                self.events.emit(Event::ExtractionComplete {
                    stats: report.stats,
                });
                Ok(report)
            }
            Err(err) => {
                self.events
                    .log(format!("Extraction failed: {err}"), Severity::Error);
                self.events.emit(Event::ExtractionError {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Requests cooperative cancellation. Takes effect after the record or
    /// page currently being worked on; an in-flight wait is not interrupted.
    pub fn stop(&self) -> Ack {
        if !self.running.load(Ordering::SeqCst) {
            return Ack::fail("no extraction in progress");
        }
        self.cancel.cancel();
        self.events.log(
            "Stop requested, finishing the current record",
            Severity::Warning,
        );
        Ack::ok()
    }

    /// Attempts an automatic login with the stored credentials.
    pub async fn auto_login(&self) -> Result<bool, EngineError> {
        auth::auto_login(
            self.host.as_ref(),
            self.store.as_ref(),
            &self.config.profile,
            &self.config.pacing,
            &self.events,
        )
        .await
    }

    async fn run_session(
        &self,
        options: &ExtractionOptions,
    ) -> Result<SessionReport, EngineError> {
        let html = self.host.current_html().await?;
        let url = self.host.current_url().await?;
        {
            let document = Html::parse_document(&html);
            if auth::is_login_page(&url, &document, &self.config.profile) {
                return Err(EngineError::Precondition(
                    "authentication page detected, log in first".into(),
                ));
            }
        }

        let mut session = ExtractionSession::new(options.clone());
        let initial_total = {
            let document = Html::parse_document(&html);
            let on_page = scanner::find_record_rows(&document, &self.config.profile).len();
            pagination::estimate_total(
                &document,
                on_page,
                options.batch_mode,
                &self.config.profile,
            )
        };
        session.counters.estimated_total = initial_total;
        self.events.log(
            format!("Estimated {initial_total} records to extract"),
            Severity::Info,
        );
        self.emit_stats(&session);

        let loop_result = if options.batch_mode {
            self.extract_all_pages(&mut session).await
        } else {
            self.extract_single_page(&mut session, &html).await
        };

        match loop_result {
            Ok(()) => {
                let outcome = if self.cancel.is_cancelled() {
                    self.events.log("Extraction stopped", Severity::Warning);
                    Outcome::Cancelled
                } else {
                    Outcome::Completed
                };
                let sink = sink::persist(
                    &session.records,
                    options,
                    self.store.as_ref(),
                    self.host.as_ref(),
                    &self.config.export_dir,
                    &self.events,
                )
                .await;
                Ok(SessionReport {
                    outcome,
                    stats: session.stats(),
                    sink,
                })
            }
            Err(err) => {
                // Records gathered so far are kept locally; no remote upload
                // happens on a failed session.
                if let Err(store_err) =
                    storage::save(self.store.as_ref(), keys::EXTRACTED_DATA, &session.records)
                {
                    tracing::error!("Safety-net save failed: {store_err}");
                }
                Err(err)
            }
        }
    }

    /// Batch mode: scan, process, advance, until the pager runs out or a
    /// stop is requested. The running discovered count replaces the initial
    /// estimate as pages are visited.
    async fn extract_all_pages(
        &self,
        session: &mut ExtractionSession,
    ) -> Result<(), EngineError> {
        let mut page = 1usize;
        let mut discovered = 0usize;
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            self.events
                .log(format!("Extracting page {page}"), Severity::Info);

            let html = self.host.current_html().await?;
            let (scans, next_link) = {
                let document = Html::parse_document(&html);
                (
                    scanner::scan_page(&document, &self.config.profile),
                    pagination::next_page_link(&document, &self.config.profile),
                )
            };

            discovered += scans.len();
            session.counters.estimated_total = discovered;
            self.emit_stats(session);

            self.process_page(session, scans).await;

            if self.cancel.is_cancelled() {
                break;
            }
            let Some(href) = next_link else {
                self.events.log("Last page reached", Severity::Info);
                break;
            };
            self.advance(&href).await?;
            page += 1;
            tokio::time::sleep(self.config.pacing.page_delay).await;
        }
        Ok(())
    }

    async fn extract_single_page(
        &self,
        session: &mut ExtractionSession,
        html: &str,
    ) -> Result<(), EngineError> {
        let scans = {
            let document = Html::parse_document(html);
            scanner::scan_page(&document, &self.config.profile)
        };
        self.process_page(session, scans).await;
        Ok(())
    }

    /// Page-local record loop, in document order. Parse misses are logged
    /// and skipped; the inter-record politeness delay runs after every
    /// element, miss or not, as long as no stop was requested.
    async fn process_page(
        &self,
        session: &mut ExtractionSession,
        scans: Vec<Option<ScannedRecord>>,
    ) {
        let found = scans.len();
        self.events
            .log(format!("{found} records found on this page"), Severity::Info);
        if found == 0 {
            self.events.log(
                "No records found, check that the listing page is open",
                Severity::Warning,
            );
            return;
        }

        for (index, scan) in scans.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            match scan {
                Some(mut scanned) => {
                    if session.options.extract_phones {
                        self.reveal_phone(&mut scanned).await;
                    }
                    let id = scanned.record.id.clone();
                    session.push(scanned.record);
                    self.emit_stats(session);
                    self.events
                        .log(format!("Record {id} extracted"), Severity::Success);
                }
                None => {
                    self.events.log(
                        format!("Failed to parse record {} of {found}", index + 1),
                        Severity::Warning,
                    );
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }
            tokio::time::sleep(self.config.pacing.record_delay).await;
        }
    }

    /// Phone enrichment: trigger the request affordance, wait the fixed
    /// response window, then scan the refreshed page text. Every failure
    /// mode degrades to "no phone" and the record stays `extracted`.
    async fn reveal_phone(&self, scanned: &mut ScannedRecord) {
        let id = scanned.record.id.clone();
        let Some(onclick) = scanned.reveal_onclick.as_deref() else {
            self.events.log(
                format!("No phone-request affordance for record {id}"),
                Severity::Warning,
            );
            return;
        };
        let Some(request_id) = patterns::parse_request_id(onclick) else {
            self.events.log(
                format!("Could not read the request id for record {id}"),
                Severity::Error,
            );
            return;
        };

        let selector = format!(r#"input[onclick*="sendreq({request_id})"]"#);
        if let Err(err) = self.host.trigger(&selector).await {
            self.events.log(
                format!("Phone request failed for record {id}: {err}"),
                Severity::Warning,
            );
            return;
        }

        self.events.log(
            format!("Waiting for the phone response for record {id}"),
            Severity::Info,
        );
        tokio::time::sleep(self.config.pacing.reveal_wait).await;

        let html = match self.host.current_html().await {
            Ok(html) => html,
            Err(err) => {
                self.events.log(
                    format!("Could not re-read the page for record {id}: {err}"),
                    Severity::Warning,
                );
                return;
            }
        };
        let page_text = {
            let document = Html::parse_document(&html);
            document.root_element().text().collect::<String>()
        };

        match patterns::parse_phone(&page_text) {
            Some(phone) => {
                self.events.log(
                    format!("Phone found for record {id}: {phone}"),
                    Severity::Success,
                );
                scanned.record.phone = Some(phone);
                scanned.record.status = crate::models::RecordStatus::Complete;
            }
            None => {
                self.events.log(
                    format!("No phone found for record {id}"),
                    Severity::Warning,
                );
            }
        }
    }

    async fn advance(&self, href: &str) -> Result<(), EngineError> {
        self.events.log("Moving to the next page", Severity::Info);
        self.host.follow(href).await?;
        // Fixed settle floor; the legacy site is never polled for readiness.
        tokio::time::sleep(self.config.pacing.page_settle).await;
        Ok(())
    }

    fn emit_stats(&self, session: &ExtractionSession) {
        self.events.emit(Event::UpdateStats {
            data: session.progress(),
        });
    }
}

impl<H: SiteSession + 'static> Engine<H> {
    /// Handles one control message, acknowledging synchronously. Starting
    /// spawns the session onto the runtime; its outcome arrives on the event
    /// feed.
    pub fn dispatch(&self, message: ControlMessage) -> Ack {
        match message {
            ControlMessage::StartExtraction { options } => {
                if self.running.load(Ordering::SeqCst) {
                    return Ack::fail("extraction already running");
                }
                let engine = self.clone();
                tokio::spawn(async move {
                    let _ = engine.start(options).await;
                });
                Ack::ok()
            }
            ControlMessage::StopExtraction => self.stop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_messages_deserialize_from_wire_shape() {
        let message: ControlMessage = serde_json::from_str(
            r#"{"action":"startExtraction","options":{"batchMode":false,"extractPhones":true,"destination":"file"}}"#,
        )
        .unwrap();
        match message {
            ControlMessage::StartExtraction { options } => {
                assert!(!options.batch_mode);
                assert!(options.extract_phones);
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let message: ControlMessage =
            serde_json::from_str(r#"{"action":"stopExtraction"}"#).unwrap();
        assert!(matches!(message, ControlMessage::StopExtraction));
    }

    #[test]
    fn ack_serializes_without_null_error() {
        let json = serde_json::to_value(Ack::ok()).unwrap();
        assert_eq!(json, serde_json::json!({"success": true}));

        let json = serde_json::to_value(Ack::fail("nope")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "nope");
    }
}
