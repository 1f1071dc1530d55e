// src/sink/mod.rs
pub mod csv;
pub mod remote;

use crate::engine::events::{EventSender, Severity};
use crate::host::SiteSession;
use crate::models::{Destination, ExtractionOptions, Record, RemoteConfig, UploadTally};
use crate::storage::{self, keys, BlobStore};
use chrono::Utc;
use remote::RemoteStore;
use std::path::{Path, PathBuf};

/// What the sink produced for one session.
#[derive(Debug, Default)]
pub struct SinkReport {
    pub csv_file: Option<PathBuf>,
    pub upload: Option<UploadTally>,
}

/// Persists the accumulated record set. The local blob store is always
/// written first as the durability safety net; the chosen destination runs
/// after it. Sink failures are logged and absorbed, never raised back into
/// the session.
pub async fn persist<H: SiteSession>(
    records: &[Record],
    options: &ExtractionOptions,
    store: &dyn BlobStore,
    host: &H,
    export_dir: &Path,
    events: &EventSender,
) -> SinkReport {
    if let Err(err) = storage::save(store, keys::EXTRACTED_DATA, &records) {
        events.log(format!("Local save failed: {err}"), Severity::Error);
    } else {
        events.log(
            format!("{} records saved locally", records.len()),
            Severity::Success,
        );
    }
    if let Err(err) = store.set(
        keys::LAST_EXTRACTION,
        serde_json::json!(Utc::now().to_rfc3339()),
    ) {
        tracing::error!("Failed to stamp the extraction time: {err}");
    }

    match options.destination {
        Destination::File => SinkReport {
            csv_file: export_csv(records, host, export_dir, events).await,
            upload: None,
        },
        Destination::Remote => SinkReport {
            csv_file: None,
            upload: upload_remote(records, store, events).await,
        },
    }
}

/// Writes the CSV export into the configured directory, falling back to the
/// host's download mechanism when the direct write fails.
async fn export_csv<H: SiteSession>(
    records: &[Record],
    host: &H,
    export_dir: &Path,
    events: &EventSender,
) -> Option<PathBuf> {
    if records.is_empty() {
        events.log("No records to export", Severity::Warning);
        return None;
    }

    let content = csv::to_csv(records);
    let filename = format!("bep_annonces_{}.csv", Utc::now().format("%Y-%m-%d"));
    let path = export_dir.join(&filename);

    match tokio::fs::write(&path, &content).await {
        Ok(()) => {
            events.log(
                format!("CSV export written to {}", path.display()),
                Severity::Success,
            );
            Some(path)
        }
        Err(err) => {
            events.log(
                format!("CSV write failed ({err}), handing the export to the host"),
                Severity::Warning,
            );
            match host.download(&filename, &content).await {
                Ok(()) => {
                    events.log("CSV export handed to the host download", Severity::Success);
                    None
                }
                Err(host_err) => {
                    events.log(format!("CSV export failed: {host_err}"), Severity::Error);
                    None
                }
            }
        }
    }
}

/// Uploads to the remote document store when it is configured; otherwise the
/// records stay local only.
async fn upload_remote(
    records: &[Record],
    store: &dyn BlobStore,
    events: &EventSender,
) -> Option<UploadTally> {
    let config = match storage::load::<RemoteConfig>(store, keys::REMOTE_CONFIG) {
        Ok(Some(config)) => config,
        Ok(None) => {
            events.log(
                "Remote store not configured, records kept locally only",
                Severity::Warning,
            );
            return None;
        }
        Err(err) => {
            events.log(
                format!("Remote store configuration unreadable: {err}"),
                Severity::Error,
            );
            return None;
        }
    };

    let remote = match RemoteStore::new(&config) {
        Ok(remote) => remote,
        Err(err) => {
            events.log(format!("Remote store unavailable: {err}"), Severity::Error);
            return None;
        }
    };

    let tally = remote.save_records(records).await;
    remote.update_bulletin_stats(records).await;

    let severity = if tally.errors > 0 {
        Severity::Warning
    } else {
        Severity::Success
    };
    events.log(
        format!(
            "Remote upload finished: {} saved, {} duplicates, {} errors",
            tally.success, tally.duplicates, tally.errors
        ),
        severity,
    );
    Some(tally)
}
