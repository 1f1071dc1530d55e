// src/models/mod.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized property listing pulled off the source site.
///
/// Field names on the wire match the legacy export (camelCase). `id` is the
/// 7-digit reference the site prints in front of every listing title; a row
/// without a parsable id is dropped by the scanner, never emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub title: String,
    pub property_type: Option<String>,
    pub description: Option<String>,
    pub rent: Option<String>,
    pub charges: Option<String>,
    pub surface_area: Option<String>,
    pub availability: Option<String>,
    pub images: Vec<String>,
    pub energy_class: Option<String>,
    pub bulletin_number: Option<String>,
    /// DD/MM/YYYY as printed in the bulletin banner.
    pub bulletin_date: Option<String>,
    pub phone: Option<String>,
    pub extracted_at: DateTime<Utc>,
    pub status: RecordStatus,
}

impl Record {
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            property_type: None,
            description: None,
            rent: None,
            charges: None,
            surface_area: None,
            availability: None,
            images: Vec::new(),
            energy_class: None,
            bulletin_number: None,
            bulletin_date: None,
            phone: None,
            extracted_at: Utc::now(),
            status: RecordStatus::Extracted,
        }
    }

    /// Stable de-duplication key across runs: `(id, bulletinDate)` with the
    /// date's slashes flattened so the key is usable as a document id.
    pub fn document_key(&self) -> String {
        match &self.bulletin_date {
            Some(date) => format!("{}_{}", self.id, date.replace('/', "-")),
            None => format!("{}_no-date", self.id),
        }
    }
}

/// `complete` only when a phone number was captured on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Extracted,
    Complete,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Extracted => "extracted",
            RecordStatus::Complete => "complete",
        }
    }
}

/// Immutable per-session configuration, received with the start message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOptions {
    /// Traverse every result page instead of only the current one.
    pub batch_mode: bool,
    /// Run the phone-reveal protocol for each record.
    pub extract_phones: bool,
    pub destination: Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    File,
    Remote,
}

/// Subscriber credentials for the source site, kept in the blob store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Remote document store configuration, kept in the blob store under
/// `remoteStoreConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    pub api_key: String,
    pub project_id: String,
    /// Overrides the service endpoint; tests point this at a mock server.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_listing_collection")]
    pub listing_collection: String,
    #[serde(default = "default_bulletin_collection")]
    pub bulletin_collection: String,
}

fn default_listing_collection() -> String {
    "annonces".to_string()
}

fn default_bulletin_collection() -> String {
    "bulletins".to_string()
}

/// Final counters reported with the completion event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub extracted: usize,
    pub phones: usize,
    pub total: usize,
}

/// Outcome tally of one remote upload batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTally {
    pub success: usize,
    pub duplicates: usize,
    pub errors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_key_flattens_bulletin_date() {
        let mut record = Record::new("1234567".into(), "Nice Flat".into());
        record.bulletin_date = Some("01/02/2024".into());
        assert_eq!(record.document_key(), "1234567_01-02-2024");
    }

    #[test]
    fn document_key_without_date() {
        let record = Record::new("7654321".into(), "Studio".into());
        assert_eq!(record.document_key(), "7654321_no-date");
    }

    #[test]
    fn record_serializes_with_legacy_field_names() {
        let record = Record::new("1234567".into(), "Nice Flat".into());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "1234567");
        assert_eq!(json["propertyType"], serde_json::Value::Null);
        assert_eq!(json["status"], "extracted");
    }

    #[test]
    fn options_deserialize_from_control_payload() {
        let options: ExtractionOptions = serde_json::from_str(
            r#"{"batchMode":true,"extractPhones":false,"destination":"remote"}"#,
        )
        .unwrap();
        assert!(options.batch_mode);
        assert!(!options.extract_phones);
        assert_eq!(options.destination, Destination::Remote);
    }

    #[test]
    fn remote_config_defaults_collections() {
        let config: RemoteConfig =
            serde_json::from_str(r#"{"apiKey":"k","projectId":"p"}"#).unwrap();
        assert_eq!(config.listing_collection, "annonces");
        assert_eq!(config.bulletin_collection, "bulletins");
        assert!(config.base_url.is_none());
    }
}
