// src/sink/remote.rs

// --- Imports ---
use crate::models::{Record, RemoteConfig, UploadTally};
use crate::utils::error::RemoteError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One value in the remote store's typed field envelope. Integers ride as
/// strings on the wire, per the store's REST format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    #[serde(rename = "stringValue")]
    Str(String),
    #[serde(rename = "integerValue")]
    Integer(String),
    #[serde(rename = "doubleValue")]
    Double(f64),
    #[serde(rename = "booleanValue")]
    Boolean(bool),
    #[serde(rename = "timestampValue")]
    Timestamp(String),
    #[serde(rename = "arrayValue")]
    Array(ArrayValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub fields: BTreeMap<String, FieldValue>,
}

impl FieldValue {
    fn integer(value: i64) -> Self {
        FieldValue::Integer(value.to_string())
    }

    fn strings(values: &[String]) -> Self {
        FieldValue::Array(ArrayValue {
            values: values.iter().cloned().map(FieldValue::Str).collect(),
        })
    }

    fn timestamp(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value.to_rfc3339())
    }
}

/// Client for the remote document store. Writes are unconditional upserts
/// keyed by the record's `(id, bulletinDate)` document key, so re-running an
/// extraction overwrites rather than duplicates.
pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    listing_collection: String,
    bulletin_collection: String,
}

impl RemoteStore {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        if config.api_key.is_empty() || config.project_id.is_empty() {
            return Err(RemoteError::Config(
                "api key and project id are required".into(),
            ));
        }
        let base_url = config.base_url.clone().unwrap_or_else(|| {
            format!(
                "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
                config.project_id
            )
        });
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: config.api_key.clone(),
            listing_collection: config.listing_collection.clone(),
            bulletin_collection: config.bulletin_collection.clone(),
        })
    }

    /// Uploads every record, isolating failures: a bad record is counted and
    /// the batch continues. A conflict response counts as a duplicate.
    pub async fn save_records(&self, records: &[Record]) -> UploadTally {
        let mut tally = UploadTally::default();
        tracing::info!("Uploading {} records to the remote store", records.len());
        for record in records {
            let document = record_document(record, Utc::now());
            match self
                .upsert(&self.listing_collection, &record.document_key(), &document)
                .await
            {
                Ok(()) => tally.success += 1,
                Err(RemoteError::Conflict) => {
                    tracing::warn!("Record {} already stored, skipped", record.id);
                    tally.duplicates += 1;
                }
                Err(err) => {
                    tracing::error!("Upload failed for record {}: {err}", record.id);
                    tally.errors += 1;
                }
            }
        }
        tracing::info!(
            "Remote upload done: {} saved, {} duplicates, {} errors",
            tally.success,
            tally.duplicates,
            tally.errors
        );
        tally
    }

    /// Maintains the per-bulletin aggregates: record counts and id lists
    /// grouped by `(bulletinNumber, bulletinDate)`. Aggregate failures are
    /// logged per bulletin and never propagate.
    pub async fn update_bulletin_stats(&self, records: &[Record]) {
        let mut groups: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
        for record in records {
            if let (Some(number), Some(date)) =
                (&record.bulletin_number, &record.bulletin_date)
            {
                groups
                    .entry((number.clone(), date.clone()))
                    .or_default()
                    .push(record.id.clone());
            }
        }

        for ((number, date), ids) in groups {
            let key = format!("{}_{}", number, date.replace('/', "-"));
            let document = bulletin_document(&number, &date, &ids, Utc::now());
            match self.upsert(&self.bulletin_collection, &key, &document).await {
                Ok(()) => tracing::debug!("Bulletin {key} aggregate updated ({} records)", ids.len()),
                Err(err) => tracing::error!("Bulletin {key} aggregate update failed: {err}"),
            }
        }
    }

    async fn upsert(
        &self,
        collection: &str,
        doc_id: &str,
        document: &Document,
    ) -> Result<(), RemoteError> {
        let url = format!("{}/{}/{}", self.base_url, collection, doc_id);
        let response = self
            .client
            .patch(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(document)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == reqwest::StatusCode::CONFLICT {
            return Err(RemoteError::Conflict);
        }
        Err(RemoteError::Http(status))
    }
}

/// Flattens a record into the typed envelope. Absent fields are left out of
/// the document entirely; `createdAt`/`lastUpdate` are stamped at upload.
fn record_document(record: &Record, now: DateTime<Utc>) -> Document {
    let mut fields = BTreeMap::new();
    fields.insert("id".to_string(), FieldValue::Str(record.id.clone()));
    fields.insert("title".to_string(), FieldValue::Str(record.title.clone()));
    insert_opt(&mut fields, "propertyType", &record.property_type);
    insert_opt(&mut fields, "description", &record.description);
    insert_opt(&mut fields, "rent", &record.rent);
    insert_opt(&mut fields, "charges", &record.charges);
    insert_opt(&mut fields, "surfaceArea", &record.surface_area);
    insert_opt(&mut fields, "availability", &record.availability);
    fields.insert("images".to_string(), FieldValue::strings(&record.images));
    insert_opt(&mut fields, "energyClass", &record.energy_class);
    insert_opt(&mut fields, "bulletinNumber", &record.bulletin_number);
    insert_opt(&mut fields, "bulletinDate", &record.bulletin_date);
    insert_opt(&mut fields, "phone", &record.phone);
    fields.insert(
        "extractedAt".to_string(),
        FieldValue::timestamp(record.extracted_at),
    );
    fields.insert(
        "status".to_string(),
        FieldValue::Str(record.status.as_str().to_string()),
    );
    fields.insert("createdAt".to_string(), FieldValue::timestamp(now));
    fields.insert("lastUpdate".to_string(), FieldValue::timestamp(now));
    Document { fields }
}

fn bulletin_document(
    number: &str,
    date: &str,
    record_ids: &[String],
    now: DateTime<Utc>,
) -> Document {
    let mut fields = BTreeMap::new();
    fields.insert("number".to_string(), FieldValue::Str(number.to_string()));
    fields.insert("date".to_string(), FieldValue::Str(date.to_string()));
    fields.insert(
        "recordCount".to_string(),
        FieldValue::integer(record_ids.len() as i64),
    );
    fields.insert("recordIds".to_string(), FieldValue::strings(record_ids));
    fields.insert("lastUpdate".to_string(), FieldValue::timestamp(now));
    Document { fields }
}

fn insert_opt(fields: &mut BTreeMap<String, FieldValue>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        fields.insert(key.to_string(), FieldValue::Str(value.clone()));
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(base_url: &str) -> RemoteConfig {
        RemoteConfig {
            api_key: "test-key".into(),
            project_id: "test-project".into(),
            base_url: Some(base_url.to_string()),
            listing_collection: "annonces".into(),
            bulletin_collection: "bulletins".into(),
        }
    }

    fn record(id: &str, date: Option<&str>) -> Record {
        let mut record = Record::new(id.to_string(), "Nice Flat".to_string());
        record.bulletin_date = date.map(str::to_string);
        record
    }

    #[test]
    fn envelope_types_serialize_to_wire_shape() {
        let mut record = record("1234567", Some("01/02/2024"));
        record.rent = Some("650 €".into());
        record.images = vec!["http://photos.test/a.jpg".into()];
        let document = record_document(&record, Utc::now());
        let json = serde_json::to_value(&document).unwrap();

        assert_eq!(json["fields"]["id"]["stringValue"], "1234567");
        assert_eq!(json["fields"]["rent"]["stringValue"], "650 €");
        assert_eq!(
            json["fields"]["images"]["arrayValue"]["values"][0]["stringValue"],
            "http://photos.test/a.jpg"
        );
        assert!(json["fields"]["extractedAt"]["timestampValue"].is_string());
        // Absent fields are omitted, not sent as nulls.
        assert!(json["fields"].get("phone").is_none());
    }

    #[test]
    fn bulletin_document_counts_as_string_integer() {
        let ids = vec!["1234567".to_string(), "7654321".to_string()];
        let document = bulletin_document("118", "01/02/2024", &ids, Utc::now());
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["fields"]["recordCount"]["integerValue"], "2");
        assert_eq!(json["fields"]["number"]["stringValue"], "118");
    }

    #[test]
    fn missing_config_rejected() {
        let mut bad = config("http://unused.test");
        bad.api_key.clear();
        assert!(matches!(
            RemoteStore::new(&bad),
            Err(RemoteError::Config(_))
        ));
    }

    #[tokio::test]
    async fn reruns_hit_the_same_document_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/annonces/1234567_01-02-2024")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .with_status(200)
            .with_body("{}")
            .expect(2)
            .create_async()
            .await;

        let store = RemoteStore::new(&config(&server.url())).unwrap();
        let records = [record("1234567", Some("01/02/2024"))];
        let first = store.save_records(&records).await;
        let second = store.save_records(&records).await;

        mock.assert_async().await;
        assert_eq!(first.success, 1);
        assert_eq!(second.success, 1);
        assert_eq!(second.duplicates, 0);
    }

    #[tokio::test]
    async fn conflict_is_tallied_as_duplicate() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PATCH", "/annonces/1234567_01-02-2024")
            .with_status(409)
            .with_body("{}")
            .create_async()
            .await;

        let store = RemoteStore::new(&config(&server.url())).unwrap();
        let tally = store.save_records(&[record("1234567", Some("01/02/2024"))]).await;
        assert_eq!(tally.duplicates, 1);
        assert_eq!(tally.success, 0);
        assert_eq!(tally.errors, 0);
    }

    #[tokio::test]
    async fn one_bad_record_never_blocks_the_batch() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("PATCH", "/annonces/1111111_no-date")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;
        let passing = server
            .mock("PATCH", "/annonces/2222222_no-date")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let store = RemoteStore::new(&config(&server.url())).unwrap();
        let tally = store
            .save_records(&[record("1111111", None), record("2222222", None)])
            .await;

        failing.assert_async().await;
        passing.assert_async().await;
        assert_eq!(tally.errors, 1);
        assert_eq!(tally.success, 1);
    }

    #[tokio::test]
    async fn bulletin_aggregates_grouped_and_upserted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/bulletins/118_01-02-2024")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "fields": {
                    "recordCount": { "integerValue": "2" },
                    "number": { "stringValue": "118" }
                }
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let store = RemoteStore::new(&config(&server.url())).unwrap();
        let mut first = record("1234567", Some("01/02/2024"));
        first.bulletin_number = Some("118".into());
        let mut second = record("7654321", Some("01/02/2024"));
        second.bulletin_number = Some("118".into());
        // No bulletin banner, never aggregated.
        let third = record("9999999", None);

        store
            .update_bulletin_stats(&[first, second, third])
            .await;
        mock.assert_async().await;
    }
}
