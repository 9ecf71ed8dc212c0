// logsink/src/storage/mongo.rs
use anyhow::{Context, Result};
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::{Client, Collection, IndexModel};
use serde_json::Value;
use tracing::debug;

use super::record::LogRecord;
use crate::config::StorageConfig;

const LOGS_COLLECTION: &str = "logs";

/// Document log store writing to a single MongoDB collection.
pub struct MongoLogStore {
    collection: Collection<Document>,
}

impl MongoLogStore {
    /// Connects and pings the server. The ping is what actually verifies
    /// reachability; the client itself connects lazily.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let client = Client::with_uri_str(config.mongo_url()?)
            .await
            .context("failed to parse MongoDB connection string")?;
        let database = client.database(&config.mongo_database());

        database
            .run_command(doc! { "ping": 1 })
            .await
            .context("failed to reach MongoDB")?;

        Ok(Self {
            collection: database.collection(LOGS_COLLECTION),
        })
    }

    /// Descending timestamp index, mirroring the relational schema. Failure
    /// here is fatal.
    pub async fn ensure_index(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "timestamp": -1 })
            .build();
        self.collection
            .create_index(index)
            .await
            .context("failed to create timestamp index on logs collection")?;
        debug!("✓ MongoDB index ready");
        Ok(())
    }

    pub async fn insert(&self, record: &LogRecord) -> Result<()> {
        let document = record_to_document(record)?;
        self.collection
            .insert_one(document)
            .await
            .context("failed to insert log document into MongoDB")?;
        Ok(())
    }
}

/// Converts a record into the stored document. Every field is written, with
/// explicit nulls for absent values, so documents from both ingest shapes
/// carry the same key set.
fn record_to_document(record: &LogRecord) -> Result<Document> {
    let mut document = Document::new();
    document.insert(
        "timestamp",
        BsonDateTime::from_millis(record.timestamp.timestamp_millis()),
    );
    document.insert("apiUrl", string_or_null(&record.api_url));
    document.insert("headers", json_or_null(&record.headers)?);
    document.insert("requestBody", json_or_null(&record.request_body)?);
    document.insert("responseBody", json_or_null(&record.response_body)?);
    document.insert("userId", string_or_null(&record.user_id));
    document.insert("event", string_or_null(&record.event));
    document.insert("entity", string_or_null(&record.entity));
    document.insert("entityId", string_or_null(&record.entity_id));
    document.insert("actor", json_or_null(&record.actor)?);
    document.insert("request", json_or_null(&record.request)?);
    document.insert("response", json_or_null(&record.response)?);
    document.insert("metadata", json_or_null(&record.metadata)?);
    Ok(document)
}

fn string_or_null(value: &Option<String>) -> Bson {
    match value {
        Some(s) => Bson::String(s.clone()),
        None => Bson::Null,
    }
}

fn json_or_null(value: &Option<Value>) -> Result<Bson> {
    match value {
        Some(v) => mongodb::bson::to_bson(v).context("failed to convert JSON value to BSON"),
        None => Ok(Bson::Null),
    }
}
