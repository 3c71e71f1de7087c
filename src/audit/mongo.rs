//! MongoDB audit sink
//!
//! One collection per entity name inside the audit database; documents are
//! `{action, details, timestamp, user?}`.

use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::{options::IndexOptions, Client, IndexModel};
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{AuditRecord, AuditSink};
use crate::types::HortaError;

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping the database
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, HortaError> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast when MongoDB is unreachable
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Self::connect(&timeout_uri, db_name).await?;

        client
            .client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| HortaError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(client)
    }

    /// Build a client without contacting the server
    pub(crate) async fn connect(uri: &str, db_name: &str) -> Result<Self, HortaError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| HortaError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Writes audit records into MongoDB
pub struct MongoAuditSink {
    client: MongoClient,
    /// Collections whose timestamp index has been attempted
    indexed: Mutex<HashSet<String>>,
}

impl MongoAuditSink {
    pub fn new(client: MongoClient) -> Self {
        Self {
            client,
            indexed: Mutex::new(HashSet::new()),
        }
    }

    /// Create the timestamp index once per collection
    ///
    /// Best effort: a failure (e.g. a user without createIndex rights) is
    /// logged once and the collection is not retried.
    async fn ensure_index(&self, collection: &str) {
        let mut indexed = self.indexed.lock().await;
        if !indexed.insert(collection.to_string()) {
            return;
        }

        let index = IndexModel::builder()
            .keys(doc! { "timestamp": -1 })
            .options(
                IndexOptions::builder()
                    .name("timestamp_desc".to_string())
                    .build(),
            )
            .build();

        match self
            .client
            .client
            .database(&self.client.db_name)
            .collection::<Document>(collection)
            .create_index(index)
            .await
        {
            Ok(_) => debug!(collection, "Created audit timestamp index"),
            Err(e) => warn!(collection, error = %e, "Failed to create audit index"),
        }
    }
}

/// BSON form of a record (the collection name is the target, not a field)
pub(crate) fn to_document(record: &AuditRecord) -> Result<Document, HortaError> {
    let details = bson::to_bson(&record.details)
        .map_err(|e| HortaError::Internal(format!("Failed to encode audit details: {}", e)))?;
    let action = bson::to_bson(&record.action)
        .map_err(|e| HortaError::Internal(format!("Failed to encode audit action: {}", e)))?;

    let mut document = doc! {
        "action": action,
        "details": details,
        "timestamp": bson::DateTime::from_chrono(record.timestamp),
    };
    if let Some(user) = &record.user {
        document.insert("user", user.as_str());
    }
    Ok(document)
}

#[async_trait]
impl AuditSink for MongoAuditSink {
    async fn write(&self, record: &AuditRecord) -> Result<(), HortaError> {
        self.ensure_index(&record.collection).await;

        let document = to_document(record)?;
        self.client
            .client
            .database(&self.client.db_name)
            .collection::<Document>(&record.collection)
            .insert_one(document)
            .await
            .map_err(|e| HortaError::Database(format!("Audit insert failed: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditAction;
    use serde_json::json;

    #[test]
    fn test_document_shape() {
        let record = AuditRecord::new(
            "colheitas",
            AuditAction::Create,
            json!({"id_colheita": 3, "quantidade_kg": 2.5}),
        )
        .with_user(Some("ana@x.com".into()));

        let document = to_document(&record).unwrap();
        assert_eq!(document.get_str("action").unwrap(), "create");
        assert_eq!(document.get_str("user").unwrap(), "ana@x.com");
        assert!(document.get_datetime("timestamp").is_ok());
        assert_eq!(
            document
                .get_document("details")
                .unwrap()
                .get_f64("quantidade_kg")
                .unwrap(),
            2.5
        );
        assert!(!document.contains_key("collection"));
    }

    #[tokio::test]
    async fn test_insert_attempted_when_index_creation_fails() {
        let client = MongoClient::connect(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=50&connectTimeoutMS=50",
            "horta_logs",
        )
        .await
        .unwrap();
        let sink = MongoAuditSink::new(client);
        let record = AuditRecord::new("hortas", AuditAction::Delete, json!({"id_horta": "h1"}));

        let err = sink.write(&record).await.unwrap_err();
        assert!(err.detail().starts_with("Audit insert failed"), "{}", err);
        assert!(sink.indexed.lock().await.contains("hortas"));
    }

    #[test]
    fn test_anonymous_record_has_no_user() {
        let record = AuditRecord::new("usuarios", AuditAction::Create, json!({}));
        let document = to_document(&record).unwrap();
        assert!(!document.contains_key("user"));
    }
}
