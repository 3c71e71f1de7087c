//! Audit trail of domain mutations
//!
//! Every successful create/update/delete (and every login) produces one
//! [`AuditRecord`]. [`AuditLog::record`] hands the record to a spawned task
//! and returns immediately; the HTTP response never waits on the sink and a
//! failed write never undoes the domain change. Outcomes are counted so the
//! health endpoint can report them.

pub mod memory;
pub mod mongo;

pub use memory::MemoryAuditSink;
pub use mongo::{MongoAuditSink, MongoClient};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::types::HortaError;

/// Kind of mutation being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
}

/// One audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Target collection (entity name, or `auth` for logins)
    pub collection: String,
    pub action: AuditAction,
    /// Free-form payload, usually the written row or its key
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    /// Email of the authenticated caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl AuditRecord {
    pub fn new(collection: &str, action: AuditAction, details: serde_json::Value) -> Self {
        Self {
            collection: collection.to_string(),
            action,
            details,
            timestamp: Utc::now(),
            user: None,
        }
    }

    /// Set the acting user
    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }
}

/// Destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, record: &AuditRecord) -> Result<(), HortaError>;
}

/// Snapshot of audit outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    pub enabled: bool,
    pub recorded: u64,
    pub failed: u64,
    /// Records discarded because no sink is configured
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    recorded: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Fire-and-forget front for an optional [`AuditSink`]
#[derive(Clone)]
pub struct AuditLog {
    sink: Option<Arc<dyn AuditSink>>,
    counters: Arc<Counters>,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink: Some(sink),
            counters: Arc::default(),
        }
    }

    /// An audit log that counts every record as dropped
    pub fn disabled() -> Self {
        Self {
            sink: None,
            counters: Arc::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Queue a record; must be called from within a tokio runtime
    pub fn record(&self, record: AuditRecord) {
        let Some(sink) = self.sink.clone() else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let counters = Arc::clone(&self.counters);
        tokio::spawn(async move {
            match sink.write(&record).await {
                Ok(()) => {
                    counters.recorded.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        collection = %record.collection,
                        action = ?record.action,
                        "Audit record written"
                    );
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        collection = %record.collection,
                        action = ?record.action,
                        error = %e,
                        "Failed to write audit record"
                    );
                }
            }
        });
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            enabled: self.is_enabled(),
            recorded: self.counters.recorded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn write(&self, _record: &AuditRecord) -> Result<(), HortaError> {
            Err(HortaError::Database("audit store unreachable".into()))
        }
    }

    /// Yield until the spawned writes have settled
    pub(crate) async fn settle(log: &AuditLog, expected: u64) {
        for _ in 0..100 {
            let stats = log.stats();
            if stats.recorded + stats.failed + stats.dropped >= expected {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_records_reach_sink() {
        let sink = Arc::new(MemoryAuditSink::new());
        let log = AuditLog::new(sink.clone());

        log.record(
            AuditRecord::new("hortas", AuditAction::Create, json!({"nome": "Horta"}))
                .with_user(Some("ana@x.com".into())),
        );
        settle(&log, 1).await;

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].collection, "hortas");
        assert_eq!(records[0].user.as_deref(), Some("ana@x.com"));
        assert_eq!(log.stats().recorded, 1);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_raised() {
        let log = AuditLog::new(Arc::new(FailingSink));

        log.record(AuditRecord::new("produto", AuditAction::Delete, json!({"id_produto": 1})));
        log.record(AuditRecord::new("produto", AuditAction::Delete, json!({"id_produto": 2})));
        settle(&log, 2).await;

        let stats = log.stats();
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.recorded, 0);
        assert!(stats.enabled);
    }

    #[test]
    fn test_disabled_log_drops() {
        let log = AuditLog::disabled();
        log.record(AuditRecord::new("auth", AuditAction::Login, json!({})));

        assert_eq!(
            log.stats(),
            AuditStats {
                enabled: false,
                recorded: 0,
                failed: 0,
                dropped: 1,
            }
        );
    }

    #[test]
    fn test_action_wire_names() {
        let record = AuditRecord::new("cultivos", AuditAction::Update, json!({}));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["action"], "update");
        assert!(value.get("user").is_none());
    }
}
