//! In-process audit sink
//!
//! Keeps records in memory. Used when embedding the router without a
//! document store and by the router tests.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{AuditRecord, AuditSink};
use crate::types::HortaError;

#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far, oldest first
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn write(&self, record: &AuditRecord) -> Result<(), HortaError> {
        self.records
            .lock()
            .map_err(|e| HortaError::Internal(format!("Lock poisoned: {}", e)))?
            .push(record.clone());
        Ok(())
    }
}
