//! Health check endpoint
//!
//! `GET /health` reports liveness together with the state of both stores:
//! `database` is a `SELECT 1` against SQLite, `audit` carries the audit
//! sink counters.

use hyper::StatusCode;
use serde::Serialize;

use super::{json_response, HandlerResult};
use crate::audit::AuditStats;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// True when the relational store answers
    pub healthy: bool,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub database: bool,
    pub audit: AuditStats,
}

pub fn health_check(state: &AppState) -> HandlerResult {
    let database = state.db.ping();

    let response = HealthResponse {
        healthy: database,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        database,
        audit: state.audit.stats(),
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok(json_response(status, &response))
}
