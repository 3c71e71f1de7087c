//! HTTP routes for Horta
//!
//! Every resource module exposes `handle(ctx, params)`, where `params` are
//! the path segments after the resource name. Handlers return
//! `Result<Response, HortaError>`; the server renders errors through
//! [`error_response`].

pub mod auth_routes;
pub mod cultivations;
pub mod events;
pub mod form;
pub mod gardens;
pub mod groups;
pub mod harvests;
pub mod health;
pub mod participations;
pub mod plots;
pub mod products;
pub mod users;

pub use auth_routes::{handle_login, handle_me};
pub use health::health_check;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::str::FromStr;
use tracing::warn;

use crate::audit::{AuditAction, AuditRecord};
use crate::auth::{extract_token_from_header, Access};
use crate::db::users::find_user_by_email;
use crate::server::AppState;
use crate::types::HortaError;

pub type FullBody = Full<Bytes>;

/// What every route handler returns
pub type HandlerResult = Result<Response<FullBody>, HortaError>;

/// The user resolved from a verified bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub email: String,
    pub group_id: i64,
}

/// A request whose body has been collected, plus its resolved caller
pub struct RequestContext<'a> {
    pub state: &'a AppState,
    pub request: &'a Request<Bytes>,
    pub caller: Option<Caller>,
}

impl RequestContext<'_> {
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    /// Queue an audit record attributed to the caller, if any
    pub fn audit<T: Serialize>(&self, collection: &str, action: AuditAction, details: &T) {
        let details = serde_json::to_value(details).unwrap_or_default();
        let user = self.caller.as_ref().map(|c| c.email.clone());
        self.state
            .audit
            .record(AuditRecord::new(collection, action, details).with_user(user));
    }
}

// =============================================================================
// Auth Gate
// =============================================================================

/// Resolve and check the caller for a route needing `access`
///
/// Public routes never reject: a token that resolves to a user only
/// attributes the request. Everything else needs a valid bearer token whose
/// subject is a registered email; group-restricted routes additionally check
/// the caller's group against the allow-list.
pub fn authorize(
    state: &AppState,
    access: Access,
    headers: &HeaderMap,
) -> Result<Option<Caller>, HortaError> {
    let auth_header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = extract_token_from_header(auth_header);

    if access == Access::Public {
        return Ok(token.and_then(|t| resolve_caller(state, t).ok()));
    }

    let token = token.ok_or_else(|| HortaError::Unauthorized("No token provided".to_string()))?;
    let caller = resolve_caller(state, token)?;

    if !state.policy.is_allowed(access, caller.group_id) {
        warn!(
            user = %caller.email,
            group = caller.group_id,
            required = %access,
            "Group not permitted"
        );
        return Err(HortaError::Forbidden(
            "Your group is not allowed to perform this action".to_string(),
        ));
    }

    Ok(Some(caller))
}

/// Verify a bearer token and load the user it names
fn resolve_caller(state: &AppState, token: &str) -> Result<Caller, HortaError> {
    let claims = state.jwt.verify_token(token).map_err(|e| {
        warn!(error = %e, "Rejected bearer token");
        e
    })?;

    let user = state
        .db
        .with_conn(|conn| find_user_by_email(conn, &claims.sub))?
        .ok_or_else(|| {
            warn!(subject = %claims.sub, "Token subject is not a registered user");
            HortaError::Unauthorized("Could not validate credentials".to_string())
        })?;

    Ok(Caller {
        user_id: user.id,
        email: user.email,
        group_id: user.group_id,
    })
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Decode a JSON request body
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, HortaError> {
    if body.is_empty() {
        return Err(HortaError::BadRequest("Request body is required".to_string()));
    }
    serde_json::from_slice(body)
        .map_err(|e| HortaError::BadRequest(format!("Invalid request body: {}", e)))
}

/// Parse a path segment
pub fn parse_param<T: FromStr>(segment: &str, name: &str) -> Result<T, HortaError> {
    segment
        .parse()
        .map_err(|_| HortaError::BadRequest(format!("Invalid {}: {}", name, segment)))
}

pub fn route_not_found() -> HortaError {
    HortaError::NotFound("Route not found".to_string())
}

// =============================================================================
// Response Helpers
// =============================================================================

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    match serde_json::to_vec(body) {
        Ok(json) => {
            let mut response = Response::new(Full::new(Bytes::from(json)));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => error_response(&HortaError::Internal(format!(
            "Failed to encode response: {}",
            e
        ))),
    }
}

pub fn no_content() -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

/// `{"error": <reason phrase>, "detail": <message>}`
pub fn error_response(err: &HortaError) -> Response<FullBody> {
    let status = err.status_code();
    let body = serde_json::json!({
        "error": status.canonical_reason().unwrap_or("Error"),
        "detail": err.detail(),
    });

    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
