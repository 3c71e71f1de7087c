//! Authentication routes
//!
//! - `POST /login` - exchange email/password for a bearer token
//! - `GET /usuarios/me` - profile of the token's user
//!
//! Login takes the OAuth2 password form (`username`, `password`) as
//! `application/x-www-form-urlencoded` or `multipart/form-data`, or the same
//! fields as JSON.

use hyper::header::CONTENT_TYPE;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::form::{multipart_boundary, multipart_fields};
use super::{json_response, parse_json, HandlerResult, RequestContext};
use crate::audit::{AuditAction, AuditRecord};
use crate::auth::verify_password;
use crate::db::{groups, users};
use crate::types::HortaError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// The user's email
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub id_grupo: i64,
    pub nome_grupo: Option<String>,
}

fn invalid_credentials() -> HortaError {
    HortaError::BadRequest("Incorrect email or password".to_string())
}

fn parse_login(ctx: &RequestContext<'_>) -> Result<LoginRequest, HortaError> {
    let content_type = ctx.header(CONTENT_TYPE.as_str()).unwrap_or_default();

    if content_type.starts_with("application/json") {
        return parse_json(ctx.body());
    }

    if let Some(boundary) = multipart_boundary(content_type) {
        let mut fields = multipart_fields(ctx.body(), boundary)?;
        let mut take = |name: &str| {
            fields.remove(name).ok_or_else(|| {
                HortaError::BadRequest(format!("Invalid login form: missing field `{}`", name))
            })
        };
        return Ok(LoginRequest {
            username: take("username")?,
            password: take("password")?,
        });
    }

    serde_urlencoded::from_bytes(ctx.body())
        .map_err(|e| HortaError::BadRequest(format!("Invalid login form: {}", e)))
}

/// POST /login
pub fn handle_login(ctx: &RequestContext<'_>) -> HandlerResult {
    let body = parse_login(ctx)?;

    if body.username.is_empty() || body.password.is_empty() {
        return Err(HortaError::BadRequest(
            "Missing required fields: username, password".to_string(),
        ));
    }

    let (user, group) = ctx.state.db.with_conn(|conn| {
        let Some(user) = users::find_user_by_email(conn, &body.username)? else {
            return Ok((None, None));
        };
        let group = groups::get_group(conn, user.group_id)?;
        Ok((Some(user), group))
    })?;

    let Some(user) = user else {
        warn!("Login failed - user not found: {}", body.username);
        return Err(invalid_credentials());
    };

    if !verify_password(&body.password, &user.password_hash)? {
        warn!("Login failed - invalid password: {}", body.username);
        return Err(invalid_credentials());
    }

    let token = ctx.state.jwt.generate_token(&user.email)?;
    info!("Login successful: {}", user.email);

    ctx.state.audit.record(
        AuditRecord::new("auth", AuditAction::Login, json!({ "email": user.email }))
            .with_user(Some(user.email.clone())),
    );

    Ok(json_response(
        StatusCode::OK,
        &LoginResponse {
            access_token: token,
            token_type: "bearer".to_string(),
            expires_in: ctx.state.jwt.expiry_seconds(),
            id_grupo: user.group_id,
            nome_grupo: group.map(|g| g.name),
        },
    ))
}

/// GET /usuarios/me
pub fn handle_me(ctx: &RequestContext<'_>) -> HandlerResult {
    let caller = ctx
        .caller
        .as_ref()
        .ok_or_else(|| HortaError::Unauthorized("No token provided".to_string()))?;

    let user = ctx
        .state
        .db
        .with_conn(|conn| users::get_user(conn, &caller.user_id))?
        .ok_or_else(|| HortaError::NotFound("User not found".to_string()))?;

    Ok(json_response(StatusCode::OK, &user))
}
