//! /usuarios routes
//!
//! Signup (`POST /usuarios`) is always public. Under the `groups` access mode
//! reads need a valid token and updates and deletes need the admin group.

use hyper::{Method, StatusCode};
use serde_json::json;

use super::{
    auth_routes, json_response, no_content, parse_json, route_not_found, HandlerResult,
    RequestContext,
};
use crate::audit::AuditAction;
use crate::auth::hash_password;
use crate::db::users::{self, CreateUserInput, UserPatch};
use crate::db::require_text;
use crate::types::HortaError;

const COLLECTION: &str = "usuarios";

pub fn handle(ctx: &RequestContext<'_>, params: &[&str]) -> HandlerResult {
    let db = &ctx.state.db;

    match (ctx.method(), params) {
        (&Method::GET, []) => {
            let rows = db.with_conn(users::list_users)?;
            Ok(json_response(StatusCode::OK, &rows))
        }
        (&Method::GET, ["me"]) => auth_routes::handle_me(ctx),
        (&Method::GET, [id]) => {
            let row = db
                .with_conn(|conn| users::get_user(conn, id))?
                .ok_or_else(|| HortaError::NotFound("User not found".to_string()))?;
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::POST, []) => {
            let input: CreateUserInput = parse_json(ctx.body())?;
            require_text(&input.password, "senha")?;
            let password_hash = hash_password(&input.password)?;

            let row = db.with_conn_mut(|conn| users::create_user(conn, input, password_hash))?;
            ctx.audit(
                COLLECTION,
                AuditAction::Create,
                &json!({ "id_usuario": row.id, "nome": row.name }),
            );
            Ok(json_response(StatusCode::CREATED, &row))
        }
        (&Method::PUT, [id]) => {
            let patch: UserPatch = parse_json(ctx.body())?;
            let password_hash = match patch.password.as_deref() {
                Some(password) => {
                    require_text(password, "senha")?;
                    Some(hash_password(password)?)
                }
                None => None,
            };

            let row =
                db.with_conn_mut(|conn| users::update_user(conn, id, patch, password_hash))?;
            ctx.audit(COLLECTION, AuditAction::Update, &row);
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::DELETE, [id]) => {
            db.with_conn_mut(|conn| users::delete_user(conn, id))?;
            ctx.audit(COLLECTION, AuditAction::Delete, &json!({ "id_usuario": id }));
            Ok(no_content())
        }
        _ => Err(route_not_found()),
    }
}
