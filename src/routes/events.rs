//! /eventos routes

use hyper::{Method, StatusCode};
use serde_json::json;

use super::{
    json_response, no_content, parse_json, parse_param, route_not_found, HandlerResult,
    RequestContext,
};
use crate::audit::AuditAction;
use crate::db::events;
use crate::types::HortaError;

const COLLECTION: &str = "eventos";

pub fn handle(ctx: &RequestContext<'_>, params: &[&str]) -> HandlerResult {
    let db = &ctx.state.db;

    match (ctx.method(), params) {
        (&Method::GET, []) => {
            let rows = db.with_conn(events::list_events)?;
            Ok(json_response(StatusCode::OK, &rows))
        }
        (&Method::GET, [id]) => {
            let id: i64 = parse_param(id, "id_evento")?;
            let row = db
                .with_conn(|conn| events::get_event(conn, id))?
                .ok_or_else(|| HortaError::NotFound("Event not found".to_string()))?;
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::POST, []) => {
            let input = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| events::create_event(conn, input))?;
            ctx.audit(COLLECTION, AuditAction::Create, &row);
            Ok(json_response(StatusCode::CREATED, &row))
        }
        (&Method::PUT, [id]) => {
            let id: i64 = parse_param(id, "id_evento")?;
            let patch = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| events::update_event(conn, id, patch))?;
            ctx.audit(COLLECTION, AuditAction::Update, &row);
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::DELETE, [id]) => {
            let id: i64 = parse_param(id, "id_evento")?;
            db.with_conn_mut(|conn| events::delete_event(conn, id))?;
            ctx.audit(COLLECTION, AuditAction::Delete, &json!({ "id_evento": id }));
            Ok(no_content())
        }
        _ => Err(route_not_found()),
    }
}
