//! /participacoes routes, addressed by `/{id_usuario}/{id_evento}`

use hyper::{Method, StatusCode};
use serde_json::json;

use super::{
    json_response, no_content, parse_json, parse_param, route_not_found, HandlerResult,
    RequestContext,
};
use crate::audit::AuditAction;
use crate::db::participations;
use crate::types::HortaError;

const COLLECTION: &str = "participacoes";

pub fn handle(ctx: &RequestContext<'_>, params: &[&str]) -> HandlerResult {
    let db = &ctx.state.db;

    match (ctx.method(), params) {
        (&Method::GET, []) => {
            let rows = db.with_conn(participations::list_participations)?;
            Ok(json_response(StatusCode::OK, &rows))
        }
        (&Method::GET, [user_id, event_id]) => {
            let event_id: i64 = parse_param(event_id, "id_evento")?;
            let row = db
                .with_conn(|conn| participations::get_participation(conn, user_id, event_id))?
                .ok_or_else(|| HortaError::NotFound("Participation not found".to_string()))?;
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::POST, []) => {
            let input = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| participations::create_participation(conn, input))?;
            ctx.audit(COLLECTION, AuditAction::Create, &row);
            Ok(json_response(StatusCode::CREATED, &row))
        }
        (&Method::PUT, [user_id, event_id]) => {
            let event_id: i64 = parse_param(event_id, "id_evento")?;
            let patch = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| {
                participations::update_participation(conn, user_id, event_id, patch)
            })?;
            ctx.audit(COLLECTION, AuditAction::Update, &row);
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::DELETE, [user_id, event_id]) => {
            let event_id: i64 = parse_param(event_id, "id_evento")?;
            db.with_conn_mut(|conn| {
                participations::delete_participation(conn, user_id, event_id)
            })?;
            ctx.audit(
                COLLECTION,
                AuditAction::Delete,
                &json!({ "id_usuario": user_id, "id_evento": event_id }),
            );
            Ok(no_content())
        }
        _ => Err(route_not_found()),
    }
}
