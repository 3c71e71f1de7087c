//! /hortas routes

use hyper::{Method, StatusCode};
use serde_json::json;

use super::{json_response, no_content, parse_json, route_not_found, HandlerResult, RequestContext};
use crate::audit::AuditAction;
use crate::db::gardens;
use crate::types::HortaError;

const COLLECTION: &str = "hortas";

pub fn handle(ctx: &RequestContext<'_>, params: &[&str]) -> HandlerResult {
    let db = &ctx.state.db;

    match (ctx.method(), params) {
        (&Method::GET, []) => {
            let rows = db.with_conn(gardens::list_gardens)?;
            Ok(json_response(StatusCode::OK, &rows))
        }
        (&Method::GET, [id]) => {
            let row = db
                .with_conn(|conn| gardens::get_garden(conn, id))?
                .ok_or_else(|| HortaError::NotFound("Garden not found".to_string()))?;
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::POST, []) => {
            let input = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| gardens::create_garden(conn, input))?;
            ctx.audit(COLLECTION, AuditAction::Create, &row);
            Ok(json_response(StatusCode::CREATED, &row))
        }
        (&Method::PUT, [id]) => {
            let patch = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| gardens::update_garden(conn, id, patch))?;
            ctx.audit(COLLECTION, AuditAction::Update, &row);
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::DELETE, [id]) => {
            db.with_conn_mut(|conn| gardens::delete_garden(conn, id))?;
            ctx.audit(COLLECTION, AuditAction::Delete, &json!({ "id_horta": id }));
            Ok(no_content())
        }
        _ => Err(route_not_found()),
    }
}
