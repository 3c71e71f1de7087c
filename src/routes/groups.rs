//! /grupos routes

use hyper::{Method, StatusCode};
use serde_json::json;

use super::{
    json_response, no_content, parse_json, parse_param, route_not_found, HandlerResult,
    RequestContext,
};
use crate::audit::AuditAction;
use crate::db::groups;
use crate::types::HortaError;

const COLLECTION: &str = "grupos";

pub fn handle(ctx: &RequestContext<'_>, params: &[&str]) -> HandlerResult {
    let db = &ctx.state.db;

    match (ctx.method(), params) {
        (&Method::GET, []) => {
            let rows = db.with_conn(groups::list_groups)?;
            Ok(json_response(StatusCode::OK, &rows))
        }
        (&Method::GET, [id]) => {
            let id: i64 = parse_param(id, "id_grupo")?;
            let row = db
                .with_conn(|conn| groups::get_group(conn, id))?
                .ok_or_else(|| HortaError::NotFound("Group not found".to_string()))?;
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::POST, []) => {
            let input = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| groups::create_group(conn, input))?;
            ctx.audit(COLLECTION, AuditAction::Create, &row);
            Ok(json_response(StatusCode::CREATED, &row))
        }
        (&Method::PUT, [id]) => {
            let id: i64 = parse_param(id, "id_grupo")?;
            let input = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| groups::update_group(conn, id, input))?;
            ctx.audit(COLLECTION, AuditAction::Update, &row);
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::DELETE, [id]) => {
            let id: i64 = parse_param(id, "id_grupo")?;
            db.with_conn_mut(|conn| groups::delete_group(conn, id))?;
            ctx.audit(COLLECTION, AuditAction::Delete, &json!({ "id_grupo": id }));
            Ok(no_content())
        }
        _ => Err(route_not_found()),
    }
}
