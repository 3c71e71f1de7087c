//! /parcelas routes

use hyper::{Method, StatusCode};
use serde_json::json;

use super::{
    json_response, no_content, parse_json, parse_param, route_not_found, HandlerResult,
    RequestContext,
};
use crate::audit::AuditAction;
use crate::db::plots;
use crate::types::HortaError;

const COLLECTION: &str = "parcelas";

pub fn handle(ctx: &RequestContext<'_>, params: &[&str]) -> HandlerResult {
    let db = &ctx.state.db;

    match (ctx.method(), params) {
        (&Method::GET, []) => {
            let rows = db.with_conn(plots::list_plots)?;
            Ok(json_response(StatusCode::OK, &rows))
        }
        (&Method::GET, [id]) => {
            let id: i64 = parse_param(id, "id_parcela")?;
            let row = db
                .with_conn(|conn| plots::get_plot(conn, id))?
                .ok_or_else(|| HortaError::NotFound("Plot not found".to_string()))?;
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::POST, []) => {
            let input = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| plots::create_plot(conn, input))?;
            ctx.audit(COLLECTION, AuditAction::Create, &row);
            Ok(json_response(StatusCode::CREATED, &row))
        }
        (&Method::PUT, [id]) => {
            let id: i64 = parse_param(id, "id_parcela")?;
            let patch = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| plots::update_plot(conn, id, patch))?;
            ctx.audit(COLLECTION, AuditAction::Update, &row);
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::DELETE, [id]) => {
            let id: i64 = parse_param(id, "id_parcela")?;
            db.with_conn_mut(|conn| plots::delete_plot(conn, id))?;
            ctx.audit(COLLECTION, AuditAction::Delete, &json!({ "id_parcela": id }));
            Ok(no_content())
        }
        _ => Err(route_not_found()),
    }
}
