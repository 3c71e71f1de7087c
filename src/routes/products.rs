//! /produtos routes

use hyper::{Method, StatusCode};
use serde_json::json;

use super::{
    json_response, no_content, parse_json, parse_param, route_not_found, HandlerResult,
    RequestContext,
};
use crate::audit::AuditAction;
use crate::db::products;
use crate::types::HortaError;

const COLLECTION: &str = "produtos";

pub fn handle(ctx: &RequestContext<'_>, params: &[&str]) -> HandlerResult {
    let db = &ctx.state.db;

    match (ctx.method(), params) {
        (&Method::GET, []) => {
            let rows = db.with_conn(products::list_products)?;
            Ok(json_response(StatusCode::OK, &rows))
        }
        (&Method::GET, [id]) => {
            let id: i64 = parse_param(id, "id_produto")?;
            let row = db
                .with_conn(|conn| products::get_product(conn, id))?
                .ok_or_else(|| HortaError::NotFound("Product not found".to_string()))?;
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::POST, []) => {
            let input = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| products::create_product(conn, input))?;
            ctx.audit(COLLECTION, AuditAction::Create, &row);
            Ok(json_response(StatusCode::CREATED, &row))
        }
        (&Method::PUT, [id]) => {
            let id: i64 = parse_param(id, "id_produto")?;
            let input = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| products::update_product(conn, id, input))?;
            ctx.audit(COLLECTION, AuditAction::Update, &row);
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::DELETE, [id]) => {
            let id: i64 = parse_param(id, "id_produto")?;
            db.with_conn_mut(|conn| products::delete_product(conn, id))?;
            ctx.audit(COLLECTION, AuditAction::Delete, &json!({ "id_produto": id }));
            Ok(no_content())
        }
        _ => Err(route_not_found()),
    }
}
