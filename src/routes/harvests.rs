//! /colheitas routes

use hyper::{Method, StatusCode};
use serde_json::json;

use super::{
    json_response, no_content, parse_json, parse_param, route_not_found, HandlerResult,
    RequestContext,
};
use crate::audit::AuditAction;
use crate::db::harvests::{self, RecordedHarvest};
use crate::types::HortaError;

const COLLECTION: &str = "colheitas";

fn audit_recorded(ctx: &RequestContext<'_>, action: AuditAction, recorded: &RecordedHarvest) {
    let mut details = serde_json::to_value(&recorded.harvest).unwrap_or_default();
    if let Some(map) = details.as_object_mut() {
        map.insert(
            "cultivos_colhidos".to_string(),
            json!(recorded.plantings_harvested),
        );
    }
    ctx.audit(COLLECTION, action, &details);
}

pub fn handle(ctx: &RequestContext<'_>, params: &[&str]) -> HandlerResult {
    let db = &ctx.state.db;

    match (ctx.method(), params) {
        (&Method::GET, []) => {
            let rows = db.with_conn(harvests::list_harvests)?;
            Ok(json_response(StatusCode::OK, &rows))
        }
        (&Method::GET, [id]) => {
            let id: i64 = parse_param(id, "id_colheita")?;
            let row = db
                .with_conn(|conn| harvests::get_harvest(conn, id))?
                .ok_or_else(|| HortaError::NotFound("Harvest not found".to_string()))?;
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::POST, []) => {
            let input = parse_json(ctx.body())?;
            let recorded = db.with_conn_mut(|conn| harvests::create_harvest(conn, input))?;
            audit_recorded(ctx, AuditAction::Create, &recorded);
            Ok(json_response(StatusCode::CREATED, &recorded.harvest))
        }
        (&Method::PUT, [id]) => {
            let id: i64 = parse_param(id, "id_colheita")?;
            let input = parse_json(ctx.body())?;
            let recorded = db.with_conn_mut(|conn| harvests::update_harvest(conn, id, input))?;
            audit_recorded(ctx, AuditAction::Update, &recorded);
            Ok(json_response(StatusCode::OK, &recorded.harvest))
        }
        (&Method::DELETE, [id]) => {
            let id: i64 = parse_param(id, "id_colheita")?;
            db.with_conn_mut(|conn| harvests::delete_harvest(conn, id))?;
            ctx.audit(COLLECTION, AuditAction::Delete, &json!({ "id_colheita": id }));
            Ok(no_content())
        }
        _ => Err(route_not_found()),
    }
}
