//! /cultivos routes, addressed by `/{id_produto}/{id_parcela}/{data_plantio}`

use hyper::{Method, StatusCode};
use serde_json::json;

use super::{
    json_response, no_content, parse_json, parse_param, route_not_found, HandlerResult,
    RequestContext,
};
use crate::audit::AuditAction;
use crate::db::cultivations::{self, CultivationKey};
use crate::types::HortaError;

const COLLECTION: &str = "cultivos";

fn parse_key(product: &str, plot: &str, date: &str) -> Result<CultivationKey, HortaError> {
    Ok(CultivationKey {
        product_id: parse_param(product, "id_produto")?,
        plot_id: parse_param(plot, "id_parcela")?,
        planted_on: parse_param(date, "data_plantio")?,
    })
}

pub fn handle(ctx: &RequestContext<'_>, params: &[&str]) -> HandlerResult {
    let db = &ctx.state.db;

    match (ctx.method(), params) {
        (&Method::GET, []) => {
            let rows = db.with_conn(cultivations::list_cultivations)?;
            Ok(json_response(StatusCode::OK, &rows))
        }
        (&Method::GET, [product, plot, date]) => {
            let key = parse_key(product, plot, date)?;
            let row = db
                .with_conn(|conn| cultivations::get_cultivation(conn, &key))?
                .ok_or_else(|| HortaError::NotFound("Cultivation not found".to_string()))?;
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::POST, []) => {
            let input = parse_json(ctx.body())?;
            let row = db.with_conn_mut(|conn| cultivations::create_cultivation(conn, input))?;
            ctx.audit(COLLECTION, AuditAction::Create, &row);
            Ok(json_response(StatusCode::CREATED, &row))
        }
        (&Method::PUT, [product, plot, date]) => {
            let key = parse_key(product, plot, date)?;
            let patch = parse_json(ctx.body())?;
            let row =
                db.with_conn_mut(|conn| cultivations::update_cultivation(conn, &key, patch))?;
            ctx.audit(COLLECTION, AuditAction::Update, &row);
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::DELETE, [product, plot, date]) => {
            let key = parse_key(product, plot, date)?;
            db.with_conn_mut(|conn| cultivations::delete_cultivation(conn, &key))?;
            ctx.audit(
                COLLECTION,
                AuditAction::Delete,
                &json!({
                    "id_produto": key.product_id,
                    "id_parcela": key.plot_id,
                    "data_plantio": key.planted_on,
                }),
            );
            Ok(no_content())
        }
        _ => Err(route_not_found()),
    }
}
