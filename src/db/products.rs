//! Product CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::models::ProductKind;
use crate::db::{reject_if_referenced, require_text};
use crate::types::HortaError;

/// Product row from database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRow {
    #[serde(rename = "id_produto")]
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: ProductKind,
    #[serde(rename = "epoca_plantio")]
    pub planting_season: Option<String>,
}

/// Create body, also used as the full replacement on update
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: ProductKind,
    #[serde(rename = "epoca_plantio", default)]
    pub planting_season: Option<String>,
}

const SELECT_PRODUCT: &str = "SELECT id_produto, nome, tipo, epoca_plantio FROM produto";

fn map_product(row: &Row<'_>) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        planting_season: row.get(3)?,
    })
}

pub fn get_product(conn: &Connection, id: i64) -> Result<Option<ProductRow>, HortaError> {
    conn.query_row(
        &format!("{} WHERE id_produto = ?", SELECT_PRODUCT),
        params![id],
        map_product,
    )
    .optional()
    .map_err(|e| HortaError::Database(format!("Failed to get product: {}", e)))
}

pub fn list_products(conn: &Connection) -> Result<Vec<ProductRow>, HortaError> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY id_produto", SELECT_PRODUCT))?;
    let rows = stmt.query_map([], map_product)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| HortaError::Database(format!("Failed to list products: {}", e)))
}

pub fn create_product(conn: &mut Connection, input: ProductInput) -> Result<ProductRow, HortaError> {
    require_text(&input.name, "nome")?;

    conn.execute(
        "INSERT INTO produto (nome, tipo, epoca_plantio) VALUES (?, ?, ?)",
        params![input.name, input.kind, input.planting_season],
    )
    .map_err(|e| HortaError::Database(format!("Failed to create product: {}", e)))?;

    Ok(ProductRow {
        id: conn.last_insert_rowid(),
        name: input.name,
        kind: input.kind,
        planting_season: input.planting_season,
    })
}

pub fn update_product(
    conn: &mut Connection,
    id: i64,
    input: ProductInput,
) -> Result<ProductRow, HortaError> {
    require_text(&input.name, "nome")?;

    let changed = conn
        .execute(
            "UPDATE produto SET nome = ?, tipo = ?, epoca_plantio = ? WHERE id_produto = ?",
            params![input.name, input.kind, input.planting_season, id],
        )
        .map_err(|e| HortaError::Database(format!("Failed to update product: {}", e)))?;

    if changed == 0 {
        return Err(HortaError::NotFound("Product not found".to_string()));
    }

    Ok(ProductRow {
        id,
        name: input.name,
        kind: input.kind,
        planting_season: input.planting_season,
    })
}

/// Delete a product that no planting or harvest refers to
pub fn delete_product(conn: &mut Connection, id: i64) -> Result<(), HortaError> {
    let tx = conn.transaction()?;

    if get_product(&tx, id)?.is_none() {
        return Err(HortaError::NotFound("Product not found".to_string()));
    }
    reject_if_referenced(&tx, "cultivos", "id_produto", &id, "Product")?;
    reject_if_referenced(&tx, "colheitas", "id_produto", &id, "Product")?;

    tx.execute("DELETE FROM produto WHERE id_produto = ?", params![id])
        .map_err(|e| HortaError::Database(format!("Failed to delete product: {}", e)))?;
    tx.commit()?;

    Ok(())
}
