//! Garden CRUD operations

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::require_text;
use crate::types::HortaError;

/// Garden row from database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GardenRow {
    #[serde(rename = "id_horta")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "localizacao")]
    pub location: String,
    #[serde(rename = "data_criacao")]
    pub created_on: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGardenInput {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "localizacao")]
    pub location: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GardenPatch {
    #[serde(rename = "nome", default)]
    pub name: Option<String>,
    #[serde(rename = "localizacao", default)]
    pub location: Option<String>,
}

const SELECT_GARDEN: &str = "SELECT id_horta, nome, localizacao, data_criacao FROM hortas";

fn map_garden(row: &Row<'_>) -> rusqlite::Result<GardenRow> {
    Ok(GardenRow {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        created_on: row.get(3)?,
    })
}

pub fn get_garden(conn: &Connection, id: &str) -> Result<Option<GardenRow>, HortaError> {
    conn.query_row(
        &format!("{} WHERE id_horta = ?", SELECT_GARDEN),
        params![id],
        map_garden,
    )
    .optional()
    .map_err(|e| HortaError::Database(format!("Failed to get garden: {}", e)))
}

pub fn list_gardens(conn: &Connection) -> Result<Vec<GardenRow>, HortaError> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY data_criacao, nome", SELECT_GARDEN))?;
    let rows = stmt.query_map([], map_garden)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| HortaError::Database(format!("Failed to list gardens: {}", e)))
}

/// Create a garden stamped with today's UTC date
pub fn create_garden(
    conn: &mut Connection,
    input: CreateGardenInput,
) -> Result<GardenRow, HortaError> {
    require_text(&input.name, "nome")?;
    require_text(&input.location, "localizacao")?;

    let garden = GardenRow {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        location: input.location,
        created_on: Utc::now().date_naive(),
    };

    conn.execute(
        "INSERT INTO hortas (id_horta, nome, localizacao, data_criacao) VALUES (?, ?, ?, ?)",
        params![garden.id, garden.name, garden.location, garden.created_on],
    )
    .map_err(|e| HortaError::Database(format!("Failed to create garden: {}", e)))?;

    Ok(garden)
}

pub fn update_garden(
    conn: &mut Connection,
    id: &str,
    patch: GardenPatch,
) -> Result<GardenRow, HortaError> {
    let tx = conn.transaction()?;

    let mut garden =
        get_garden(&tx, id)?.ok_or_else(|| HortaError::NotFound("Garden not found".to_string()))?;

    if let Some(name) = patch.name {
        require_text(&name, "nome")?;
        garden.name = name;
    }
    if let Some(location) = patch.location {
        require_text(&location, "localizacao")?;
        garden.location = location;
    }

    tx.execute(
        "UPDATE hortas SET nome = ?, localizacao = ? WHERE id_horta = ?",
        params![garden.name, garden.location, garden.id],
    )
    .map_err(|e| HortaError::Database(format!("Failed to update garden: {}", e)))?;
    tx.commit()?;

    Ok(garden)
}

pub fn delete_garden(conn: &mut Connection, id: &str) -> Result<(), HortaError> {
    let deleted = conn
        .execute("DELETE FROM hortas WHERE id_horta = ?", params![id])
        .map_err(|e| HortaError::Database(format!("Failed to delete garden: {}", e)))?;

    if deleted == 0 {
        return Err(HortaError::NotFound("Garden not found".to_string()));
    }
    Ok(())
}
