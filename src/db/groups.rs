//! Group CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{reject_if_referenced, require_text};
use crate::types::HortaError;

/// Group row from database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    #[serde(rename = "id_grupo")]
    pub id: i64,
    #[serde(rename = "nome_grupo")]
    pub name: String,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
}

/// Input for creating or replacing a group
#[derive(Debug, Clone, Deserialize)]
pub struct GroupInput {
    #[serde(rename = "nome_grupo")]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
}

const SELECT_GROUP: &str = "SELECT id_grupo, nome_grupo, descricao FROM grupos_usuarios";

fn map_group(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

/// Get a group by ID
pub fn get_group(conn: &Connection, id: i64) -> Result<Option<GroupRow>, HortaError> {
    conn.query_row(
        &format!("{} WHERE id_grupo = ?", SELECT_GROUP),
        params![id],
        map_group,
    )
    .optional()
    .map_err(|e| HortaError::Database(format!("Failed to get group: {}", e)))
}

/// List all groups
pub fn list_groups(conn: &Connection) -> Result<Vec<GroupRow>, HortaError> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY id_grupo", SELECT_GROUP))?;
    let rows = stmt.query_map([], map_group)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| HortaError::Database(format!("Failed to list groups: {}", e)))
}

/// Create a new group
pub fn create_group(conn: &mut Connection, input: GroupInput) -> Result<GroupRow, HortaError> {
    require_text(&input.name, "nome_grupo")?;

    conn.execute(
        "INSERT INTO grupos_usuarios (nome_grupo, descricao) VALUES (?, ?)",
        params![input.name, input.description],
    )
    .map_err(|e| HortaError::Database(format!("Failed to create group: {}", e)))?;

    let id = conn.last_insert_rowid();
    get_group(conn, id)?
        .ok_or_else(|| HortaError::Internal("Group not found after insert".to_string()))
}

/// Replace a group's name and description
pub fn update_group(
    conn: &mut Connection,
    id: i64,
    input: GroupInput,
) -> Result<GroupRow, HortaError> {
    require_text(&input.name, "nome_grupo")?;

    let changed = conn
        .execute(
            "UPDATE grupos_usuarios SET nome_grupo = ?, descricao = ? WHERE id_grupo = ?",
            params![input.name, input.description, id],
        )
        .map_err(|e| HortaError::Database(format!("Failed to update group: {}", e)))?;

    if changed == 0 {
        return Err(HortaError::NotFound("Group not found".to_string()));
    }

    get_group(conn, id)?.ok_or_else(|| HortaError::NotFound("Group not found".to_string()))
}

/// Delete a group that no user belongs to
pub fn delete_group(conn: &mut Connection, id: i64) -> Result<(), HortaError> {
    let tx = conn.transaction()?;

    if get_group(&tx, id)?.is_none() {
        return Err(HortaError::NotFound("Group not found".to_string()));
    }
    reject_if_referenced(&tx, "usuarios", "id_grupo", &id, "Group")?;

    tx.execute("DELETE FROM grupos_usuarios WHERE id_grupo = ?", params![id])
        .map_err(|e| HortaError::Database(format!("Failed to delete group: {}", e)))?;
    tx.commit()?;

    Ok(())
}
