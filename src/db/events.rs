//! Community event CRUD operations

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::models::nullable;
use crate::db::{reject_if_referenced, require_text};
use crate::types::HortaError;

/// Event row from database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    #[serde(rename = "id_evento")]
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "data_evento")]
    pub date: NaiveDate,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    #[serde(rename = "local_evento")]
    pub venue: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventInput {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "data_evento")]
    pub date: NaiveDate,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "local_evento", default)]
    pub venue: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    #[serde(rename = "nome", default)]
    pub name: Option<String>,
    #[serde(rename = "data_evento", default)]
    pub date: Option<NaiveDate>,
    #[serde(rename = "descricao", default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(rename = "local_evento", default, deserialize_with = "nullable")]
    pub venue: Option<Option<String>>,
}

const SELECT_EVENT: &str =
    "SELECT id_evento, nome, data_evento, descricao, local_evento FROM evento";

fn map_event(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        name: row.get(1)?,
        date: row.get(2)?,
        description: row.get(3)?,
        venue: row.get(4)?,
    })
}

pub fn get_event(conn: &Connection, id: i64) -> Result<Option<EventRow>, HortaError> {
    conn.query_row(
        &format!("{} WHERE id_evento = ?", SELECT_EVENT),
        params![id],
        map_event,
    )
    .optional()
    .map_err(|e| HortaError::Database(format!("Failed to get event: {}", e)))
}

/// List events, soonest first
pub fn list_events(conn: &Connection) -> Result<Vec<EventRow>, HortaError> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY data_evento, id_evento", SELECT_EVENT))?;
    let rows = stmt.query_map([], map_event)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| HortaError::Database(format!("Failed to list events: {}", e)))
}

pub fn create_event(conn: &mut Connection, input: CreateEventInput) -> Result<EventRow, HortaError> {
    require_text(&input.name, "nome")?;

    conn.execute(
        "INSERT INTO evento (nome, data_evento, descricao, local_evento) VALUES (?, ?, ?, ?)",
        params![input.name, input.date, input.description, input.venue],
    )
    .map_err(|e| HortaError::Database(format!("Failed to create event: {}", e)))?;

    Ok(EventRow {
        id: conn.last_insert_rowid(),
        name: input.name,
        date: input.date,
        description: input.description,
        venue: input.venue,
    })
}

pub fn update_event(conn: &mut Connection, id: i64, patch: EventPatch) -> Result<EventRow, HortaError> {
    let tx = conn.transaction()?;

    let mut event =
        get_event(&tx, id)?.ok_or_else(|| HortaError::NotFound("Event not found".to_string()))?;

    if let Some(name) = patch.name {
        require_text(&name, "nome")?;
        event.name = name;
    }
    if let Some(date) = patch.date {
        event.date = date;
    }
    if let Some(description) = patch.description {
        event.description = description;
    }
    if let Some(venue) = patch.venue {
        event.venue = venue;
    }

    tx.execute(
        "UPDATE evento SET nome = ?, data_evento = ?, descricao = ?, local_evento = ?
         WHERE id_evento = ?",
        params![event.name, event.date, event.description, event.venue, event.id],
    )
    .map_err(|e| HortaError::Database(format!("Failed to update event: {}", e)))?;
    tx.commit()?;

    Ok(event)
}

/// Delete an event nobody is registered for
pub fn delete_event(conn: &mut Connection, id: i64) -> Result<(), HortaError> {
    let tx = conn.transaction()?;

    if get_event(&tx, id)?.is_none() {
        return Err(HortaError::NotFound("Event not found".to_string()));
    }
    reject_if_referenced(&tx, "participacao_evento", "id_evento", &id, "Event")?;

    tx.execute("DELETE FROM evento WHERE id_evento = ?", params![id])
        .map_err(|e| HortaError::Database(format!("Failed to delete event: {}", e)))?;
    tx.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn mutirao() -> CreateEventInput {
        serde_json::from_str(
            r#"{"nome": "Mutirão", "data_evento": "2024-06-15", "descricao": "Plantio coletivo", "local_evento": "Horta Norte"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_create_parses_iso_date() {
        let mut conn = conn();
        let event = create_event(&mut conn, mutirao()).unwrap();

        assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(get_event(&conn, event.id).unwrap(), Some(event));
    }

    #[test]
    fn test_bad_date_rejected_on_the_wire() {
        let body = r#"{"nome": "Feira", "data_evento": "15/06/2024"}"#;
        assert!(serde_json::from_str::<CreateEventInput>(body).is_err());
    }

    #[test]
    fn test_patch_clears_nullable_fields() {
        let mut conn = conn();
        let event = create_event(&mut conn, mutirao()).unwrap();

        let patch: EventPatch = serde_json::from_str(r#"{"descricao": null}"#).unwrap();
        let updated = update_event(&mut conn, event.id, patch).unwrap();

        assert_eq!(updated.description, None);
        assert_eq!(updated.venue.as_deref(), Some("Horta Norte"));
        assert_eq!(updated.name, "Mutirão");
    }

    #[test]
    fn test_delete_with_participants_rejected() {
        let mut conn = conn();
        let event = create_event(&mut conn, mutirao()).unwrap();
        conn.execute(
            "INSERT INTO participacao_evento (id_usuario, id_evento, papel) VALUES ('u1', ?, 'Participante')",
            params![event.id],
        )
        .unwrap();

        assert!(matches!(
            delete_event(&mut conn, event.id),
            Err(HortaError::BadRequest(_))
        ));

        conn.execute("DELETE FROM participacao_evento", []).unwrap();
        delete_event(&mut conn, event.id).unwrap();
        assert!(matches!(
            delete_event(&mut conn, event.id),
            Err(HortaError::NotFound(_))
        ));
    }
}
