//! Event participation operations
//!
//! A participation is keyed by the (user, event) pair; a user holds at most
//! one role per event.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::models::ParticipationRole;
use crate::db::require_row;
use crate::types::HortaError;

/// Participation row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRow {
    #[serde(rename = "id_usuario")]
    pub user_id: String,
    #[serde(rename = "id_evento")]
    pub event_id: i64,
    #[serde(rename = "papel")]
    pub role: ParticipationRole,
}

/// Only the role of an existing participation can change
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipationPatch {
    #[serde(rename = "papel")]
    pub role: ParticipationRole,
}

const SELECT_PARTICIPATION: &str =
    "SELECT id_usuario, id_evento, papel FROM participacao_evento";

fn map_participation(row: &Row<'_>) -> rusqlite::Result<ParticipationRow> {
    Ok(ParticipationRow {
        user_id: row.get(0)?,
        event_id: row.get(1)?,
        role: row.get(2)?,
    })
}

pub fn get_participation(
    conn: &Connection,
    user_id: &str,
    event_id: i64,
) -> Result<Option<ParticipationRow>, HortaError> {
    conn.query_row(
        &format!(
            "{} WHERE id_usuario = ? AND id_evento = ?",
            SELECT_PARTICIPATION
        ),
        params![user_id, event_id],
        map_participation,
    )
    .optional()
    .map_err(|e| HortaError::Database(format!("Failed to get participation: {}", e)))
}

pub fn list_participations(conn: &Connection) -> Result<Vec<ParticipationRow>, HortaError> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY id_evento, id_usuario",
        SELECT_PARTICIPATION
    ))?;
    let rows = stmt.query_map([], map_participation)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| HortaError::Database(format!("Failed to list participations: {}", e)))
}

/// Register a user for an event
///
/// Both sides must exist (NotFound); a second registration of the same pair
/// is a BadRequest.
pub fn create_participation(
    conn: &mut Connection,
    input: ParticipationRow,
) -> Result<ParticipationRow, HortaError> {
    let tx = conn.transaction()?;

    require_row(&tx, "usuarios", "id_usuario", &input.user_id, "User")?;
    require_row(&tx, "evento", "id_evento", &input.event_id, "Event")?;

    if get_participation(&tx, &input.user_id, input.event_id)?.is_some() {
        return Err(HortaError::BadRequest(
            "User is already registered for this event".to_string(),
        ));
    }

    tx.execute(
        "INSERT INTO participacao_evento (id_usuario, id_evento, papel) VALUES (?, ?, ?)",
        params![input.user_id, input.event_id, input.role],
    )
    .map_err(|e| HortaError::Database(format!("Failed to create participation: {}", e)))?;
    tx.commit()?;

    Ok(input)
}

pub fn update_participation(
    conn: &mut Connection,
    user_id: &str,
    event_id: i64,
    patch: ParticipationPatch,
) -> Result<ParticipationRow, HortaError> {
    let changed = conn
        .execute(
            "UPDATE participacao_evento SET papel = ? WHERE id_usuario = ? AND id_evento = ?",
            params![patch.role, user_id, event_id],
        )
        .map_err(|e| HortaError::Database(format!("Failed to update participation: {}", e)))?;

    if changed == 0 {
        return Err(HortaError::NotFound("Participation not found".to_string()));
    }

    Ok(ParticipationRow {
        user_id: user_id.to_string(),
        event_id,
        role: patch.role,
    })
}

pub fn delete_participation(
    conn: &mut Connection,
    user_id: &str,
    event_id: i64,
) -> Result<(), HortaError> {
    let deleted = conn
        .execute(
            "DELETE FROM participacao_evento WHERE id_usuario = ? AND id_evento = ?",
            params![user_id, event_id],
        )
        .map_err(|e| HortaError::Database(format!("Failed to delete participation: {}", e)))?;

    if deleted == 0 {
        return Err(HortaError::NotFound("Participation not found".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO usuarios (id_usuario, id_grupo, nome, email, senha) VALUES ('u1', 2, 'Ana', 'ana@x.com', 'h');
            INSERT INTO evento (id_evento, nome, data_evento) VALUES (7, 'Mutirão', '2024-06-15');
            "#,
        )
        .unwrap();
        conn
    }

    fn ana_at_mutirao(role: ParticipationRole) -> ParticipationRow {
        ParticipationRow {
            user_id: "u1".into(),
            event_id: 7,
            role,
        }
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let mut conn = conn();
        create_participation(&mut conn, ana_at_mutirao(ParticipationRole::Participant)).unwrap();

        let err = create_participation(&mut conn, ana_at_mutirao(ParticipationRole::Speaker))
            .unwrap_err();
        assert!(matches!(err, HortaError::BadRequest(_)));

        let all = list_participations(&conn).unwrap();
        assert_eq!(all, vec![ana_at_mutirao(ParticipationRole::Participant)]);
    }

    #[test]
    fn test_missing_user_or_event() {
        let mut conn = conn();

        let mut ghost = ana_at_mutirao(ParticipationRole::Participant);
        ghost.user_id = "ghost".into();
        assert_eq!(
            create_participation(&mut conn, ghost).unwrap_err().detail(),
            "User not found"
        );

        let mut no_event = ana_at_mutirao(ParticipationRole::Participant);
        no_event.event_id = 99;
        assert_eq!(
            create_participation(&mut conn, no_event).unwrap_err().detail(),
            "Event not found"
        );
    }

    #[test]
    fn test_update_role_and_delete() {
        let mut conn = conn();
        create_participation(&mut conn, ana_at_mutirao(ParticipationRole::Participant)).unwrap();

        let updated = update_participation(
            &mut conn,
            "u1",
            7,
            ParticipationPatch {
                role: ParticipationRole::Organizer,
            },
        )
        .unwrap();
        assert_eq!(updated.role, ParticipationRole::Organizer);
        assert_eq!(
            get_participation(&conn, "u1", 7).unwrap().unwrap().role,
            ParticipationRole::Organizer
        );

        delete_participation(&mut conn, "u1", 7).unwrap();
        assert!(matches!(
            delete_participation(&mut conn, "u1", 7),
            Err(HortaError::NotFound(_))
        ));
    }
}
