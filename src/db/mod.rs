//! SQLite database module for the garden domain
//!
//! All domain entities live in one SQLite file. The connection sits behind a
//! mutex; every mutating operation runs in its own transaction, so a request
//! either commits all of its writes or none of them.
//!
//! ## Tables
//!
//! - `grupos_usuarios` - Groups used for authorization
//! - `usuarios` - Users (UUID ids, unique email, argon2 hash)
//! - `hortas` - Gardens
//! - `produto` - Products
//! - `parcela` - Plots
//! - `evento` - Community events
//! - `participacao_evento` - (user, event) participation with a role
//! - `cultivos` - Plantings keyed by (product, plot, date)
//! - `colheitas` - Harvests
//!
//! Referential integrity is checked by the operations in this module (rows
//! are looked up before they are referenced or removed); the schema itself
//! declares no foreign keys.

pub mod cultivations;
pub mod events;
pub mod gardens;
pub mod groups;
pub mod harvests;
pub mod models;
pub mod participations;
pub mod plots;
pub mod products;
pub mod schema;
pub mod users;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, ToSql};
use tracing::{debug, info};

use crate::types::HortaError;

/// SQLite database for the garden domain
pub struct GardenDb {
    conn: Mutex<Connection>,
}

impl GardenDb {
    /// Open or create the database file
    pub fn open(path: &Path) -> Result<Self, HortaError> {
        info!("Opening SQLite database at {:?}", path);

        let conn = Connection::open(path)
            .map_err(|e| HortaError::Database(format!("Failed to open SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| HortaError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, HortaError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory().map_err(|e| {
            HortaError::Database(format!("Failed to open in-memory SQLite: {}", e))
        })?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    fn init_schema(&self) -> Result<(), HortaError> {
        self.with_conn(schema::init_schema)
    }

    /// Run a read with shared access to the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, HortaError>
    where
        F: FnOnce(&Connection) -> Result<T, HortaError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HortaError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a write operation with exclusive access
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, HortaError>
    where
        F: FnOnce(&mut Connection) -> Result<T, HortaError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| HortaError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Liveness check used by the health endpoint
    pub fn ping(&self) -> bool {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(HortaError::from)
        })
        .is_ok()
    }
}

/// Whether any row of `table` has `column = value`
///
/// `table` and `column` are always literals from this module.
pub(crate) fn row_exists(
    conn: &Connection,
    table: &str,
    column: &str,
    value: &dyn ToSql,
) -> Result<bool, HortaError> {
    let sql = format!("SELECT 1 FROM {} WHERE {} = ? LIMIT 1", table, column);
    let found = conn
        .query_row(&sql, params![value], |_| Ok(()))
        .optional()
        .map_err(|e| HortaError::Database(format!("Existence check on {} failed: {}", table, e)))?;
    Ok(found.is_some())
}

/// Fail with NotFound unless the referenced row exists
pub(crate) fn require_row(
    conn: &Connection,
    table: &str,
    column: &str,
    value: &dyn ToSql,
    what: &str,
) -> Result<(), HortaError> {
    if row_exists(conn, table, column, value)? {
        Ok(())
    } else {
        Err(HortaError::NotFound(format!("{} not found", what)))
    }
}

/// Fail with BadRequest while other rows still reference this one
pub(crate) fn reject_if_referenced(
    conn: &Connection,
    table: &str,
    column: &str,
    value: &dyn ToSql,
    what: &str,
) -> Result<(), HortaError> {
    if row_exists(conn, table, column, value)? {
        Err(HortaError::BadRequest(format!(
            "{} is still referenced by {}",
            what, table
        )))
    } else {
        Ok(())
    }
}

/// Reject blank required text fields
pub(crate) fn require_text(value: &str, field: &str) -> Result<(), HortaError> {
    if value.trim().is_empty() {
        Err(HortaError::BadRequest(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

pub use models::{CultivationStatus, ParticipationRole, PlotStatus, ProductKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_seeds_groups() {
        let db = GardenDb::open_in_memory().unwrap();
        assert!(db.ping());

        let groups = db.with_conn(groups::list_groups).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, 1);
    }

    #[test]
    fn test_open_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("horta.db");

        {
            let db = GardenDb::open(&path).unwrap();
            db.with_conn_mut(|conn| {
                groups::create_group(
                    conn,
                    groups::GroupInput {
                        name: "Voluntários".into(),
                        description: None,
                    },
                )
            })
            .unwrap();
        }

        let db = GardenDb::open(&path).unwrap();
        let groups = db.with_conn(groups::list_groups).unwrap();
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_require_helpers() {
        let db = GardenDb::open_in_memory().unwrap();
        db.with_conn(|conn| {
            assert!(require_row(conn, "grupos_usuarios", "id_grupo", &1, "Group").is_ok());
            let err = require_row(conn, "grupos_usuarios", "id_grupo", &99, "Group").unwrap_err();
            assert_eq!(err.detail(), "Group not found");
            Ok(())
        })
        .unwrap();

        assert!(require_text("  ", "nome").is_err());
        assert!(require_text("Ana", "nome").is_ok());
    }
}
