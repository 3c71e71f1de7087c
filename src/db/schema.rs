//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::types::HortaError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), HortaError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        seed_groups(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, HortaError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )
    .map_err(|e| HortaError::Database(format!("Failed to create schema_version table: {}", e)))?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), HortaError> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| HortaError::Database(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .map_err(|e| HortaError::Database(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<(), HortaError> {
    conn.execute_batch(PEOPLE_SCHEMA)
        .map_err(|e| HortaError::Database(format!("Failed to create people tables: {}", e)))?;

    conn.execute_batch(GARDEN_SCHEMA)
        .map_err(|e| HortaError::Database(format!("Failed to create garden tables: {}", e)))?;

    conn.execute_batch(INDEXES_SCHEMA)
        .map_err(|e| HortaError::Database(format!("Failed to create indexes: {}", e)))?;

    Ok(())
}

/// Default groups matching the default admin/member allow-lists
fn seed_groups(conn: &Connection) -> Result<(), HortaError> {
    conn.execute_batch(
        r#"
        INSERT INTO grupos_usuarios (id_grupo, nome_grupo, descricao)
        VALUES (1, 'Administradores', 'Gestão da horta comunitária');
        INSERT INTO grupos_usuarios (id_grupo, nome_grupo, descricao)
        VALUES (2, 'Membros', 'Voluntários que cultivam as parcelas');
        "#,
    )
    .map_err(|e| HortaError::Database(format!("Failed to seed groups: {}", e)))
}

/// Users, groups, events and participation
const PEOPLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS grupos_usuarios (
    id_grupo INTEGER PRIMARY KEY AUTOINCREMENT,
    nome_grupo TEXT NOT NULL,
    descricao TEXT
);

CREATE TABLE IF NOT EXISTS usuarios (
    id_usuario TEXT PRIMARY KEY,
    id_grupo INTEGER NOT NULL,
    nome TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    telefone TEXT,
    senha TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS evento (
    id_evento INTEGER PRIMARY KEY AUTOINCREMENT,
    nome TEXT NOT NULL,
    data_evento TEXT NOT NULL,
    descricao TEXT,
    local_evento TEXT
);

CREATE TABLE IF NOT EXISTS participacao_evento (
    id_usuario TEXT NOT NULL,
    id_evento INTEGER NOT NULL,
    papel TEXT NOT NULL,
    PRIMARY KEY (id_usuario, id_evento)
);
"#;

/// Gardens, products, plots, plantings and harvests
const GARDEN_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS hortas (
    id_horta TEXT PRIMARY KEY,
    nome TEXT NOT NULL,
    localizacao TEXT NOT NULL,
    data_criacao TEXT NOT NULL DEFAULT (date('now'))
);

CREATE TABLE IF NOT EXISTS produto (
    id_produto INTEGER PRIMARY KEY AUTOINCREMENT,
    nome TEXT NOT NULL,
    tipo TEXT NOT NULL,
    epoca_plantio TEXT
);

CREATE TABLE IF NOT EXISTS parcela (
    id_parcela INTEGER PRIMARY KEY AUTOINCREMENT,
    tamanho REAL NOT NULL,
    localizacao TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Livre'
);

CREATE TABLE IF NOT EXISTS cultivos (
    id_produto INTEGER NOT NULL,
    id_parcela INTEGER NOT NULL,
    data_plantio TEXT NOT NULL,
    status_cultivo TEXT NOT NULL,
    PRIMARY KEY (id_produto, id_parcela, data_plantio)
);

CREATE TABLE IF NOT EXISTS colheitas (
    id_colheita INTEGER PRIMARY KEY AUTOINCREMENT,
    id_parcela INTEGER NOT NULL,
    id_produto INTEGER NOT NULL,
    data_colheita TEXT NOT NULL,
    quantidade_kg REAL NOT NULL
);
"#;

const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_usuarios_grupo ON usuarios(id_grupo);
CREATE INDEX IF NOT EXISTS idx_participacao_evento ON participacao_evento(id_evento);
CREATE INDEX IF NOT EXISTS idx_cultivos_parcela_produto ON cultivos(id_parcela, id_produto);
CREATE INDEX IF NOT EXISTS idx_colheitas_parcela_produto ON colheitas(id_parcela, id_produto);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_keeps_seeded_groups() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM grupos_usuarios", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
