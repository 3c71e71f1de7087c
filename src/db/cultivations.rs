//! Planting (cultivation) operations
//!
//! A planting is identified by (product, plot, planting date). Its status is
//! edited directly or forced to `Colhido` when a harvest is recorded for the
//! same plot and product (see `services::propagation`).

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::models::CultivationStatus;
use crate::db::require_row;
use crate::types::HortaError;

/// Cultivation row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CultivationRow {
    #[serde(rename = "id_produto")]
    pub product_id: i64,
    #[serde(rename = "id_parcela")]
    pub plot_id: i64,
    #[serde(rename = "data_plantio")]
    pub planted_on: NaiveDate,
    #[serde(rename = "status_cultivo")]
    pub status: CultivationStatus,
}

/// Composite key of a planting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CultivationKey {
    pub product_id: i64,
    pub plot_id: i64,
    pub planted_on: NaiveDate,
}

impl CultivationRow {
    pub fn key(&self) -> CultivationKey {
        CultivationKey {
            product_id: self.product_id,
            plot_id: self.plot_id,
            planted_on: self.planted_on,
        }
    }
}

/// An absent status leaves the planting unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CultivationPatch {
    #[serde(rename = "status_cultivo", default)]
    pub status: Option<CultivationStatus>,
}

const SELECT_CULTIVATION: &str =
    "SELECT id_produto, id_parcela, data_plantio, status_cultivo FROM cultivos";

fn map_cultivation(row: &Row<'_>) -> rusqlite::Result<CultivationRow> {
    Ok(CultivationRow {
        product_id: row.get(0)?,
        plot_id: row.get(1)?,
        planted_on: row.get(2)?,
        status: row.get(3)?,
    })
}

pub fn get_cultivation(
    conn: &Connection,
    key: &CultivationKey,
) -> Result<Option<CultivationRow>, HortaError> {
    conn.query_row(
        &format!(
            "{} WHERE id_produto = ? AND id_parcela = ? AND data_plantio = ?",
            SELECT_CULTIVATION
        ),
        params![key.product_id, key.plot_id, key.planted_on],
        map_cultivation,
    )
    .optional()
    .map_err(|e| HortaError::Database(format!("Failed to get cultivation: {}", e)))
}

pub fn list_cultivations(conn: &Connection) -> Result<Vec<CultivationRow>, HortaError> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY data_plantio, id_parcela, id_produto",
        SELECT_CULTIVATION
    ))?;
    let rows = stmt.query_map([], map_cultivation)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| HortaError::Database(format!("Failed to list cultivations: {}", e)))
}

/// Record a planting
///
/// Product and plot must exist (NotFound); the same (product, plot, date)
/// triple cannot be planted twice (BadRequest).
pub fn create_cultivation(
    conn: &mut Connection,
    input: CultivationRow,
) -> Result<CultivationRow, HortaError> {
    let tx = conn.transaction()?;

    require_row(&tx, "produto", "id_produto", &input.product_id, "Product")?;
    require_row(&tx, "parcela", "id_parcela", &input.plot_id, "Plot")?;

    if get_cultivation(&tx, &input.key())?.is_some() {
        return Err(HortaError::BadRequest(
            "Cultivation already exists for this product, plot and date".to_string(),
        ));
    }

    tx.execute(
        "INSERT INTO cultivos (id_produto, id_parcela, data_plantio, status_cultivo)
         VALUES (?, ?, ?, ?)",
        params![input.product_id, input.plot_id, input.planted_on, input.status],
    )
    .map_err(|e| HortaError::Database(format!("Failed to create cultivation: {}", e)))?;
    tx.commit()?;

    Ok(input)
}

/// Change a planting's status; the key itself is immutable
pub fn update_cultivation(
    conn: &mut Connection,
    key: &CultivationKey,
    patch: CultivationPatch,
) -> Result<CultivationRow, HortaError> {
    let Some(status) = patch.status else {
        return get_cultivation(conn, key)?
            .ok_or_else(|| HortaError::NotFound("Cultivation not found".to_string()));
    };

    let changed = conn
        .execute(
            "UPDATE cultivos SET status_cultivo = ?
             WHERE id_produto = ? AND id_parcela = ? AND data_plantio = ?",
            params![status, key.product_id, key.plot_id, key.planted_on],
        )
        .map_err(|e| HortaError::Database(format!("Failed to update cultivation: {}", e)))?;

    if changed == 0 {
        return Err(HortaError::NotFound("Cultivation not found".to_string()));
    }

    Ok(CultivationRow {
        product_id: key.product_id,
        plot_id: key.plot_id,
        planted_on: key.planted_on,
        status,
    })
}

pub fn delete_cultivation(conn: &mut Connection, key: &CultivationKey) -> Result<(), HortaError> {
    let deleted = conn
        .execute(
            "DELETE FROM cultivos WHERE id_produto = ? AND id_parcela = ? AND data_plantio = ?",
            params![key.product_id, key.plot_id, key.planted_on],
        )
        .map_err(|e| HortaError::Database(format!("Failed to delete cultivation: {}", e)))?;

    if deleted == 0 {
        return Err(HortaError::NotFound("Cultivation not found".to_string()));
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
            INSERT INTO produto (id_produto, nome, tipo) VALUES (1, 'Alface', 'Verdura');
            INSERT INTO parcela (id_parcela, tamanho, localizacao) VALUES (2, 10.0, 'Canteiro A');
            "#,
        )
        .unwrap();
        conn
    }

    fn planting(day: u32) -> CultivationRow {
        CultivationRow {
            product_id: 1,
            plot_id: 2,
            planted_on: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            status: CultivationStatus::Planted,
        }
    }

    #[test]
    fn test_duplicate_triple_rejected() {
        let mut conn = conn();
        create_cultivation(&mut conn, planting(1)).unwrap();

        let err = create_cultivation(&mut conn, planting(1)).unwrap_err();
        assert!(matches!(err, HortaError::BadRequest(_)));

        // Same pair on another date is a separate planting
        create_cultivation(&mut conn, planting(2)).unwrap();
        assert_eq!(list_cultivations(&conn).unwrap().len(), 2);
    }

    #[test]
    fn test_requires_product_and_plot() {
        let mut conn = conn();

        let mut input = planting(1);
        input.product_id = 9;
        assert_eq!(
            create_cultivation(&mut conn, input).unwrap_err().detail(),
            "Product not found"
        );

        let mut input = planting(1);
        input.plot_id = 9;
        assert_eq!(
            create_cultivation(&mut conn, input).unwrap_err().detail(),
            "Plot not found"
        );
        assert!(list_cultivations(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_update_status_by_key() {
        let mut conn = conn();
        let row = create_cultivation(&mut conn, planting(1)).unwrap();

        let updated = update_cultivation(
            &mut conn,
            &row.key(),
            CultivationPatch {
                status: Some(CultivationStatus::Growing),
            },
        )
        .unwrap();
        assert_eq!(updated.status, CultivationStatus::Growing);
        assert_eq!(
            get_cultivation(&conn, &row.key()).unwrap().unwrap().status,
            CultivationStatus::Growing
        );

        let missing = planting(20).key();
        assert!(matches!(
            update_cultivation(
                &mut conn,
                &missing,
                CultivationPatch {
                    status: Some(CultivationStatus::Growing)
                }
            ),
            Err(HortaError::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_patch_keeps_status() {
        let mut conn = conn();
        let row = create_cultivation(&mut conn, planting(1)).unwrap();

        let patch: CultivationPatch = serde_json::from_str("{}").unwrap();
        let unchanged = update_cultivation(&mut conn, &row.key(), patch).unwrap();
        assert_eq!(unchanged, row);

        let missing = planting(20).key();
        assert!(matches!(
            update_cultivation(&mut conn, &missing, CultivationPatch::default()),
            Err(HortaError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_by_key() {
        let mut conn = conn();
        let row = create_cultivation(&mut conn, planting(1)).unwrap();

        delete_cultivation(&mut conn, &row.key()).unwrap();
        assert!(matches!(
            delete_cultivation(&mut conn, &row.key()),
            Err(HortaError::NotFound(_))
        ));
    }
}
