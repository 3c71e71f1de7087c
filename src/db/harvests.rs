//! Harvest operations
//!
//! Recording a harvest (create or update) emits
//! `DomainEvent::HarvestRecorded`, applied in the same transaction as the
//! harvest write.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::require_row;
use crate::services::propagation::{self, DomainEvent};
use crate::types::HortaError;

/// Harvest row from database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestRow {
    #[serde(rename = "id_colheita")]
    pub id: i64,
    #[serde(rename = "id_parcela")]
    pub plot_id: i64,
    #[serde(rename = "id_produto")]
    pub product_id: i64,
    #[serde(rename = "data_colheita")]
    pub harvested_on: NaiveDate,
    #[serde(rename = "quantidade_kg")]
    pub quantity_kg: f64,
}

/// Create body, also used as the full replacement on update
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestInput {
    #[serde(rename = "id_parcela")]
    pub plot_id: i64,
    #[serde(rename = "id_produto")]
    pub product_id: i64,
    #[serde(rename = "data_colheita")]
    pub harvested_on: NaiveDate,
    #[serde(rename = "quantidade_kg")]
    pub quantity_kg: f64,
}

/// A harvest write plus the number of plantings it marked as harvested
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedHarvest {
    pub harvest: HarvestRow,
    pub plantings_harvested: usize,
}

const SELECT_HARVEST: &str =
    "SELECT id_colheita, id_parcela, id_produto, data_colheita, quantidade_kg FROM colheitas";

fn map_harvest(row: &Row<'_>) -> rusqlite::Result<HarvestRow> {
    Ok(HarvestRow {
        id: row.get(0)?,
        plot_id: row.get(1)?,
        product_id: row.get(2)?,
        harvested_on: row.get(3)?,
        quantity_kg: row.get(4)?,
    })
}

fn validate(conn: &Connection, input: &HarvestInput) -> Result<(), HortaError> {
    if !input.quantity_kg.is_finite() || input.quantity_kg < 0.0 {
        return Err(HortaError::BadRequest(
            "quantidade_kg must be a non-negative number".to_string(),
        ));
    }
    require_row(conn, "produto", "id_produto", &input.product_id, "Product")?;
    require_row(conn, "parcela", "id_parcela", &input.plot_id, "Plot")?;
    Ok(())
}

pub fn get_harvest(conn: &Connection, id: i64) -> Result<Option<HarvestRow>, HortaError> {
    conn.query_row(
        &format!("{} WHERE id_colheita = ?", SELECT_HARVEST),
        params![id],
        map_harvest,
    )
    .optional()
    .map_err(|e| HortaError::Database(format!("Failed to get harvest: {}", e)))
}

pub fn list_harvests(conn: &Connection) -> Result<Vec<HarvestRow>, HortaError> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY data_colheita, id_colheita",
        SELECT_HARVEST
    ))?;
    let rows = stmt.query_map([], map_harvest)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| HortaError::Database(format!("Failed to list harvests: {}", e)))
}

/// Record a harvest and mark the pair's plantings as harvested
pub fn create_harvest(
    conn: &mut Connection,
    input: HarvestInput,
) -> Result<RecordedHarvest, HortaError> {
    let tx = conn.transaction()?;
    validate(&tx, &input)?;

    tx.execute(
        "INSERT INTO colheitas (id_parcela, id_produto, data_colheita, quantidade_kg)
         VALUES (?, ?, ?, ?)",
        params![
            input.plot_id,
            input.product_id,
            input.harvested_on,
            input.quantity_kg
        ],
    )
    .map_err(|e| HortaError::Database(format!("Failed to create harvest: {}", e)))?;

    let harvest = HarvestRow {
        id: tx.last_insert_rowid(),
        plot_id: input.plot_id,
        product_id: input.product_id,
        harvested_on: input.harvested_on,
        quantity_kg: input.quantity_kg,
    };
    let plantings_harvested = propagation::apply(
        &tx,
        &DomainEvent::HarvestRecorded {
            plot_id: harvest.plot_id,
            product_id: harvest.product_id,
        },
    )?;
    tx.commit()?;

    Ok(RecordedHarvest {
        harvest,
        plantings_harvested,
    })
}

/// Replace a harvest; propagation uses the updated plot/product pair
pub fn update_harvest(
    conn: &mut Connection,
    id: i64,
    input: HarvestInput,
) -> Result<RecordedHarvest, HortaError> {
    let tx = conn.transaction()?;

    if get_harvest(&tx, id)?.is_none() {
        return Err(HortaError::NotFound("Harvest not found".to_string()));
    }
    validate(&tx, &input)?;

    tx.execute(
        "UPDATE colheitas SET id_parcela = ?, id_produto = ?, data_colheita = ?, quantidade_kg = ?
         WHERE id_colheita = ?",
        params![
            input.plot_id,
            input.product_id,
            input.harvested_on,
            input.quantity_kg,
            id
        ],
    )
    .map_err(|e| HortaError::Database(format!("Failed to update harvest: {}", e)))?;

    let plantings_harvested = propagation::apply(
        &tx,
        &DomainEvent::HarvestRecorded {
            plot_id: input.plot_id,
            product_id: input.product_id,
        },
    )?;
    tx.commit()?;

    Ok(RecordedHarvest {
        harvest: HarvestRow {
            id,
            plot_id: input.plot_id,
            product_id: input.product_id,
            harvested_on: input.harvested_on,
            quantity_kg: input.quantity_kg,
        },
        plantings_harvested,
    })
}

/// Delete a harvest; planting statuses are left as they are
pub fn delete_harvest(conn: &mut Connection, id: i64) -> Result<(), HortaError> {
    let deleted = conn
        .execute("DELETE FROM colheitas WHERE id_colheita = ?", params![id])
        .map_err(|e| HortaError::Database(format!("Failed to delete harvest: {}", e)))?;

    if deleted == 0 {
        return Err(HortaError::NotFound("Harvest not found".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CultivationStatus;
    use crate::db::schema::init_schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO produto (id_produto, nome, tipo) VALUES (1, 'Alface', 'Verdura');
            INSERT INTO produto (id_produto, nome, tipo) VALUES (5, 'Tomate', 'Fruta');
            INSERT INTO parcela (id_parcela, tamanho, localizacao) VALUES (2, 10.0, 'Canteiro A');
            INSERT INTO cultivos VALUES (1, 2, '2024-03-01', 'Plantado');
            INSERT INTO cultivos VALUES (1, 2, '2024-04-01', 'Crescendo');
            INSERT INTO cultivos VALUES (5, 2, '2024-03-01', 'Plantado');
            "#,
        )
        .unwrap();
        conn
    }

    fn input(product_id: i64, quantity_kg: f64) -> HarvestInput {
        HarvestInput {
            plot_id: 2,
            product_id,
            harvested_on: NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
            quantity_kg,
        }
    }

    fn statuses(conn: &Connection, product_id: i64) -> Vec<CultivationStatus> {
        let mut stmt = conn
            .prepare("SELECT status_cultivo FROM cultivos WHERE id_produto = ? ORDER BY data_plantio")
            .unwrap();
        stmt.query_map(params![product_id], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_create_propagates_to_pair_only() {
        let mut conn = conn();
        let recorded = create_harvest(&mut conn, input(1, 3.5)).unwrap();

        assert_eq!(recorded.plantings_harvested, 2);
        assert_eq!(
            statuses(&conn, 1),
            vec![CultivationStatus::Harvested, CultivationStatus::Harvested]
        );
        assert_eq!(statuses(&conn, 5), vec![CultivationStatus::Planted]);
        assert_eq!(
            get_harvest(&conn, recorded.harvest.id).unwrap(),
            Some(recorded.harvest)
        );
    }

    #[test]
    fn test_update_propagates_to_new_pair() {
        let mut conn = conn();
        let recorded = create_harvest(&mut conn, input(1, 3.5)).unwrap();

        let updated = update_harvest(&mut conn, recorded.harvest.id, input(5, 1.0)).unwrap();
        assert_eq!(updated.plantings_harvested, 1);
        assert_eq!(statuses(&conn, 5), vec![CultivationStatus::Harvested]);
        assert_eq!(updated.harvest.quantity_kg, 1.0);
    }

    #[test]
    fn test_rejections_leave_no_trace() {
        let mut conn = conn();

        assert!(matches!(
            create_harvest(&mut conn, input(1, -1.0)),
            Err(HortaError::BadRequest(_))
        ));
        assert!(matches!(
            create_harvest(&mut conn, input(99, 1.0)),
            Err(HortaError::NotFound(_))
        ));
        assert!(matches!(
            update_harvest(&mut conn, 42, input(1, 1.0)),
            Err(HortaError::NotFound(_))
        ));

        assert!(list_harvests(&conn).unwrap().is_empty());
        assert_eq!(
            statuses(&conn, 1),
            vec![CultivationStatus::Planted, CultivationStatus::Growing]
        );
    }

    #[test]
    fn test_delete_keeps_statuses() {
        let mut conn = conn();
        let recorded = create_harvest(&mut conn, input(1, 0.0)).unwrap();

        delete_harvest(&mut conn, recorded.harvest.id).unwrap();
        assert_eq!(
            statuses(&conn, 1),
            vec![CultivationStatus::Harvested, CultivationStatus::Harvested]
        );
        assert!(matches!(
            delete_harvest(&mut conn, recorded.harvest.id),
            Err(HortaError::NotFound(_))
        ));
    }
}
