//! Harvest to planting status propagation

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::db::models::CultivationStatus;
use crate::types::HortaError;

/// Events emitted by data-layer writes that other rows react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainEvent {
    /// A harvest was created or updated for this plot/product pair
    HarvestRecorded { plot_id: i64, product_id: i64 },
}

/// Apply an event on the caller's connection (normally an open transaction)
///
/// Returns the number of rows touched.
pub fn apply(conn: &Connection, event: &DomainEvent) -> Result<usize, HortaError> {
    debug!(event = ?event, "Applying domain event");

    match *event {
        DomainEvent::HarvestRecorded {
            plot_id,
            product_id,
        } => {
            // Every planting of the pair, whatever its date or current status
            let updated = conn
                .execute(
                    "UPDATE cultivos SET status_cultivo = ? WHERE id_parcela = ? AND id_produto = ?",
                    params![CultivationStatus::Harvested, plot_id, product_id],
                )
                .map_err(|e| {
                    HortaError::Database(format!("Failed to propagate harvest: {}", e))
                })?;

            info!(plot_id, product_id, updated, "Marked plantings as harvested");
            Ok(updated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;

    fn status_of(conn: &Connection, product: i64, plot: i64, date: &str) -> CultivationStatus {
        conn.query_row(
            "SELECT status_cultivo FROM cultivos WHERE id_produto = ? AND id_parcela = ? AND data_plantio = ?",
            params![product, plot, date],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_marks_every_matching_planting() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO cultivos VALUES (1, 2, '2024-01-10', 'Plantado');
            INSERT INTO cultivos VALUES (1, 2, '2024-02-10', 'ProntoParaColheita');
            INSERT INTO cultivos VALUES (1, 3, '2024-01-10', 'Crescendo');
            INSERT INTO cultivos VALUES (4, 2, '2024-01-10', 'Plantado');
            "#,
        )
        .unwrap();

        let touched = apply(
            &conn,
            &DomainEvent::HarvestRecorded {
                plot_id: 2,
                product_id: 1,
            },
        )
        .unwrap();

        assert_eq!(touched, 2);
        assert_eq!(status_of(&conn, 1, 2, "2024-01-10"), CultivationStatus::Harvested);
        assert_eq!(status_of(&conn, 1, 2, "2024-02-10"), CultivationStatus::Harvested);
        assert_eq!(status_of(&conn, 1, 3, "2024-01-10"), CultivationStatus::Growing);
        assert_eq!(status_of(&conn, 4, 2, "2024-01-10"), CultivationStatus::Planted);
    }

    #[test]
    fn test_no_matching_planting_is_not_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let touched = apply(
            &conn,
            &DomainEvent::HarvestRecorded {
                plot_id: 8,
                product_id: 9,
            },
        )
        .unwrap();
        assert_eq!(touched, 0);
    }
}
