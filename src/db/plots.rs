//! Plot CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::models::{default_on_null, PlotStatus};
use crate::db::{reject_if_referenced, require_text};
use crate::types::HortaError;

/// Plot row from database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRow {
    #[serde(rename = "id_parcela")]
    pub id: i64,
    #[serde(rename = "tamanho")]
    pub size: f64,
    #[serde(rename = "localizacao")]
    pub location: String,
    pub status: PlotStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlotInput {
    #[serde(rename = "tamanho")]
    pub size: f64,
    #[serde(rename = "localizacao")]
    pub location: String,
    /// Absent or `null` means `Livre`
    #[serde(default, deserialize_with = "default_on_null")]
    pub status: PlotStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlotPatch {
    #[serde(rename = "tamanho", default)]
    pub size: Option<f64>,
    #[serde(rename = "localizacao", default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<PlotStatus>,
}

const SELECT_PLOT: &str = "SELECT id_parcela, tamanho, localizacao, status FROM parcela";

fn map_plot(row: &Row<'_>) -> rusqlite::Result<PlotRow> {
    Ok(PlotRow {
        id: row.get(0)?,
        size: row.get(1)?,
        location: row.get(2)?,
        status: row.get(3)?,
    })
}

fn validate_size(size: f64) -> Result<(), HortaError> {
    if size.is_finite() && size > 0.0 {
        Ok(())
    } else {
        Err(HortaError::BadRequest(
            "tamanho must be a positive number".to_string(),
        ))
    }
}

pub fn get_plot(conn: &Connection, id: i64) -> Result<Option<PlotRow>, HortaError> {
    conn.query_row(
        &format!("{} WHERE id_parcela = ?", SELECT_PLOT),
        params![id],
        map_plot,
    )
    .optional()
    .map_err(|e| HortaError::Database(format!("Failed to get plot: {}", e)))
}

pub fn list_plots(conn: &Connection) -> Result<Vec<PlotRow>, HortaError> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY id_parcela", SELECT_PLOT))?;
    let rows = stmt.query_map([], map_plot)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| HortaError::Database(format!("Failed to list plots: {}", e)))
}

pub fn create_plot(conn: &mut Connection, input: CreatePlotInput) -> Result<PlotRow, HortaError> {
    validate_size(input.size)?;
    require_text(&input.location, "localizacao")?;

    conn.execute(
        "INSERT INTO parcela (tamanho, localizacao, status) VALUES (?, ?, ?)",
        params![input.size, input.location, input.status],
    )
    .map_err(|e| HortaError::Database(format!("Failed to create plot: {}", e)))?;

    Ok(PlotRow {
        id: conn.last_insert_rowid(),
        size: input.size,
        location: input.location,
        status: input.status,
    })
}

pub fn update_plot(conn: &mut Connection, id: i64, patch: PlotPatch) -> Result<PlotRow, HortaError> {
    let tx = conn.transaction()?;

    let mut plot =
        get_plot(&tx, id)?.ok_or_else(|| HortaError::NotFound("Plot not found".to_string()))?;

    if let Some(size) = patch.size {
        validate_size(size)?;
        plot.size = size;
    }
    if let Some(location) = patch.location {
        require_text(&location, "localizacao")?;
        plot.location = location;
    }
    if let Some(status) = patch.status {
        plot.status = status;
    }

    tx.execute(
        "UPDATE parcela SET tamanho = ?, localizacao = ?, status = ? WHERE id_parcela = ?",
        params![plot.size, plot.location, plot.status, plot.id],
    )
    .map_err(|e| HortaError::Database(format!("Failed to update plot: {}", e)))?;
    tx.commit()?;

    Ok(plot)
}

/// Delete a plot that no planting or harvest refers to
pub fn delete_plot(conn: &mut Connection, id: i64) -> Result<(), HortaError> {
    let tx = conn.transaction()?;

    if get_plot(&tx, id)?.is_none() {
        return Err(HortaError::NotFound("Plot not found".to_string()));
    }
    reject_if_referenced(&tx, "cultivos", "id_parcela", &id, "Plot")?;
    reject_if_referenced(&tx, "colheitas", "id_parcela", &id, "Plot")?;

    tx.execute("DELETE FROM parcela WHERE id_parcela = ?", params![id])
        .map_err(|e| HortaError::Database(format!("Failed to delete plot: {}", e)))?;
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

    #[test]
    fn test_status_defaults_to_free() {
        let input: CreatePlotInput =
            serde_json::from_str(r#"{"tamanho": 12.5, "localizacao": "Canteiro A"}"#).unwrap();
        assert_eq!(input.status, PlotStatus::Free);

        let mut conn = conn();
        let plot = create_plot(&mut conn, input).unwrap();
        assert_eq!(get_plot(&conn, plot.id).unwrap().unwrap().status, PlotStatus::Free);

        let input: CreatePlotInput = serde_json::from_str(
            r#"{"tamanho": 4.0, "localizacao": "Canteiro B", "status": null}"#,
        )
        .unwrap();
        assert_eq!(input.status, PlotStatus::Free);
    }

    #[test]
    fn test_size_must_be_positive() {
        let mut conn = conn();
        for size in [0.0, -1.0, f64::NAN] {
            let err = create_plot(
                &mut conn,
                CreatePlotInput {
                    size,
                    location: "Canteiro A".into(),
                    status: PlotStatus::Free,
                },
            )
            .unwrap_err();
            assert!(matches!(err, HortaError::BadRequest(_)));
        }
        assert!(list_plots(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_partial_update() {
        let mut conn = conn();
        let plot = create_plot(
            &mut conn,
            CreatePlotInput {
                size: 10.0,
                location: "Canteiro A".into(),
                status: PlotStatus::Free,
            },
        )
        .unwrap();

        let updated = update_plot(
            &mut conn,
            plot.id,
            PlotPatch {
                status: Some(PlotStatus::Resting),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.status, PlotStatus::Resting);
        assert_eq!(updated.size, 10.0);

        assert!(matches!(
            update_plot(&mut conn, 404, PlotPatch::default()),
            Err(HortaError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_referenced_plot_rejected() {
        let mut conn = conn();
        let plot = create_plot(
            &mut conn,
            CreatePlotInput {
                size: 4.0,
                location: "Canteiro B".into(),
                status: PlotStatus::Cultivating,
            },
        )
        .unwrap();
        conn.execute(
            "INSERT INTO cultivos (id_produto, id_parcela, data_plantio, status_cultivo) VALUES (1, ?, '2024-03-01', 'Plantado')",
            params![plot.id],
        )
        .unwrap();

        assert!(matches!(
            delete_plot(&mut conn, plot.id),
            Err(HortaError::BadRequest(_))
        ));
        assert!(get_plot(&conn, plot.id).unwrap().is_some());
    }
}
