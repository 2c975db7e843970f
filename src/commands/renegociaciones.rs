use crate::commands::deudas::{mapear_deuda, COLUMNAS_DEUDA};
use crate::db::{Database, SesionState};
use crate::error::{Error, Result};
use crate::models::{Deuda, Renegociacion};
use chrono::{Duration, Local};
use rusqlite::OptionalExtension;

/// Renegocia una deuda: nuevo vencimiento a `plazo_dias` de hoy y recargo de
/// `interes_percent` sobre el saldo actual. Deja registro en el historial.
pub fn renegociar_deuda(
    db: &Database,
    sesion: &SesionState,
    deuda_id: i64,
    plazo_dias: i64,
    interes_percent: f64,
) -> Result<Deuda> {
    if plazo_dias < 0 {
        return Err(Error::Validacion("el plazo no puede ser negativo".into()));
    }

    let operador = crate::commands::usuarios::sesion_actual(sesion)?
        .map(|s| s.nombre)
        .unwrap_or_else(|| "Sistema".to_string());

    let hoy = Local::now().date_naive();
    let nueva_fecha = hoy + Duration::days(plazo_dias);

    let mut conn = db.conn()?;
    let tx = conn.transaction()?;

    let mut deuda: Deuda = tx
        .query_row(
            &format!("SELECT {} FROM deudas d WHERE d.id = ?1", COLUMNAS_DEUDA),
            rusqlite::params![deuda_id],
            mapear_deuda,
        )
        .optional()?
        .ok_or_else(|| Error::NoEncontrado(format!("deuda {}", deuda_id)))?;

    let recargo = deuda.renegociar(nueva_fecha, interes_percent)?;

    tx.execute(
        "UPDATE deudas SET saldo = ?1, estado = ?2, fecha_vencimiento = ?3,
         updated_at = datetime('now','localtime')
         WHERE id = ?4",
        rusqlite::params![deuda.saldo, deuda.estado, deuda.fecha_vencimiento, deuda_id],
    )?;

    tx.execute(
        "INSERT INTO renegociaciones (deuda_id, nueva_fecha_venc, interes_percent, fecha, operador)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![deuda_id, nueva_fecha, interes_percent, hoy, operador],
    )?;

    tx.commit()?;

    tracing::info!(
        deuda_id,
        interes_percent,
        recargo,
        saldo = deuda.saldo,
        "deuda renegociada"
    );

    Ok(deuda)
}

pub fn listar_renegociaciones_deuda(db: &Database, deuda_id: i64) -> Result<Vec<Renegociacion>> {
    let conn = db.conn()?;

    let mut stmt = conn.prepare(
        "SELECT id, deuda_id, nueva_fecha_venc, interes_percent, fecha, operador
         FROM renegociaciones WHERE deuda_id = ?1 ORDER BY fecha DESC, id DESC",
    )?;

    let renegociaciones = stmt
        .query_map(rusqlite::params![deuda_id], |row| {
            Ok(Renegociacion {
                id: Some(row.get(0)?),
                deuda_id: row.get(1)?,
                nueva_fecha_venc: row.get(2)?,
                interes_percent: row.get(3)?,
                fecha: row.get(4)?,
                operador: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(renegociaciones)
}
