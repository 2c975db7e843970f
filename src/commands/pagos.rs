use crate::commands::deudas::{mapear_deuda, COLUMNAS_DEUDA};
use crate::db::{Database, SesionState};
use crate::error::{Error, Result};
use crate::models::{Deuda, NuevoPago, Pago};
use chrono::Local;
use rusqlite::OptionalExtension;

/// Registra un pago sobre una deuda y actualiza su saldo, todo dentro de una
/// transacción: si algo falla no queda ni el pago ni el saldo a medias.
/// El operador por defecto es el usuario de la sesión activa.
pub fn registrar_pago(db: &Database, sesion: &SesionState, pago: NuevoPago) -> Result<Deuda> {
    let operador = match pago.operador {
        Some(op) => Some(op),
        None => crate::commands::usuarios::sesion_actual(sesion)?.map(|s| s.nombre),
    };

    let mut conn = db.conn()?;
    let tx = conn.transaction()?;

    let mut deuda: Deuda = tx
        .query_row(
            &format!("SELECT {} FROM deudas d WHERE d.id = ?1", COLUMNAS_DEUDA),
            rusqlite::params![pago.deuda_id],
            mapear_deuda,
        )
        .optional()?
        .ok_or_else(|| Error::NoEncontrado(format!("deuda {}", pago.deuda_id)))?;

    deuda.aplicar_pago(pago.monto)?;

    let hoy = Local::now().date_naive();
    tx.execute(
        "INSERT INTO pagos (deuda_id, monto, fecha, medio, operador)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![pago.deuda_id, pago.monto, hoy, pago.medio, operador],
    )?;

    tx.execute(
        "UPDATE deudas SET saldo = ?1, estado = ?2, updated_at = datetime('now','localtime')
         WHERE id = ?3",
        rusqlite::params![deuda.saldo, deuda.estado, pago.deuda_id],
    )?;

    tx.commit()?;

    tracing::info!(
        deuda_id = pago.deuda_id,
        monto = pago.monto,
        saldo = deuda.saldo,
        estado = deuda.estado.as_str(),
        "pago registrado"
    );

    Ok(deuda)
}

pub fn listar_pagos_deuda(db: &Database, deuda_id: i64) -> Result<Vec<Pago>> {
    let conn = db.conn()?;

    let existe: i64 = conn.query_row(
        "SELECT COUNT(*) FROM deudas WHERE id = ?1",
        rusqlite::params![deuda_id],
        |row| row.get(0),
    )?;
    if existe == 0 {
        return Err(Error::NoEncontrado(format!("deuda {}", deuda_id)));
    }

    let mut stmt = conn.prepare(
        "SELECT id, deuda_id, monto, fecha, medio, operador
         FROM pagos WHERE deuda_id = ?1 ORDER BY fecha DESC, id DESC",
    )?;

    let pagos = stmt
        .query_map(rusqlite::params![deuda_id], |row| {
            Ok(Pago {
                id: Some(row.get(0)?),
                deuda_id: row.get(1)?,
                monto: row.get(2)?,
                fecha: row.get(3)?,
                medio: row.get(4)?,
                operador: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(pagos)
}
