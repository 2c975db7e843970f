use crate::commands::config::obtener_config;
use crate::commands::usuarios::{validar_credenciales_admin, verificar_admin};
use crate::db::{Database, SesionState};
use crate::error::{Error, Result};
use crate::models::{
    generar_cuotas, Cuota, Deuda, EstadoDeuda, NivelConfianza, Pago, Renegociacion,
};
use chrono::{Duration, Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

pub(crate) const COLUMNAS_DEUDA: &str = "d.id, d.cliente_id, d.valor_original, d.fecha_venta, \
     d.fecha_vencimiento, d.descripcion, d.estado, d.saldo, d.en_cuotas, d.num_cuotas, \
     d.interes_cuotas";

pub(crate) fn mapear_deuda(row: &Row) -> rusqlite::Result<Deuda> {
    Ok(Deuda {
        id: Some(row.get(0)?),
        cliente_id: row.get(1)?,
        valor_original: row.get(2)?,
        fecha_venta: row.get(3)?,
        fecha_vencimiento: row.get(4)?,
        descripcion: row.get(5)?,
        estado: row.get(6)?,
        saldo: row.get(7)?,
        en_cuotas: row.get::<_, i64>(8)? != 0,
        num_cuotas: row.get(9)?,
        interes_cuotas: row.get(10)?,
    })
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NuevaDeuda {
    pub cliente_id: i64,
    pub valor: f64,
    pub descripcion: String,
    /// Días hasta el vencimiento, contados desde hoy.
    pub plazo_dias: i64,
    pub num_cuotas: i64,
    pub interes_cuotas: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeudaConCliente {
    pub deuda: Deuda,
    pub cliente_nombre: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeudaDetalle {
    pub deuda: Deuda,
    pub cliente_nombre: String,
    pub pagos: Vec<Pago>,
    pub renegociaciones: Vec<Renegociacion>,
    pub cuotas: Vec<Cuota>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CredencialesAdmin {
    pub usuario: String,
    pub clave: String,
}

/// Registra una nueva deuda (venta a plazo).
///
/// Si viene en cuotas, el total con interés se reparte en cuotas iguales y el
/// vencimiento de la deuda pasa a ser el de la última cuota. Además, todas las
/// demás deudas pendientes del cliente se prorrogan al mismo vencimiento con
/// interés 0 (comportamiento acumulativo: el cliente paga todo junto).
pub fn crear_deuda(db: &Database, sesion: &SesionState, nueva: NuevaDeuda) -> Result<DeudaDetalle> {
    if nueva.valor <= 0.0 {
        return Err(Error::Validacion("el valor debe ser mayor a 0".into()));
    }
    if nueva.num_cuotas < 1 {
        return Err(Error::Validacion("el número de cuotas debe ser al menos 1".into()));
    }
    if nueva.interes_cuotas < 0.0 {
        return Err(Error::Validacion("el interés no puede ser negativo".into()));
    }
    if nueva.plazo_dias < 0 {
        return Err(Error::Validacion("el plazo no puede ser negativo".into()));
    }

    let operador = crate::commands::usuarios::sesion_actual(sesion)?
        .map(|s| s.nombre)
        .unwrap_or_else(|| "Sistema".to_string());
    let dias_default = obtener_config(db)?.dias_entre_cuotas;

    let mut conn = db.conn()?;
    let tx = conn.transaction()?;

    let (cliente_nombre, nivel): (String, NivelConfianza) = tx
        .query_row(
            "SELECT nombre, nivel_confianza FROM clientes WHERE id = ?1",
            rusqlite::params![nueva.cliente_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| Error::NoEncontrado(format!("cliente {}", nueva.cliente_id)))?;

    if nivel == NivelConfianza::Bloqueado {
        return Err(Error::Validacion(format!(
            "el cliente '{}' está bloqueado para nuevas deudas",
            cliente_nombre
        )));
    }

    let hoy = Local::now().date_naive();
    let en_cuotas = nueva.num_cuotas > 1;

    // El interés de parcelamiento solo aplica cuando hay más de una cuota
    let interes = if en_cuotas { nueva.interes_cuotas } else { 0.0 };
    let valor_total = nueva.valor * (1.0 + interes / 100.0);

    let dias_entre = if nueva.plazo_dias > 0 {
        nueva.plazo_dias / nueva.num_cuotas
    } else {
        dias_default
    };
    let fecha_vencimiento = if en_cuotas {
        hoy + Duration::days(dias_entre * nueva.num_cuotas)
    } else {
        hoy + Duration::days(nueva.plazo_dias)
    };

    tx.execute(
        "INSERT INTO deudas (cliente_id, valor_original, fecha_venta, fecha_vencimiento,
         descripcion, estado, saldo, en_cuotas, num_cuotas, interes_cuotas)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            nueva.cliente_id,
            nueva.valor,
            hoy,
            fecha_vencimiento,
            nueva.descripcion,
            EstadoDeuda::Pendiente,
            valor_total,
            en_cuotas as i64,
            nueva.num_cuotas,
            interes,
        ],
    )?;
    let deuda_id = tx.last_insert_rowid();

    let mut cuotas = Vec::new();
    if en_cuotas {
        cuotas = generar_cuotas(deuda_id, nueva.valor, nueva.num_cuotas, interes, hoy, dias_entre);
        for c in &cuotas {
            tx.execute(
                "INSERT INTO cuotas (deuda_id, numero, valor, fecha_vencimiento, estado, valor_pagado)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    c.deuda_id,
                    c.numero,
                    c.valor,
                    c.fecha_vencimiento,
                    c.estado,
                    c.valor_pagado,
                ],
            )?;
        }
    }

    prorrogar_pendientes(&tx, nueva.cliente_id, deuda_id, fecha_vencimiento, hoy, &operador)?;

    tx.commit()?;

    tracing::info!(
        deuda_id,
        cliente_id = nueva.cliente_id,
        valor = nueva.valor,
        num_cuotas = nueva.num_cuotas,
        "deuda registrada"
    );

    Ok(DeudaDetalle {
        deuda: Deuda {
            id: Some(deuda_id),
            cliente_id: nueva.cliente_id,
            valor_original: nueva.valor,
            fecha_venta: hoy,
            fecha_vencimiento,
            descripcion: nueva.descripcion,
            estado: EstadoDeuda::Pendiente,
            saldo: valor_total,
            en_cuotas,
            num_cuotas: nueva.num_cuotas,
            interes_cuotas: interes,
        },
        cliente_nombre,
        pagos: Vec::new(),
        renegociaciones: Vec::new(),
        cuotas,
    })
}

/// Prorroga al 0% todas las demás deudas abiertas del cliente para que venzan
/// junto con la deuda nueva, dejando registro en el historial.
fn prorrogar_pendientes(
    tx: &Connection,
    cliente_id: i64,
    deuda_nueva_id: i64,
    nueva_fecha: NaiveDate,
    hoy: NaiveDate,
    operador: &str,
) -> Result<()> {
    let pendientes: Vec<Deuda> = {
        let mut stmt = tx.prepare(&format!(
            "SELECT {} FROM deudas d
             WHERE d.cliente_id = ?1 AND d.id != ?2 AND d.estado != 'PAGADA'",
            COLUMNAS_DEUDA
        ))?;
        let filas = stmt
            .query_map(rusqlite::params![cliente_id, deuda_nueva_id], mapear_deuda)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        filas
    };

    for mut d in pendientes {
        d.renegociar(nueva_fecha, 0.0)?;
        let id = d.id.expect("deuda leída de la base siempre tiene id");
        tx.execute(
            "UPDATE deudas SET saldo = ?1, estado = ?2, fecha_vencimiento = ?3,
             updated_at = datetime('now','localtime')
             WHERE id = ?4",
            rusqlite::params![d.saldo, d.estado, d.fecha_vencimiento, id],
        )?;
        tx.execute(
            "INSERT INTO renegociaciones (deuda_id, nueva_fecha_venc, interes_percent, fecha, operador)
             VALUES (?1, ?2, 0, ?3, ?4)",
            rusqlite::params![id, nueva_fecha, hoy, operador],
        )?;
    }

    Ok(())
}

pub fn listar_deudas(db: &Database) -> Result<Vec<DeudaConCliente>> {
    let conn = db.conn()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {}, cl.nombre FROM deudas d
         JOIN clientes cl ON d.cliente_id = cl.id
         ORDER BY d.fecha_vencimiento",
        COLUMNAS_DEUDA
    ))?;

    let deudas = stmt
        .query_map([], |row| {
            Ok(DeudaConCliente {
                deuda: mapear_deuda(row)?,
                cliente_nombre: row.get(11)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(deudas)
}

pub fn listar_deudas_cliente(db: &Database, cliente_id: i64) -> Result<Vec<Deuda>> {
    let conn = db.conn()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM deudas d WHERE d.cliente_id = ?1 ORDER BY d.fecha_vencimiento",
        COLUMNAS_DEUDA
    ))?;

    let deudas = stmt
        .query_map(rusqlite::params![cliente_id], mapear_deuda)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(deudas)
}

/// Deuda con su historial completo: pagos, renegociaciones y cuotas.
pub fn obtener_deuda(db: &Database, id: i64) -> Result<DeudaDetalle> {
    let conn = db.conn()?;

    let (deuda, cliente_nombre) = conn
        .query_row(
            &format!(
                "SELECT {}, cl.nombre FROM deudas d
                 JOIN clientes cl ON d.cliente_id = cl.id
                 WHERE d.id = ?1",
                COLUMNAS_DEUDA
            ),
            rusqlite::params![id],
            |row| Ok((mapear_deuda(row)?, row.get::<_, String>(11)?)),
        )
        .optional()?
        .ok_or_else(|| Error::NoEncontrado(format!("deuda {}", id)))?;

    let (pagos, renegociaciones, cuotas) = cargar_historial(&conn, id)?;

    Ok(DeudaDetalle {
        deuda,
        cliente_nombre,
        pagos,
        renegociaciones,
        cuotas,
    })
}

pub(crate) fn cargar_historial(
    conn: &Connection,
    deuda_id: i64,
) -> Result<(Vec<Pago>, Vec<Renegociacion>, Vec<Cuota>)> {
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

    let mut stmt = conn.prepare(
        "SELECT id, deuda_id, numero, valor, fecha_vencimiento, estado, valor_pagado
         FROM cuotas WHERE deuda_id = ?1 ORDER BY numero",
    )?;
    let cuotas = stmt
        .query_map(rusqlite::params![deuda_id], |row| {
            Ok(Cuota {
                id: Some(row.get(0)?),
                deuda_id: row.get(1)?,
                numero: row.get(2)?,
                valor: row.get(3)?,
                fecha_vencimiento: row.get(4)?,
                estado: row.get(5)?,
                valor_pagado: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((pagos, renegociaciones, cuotas))
}

/// Elimina una deuda con todo su historial. Un admin con sesión activa puede
/// hacerlo directo; un cajero debe presentar credenciales de un admin.
pub fn eliminar_deuda(
    db: &Database,
    sesion: &SesionState,
    id: i64,
    credenciales: Option<CredencialesAdmin>,
) -> Result<()> {
    let autorizado = verificar_admin(sesion).is_ok();

    let mut conn = db.conn()?;

    if !autorizado {
        let cred = credenciales.ok_or_else(|| {
            tracing::warn!(deuda_id = id, "eliminación de deuda sin autorización");
            Error::Validacion("se requieren credenciales de administrador".into())
        })?;
        validar_credenciales_admin(&conn, &cred.usuario, &cred.clave)?;
    }

    let tx = conn.transaction()?;
    let borradas = tx.execute("DELETE FROM deudas WHERE id = ?1", rusqlite::params![id])?;
    if borradas == 0 {
        return Err(Error::NoEncontrado(format!("deuda {}", id)));
    }
    tx.commit()?;

    tracing::info!(deuda_id = id, "deuda eliminada");
    Ok(())
}
