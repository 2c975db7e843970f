use crate::commands::config::obtener_config;
use crate::commands::deudas::{cargar_historial, mapear_deuda, DeudaDetalle, COLUMNAS_DEUDA};
use crate::commands::usuarios::verificar_admin;
use crate::db::{Database, SesionState};
use crate::error::{Error, Result};
use crate::models::{Cliente, NivelConfianza, NuevoCliente};
use rusqlite::{OptionalExtension, Row};
use serde::{Deserialize, Serialize};

fn mapear_cliente(row: &Row) -> rusqlite::Result<Cliente> {
    Ok(Cliente {
        id: Some(row.get(0)?),
        nombre: row.get(1)?,
        documento: row.get(2)?,
        telefono: row.get(3)?,
        direccion: row.get(4)?,
        nivel_confianza: row.get(5)?,
        limite_credito: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const COLUMNAS_CLIENTE: &str =
    "id, nombre, documento, telefono, direccion, nivel_confianza, limite_credito, created_at";

/// Cliente con sus deudas anidadas, cada una con su historial completo.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClienteDetalle {
    pub cliente: Cliente,
    pub deudas: Vec<DeudaDetalle>,
    pub total_adeudado: f64,
}

pub fn crear_cliente(db: &Database, nuevo: NuevoCliente) -> Result<i64> {
    let nombre = nuevo.nombre.trim().to_string();
    if nombre.is_empty() {
        return Err(Error::Validacion("el nombre no puede estar vacío".into()));
    }
    if let Some(limite) = nuevo.limite_credito {
        if limite < 0.0 {
            return Err(Error::Validacion(
                "el límite de crédito no puede ser negativo".into(),
            ));
        }
    }

    let limite = match nuevo.limite_credito {
        Some(l) => l,
        None => obtener_config(db)?.limite_credito_default,
    };
    let nivel = nuevo.nivel_confianza.unwrap_or(NivelConfianza::Nuevo);

    let conn = db.conn()?;

    let existe: i64 = conn.query_row(
        "SELECT COUNT(*) FROM clientes WHERE nombre = ?1",
        rusqlite::params![nombre],
        |row| row.get(0),
    )?;
    if existe > 0 {
        return Err(Error::Validacion(format!(
            "ya existe un cliente con el nombre '{}'",
            nombre
        )));
    }

    conn.execute(
        "INSERT INTO clientes (nombre, documento, telefono, direccion, nivel_confianza, limite_credito)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            nombre,
            nuevo.documento,
            nuevo.telefono,
            nuevo.direccion,
            nivel,
            limite,
        ],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(cliente_id = id, nombre = %nombre, "cliente registrado");
    Ok(id)
}

pub fn actualizar_cliente(db: &Database, cliente: Cliente) -> Result<()> {
    let id = cliente
        .id
        .ok_or_else(|| Error::Validacion("id requerido para actualizar".into()))?;
    if cliente.nombre.trim().is_empty() {
        return Err(Error::Validacion("el nombre no puede estar vacío".into()));
    }
    if cliente.limite_credito < 0.0 {
        return Err(Error::Validacion(
            "el límite de crédito no puede ser negativo".into(),
        ));
    }

    let conn = db.conn()?;

    let cambiadas = conn.execute(
        "UPDATE clientes SET nombre=?1, documento=?2, telefono=?3, direccion=?4,
         nivel_confianza=?5, limite_credito=?6, updated_at=datetime('now','localtime')
         WHERE id=?7",
        rusqlite::params![
            cliente.nombre.trim(),
            cliente.documento,
            cliente.telefono,
            cliente.direccion,
            cliente.nivel_confianza,
            cliente.limite_credito,
            id,
        ],
    )?;

    if cambiadas == 0 {
        return Err(Error::NoEncontrado(format!("cliente {}", id)));
    }
    Ok(())
}

pub fn buscar_clientes(db: &Database, termino: &str) -> Result<Vec<Cliente>> {
    let conn = db.conn()?;
    let busqueda = format!("%{}%", termino);

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM clientes
         WHERE nombre LIKE ?1 OR documento LIKE ?1
         ORDER BY nombre LIMIT 30",
        COLUMNAS_CLIENTE
    ))?;

    let clientes = stmt
        .query_map(rusqlite::params![busqueda], mapear_cliente)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(clientes)
}

pub fn listar_clientes(db: &Database) -> Result<Vec<Cliente>> {
    let conn = db.conn()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM clientes ORDER BY nombre",
        COLUMNAS_CLIENTE
    ))?;

    let clientes = stmt
        .query_map([], mapear_cliente)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(clientes)
}

pub fn obtener_cliente(db: &Database, id: i64) -> Result<Cliente> {
    let conn = db.conn()?;

    conn.query_row(
        &format!("SELECT {} FROM clientes WHERE id = ?1", COLUMNAS_CLIENTE),
        rusqlite::params![id],
        mapear_cliente,
    )
    .optional()?
    .ok_or_else(|| Error::NoEncontrado(format!("cliente {}", id)))
}

/// Cliente con todas sus deudas y el historial de cada una (pagos,
/// renegociaciones, cuotas), más el total adeudado.
pub fn obtener_cliente_detalle(db: &Database, id: i64) -> Result<ClienteDetalle> {
    let cliente = obtener_cliente(db, id)?;

    let conn = db.conn()?;
    let deudas_planas: Vec<_> = {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM deudas d WHERE d.cliente_id = ?1 ORDER BY d.fecha_vencimiento",
            COLUMNAS_DEUDA
        ))?;
        let filas = stmt
            .query_map(rusqlite::params![id], mapear_deuda)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        filas
    };

    let mut deudas = Vec::with_capacity(deudas_planas.len());
    let mut total_adeudado = 0.0;
    for deuda in deudas_planas {
        total_adeudado += deuda.saldo;
        let deuda_id = deuda.id.expect("deuda leída de la base siempre tiene id");
        let (pagos, renegociaciones, cuotas) = cargar_historial(&conn, deuda_id)?;
        deudas.push(DeudaDetalle {
            deuda,
            cliente_nombre: cliente.nombre.clone(),
            pagos,
            renegociaciones,
            cuotas,
        });
    }

    Ok(ClienteDetalle {
        cliente,
        deudas,
        total_adeudado,
    })
}

/// Elimina un cliente y, en cascada, sus deudas con pagos, renegociaciones y
/// cuotas. Solo con sesión de administrador.
pub fn eliminar_cliente(db: &Database, sesion: &SesionState, id: i64) -> Result<()> {
    verificar_admin(sesion).map_err(|e| {
        tracing::warn!(cliente_id = id, "eliminación de cliente sin autorización");
        e
    })?;

    let mut conn = db.conn()?;
    let tx = conn.transaction()?;

    let borradas = tx.execute("DELETE FROM clientes WHERE id = ?1", rusqlite::params![id])?;
    if borradas == 0 {
        return Err(Error::NoEncontrado(format!("cliente {}", id)));
    }
    tx.commit()?;

    tracing::info!(cliente_id = id, "cliente eliminado con todas sus deudas");
    Ok(())
}
