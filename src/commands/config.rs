use crate::db::Database;
use crate::error::{Error, Result};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

const CLAVE_CONFIG: &str = "negocio";

/// Parámetros generales del negocio, guardados como JSON en la tabla config.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConfigNegocio {
    pub nombre_negocio: String,
    /// Límite de crédito asignado a clientes nuevos sin límite explícito.
    pub limite_credito_default: f64,
    /// Intervalo entre cuotas cuando la deuda no trae plazo.
    pub dias_entre_cuotas: i64,
}

impl Default for ConfigNegocio {
    fn default() -> Self {
        ConfigNegocio {
            nombre_negocio: String::new(),
            limite_credito_default: 200.0,
            dias_entre_cuotas: 30,
        }
    }
}

pub fn obtener_config(db: &Database) -> Result<ConfigNegocio> {
    let conn = db.conn()?;

    let valor: Option<String> = conn
        .query_row(
            "SELECT value FROM config WHERE key = ?1",
            rusqlite::params![CLAVE_CONFIG],
            |row| row.get(0),
        )
        .optional()?;

    match valor {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| Error::Validacion(format!("configuración corrupta: {}", e))),
        None => Ok(ConfigNegocio::default()),
    }
}

pub fn guardar_config(db: &Database, config: &ConfigNegocio) -> Result<()> {
    if config.limite_credito_default < 0.0 {
        return Err(Error::Validacion(
            "el límite de crédito default no puede ser negativo".into(),
        ));
    }
    if config.dias_entre_cuotas <= 0 {
        return Err(Error::Validacion(
            "los días entre cuotas deben ser mayores a 0".into(),
        ));
    }

    let json = serde_json::to_string(config)
        .map_err(|e| Error::Validacion(format!("configuración inválida: {}", e)))?;

    let conn = db.conn()?;
    conn.execute(
        "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
        rusqlite::params![CLAVE_CONFIG, json],
    )?;

    Ok(())
}
