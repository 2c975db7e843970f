use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Clasificación de confianza del cliente. Afecta el límite de crédito
/// sugerido y el tratamiento de riesgo, no bloquea operaciones por sí sola
/// (salvo BLOQUEADO, que rechaza deudas nuevas).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NivelConfianza {
    Nuevo,
    BuenPagador,
    Moroso,
    Bloqueado,
}

impl NivelConfianza {
    pub fn as_str(&self) -> &'static str {
        match self {
            NivelConfianza::Nuevo => "NUEVO",
            NivelConfianza::BuenPagador => "BUEN_PAGADOR",
            NivelConfianza::Moroso => "MOROSO",
            NivelConfianza::Bloqueado => "BLOQUEADO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NUEVO" => Some(NivelConfianza::Nuevo),
            "BUEN_PAGADOR" => Some(NivelConfianza::BuenPagador),
            "MOROSO" => Some(NivelConfianza::Moroso),
            "BLOQUEADO" => Some(NivelConfianza::Bloqueado),
            _ => None,
        }
    }
}

impl ToSql for NivelConfianza {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for NivelConfianza {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Self::parse(s).ok_or(FromSqlError::InvalidType)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Cliente {
    pub id: Option<i64>,
    pub nombre: String,
    pub documento: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub nivel_confianza: NivelConfianza,
    pub limite_credito: f64,
    pub created_at: Option<String>,
}

/// Datos para registrar un cliente nuevo. El límite de crédito es opcional:
/// si no viene, se usa el default de la configuración del negocio.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NuevoCliente {
    pub nombre: String,
    pub documento: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub nivel_confianza: Option<NivelConfianza>,
    pub limite_credito: Option<f64>,
}
