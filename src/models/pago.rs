use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MedioPago {
    Efectivo,
    Pix,
    TarjetaDebito,
    TarjetaCredito,
    Otro,
}

impl MedioPago {
    pub fn as_str(&self) -> &'static str {
        match self {
            MedioPago::Efectivo => "EFECTIVO",
            MedioPago::Pix => "PIX",
            MedioPago::TarjetaDebito => "TARJETA_DEBITO",
            MedioPago::TarjetaCredito => "TARJETA_CREDITO",
            MedioPago::Otro => "OTRO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EFECTIVO" => Some(MedioPago::Efectivo),
            "PIX" => Some(MedioPago::Pix),
            "TARJETA_DEBITO" => Some(MedioPago::TarjetaDebito),
            "TARJETA_CREDITO" => Some(MedioPago::TarjetaCredito),
            "OTRO" => Some(MedioPago::Otro),
            _ => None,
        }
    }
}

impl ToSql for MedioPago {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MedioPago {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Self::parse(s).ok_or(FromSqlError::InvalidType)
    }
}

/// Pago parcial o total aplicado a una deuda. Inmutable una vez registrado.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Pago {
    pub id: Option<i64>,
    pub deuda_id: i64,
    pub monto: f64,
    pub fecha: NaiveDate,
    pub medio: MedioPago,
    pub operador: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NuevoPago {
    pub deuda_id: i64,
    pub monto: f64,
    pub medio: MedioPago,
    pub operador: Option<String>,
}
