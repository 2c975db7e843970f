use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Registro histórico de una renegociación: nuevo vencimiento acordado e
/// interés aplicado sobre el saldo en ese momento. Inmutable una vez creado.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Renegociacion {
    pub id: Option<i64>,
    pub deuda_id: i64,
    pub nueva_fecha_venc: NaiveDate,
    pub interes_percent: f64,
    pub fecha: NaiveDate,
    pub operador: Option<String>,
}
