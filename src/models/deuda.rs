use crate::error::{Error, Result};
use chrono::{Duration, NaiveDate};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Estado de una deuda. PAGADA es terminal: no admite más pagos
/// ni renegociaciones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoDeuda {
    Pendiente,
    Pagada,
    Renegociada,
}

impl EstadoDeuda {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoDeuda::Pendiente => "PENDIENTE",
            EstadoDeuda::Pagada => "PAGADA",
            EstadoDeuda::Renegociada => "RENEGOCIADA",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDIENTE" => Some(EstadoDeuda::Pendiente),
            "PAGADA" => Some(EstadoDeuda::Pagada),
            "RENEGOCIADA" => Some(EstadoDeuda::Renegociada),
            _ => None,
        }
    }
}

impl ToSql for EstadoDeuda {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EstadoDeuda {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Self::parse(s).ok_or(FromSqlError::InvalidType)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoCuota {
    Pendiente,
    Pagada,
    Vencida,
}

impl EstadoCuota {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoCuota::Pendiente => "PENDIENTE",
            EstadoCuota::Pagada => "PAGADA",
            EstadoCuota::Vencida => "VENCIDA",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDIENTE" => Some(EstadoCuota::Pendiente),
            "PAGADA" => Some(EstadoCuota::Pagada),
            "VENCIDA" => Some(EstadoCuota::Vencida),
            _ => None,
        }
    }
}

impl ToSql for EstadoCuota {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EstadoCuota {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Self::parse(s).ok_or(FromSqlError::InvalidType)
    }
}

/// Una compra a plazo. El saldo se deriva de los pagos y renegociaciones
/// aplicados: los pagos lo reducen, el recargo de una renegociación lo
/// aumenta. Nunca queda negativo.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Deuda {
    pub id: Option<i64>,
    pub cliente_id: i64,
    pub valor_original: f64,
    pub fecha_venta: NaiveDate,
    pub fecha_vencimiento: NaiveDate,
    pub descripcion: String,
    pub estado: EstadoDeuda,
    pub saldo: f64,
    pub en_cuotas: bool,
    pub num_cuotas: i64,
    pub interes_cuotas: f64,
}

/// Una cuota de una deuda con plan de pagos. Lleva su propio estado,
/// independiente del saldo de la deuda madre: son dos vistas paralelas
/// que el sistema no reconcilia entre sí.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Cuota {
    pub id: Option<i64>,
    pub deuda_id: i64,
    pub numero: i64,
    pub valor: f64,
    pub fecha_vencimiento: NaiveDate,
    pub estado: EstadoCuota,
    pub valor_pagado: f64,
}

impl Deuda {
    /// Aplica un pago, reduciendo el saldo. Si el pago cubre (o excede) el
    /// saldo, la deuda queda en 0 y pasa a PAGADA. El excedente no se
    /// registra como vuelto ni como crédito a favor.
    pub fn aplicar_pago(&mut self, monto: f64) -> Result<()> {
        if self.estado == EstadoDeuda::Pagada {
            return Err(Error::EstadoIlegal(
                "la deuda ya está pagada, no admite más pagos".into(),
            ));
        }
        if monto <= 0.0 {
            return Err(Error::Validacion("el monto del pago debe ser mayor a 0".into()));
        }

        self.saldo -= monto;
        if self.saldo <= 0.0 {
            self.saldo = 0.0;
            self.estado = EstadoDeuda::Pagada;
        }
        Ok(())
    }

    /// Renegocia la deuda: aplica el recargo de interés sobre el saldo y
    /// prorroga el vencimiento. Interés 0% es válido (prórroga pura).
    /// Retorna el recargo aplicado.
    pub fn renegociar(&mut self, nueva_fecha: NaiveDate, interes_percent: f64) -> Result<f64> {
        if self.estado == EstadoDeuda::Pagada {
            return Err(Error::EstadoIlegal(
                "no se puede renegociar una deuda ya pagada".into(),
            ));
        }
        if interes_percent < 0.0 {
            return Err(Error::Validacion("el interés no puede ser negativo".into()));
        }

        let recargo = self.saldo * (interes_percent / 100.0);
        self.saldo += recargo;
        self.fecha_vencimiento = nueva_fecha;
        self.estado = EstadoDeuda::Renegociada;
        Ok(recargo)
    }

    /// Una deuda abierta cuenta como vencida desde el día del vencimiento
    /// inclusive. Esta es la única regla de corte usada en todo el sistema.
    pub fn vencida(&self, hoy: NaiveDate) -> bool {
        self.estado != EstadoDeuda::Pagada && self.fecha_vencimiento <= hoy
    }
}

/// Genera el plan de cuotas de una deuda: el total con interés se reparte en
/// `num` cuotas iguales, venciendo cada `dias_entre` días desde la venta.
pub fn generar_cuotas(
    deuda_id: i64,
    valor_original: f64,
    num: i64,
    interes_percent: f64,
    fecha_venta: NaiveDate,
    dias_entre: i64,
) -> Vec<Cuota> {
    let total = valor_original * (1.0 + interes_percent / 100.0);
    let valor_cuota = total / num as f64;

    (1..=num)
        .map(|i| Cuota {
            id: None,
            deuda_id,
            numero: i,
            valor: valor_cuota,
            fecha_vencimiento: fecha_venta + Duration::days(dias_entre * i),
            estado: EstadoCuota::Pendiente,
            valor_pagado: 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deuda_de_prueba(saldo: f64) -> Deuda {
        Deuda {
            id: Some(1),
            cliente_id: 1,
            valor_original: saldo,
            fecha_venta: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            fecha_vencimiento: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            descripcion: "canasta básica".into(),
            estado: EstadoDeuda::Pendiente,
            saldo,
            en_cuotas: false,
            num_cuotas: 1,
            interes_cuotas: 0.0,
        }
    }

    #[test]
    fn test_pago_parcial_reduce_saldo() {
        let mut d = deuda_de_prueba(100.0);
        d.aplicar_pago(40.0).unwrap();
        assert_eq!(d.saldo, 60.0);
        assert_eq!(d.estado, EstadoDeuda::Pendiente);
    }

    #[test]
    fn test_pago_total_cierra_deuda() {
        let mut d = deuda_de_prueba(100.0);
        d.aplicar_pago(100.0).unwrap();
        assert_eq!(d.saldo, 0.0);
        assert_eq!(d.estado, EstadoDeuda::Pagada);
    }

    #[test]
    fn test_sobrepago_queda_en_cero() {
        // El excedente no genera saldo negativo ni vuelto
        let mut d = deuda_de_prueba(100.0);
        d.aplicar_pago(150.0).unwrap();
        assert_eq!(d.saldo, 0.0);
        assert_eq!(d.estado, EstadoDeuda::Pagada);
    }

    #[test]
    fn test_deuda_pagada_rechaza_pago() {
        let mut d = deuda_de_prueba(50.0);
        d.aplicar_pago(50.0).unwrap();
        let err = d.aplicar_pago(10.0).unwrap_err();
        assert!(matches!(err, Error::EstadoIlegal(_)));
    }

    #[test]
    fn test_deuda_pagada_rechaza_renegociacion() {
        let mut d = deuda_de_prueba(50.0);
        d.aplicar_pago(50.0).unwrap();
        let nueva = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let err = d.renegociar(nueva, 10.0).unwrap_err();
        assert!(matches!(err, Error::EstadoIlegal(_)));
    }

    #[test]
    fn test_pago_monto_invalido() {
        let mut d = deuda_de_prueba(100.0);
        assert!(matches!(d.aplicar_pago(0.0), Err(Error::Validacion(_))));
        assert!(matches!(d.aplicar_pago(-5.0), Err(Error::Validacion(_))));
        assert_eq!(d.saldo, 100.0);
    }

    #[test]
    fn test_renegociar_aplica_recargo() {
        let mut d = deuda_de_prueba(100.0);
        let nueva = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let recargo = d.renegociar(nueva, 10.0).unwrap();
        assert_eq!(recargo, 10.0);
        assert_eq!(d.saldo, 110.0);
        assert_eq!(d.estado, EstadoDeuda::Renegociada);
        assert_eq!(d.fecha_vencimiento, nueva);
    }

    #[test]
    fn test_renegociar_cero_por_ciento_solo_prorroga() {
        let mut d = deuda_de_prueba(80.0);
        let nueva = NaiveDate::from_ymd_opt(2026, 7, 15).unwrap();
        let recargo = d.renegociar(nueva, 0.0).unwrap();
        assert_eq!(recargo, 0.0);
        assert_eq!(d.saldo, 80.0);
        assert_eq!(d.estado, EstadoDeuda::Renegociada);
        assert_eq!(d.fecha_vencimiento, nueva);
    }

    #[test]
    fn test_re_renegociacion_permitida() {
        let mut d = deuda_de_prueba(100.0);
        let f1 = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let f2 = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        d.renegociar(f1, 10.0).unwrap();
        d.renegociar(f2, 10.0).unwrap();
        assert!((d.saldo - 121.0).abs() < 1e-9);
        assert_eq!(d.estado, EstadoDeuda::Renegociada);
    }

    #[test]
    fn test_saldo_nunca_negativo() {
        let mut d = deuda_de_prueba(100.0);
        let nueva = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        d.aplicar_pago(30.0).unwrap();
        d.renegociar(nueva, 5.0).unwrap();
        d.aplicar_pago(25.5).unwrap();
        d.aplicar_pago(999.0).unwrap();
        assert_eq!(d.saldo, 0.0);
    }

    #[test]
    fn test_vencida_incluye_el_dia_del_vencimiento() {
        // Regla inclusiva: el día del vencimiento ya cuenta como vencida
        let d = deuda_de_prueba(100.0);
        let venc = d.fecha_vencimiento;
        assert!(!d.vencida(venc - Duration::days(1)));
        assert!(d.vencida(venc));
        assert!(d.vencida(venc + Duration::days(1)));
    }

    #[test]
    fn test_deuda_pagada_nunca_vencida() {
        let mut d = deuda_de_prueba(100.0);
        d.aplicar_pago(100.0).unwrap();
        assert!(!d.vencida(d.fecha_vencimiento + Duration::days(30)));
    }

    #[test]
    fn test_plan_tres_cuotas_sin_interes() {
        let venta = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let cuotas = generar_cuotas(7, 300.0, 3, 0.0, venta, 30);
        assert_eq!(cuotas.len(), 3);
        for (i, c) in cuotas.iter().enumerate() {
            assert_eq!(c.numero, i as i64 + 1);
            assert_eq!(c.valor, 100.0);
            assert_eq!(c.estado, EstadoCuota::Pendiente);
            assert_eq!(c.valor_pagado, 0.0);
            assert_eq!(
                c.fecha_vencimiento,
                venta + Duration::days(30 * (i as i64 + 1))
            );
        }
    }

    #[test]
    fn test_plan_con_interes_reparte_el_total() {
        let venta = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let cuotas = generar_cuotas(7, 200.0, 4, 10.0, venta, 15);
        let suma: f64 = cuotas.iter().map(|c| c.valor).sum();
        assert!((suma - 220.0).abs() < 1e-9);
        assert_eq!(cuotas.last().unwrap().fecha_vencimiento, venta + Duration::days(60));
    }
}
