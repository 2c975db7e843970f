use crate::commands::clientes::{obtener_cliente_detalle, ClienteDetalle};
use crate::commands::deudas::{mapear_deuda, DeudaConCliente, COLUMNAS_DEUDA};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{EstadoDeuda, MedioPago};
use chrono::{Datelike, Local, NaiveDate};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Un cliente con su deuda total sumada, para el ranking de deudores.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeudorRanking {
    pub cliente_id: i64,
    pub cliente_nombre: String,
    pub total_deuda: f64,
    pub num_deudas: i64,
}

/// Distribución de deudas por estado para el gráfico del dashboard.
/// Una deuda abierta y vencida cuenta como vencida aunque esté renegociada.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConteoEstados {
    pub pagadas: i64,
    pub al_dia: i64,
    pub renegociadas: i64,
    pub vencidas: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PuntoMensual {
    pub anio: i32,
    pub mes: u32,
    pub etiqueta: String,
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MedioConteo {
    pub medio: MedioPago,
    pub cantidad: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeudaVencida {
    pub id: i64,
    pub cliente_nombre: String,
    pub descripcion: String,
    pub saldo: f64,
    pub fecha_vencimiento: NaiveDate,
}

/// Carga consolidada del dashboard del dueño. Todo se recalcula sobre las
/// colecciones completas en cada llamada, no hay vistas materializadas.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResumenDashboard {
    pub total_por_cobrar: f64,
    pub total_vencido: f64,
    pub cant_pagadas: i64,
    pub cant_vencidas: i64,
    pub cant_abiertas: i64,
    pub conteo_estados: ConteoEstados,
    pub ranking: Vec<DeudorRanking>,
    pub serie_mensual: Vec<PuntoMensual>,
    pub medios_pago: Vec<MedioConteo>,
    pub deudas_vencidas: Vec<DeudaVencida>,
}

pub fn resumen_dashboard(db: &Database) -> Result<ResumenDashboard> {
    let hoy = Local::now().date_naive();

    let conn = db.conn()?;

    let deudas: Vec<DeudaConCliente> = {
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, cl.nombre FROM deudas d
             JOIN clientes cl ON d.cliente_id = cl.id
             ORDER BY d.id",
            COLUMNAS_DEUDA
        ))?;
        let filas = stmt
            .query_map([], |row| {
                Ok(DeudaConCliente {
                    deuda: mapear_deuda(row)?,
                    cliente_nombre: row.get(11)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        filas
    };

    let medios: Vec<MedioPago> = {
        let mut stmt = conn.prepare("SELECT medio FROM pagos ORDER BY id")?;
        let filas = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        filas
    };
    drop(conn);

    let mut ranking = ranking_deudores(&deudas);
    ranking.truncate(5);

    Ok(ResumenDashboard {
        total_por_cobrar: total_por_cobrar(&deudas),
        total_vencido: total_vencido(&deudas, hoy),
        cant_pagadas: deudas
            .iter()
            .filter(|d| d.deuda.estado == EstadoDeuda::Pagada)
            .count() as i64,
        cant_vencidas: deudas.iter().filter(|d| d.deuda.vencida(hoy)).count() as i64,
        cant_abiertas: deudas
            .iter()
            .filter(|d| d.deuda.estado != EstadoDeuda::Pagada && !d.deuda.vencida(hoy))
            .count() as i64,
        conteo_estados: conteo_estados(&deudas, hoy),
        ranking,
        serie_mensual: serie_mensual(&deudas, hoy),
        medios_pago: conteo_medios(&medios),
        deudas_vencidas: deudas_vencidas(&deudas, hoy),
    })
}

/// Extracto de un cliente buscado por id o por nombre parcial.
pub fn extracto_cliente(db: &Database, termino: &str) -> Result<ClienteDetalle> {
    let termino = termino.trim();
    if termino.is_empty() {
        return Err(Error::Validacion("indique el id o nombre del cliente".into()));
    }

    let cliente_id: i64 = if let Ok(id) = termino.parse::<i64>() {
        id
    } else {
        let conn = db.conn()?;
        conn.query_row(
            "SELECT id FROM clientes WHERE nombre LIKE ?1 ORDER BY nombre LIMIT 1",
            rusqlite::params![format!("%{}%", termino)],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| Error::NoEncontrado(format!("cliente '{}'", termino)))?
    };

    obtener_cliente_detalle(db, cliente_id)
}

fn total_por_cobrar(deudas: &[DeudaConCliente]) -> f64 {
    deudas
        .iter()
        .filter(|d| d.deuda.estado != EstadoDeuda::Pagada)
        .map(|d| d.deuda.saldo)
        .sum()
}

fn total_vencido(deudas: &[DeudaConCliente], hoy: NaiveDate) -> f64 {
    deudas
        .iter()
        .filter(|d| d.deuda.vencida(hoy))
        .map(|d| d.deuda.saldo)
        .sum()
}

fn conteo_estados(deudas: &[DeudaConCliente], hoy: NaiveDate) -> ConteoEstados {
    let mut conteo = ConteoEstados {
        pagadas: 0,
        al_dia: 0,
        renegociadas: 0,
        vencidas: 0,
    };

    for dc in deudas {
        let d = &dc.deuda;
        if d.estado == EstadoDeuda::Pagada || d.saldo <= 0.0 {
            conteo.pagadas += 1;
        } else if d.fecha_vencimiento <= hoy {
            conteo.vencidas += 1;
        } else if d.estado == EstadoDeuda::Renegociada {
            conteo.renegociadas += 1;
        } else {
            conteo.al_dia += 1;
        }
    }

    conteo
}

/// Agrupa los saldos abiertos por cliente y ordena de mayor a menor.
/// El orden de inserción se preserva ante empates (sort estable).
fn ranking_deudores(deudas: &[DeudaConCliente]) -> Vec<DeudorRanking> {
    let mut indice: HashMap<i64, usize> = HashMap::new();
    let mut ranking: Vec<DeudorRanking> = Vec::new();

    for dc in deudas {
        if dc.deuda.estado == EstadoDeuda::Pagada {
            continue;
        }
        match indice.get(&dc.deuda.cliente_id) {
            Some(&i) => {
                ranking[i].total_deuda += dc.deuda.saldo;
                ranking[i].num_deudas += 1;
            }
            None => {
                indice.insert(dc.deuda.cliente_id, ranking.len());
                ranking.push(DeudorRanking {
                    cliente_id: dc.deuda.cliente_id,
                    cliente_nombre: dc.cliente_nombre.clone(),
                    total_deuda: dc.deuda.saldo,
                    num_deudas: 1,
                });
            }
        }
    }

    ranking.sort_by(|a, b| {
        b.total_deuda
            .partial_cmp(&a.total_deuda)
            .unwrap_or(Ordering::Equal)
    });
    ranking
}

/// Suma de valores originales por mes de venta, para los últimos 6 meses
/// calendario. Los meses sin movimiento salen en 0.
fn serie_mensual(deudas: &[DeudaConCliente], hoy: NaiveDate) -> Vec<PuntoMensual> {
    let mut por_mes: HashMap<(i32, u32), f64> = HashMap::new();
    for dc in deudas {
        let clave = (dc.deuda.fecha_venta.year(), dc.deuda.fecha_venta.month());
        *por_mes.entry(clave).or_insert(0.0) += dc.deuda.valor_original;
    }

    let mut serie = Vec::with_capacity(6);
    for i in (0..6).rev() {
        let mut anio = hoy.year();
        let mut mes = hoy.month() as i32 - i;
        while mes <= 0 {
            anio -= 1;
            mes += 12;
        }
        let mes = mes as u32;

        let total = por_mes.get(&(anio, mes)).copied().unwrap_or(0.0);
        serie.push(PuntoMensual {
            anio,
            mes,
            etiqueta: format!("{:02}/{:02}", mes, anio % 100),
            total: (total * 100.0).round() / 100.0,
        });
    }
    serie
}

fn conteo_medios(medios: &[MedioPago]) -> Vec<MedioConteo> {
    let mut indice: HashMap<MedioPago, usize> = HashMap::new();
    let mut conteos: Vec<MedioConteo> = Vec::new();

    for &medio in medios {
        match indice.get(&medio) {
            Some(&i) => conteos[i].cantidad += 1,
            None => {
                indice.insert(medio, conteos.len());
                conteos.push(MedioConteo { medio, cantidad: 1 });
            }
        }
    }
    conteos
}

/// Deudas abiertas y vencidas, las más antiguas primero.
fn deudas_vencidas(deudas: &[DeudaConCliente], hoy: NaiveDate) -> Vec<DeudaVencida> {
    let mut vencidas: Vec<DeudaVencida> = deudas
        .iter()
        .filter(|d| d.deuda.vencida(hoy) && d.deuda.saldo > 0.0)
        .map(|d| DeudaVencida {
            id: d.deuda.id.expect("deuda leída de la base siempre tiene id"),
            cliente_nombre: d.cliente_nombre.clone(),
            descripcion: if d.deuda.descripcion.is_empty() {
                "Sin descripción".to_string()
            } else {
                d.deuda.descripcion.clone()
            },
            saldo: d.deuda.saldo,
            fecha_vencimiento: d.deuda.fecha_vencimiento,
        })
        .collect();

    vencidas.sort_by_key(|d| d.fecha_vencimiento);
    vencidas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::clientes::crear_cliente;
    use crate::commands::deudas::{crear_deuda, NuevaDeuda};
    use crate::commands::pagos::registrar_pago;
    use crate::db::SesionState;
    use crate::models::{Deuda, NuevoCliente, NuevoPago, Rol, SesionActiva};
    use std::sync::Mutex;

    fn deuda(
        cliente_id: i64,
        nombre: &str,
        saldo: f64,
        estado: EstadoDeuda,
        venta: NaiveDate,
        vencimiento: NaiveDate,
    ) -> DeudaConCliente {
        DeudaConCliente {
            deuda: Deuda {
                id: Some(cliente_id * 10 + saldo as i64),
                cliente_id,
                valor_original: saldo,
                fecha_venta: venta,
                fecha_vencimiento: vencimiento,
                descripcion: String::new(),
                estado,
                saldo,
                en_cuotas: false,
                num_cuotas: 1,
                interes_cuotas: 0.0,
            },
            cliente_nombre: nombre.into(),
        }
    }

    fn fecha(a: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(a, m, d).unwrap()
    }

    #[test]
    fn test_ranking_suma_por_cliente() {
        let hoy = fecha(2026, 8, 30);
        let deudas = vec![
            deuda(1, "MARÍA", 50.0, EstadoDeuda::Pendiente, hoy, fecha(2026, 9, 10)),
            deuda(1, "MARÍA", 70.0, EstadoDeuda::Pendiente, hoy, fecha(2026, 9, 20)),
            deuda(2, "PEDRO", 90.0, EstadoDeuda::Pendiente, hoy, fecha(2026, 9, 15)),
            deuda(3, "ROSA", 500.0, EstadoDeuda::Pagada, hoy, fecha(2026, 9, 1)),
        ];

        let ranking = ranking_deudores(&deudas);
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].cliente_nombre, "MARÍA");
        assert_eq!(ranking[0].total_deuda, 120.0);
        assert_eq!(ranking[0].num_deudas, 2);
        assert_eq!(ranking[1].cliente_nombre, "PEDRO");
    }

    #[test]
    fn test_ranking_empate_preserva_orden() {
        let hoy = fecha(2026, 8, 30);
        let deudas = vec![
            deuda(1, "PRIMERO", 100.0, EstadoDeuda::Pendiente, hoy, fecha(2026, 9, 1)),
            deuda(2, "SEGUNDO", 100.0, EstadoDeuda::Pendiente, hoy, fecha(2026, 9, 1)),
        ];
        let ranking = ranking_deudores(&deudas);
        assert_eq!(ranking[0].cliente_nombre, "PRIMERO");
        assert_eq!(ranking[1].cliente_nombre, "SEGUNDO");
    }

    #[test]
    fn test_totales_y_regla_de_vencimiento() {
        // La regla de corte es inclusiva: lo que vence hoy ya está vencido.
        let hoy = fecha(2026, 8, 30);
        let deudas = vec![
            deuda(1, "A", 100.0, EstadoDeuda::Pendiente, hoy, hoy), // vence hoy
            deuda(2, "B", 50.0, EstadoDeuda::Pendiente, hoy, fecha(2026, 8, 1)), // vencida
            deuda(3, "C", 30.0, EstadoDeuda::Pendiente, hoy, fecha(2026, 9, 30)), // al día
            deuda(4, "D", 999.0, EstadoDeuda::Pagada, hoy, fecha(2026, 8, 1)),
        ];

        assert_eq!(total_por_cobrar(&deudas), 180.0);
        assert_eq!(total_vencido(&deudas, hoy), 150.0);

        let conteo = conteo_estados(&deudas, hoy);
        assert_eq!(
            conteo,
            ConteoEstados {
                pagadas: 1,
                al_dia: 1,
                renegociadas: 0,
                vencidas: 2,
            }
        );
    }

    #[test]
    fn test_vencida_tiene_prioridad_sobre_renegociada() {
        let hoy = fecha(2026, 8, 30);
        let deudas = vec![
            deuda(1, "A", 40.0, EstadoDeuda::Renegociada, hoy, fecha(2026, 8, 1)),
            deuda(2, "B", 40.0, EstadoDeuda::Renegociada, hoy, fecha(2026, 12, 1)),
        ];
        let conteo = conteo_estados(&deudas, hoy);
        assert_eq!(conteo.vencidas, 1);
        assert_eq!(conteo.renegociadas, 1);
    }

    #[test]
    fn test_serie_mensual_con_huecos_en_cero() {
        let hoy = fecha(2026, 8, 30);
        let deudas = vec![
            deuda(1, "A", 100.0, EstadoDeuda::Pendiente, fecha(2026, 8, 5), hoy),
            deuda(1, "A", 20.0, EstadoDeuda::Pagada, fecha(2026, 8, 12), hoy),
            deuda(2, "B", 75.0, EstadoDeuda::Pendiente, fecha(2026, 5, 20), hoy),
            // fuera de la ventana de 6 meses
            deuda(3, "C", 999.0, EstadoDeuda::Pendiente, fecha(2025, 12, 1), hoy),
        ];

        let serie = serie_mensual(&deudas, hoy);
        assert_eq!(serie.len(), 6);
        assert_eq!(serie[0].mes, 3);
        assert_eq!(serie[5].mes, 8);
        // Mes actual: suma el valor original aunque la deuda esté pagada
        assert_eq!(serie[5].total, 120.0);
        // Mayo
        assert_eq!(serie[2].total, 75.0);
        // Meses sin movimiento
        assert_eq!(serie[1].total, 0.0);
        assert_eq!(serie[3].total, 0.0);
        assert_eq!(serie[4].total, 0.0);
    }

    #[test]
    fn test_serie_mensual_cruza_el_anio() {
        let hoy = fecha(2026, 2, 10);
        let deudas = vec![deuda(
            1,
            "A",
            60.0,
            EstadoDeuda::Pendiente,
            fecha(2025, 11, 3),
            hoy,
        )];
        let serie = serie_mensual(&deudas, hoy);
        assert_eq!((serie[0].anio, serie[0].mes), (2025, 9));
        assert_eq!((serie[2].anio, serie[2].mes), (2025, 11));
        assert_eq!(serie[2].total, 60.0);
        assert_eq!((serie[5].anio, serie[5].mes), (2026, 2));
    }

    #[test]
    fn test_conteo_medios() {
        let medios = vec![
            MedioPago::Pix,
            MedioPago::Efectivo,
            MedioPago::Pix,
            MedioPago::TarjetaCredito,
            MedioPago::Pix,
        ];
        let conteos = conteo_medios(&medios);
        assert_eq!(conteos.len(), 3);
        assert_eq!(conteos[0].medio, MedioPago::Pix);
        assert_eq!(conteos[0].cantidad, 3);
        assert_eq!(conteos[1].medio, MedioPago::Efectivo);
        assert_eq!(conteos[1].cantidad, 1);
    }

    #[test]
    fn test_deudas_vencidas_mas_antiguas_primero() {
        let hoy = fecha(2026, 8, 30);
        let deudas = vec![
            deuda(1, "A", 10.0, EstadoDeuda::Pendiente, hoy, fecha(2026, 8, 20)),
            deuda(2, "B", 20.0, EstadoDeuda::Pendiente, hoy, fecha(2026, 7, 1)),
            deuda(3, "C", 30.0, EstadoDeuda::Pendiente, hoy, fecha(2026, 9, 5)),
        ];
        let vencidas = deudas_vencidas(&deudas, hoy);
        assert_eq!(vencidas.len(), 2);
        assert_eq!(vencidas[0].cliente_nombre, "B");
        assert_eq!(vencidas[1].cliente_nombre, "A");
    }

    fn sesion_admin() -> SesionState {
        SesionState {
            sesion: Mutex::new(Some(SesionActiva {
                usuario_id: 1,
                nombre: "DUEÑO".into(),
                rol: Rol::Admin,
            })),
        }
    }

    fn cliente(db: &Database, nombre: &str) -> i64 {
        crear_cliente(
            db,
            NuevoCliente {
                nombre: nombre.into(),
                documento: None,
                telefono: None,
                direccion: None,
                nivel_confianza: None,
                limite_credito: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_dashboard_integrado() {
        let db = Database::en_memoria().unwrap();
        let sesion = sesion_admin();
        let maria = cliente(&db, "MARÍA");
        let pedro = cliente(&db, "PEDRO");

        // Dos deudas de María (50 y 70) y una de Pedro ya pagada.
        // Nota: la segunda deuda prorroga la primera al mismo vencimiento.
        crear_deuda(
            &db,
            &sesion,
            NuevaDeuda {
                cliente_id: maria,
                valor: 50.0,
                descripcion: "".into(),
                plazo_dias: 30,
                num_cuotas: 1,
                interes_cuotas: 0.0,
            },
        )
        .unwrap();
        crear_deuda(
            &db,
            &sesion,
            NuevaDeuda {
                cliente_id: maria,
                valor: 70.0,
                descripcion: "".into(),
                plazo_dias: 30,
                num_cuotas: 1,
                interes_cuotas: 0.0,
            },
        )
        .unwrap();
        let de_pedro = crear_deuda(
            &db,
            &sesion,
            NuevaDeuda {
                cliente_id: pedro,
                valor: 40.0,
                descripcion: "".into(),
                plazo_dias: 15,
                num_cuotas: 1,
                interes_cuotas: 0.0,
            },
        )
        .unwrap();
        registrar_pago(
            &db,
            &sesion,
            NuevoPago {
                deuda_id: de_pedro.deuda.id.unwrap(),
                monto: 40.0,
                medio: MedioPago::Pix,
                operador: None,
            },
        )
        .unwrap();

        let resumen = resumen_dashboard(&db).unwrap();
        assert_eq!(resumen.total_por_cobrar, 120.0);
        assert_eq!(resumen.total_vencido, 0.0);
        assert_eq!(resumen.cant_pagadas, 1);
        assert_eq!(resumen.cant_abiertas, 2);
        assert_eq!(resumen.ranking.len(), 1);
        assert_eq!(resumen.ranking[0].cliente_nombre, "MARÍA");
        assert_eq!(resumen.ranking[0].total_deuda, 120.0);
        assert_eq!(resumen.medios_pago.len(), 1);
        assert_eq!(resumen.medios_pago[0].medio, MedioPago::Pix);
        // El mes actual acumula los valores originales de las tres deudas
        assert_eq!(resumen.serie_mensual[5].total, 160.0);
        assert_eq!(resumen.serie_mensual[0].total, 0.0);
    }

    #[test]
    fn test_extracto_por_nombre_y_por_id() {
        let db = Database::en_memoria().unwrap();
        let sesion = sesion_admin();
        let id = cliente(&db, "CARMEN SILVA");
        crear_deuda(
            &db,
            &sesion,
            NuevaDeuda {
                cliente_id: id,
                valor: 35.0,
                descripcion: "pan y leche".into(),
                plazo_dias: 7,
                num_cuotas: 1,
                interes_cuotas: 0.0,
            },
        )
        .unwrap();

        // LIKE de SQLite no distingue mayúsculas en ASCII
        let por_nombre = extracto_cliente(&db, "carmen").unwrap();
        assert_eq!(por_nombre.total_adeudado, 35.0);

        let por_id = extracto_cliente(&db, &id.to_string()).unwrap();
        assert_eq!(por_id.cliente.nombre, "CARMEN SILVA");
        assert_eq!(por_id.deudas.len(), 1);

        assert!(matches!(
            extracto_cliente(&db, "NADIE"),
            Err(Error::NoEncontrado(_))
        ));
    }
}
