//! Libro de fiados para pequeños negocios.
//!
//! Lleva el registro de clientes que compran a crédito, sus deudas, los
//! pagos parciales o totales y las renegociaciones de plazo con recargo de
//! interés. Las capas de presentación (GUI, HTTP) quedan afuera: el módulo
//! [`commands`] es la API que cualquier frontend invoca, con la base SQLite
//! inyectada vía [`Database`] y la sesión activa en [`SesionState`].

pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod utils;

pub use db::{Database, SesionState};
pub use error::{Error, Result};
