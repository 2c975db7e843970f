pub mod clientes;
pub mod config;
pub mod deudas;
pub mod pagos;
pub mod renegociaciones;
pub mod reportes;
pub mod usuarios;
