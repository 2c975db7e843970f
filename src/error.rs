use thiserror::Error;

/// Errores del libro de fiados.
#[derive(Debug, Error)]
pub enum Error {
    /// Datos de entrada inválidos (monto negativo, campo requerido vacío, etc.)
    #[error("validación: {0}")]
    Validacion(String),

    /// El cliente/deuda/usuario referenciado no existe.
    #[error("no encontrado: {0}")]
    NoEncontrado(String),

    /// Operación no permitida en el estado actual (ej: pagar una deuda ya pagada).
    #[error("estado ilegal: {0}")]
    EstadoIlegal(String),

    #[error("base de datos: {0}")]
    Db(#[from] rusqlite::Error),

    /// El lock de la conexión quedó envenenado por un panic previo.
    #[error("conexión a la base de datos no disponible")]
    Conexion,
}

pub type Result<T> = std::result::Result<T, Error>;
