use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rol {
    Admin,
    Cajero,
}

impl Rol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rol::Admin => "ADMIN",
            Rol::Cajero => "CAJERO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Rol::Admin),
            "CAJERO" => Some(Rol::Cajero),
            _ => None,
        }
    }
}

impl ToSql for Rol {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Rol {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Self::parse(s).ok_or(FromSqlError::InvalidType)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NuevoUsuario {
    pub nombre: String,
    pub email: Option<String>,
    pub documento: Option<String>,
    pub clave: String,
    pub rol: Rol,
}

/// Vista de usuario sin hash ni salt.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UsuarioInfo {
    pub id: i64,
    pub nombre: String,
    pub email: Option<String>,
    pub rol: Rol,
    pub activo: bool,
}

/// Sesión activa en el proceso. Es el único estado compartido entre
/// operaciones.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SesionActiva {
    pub usuario_id: i64,
    pub nombre: String,
    pub rol: Rol,
}
