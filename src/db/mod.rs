pub mod schema;

use crate::error::{Error, Result};
use crate::models::SesionActiva;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub struct Database {
    conn: Mutex<Connection>,
}

pub struct SesionState {
    pub sesion: Mutex<Option<SesionActiva>>,
}

impl SesionState {
    pub fn new() -> Self {
        SesionState {
            sesion: Mutex::new(None),
        }
    }
}

impl Default for SesionState {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn abrir(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(db_path)?;
        Self::inicializar(conn)
    }

    /// Base en memoria, para pruebas.
    pub fn en_memoria() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::inicializar(conn)
    }

    fn inicializar(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        schema::create_tables(&conn)?;
        crear_admin_inicial(&conn)?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    /// Toma el lock de la conexión. Un lock envenenado se reporta como
    /// `Error::Conexion` en lugar de propagar el panic.
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::Conexion)
    }
}

/// Inserta el usuario ADMINISTRADOR con clave "admin" si la tabla de
/// usuarios está vacía. Sin esto, una base recién creada no tendría con
/// quién iniciar sesión ni quién pudiera crear usuarios.
fn crear_admin_inicial(conn: &Connection) -> Result<()> {
    let cuantos: i64 = conn.query_row("SELECT COUNT(*) FROM usuarios", [], |row| row.get(0))?;
    if cuantos == 0 {
        let salt = crate::utils::generar_salt();
        let hash = crate::utils::hashear_credencial(&salt, "admin");
        conn.execute(
            "INSERT INTO usuarios (nombre, clave_hash, clave_salt, rol, activo)
             VALUES ('ADMINISTRADOR', ?1, ?2, 'ADMIN', 1)",
            rusqlite::params![hash, salt],
        )?;
        tracing::info!("usuario ADMINISTRADOR inicial creado; cambie la clave por defecto");
    }
    Ok(())
}
