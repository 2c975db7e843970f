use crate::db::{Database, SesionState};
use crate::error::{Error, Result};
use crate::models::{NuevoUsuario, Rol, SesionActiva, UsuarioInfo};
use crate::utils;
use rusqlite::{Connection, OptionalExtension};

/// Busca el usuario por nombre o email entre los activos y verifica la
/// clave. Si coincide, establece la sesión activa.
pub fn iniciar_sesion(
    db: &Database,
    sesion: &SesionState,
    usuario: &str,
    clave: &str,
) -> Result<SesionActiva> {
    let conn = db.conn()?;

    let fila: Option<(i64, String, String, String, Rol)> = conn
        .query_row(
            "SELECT id, nombre, clave_hash, clave_salt, rol
             FROM usuarios
             WHERE activo = 1 AND (nombre = ?1 OR email = ?1)",
            rusqlite::params![usuario],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            },
        )
        .optional()?;

    let (id, nombre, clave_hash, clave_salt, rol) = match fila {
        Some(f) => f,
        None => {
            tracing::warn!(usuario, "intento de sesión con usuario desconocido");
            return Err(Error::Validacion("credenciales inválidas".into()));
        }
    };

    if utils::hashear_credencial(&clave_salt, clave) != clave_hash {
        tracing::warn!(usuario, "intento de sesión con clave incorrecta");
        return Err(Error::Validacion("credenciales inválidas".into()));
    }

    let nueva_sesion = SesionActiva {
        usuario_id: id,
        nombre,
        rol,
    };

    let mut guard = sesion.sesion.lock().map_err(|_| Error::Conexion)?;
    *guard = Some(nueva_sesion.clone());

    tracing::info!(usuario_id = id, "sesión iniciada");
    Ok(nueva_sesion)
}

pub fn cerrar_sesion(sesion: &SesionState) -> Result<()> {
    let mut guard = sesion.sesion.lock().map_err(|_| Error::Conexion)?;
    *guard = None;
    Ok(())
}

pub fn sesion_actual(sesion: &SesionState) -> Result<Option<SesionActiva>> {
    let guard = sesion.sesion.lock().map_err(|_| Error::Conexion)?;
    Ok(guard.clone())
}

/// Exige una sesión activa con rol ADMIN.
pub(crate) fn verificar_admin(sesion: &SesionState) -> Result<SesionActiva> {
    let guard = sesion.sesion.lock().map_err(|_| Error::Conexion)?;
    match guard.as_ref() {
        Some(s) if s.rol == Rol::Admin => Ok(s.clone()),
        Some(_) => Err(Error::Validacion(
            "se requiere sesión de administrador".into(),
        )),
        None => Err(Error::Validacion("debe iniciar sesión".into())),
    }
}

/// Verifica usuario/clave de un administrador sin tocar la sesión activa.
/// Lo usa la eliminación de deudas cuando opera un cajero.
pub(crate) fn validar_credenciales_admin(
    conn: &Connection,
    usuario: &str,
    clave: &str,
) -> Result<String> {
    let fila: Option<(String, String, String, Rol)> = conn
        .query_row(
            "SELECT nombre, clave_hash, clave_salt, rol
             FROM usuarios
             WHERE activo = 1 AND (nombre = ?1 OR email = ?1)",
            rusqlite::params![usuario],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;

    match fila {
        Some((nombre, hash, salt, Rol::Admin))
            if utils::hashear_credencial(&salt, clave) == hash =>
        {
            Ok(nombre)
        }
        _ => Err(Error::Validacion(
            "usuario/clave inválidos o no es administrador".into(),
        )),
    }
}

/// Crea un nuevo usuario. Requiere sesión ADMIN.
pub fn crear_usuario(
    db: &Database,
    sesion: &SesionState,
    usuario: NuevoUsuario,
) -> Result<UsuarioInfo> {
    verificar_admin(sesion)?;

    let nombre = usuario.nombre.trim().to_string();
    if nombre.is_empty() {
        return Err(Error::Validacion("el nombre no puede estar vacío".into()));
    }
    if usuario.clave.len() < 4 {
        return Err(Error::Validacion(
            "la clave debe tener al menos 4 caracteres".into(),
        ));
    }

    let conn = db.conn()?;

    let existe: i64 = conn.query_row(
        "SELECT COUNT(*) FROM usuarios WHERE nombre = ?1 OR (email IS NOT NULL AND email = ?2)",
        rusqlite::params![nombre, usuario.email],
        |row| row.get(0),
    )?;
    if existe > 0 {
        return Err(Error::Validacion(format!(
            "ya existe un usuario con el nombre '{}' o ese email",
            nombre
        )));
    }

    let salt = utils::generar_salt();
    let clave_hash = utils::hashear_credencial(&salt, &usuario.clave);

    conn.execute(
        "INSERT INTO usuarios (nombre, email, documento, clave_hash, clave_salt, rol, activo)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        rusqlite::params![
            nombre,
            usuario.email,
            usuario.documento,
            clave_hash,
            salt,
            usuario.rol,
        ],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(usuario_id = id, nombre = %nombre, "usuario creado");

    Ok(UsuarioInfo {
        id,
        nombre,
        email: usuario.email,
        rol: usuario.rol,
        activo: true,
    })
}

/// Lista todos los usuarios (sin hash/salt). Requiere ADMIN.
pub fn listar_usuarios(db: &Database, sesion: &SesionState) -> Result<Vec<UsuarioInfo>> {
    verificar_admin(sesion)?;

    let conn = db.conn()?;
    let mut stmt =
        conn.prepare("SELECT id, nombre, email, rol, activo FROM usuarios ORDER BY id")?;

    let usuarios = stmt
        .query_map([], |row| {
            Ok(UsuarioInfo {
                id: row.get(0)?,
                nombre: row.get(1)?,
                email: row.get(2)?,
                rol: row.get(3)?,
                activo: row.get::<_, i64>(4)? == 1,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(usuarios)
}

/// Actualiza un usuario. Requiere ADMIN. No permite desactivar ni degradar
/// al último administrador activo.
pub fn actualizar_usuario(
    db: &Database,
    sesion: &SesionState,
    id: i64,
    nombre: Option<String>,
    clave: Option<String>,
    rol: Option<Rol>,
    activo: Option<bool>,
) -> Result<UsuarioInfo> {
    verificar_admin(sesion)?;

    if let Some(clave) = &clave {
        if clave.len() < 4 {
            return Err(Error::Validacion(
                "la clave debe tener al menos 4 caracteres".into(),
            ));
        }
    }

    let conn = db.conn()?;

    let (nombre_actual, email, rol_actual, activo_actual): (String, Option<String>, Rol, bool) =
        conn.query_row(
            "SELECT nombre, email, rol, activo FROM usuarios WHERE id = ?1",
            rusqlite::params![id],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get::<_, i64>(3)? == 1,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| Error::NoEncontrado(format!("usuario {}", id)))?;

    let nuevo_rol = rol.unwrap_or(rol_actual);
    let nuevo_activo = activo.unwrap_or(activo_actual);

    if rol_actual == Rol::Admin && (nuevo_rol != Rol::Admin || !nuevo_activo) {
        verificar_no_es_ultimo_admin(&conn, id)?;
    }

    let nuevo_nombre = match nombre {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => nombre_actual,
    };

    conn.execute(
        "UPDATE usuarios SET nombre = ?1, rol = ?2, activo = ?3 WHERE id = ?4",
        rusqlite::params![nuevo_nombre, nuevo_rol, nuevo_activo as i64, id],
    )?;

    if let Some(clave) = clave {
        let salt = utils::generar_salt();
        let hash = utils::hashear_credencial(&salt, &clave);
        conn.execute(
            "UPDATE usuarios SET clave_hash = ?1, clave_salt = ?2 WHERE id = ?3",
            rusqlite::params![hash, salt, id],
        )?;
    }

    Ok(UsuarioInfo {
        id,
        nombre: nuevo_nombre,
        email,
        rol: nuevo_rol,
        activo: nuevo_activo,
    })
}

/// Elimina un usuario. Requiere ADMIN. Protege al último admin activo.
pub fn eliminar_usuario(db: &Database, sesion: &SesionState, id: i64) -> Result<()> {
    verificar_admin(sesion)?;

    let conn = db.conn()?;

    let rol: Rol = conn
        .query_row(
            "SELECT rol FROM usuarios WHERE id = ?1",
            rusqlite::params![id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| Error::NoEncontrado(format!("usuario {}", id)))?;

    if rol == Rol::Admin {
        verificar_no_es_ultimo_admin(&conn, id)?;
    }

    conn.execute("DELETE FROM usuarios WHERE id = ?1", rusqlite::params![id])?;
    tracing::info!(usuario_id = id, "usuario eliminado");
    Ok(())
}

fn verificar_no_es_ultimo_admin(conn: &Connection, id: i64) -> Result<()> {
    let otros_admins: i64 = conn.query_row(
        "SELECT COUNT(*) FROM usuarios WHERE rol = 'ADMIN' AND activo = 1 AND id != ?1",
        rusqlite::params![id],
        |row| row.get(0),
    )?;

    if otros_admins == 0 {
        return Err(Error::Validacion(
            "no se puede quitar al último administrador activo".into(),
        ));
    }
    Ok(())
}
