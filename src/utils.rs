use rand::RngCore;
use sha2::{Digest, Sha256};

/// Salt aleatorio de 16 bytes, en hexadecimal. Se genera uno por usuario
/// y se guarda junto al hash de su clave.
pub fn generar_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Deriva el hash hexadecimal de una clave de acceso con su salt.
/// La base nunca guarda claves en texto plano.
pub fn hashear_credencial(salt: &str, clave: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(clave.as_bytes());
    format!("{:x}", hasher.finalize())
}
