use rusqlite::Connection;

pub fn create_tables(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        -- Configuración del negocio
        CREATE TABLE IF NOT EXISTS config (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Usuarios del sistema (administradores y cajeros)
        CREATE TABLE IF NOT EXISTS usuarios (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL UNIQUE,
            email TEXT UNIQUE,
            documento TEXT,
            clave_hash TEXT NOT NULL,
            clave_salt TEXT NOT NULL,
            rol TEXT NOT NULL DEFAULT 'CAJERO',
            activo INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        -- Clientes que compran fiado
        CREATE TABLE IF NOT EXISTS clientes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL UNIQUE,
            documento TEXT,
            telefono TEXT,
            direccion TEXT,
            nivel_confianza TEXT NOT NULL DEFAULT 'NUEVO',
            limite_credito REAL NOT NULL DEFAULT 200.0,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        CREATE INDEX IF NOT EXISTS idx_clientes_nombre ON clientes(nombre);
        CREATE INDEX IF NOT EXISTS idx_clientes_documento ON clientes(documento);

        -- Deudas (compras a plazo)
        CREATE TABLE IF NOT EXISTS deudas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cliente_id INTEGER NOT NULL,
            valor_original REAL NOT NULL,
            fecha_venta TEXT NOT NULL,
            fecha_vencimiento TEXT NOT NULL,
            descripcion TEXT NOT NULL DEFAULT '',
            estado TEXT NOT NULL DEFAULT 'PENDIENTE',
            saldo REAL NOT NULL,
            en_cuotas INTEGER NOT NULL DEFAULT 0,
            num_cuotas INTEGER NOT NULL DEFAULT 1,
            interes_cuotas REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            FOREIGN KEY (cliente_id) REFERENCES clientes(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_deudas_cliente ON deudas(cliente_id);
        CREATE INDEX IF NOT EXISTS idx_deudas_estado ON deudas(estado);
        CREATE INDEX IF NOT EXISTS idx_deudas_vencimiento ON deudas(fecha_vencimiento);

        -- Pagos (solo se agregan, nunca se modifican)
        CREATE TABLE IF NOT EXISTS pagos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            deuda_id INTEGER NOT NULL,
            monto REAL NOT NULL,
            fecha TEXT NOT NULL,
            medio TEXT NOT NULL DEFAULT 'EFECTIVO',
            operador TEXT,
            FOREIGN KEY (deuda_id) REFERENCES deudas(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_pagos_deuda ON pagos(deuda_id);

        -- Renegociaciones (historial de prórrogas e intereses)
        CREATE TABLE IF NOT EXISTS renegociaciones (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            deuda_id INTEGER NOT NULL,
            nueva_fecha_venc TEXT NOT NULL,
            interes_percent REAL NOT NULL,
            fecha TEXT NOT NULL,
            operador TEXT,
            FOREIGN KEY (deuda_id) REFERENCES deudas(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_renegociaciones_deuda ON renegociaciones(deuda_id);

        -- Cuotas de deudas en plan de pagos
        CREATE TABLE IF NOT EXISTS cuotas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            deuda_id INTEGER NOT NULL,
            numero INTEGER NOT NULL,
            valor REAL NOT NULL,
            fecha_vencimiento TEXT NOT NULL,
            estado TEXT NOT NULL DEFAULT 'PENDIENTE',
            valor_pagado REAL NOT NULL DEFAULT 0,
            FOREIGN KEY (deuda_id) REFERENCES deudas(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_cuotas_deuda ON cuotas(deuda_id);
        ",
    )
}
