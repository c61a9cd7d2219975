mod from_row;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::classify::DeviceClassifier;
use crate::error::Result;
use crate::notify::Notifier;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub base_url: String,
    /// Advertised device limit stamped on newly issued licenses.
    pub default_max_devices: i32,
    /// Per-category cap enforced on admission; independent of the
    /// advertised limit.
    pub category_device_limit: i32,
    pub internal_api_token: Option<String>,
    pub classifier: Arc<dyn DeviceClassifier>,
    pub notifier: Notifier,
}

/// Open a pooled SQLite database at `path` with the pragmas every
/// connection needs.
pub fn new_pool(path: &str, max_size: u32) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        // journal_mode returns a row, so it goes through query_row.
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(Duration::from_secs(5))
    });
    r2d2::Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(Into::into)
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS licenses (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    customer_name TEXT,
    purchase_reference TEXT NOT NULL UNIQUE,
    amount_paid_cents INTEGER NOT NULL,
    currency TEXT NOT NULL,
    max_devices INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_revoked INTEGER NOT NULL DEFAULT 0,
    purchased_at INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS device_activations (
    id TEXT PRIMARY KEY,
    license_id TEXT NOT NULL REFERENCES licenses(id),
    device_fingerprint TEXT NOT NULL,
    device_name TEXT,
    device_type TEXT NOT NULL,
    ip_address TEXT,
    user_agent TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    last_used_at INTEGER NOT NULL,
    deactivated_at INTEGER,
    UNIQUE (license_id, device_fingerprint)
);

CREATE INDEX IF NOT EXISTS idx_activations_license_active
    ON device_activations (license_id, is_active);

CREATE TABLE IF NOT EXISTS support_claims (
    id TEXT PRIMARY KEY,
    claim_number TEXT NOT NULL UNIQUE,
    license_id TEXT REFERENCES licenses(id),
    license_code TEXT,
    email TEXT NOT NULL,
    customer_name TEXT,
    claim_type TEXT NOT NULL,
    subject TEXT NOT NULL,
    message TEXT NOT NULL,
    device_info TEXT,
    created_at INTEGER NOT NULL
);
";

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// True when a rusqlite error is a UNIQUE constraint violation. Used by
/// insertion sites that retry with a fresh generated identifier.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
