//! Row mapping helpers shared by the query layer.

use std::str::FromStr;

use rusqlite::{Connection, Params, Row, types::Type};

use crate::error::Result;
use crate::models::{DeviceActivation, License, SupportClaim};

pub const LICENSE_COLS: &str = "id, code, email, customer_name, purchase_reference, \
     amount_paid_cents, currency, max_devices, is_active, is_revoked, purchased_at, created_at";

pub const ACTIVATION_COLS: &str = "id, license_id, device_fingerprint, device_name, device_type, \
     ip_address, user_agent, is_active, created_at, last_used_at, deactivated_at";

pub const CLAIM_COLS: &str = "id, claim_number, license_id, license_code, email, customer_name, \
     claim_type, subject, message, device_info, created_at";

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Parse a TEXT column into an enum, mapping bad stored values to a
/// conversion error instead of panicking.
fn parse_text_col<T: FromStr>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unrecognized value: {}", raw).into(),
        )
    })
}

impl FromRow for License {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(License {
            id: row.get(0)?,
            code: row.get(1)?,
            email: row.get(2)?,
            customer_name: row.get(3)?,
            purchase_reference: row.get(4)?,
            amount_paid_cents: row.get(5)?,
            currency: row.get(6)?,
            max_devices: row.get(7)?,
            is_active: row.get(8)?,
            is_revoked: row.get(9)?,
            purchased_at: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

impl FromRow for DeviceActivation {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(DeviceActivation {
            id: row.get(0)?,
            license_id: row.get(1)?,
            device_fingerprint: row.get(2)?,
            device_name: row.get(3)?,
            device_type: parse_text_col(row, 4)?,
            ip_address: row.get(5)?,
            user_agent: row.get(6)?,
            is_active: row.get(7)?,
            created_at: row.get(8)?,
            last_used_at: row.get(9)?,
            deactivated_at: row.get(10)?,
        })
    }
}

impl FromRow for SupportClaim {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(SupportClaim {
            id: row.get(0)?,
            claim_number: row.get(1)?,
            license_id: row.get(2)?,
            license_code: row.get(3)?,
            email: row.get(4)?,
            customer_name: row.get(5)?,
            claim_type: parse_text_col(row, 6)?,
            subject: row.get(7)?,
            message: row.get(8)?,
            device_info: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

pub fn query_one<T: FromRow, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, |row| T::from_row(row))?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow, P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| T::from_row(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
