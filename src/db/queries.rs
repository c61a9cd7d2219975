use chrono::Utc;
use rusqlite::{Connection, params};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{ACTIVATION_COLS, CLAIM_COLS, LICENSE_COLS, query_all, query_one};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Licenses ============

/// Insert a license with a pre-generated code. Callers own idempotency
/// (see `issuance`); the unique indexes on `code` and
/// `purchase_reference` backstop races.
pub fn create_license(
    conn: &Connection,
    code: &str,
    input: &IssueLicense,
    max_devices: i32,
) -> Result<License> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO licenses (id, code, email, customer_name, purchase_reference, \
         amount_paid_cents, currency, max_devices, is_active, is_revoked, purchased_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, 0, ?9, ?10)",
        params![
            &id,
            code,
            &input.email,
            &input.customer_name,
            &input.purchase_reference,
            input.amount_paid_cents,
            &input.currency,
            max_devices,
            now,
            now
        ],
    )?;

    Ok(License {
        id,
        code: code.to_string(),
        email: input.email.clone(),
        customer_name: input.customer_name.clone(),
        purchase_reference: input.purchase_reference.clone(),
        amount_paid_cents: input.amount_paid_cents,
        currency: input.currency.clone(),
        max_devices,
        is_active: true,
        is_revoked: false,
        purchased_at: now,
        created_at: now,
    })
}

pub fn get_license_by_id(conn: &Connection, id: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE id = ?1", LICENSE_COLS),
        &[&id],
    )
}

/// Lookup by canonical uppercase code. Callers normalize user input first.
pub fn get_license_by_code(conn: &Connection, code: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE code = ?1", LICENSE_COLS),
        &[&code],
    )
}

pub fn get_license_by_purchase_reference(
    conn: &Connection,
    purchase_reference: &str,
) -> Result<Option<License>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM licenses WHERE purchase_reference = ?1",
            LICENSE_COLS
        ),
        &[&purchase_reference],
    )
}

pub fn revoke_license(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET is_revoked = 1 WHERE id = ?1",
        params![id],
    )?;
    Ok(affected > 0)
}

pub fn deactivate_license(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET is_active = 0 WHERE id = ?1",
        params![id],
    )?;
    Ok(affected > 0)
}

// ============ Device activations ============

pub fn get_activation(
    conn: &Connection,
    license_id: &str,
    device_fingerprint: &str,
) -> Result<Option<DeviceActivation>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM device_activations WHERE license_id = ?1 AND device_fingerprint = ?2",
            ACTIVATION_COLS
        ),
        &[&license_id, &device_fingerprint],
    )
}

/// Every device ever seen for this license, newest first. History is
/// retained; deactivated rows are included.
pub fn list_activations(conn: &Connection, license_id: &str) -> Result<Vec<DeviceActivation>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM device_activations WHERE license_id = ?1 ORDER BY created_at DESC",
            ACTIVATION_COLS
        ),
        &[&license_id],
    )
}

pub fn list_active_activations(
    conn: &Connection,
    license_id: &str,
) -> Result<Vec<DeviceActivation>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM device_activations WHERE license_id = ?1 AND is_active = 1 \
             ORDER BY created_at DESC",
            ACTIVATION_COLS
        ),
        &[&license_id],
    )
}

/// Occupancy is always recomputed from rows, never cached on the license.
pub fn count_active_activations(conn: &Connection, license_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM device_activations WHERE license_id = ?1 AND is_active = 1",
        params![license_id],
        |row| row.get(0),
    )
    .map_err(Into::into)
}

pub fn create_activation(conn: &Connection, input: &NewActivation<'_>) -> Result<DeviceActivation> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO device_activations (id, license_id, device_fingerprint, device_name, \
         device_type, ip_address, user_agent, is_active, created_at, last_used_at, deactivated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, NULL)",
        params![
            &id,
            input.license_id,
            input.device_fingerprint,
            input.device_name,
            input.device_type.as_ref(),
            input.ip_address,
            input.user_agent,
            now,
            now
        ],
    )?;

    Ok(DeviceActivation {
        id,
        license_id: input.license_id.to_string(),
        device_fingerprint: input.device_fingerprint.to_string(),
        device_name: input.device_name.map(String::from),
        device_type: input.device_type,
        ip_address: input.ip_address.map(String::from),
        user_agent: input.user_agent.map(String::from),
        is_active: true,
        created_at: now,
        last_used_at: now,
        deactivated_at: None,
    })
}

pub fn touch_activation(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "UPDATE device_activations SET last_used_at = ?1 WHERE id = ?2",
        params![now(), id],
    )?;
    Ok(())
}

/// Flip a deactivated row back to active. Rows are never deleted, so a
/// returning fingerprint reclaims its original record.
pub fn reactivate_activation(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "UPDATE device_activations SET is_active = 1, deactivated_at = NULL, last_used_at = ?1 \
         WHERE id = ?2",
        params![now(), id],
    )?;
    Ok(())
}

pub fn deactivate_activation(conn: &Connection, id: &str) -> Result<bool> {
    let now = now();
    let affected = conn.execute(
        "UPDATE device_activations SET is_active = 0, deactivated_at = ?1 \
         WHERE id = ?2 AND is_active = 1",
        params![now, id],
    )?;
    Ok(affected > 0)
}

// ============ Support claims ============

pub fn create_support_claim(
    conn: &Connection,
    claim_number: &str,
    license_id: Option<&str>,
    input: &CreateSupportClaim,
) -> Result<SupportClaim> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO support_claims (id, claim_number, license_id, license_code, email, \
         customer_name, claim_type, subject, message, device_info, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            &id,
            claim_number,
            license_id,
            &input.license_code,
            &input.email,
            &input.customer_name,
            input.claim_type.as_ref(),
            &input.subject,
            &input.message,
            &input.device_info,
            now
        ],
    )?;

    Ok(SupportClaim {
        id,
        claim_number: claim_number.to_string(),
        license_id: license_id.map(String::from),
        license_code: input.license_code.clone(),
        email: input.email.clone(),
        customer_name: input.customer_name.clone(),
        claim_type: input.claim_type,
        subject: input.subject.clone(),
        message: input.message.clone(),
        device_info: input.device_info.clone(),
        created_at: now,
    })
}

pub fn get_claim_by_number(conn: &Connection, claim_number: &str) -> Result<Option<SupportClaim>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM support_claims WHERE claim_number = ?1",
            CLAIM_COLS
        ),
        &[&claim_number],
    )
}

// ============ Activity summary ============

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ActivityStats {
    pub window_start: i64,
    pub licenses_issued: i64,
    pub devices_activated: i64,
    pub claims_opened: i64,
}

/// Aggregate counts for the daily summary notification.
pub fn activity_since(conn: &Connection, since: i64) -> Result<ActivityStats> {
    let licenses_issued: i64 = conn.query_row(
        "SELECT COUNT(*) FROM licenses WHERE created_at >= ?1",
        params![since],
        |row| row.get(0),
    )?;
    let devices_activated: i64 = conn.query_row(
        "SELECT COUNT(*) FROM device_activations WHERE created_at >= ?1",
        params![since],
        |row| row.get(0),
    )?;
    let claims_opened: i64 = conn.query_row(
        "SELECT COUNT(*) FROM support_claims WHERE created_at >= ?1",
        params![since],
        |row| row.get(0),
    )?;

    Ok(ActivityStats {
        window_start: since,
        licenses_issued,
        devices_activated,
        claims_opened,
    })
}
