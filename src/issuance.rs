//! License issuance for completed purchases.
//!
//! Upstream payment events can be delivered more than once; issuance is
//! idempotent on the purchase reference so a retried delivery never
//! mints a second license.

use rusqlite::Connection;

use crate::codes::generate_license_code;
use crate::db::{is_unique_violation, queries};
use crate::error::{AppError, Result};
use crate::models::{IssueLicense, License};

#[derive(Debug, Clone)]
pub struct IssueOutcome {
    pub license: License,
    /// False when the purchase reference had already been processed and
    /// the existing license is returned instead.
    pub newly_issued: bool,
}

pub fn issue_license(
    conn: &Connection,
    input: &IssueLicense,
    default_max_devices: i32,
) -> Result<IssueOutcome> {
    if let Some(existing) =
        queries::get_license_by_purchase_reference(conn, &input.purchase_reference)?
    {
        tracing::info!(
            license_id = %existing.id,
            purchase_reference = %input.purchase_reference,
            "purchase already processed, returning existing license"
        );
        return Ok(IssueOutcome {
            license: existing,
            newly_issued: false,
        });
    }

    let max_devices = input.max_devices.unwrap_or(default_max_devices);

    for attempt in 0..2 {
        let code = generate_license_code();
        match queries::create_license(conn, &code, input, max_devices) {
            Ok(license) => {
                tracing::info!(
                    license_id = %license.id,
                    purchase_reference = %input.purchase_reference,
                    "license issued"
                );
                return Ok(IssueOutcome {
                    license,
                    newly_issued: true,
                });
            }
            Err(AppError::Database(e)) if is_unique_violation(&e) => {
                // Either a concurrent delivery of the same purchase won
                // the insert, or the generated code collided. Re-read for
                // the former; loop once for the latter.
                if let Some(existing) =
                    queries::get_license_by_purchase_reference(conn, &input.purchase_reference)?
                {
                    return Ok(IssueOutcome {
                        license: existing,
                        newly_issued: false,
                    });
                }
                tracing::warn!(attempt, "license code collision, regenerating");
            }
            Err(e) => return Err(e),
        }
    }

    Err(AppError::Internal(
        "could not mint a unique license code".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        conn
    }

    fn purchase(reference: &str) -> IssueLicense {
        IssueLicense {
            email: "buyer@example.com".to_string(),
            customer_name: None,
            purchase_reference: reference.to_string(),
            amount_paid_cents: 2499,
            currency: "USD".to_string(),
            max_devices: None,
        }
    }

    #[test]
    fn repeated_purchase_delivery_returns_the_same_license() {
        let conn = test_conn();

        let first = issue_license(&conn, &purchase("evt_123"), 2).unwrap();
        assert!(first.newly_issued);

        let second = issue_license(&conn, &purchase("evt_123"), 2).unwrap();
        assert!(!second.newly_issued);
        assert_eq!(second.license.id, first.license.id);
        assert_eq!(second.license.code, first.license.code);
    }

    #[test]
    fn distinct_purchases_get_distinct_licenses() {
        let conn = test_conn();

        let a = issue_license(&conn, &purchase("evt_a"), 2).unwrap();
        let b = issue_license(&conn, &purchase("evt_b"), 2).unwrap();
        assert_ne!(a.license.id, b.license.id);
        assert_ne!(a.license.code, b.license.code);
    }

    #[test]
    fn default_max_devices_applies_unless_overridden() {
        let conn = test_conn();

        let defaulted = issue_license(&conn, &purchase("evt_default"), 2).unwrap();
        assert_eq!(defaulted.license.max_devices, 2);

        let mut input = purchase("evt_override");
        input.max_devices = Some(5);
        let overridden = issue_license(&conn, &input, 2).unwrap();
        assert_eq!(overridden.license.max_devices, 5);
    }
}
