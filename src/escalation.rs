//! Support escalation: durable claims for activations the automated
//! policy refused, and for anything else a reader needs a human for.

use rusqlite::Connection;

use crate::codes::generate_claim_number;
use crate::db::{is_unique_violation, queries};
use crate::error::{AppError, Result};
use crate::models::{CreateSupportClaim, SupportClaim};
use crate::util::normalize_license_code;

/// Persist a support claim and return it with its claim number.
///
/// A supplied license code is resolved for cross-reference, but an
/// unresolvable code never blocks the claim: the raw string is stored
/// as typed. Notification happens at the call site, after this returns.
pub fn create_support_claim(
    conn: &Connection,
    input: &CreateSupportClaim,
) -> Result<SupportClaim> {
    let license = match input.license_code.as_deref() {
        Some(code) => {
            let resolved = queries::get_license_by_code(conn, &normalize_license_code(code))?;
            if resolved.is_none() {
                tracing::debug!(code = %code, "claim references an unresolvable license code");
            }
            resolved
        }
        None => None,
    };

    for attempt in 0..2 {
        let claim_number = generate_claim_number();
        match queries::create_support_claim(
            conn,
            &claim_number,
            license.as_ref().map(|l| l.id.as_str()),
            input,
        ) {
            Ok(claim) => {
                tracing::info!(
                    claim_number = %claim.claim_number,
                    claim_type = claim.claim_type.as_ref(),
                    "support claim created"
                );
                return Ok(claim);
            }
            Err(AppError::Database(e)) if is_unique_violation(&e) => {
                tracing::warn!(attempt, "claim number collision, regenerating");
            }
            Err(e) => return Err(e),
        }
    }

    Err(AppError::Internal(
        "could not mint a unique claim number".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::issuance::issue_license;
    use crate::models::{ClaimType, IssueLicense};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        conn
    }

    fn claim_input(license_code: Option<&str>) -> CreateSupportClaim {
        CreateSupportClaim {
            license_code: license_code.map(String::from),
            email: "reader@example.com".to_string(),
            customer_name: Some("Test Reader".to_string()),
            claim_type: ClaimType::DeviceLimit,
            subject: "Cannot activate my new tablet".to_string(),
            message: "I replaced my tablet and the new one is refused.".to_string(),
            device_info: Some("iPad Air, app 3.2.1".to_string()),
        }
    }

    #[test]
    fn unresolvable_code_still_creates_a_claim() {
        let conn = test_conn();

        let claim = create_support_claim(&conn, &claim_input(Some("NOPE-NOPE-NOPE-NOPE"))).unwrap();
        assert!(claim.claim_number.starts_with("SUP-"));
        assert!(claim.license_id.is_none());
        assert_eq!(claim.license_code.as_deref(), Some("NOPE-NOPE-NOPE-NOPE"));

        let stored = queries::get_claim_by_number(&conn, &claim.claim_number)
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, claim.id);
    }

    #[test]
    fn resolvable_code_is_cross_referenced() {
        let conn = test_conn();
        let issued = issue_license(
            &conn,
            &IssueLicense {
                email: "reader@example.com".to_string(),
                customer_name: None,
                purchase_reference: "evt_claim".to_string(),
                amount_paid_cents: 1299,
                currency: "USD".to_string(),
                max_devices: None,
            },
            2,
        )
        .unwrap();

        // Lowercase input still resolves.
        let claim = create_support_claim(
            &conn,
            &claim_input(Some(&issued.license.code.to_lowercase())),
        )
        .unwrap();
        assert_eq!(claim.license_id.as_deref(), Some(issued.license.id.as_str()));
    }

    #[test]
    fn claims_get_distinct_numbers() {
        let conn = test_conn();

        let a = create_support_claim(&conn, &claim_input(None)).unwrap();
        let b = create_support_claim(&conn, &claim_input(None)).unwrap();
        assert_ne!(a.claim_number, b.claim_number);
    }
}
