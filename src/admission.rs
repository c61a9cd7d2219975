//! License validation and device admission.
//!
//! Two operations with two deliberately different quota semantics:
//!
//! - [`validate_license`] reports the flat, user-facing comparison of
//!   active devices against the advertised `max_devices`.
//! - [`activate_device`] enforces a per-category cap that is independent
//!   of the advertised number. A license advertised as "2 devices" can
//!   hold one full category of mobile seats and one of desktop seats.
//!
//! The user is never told about categories; denial messages quote the
//! global figures.

use rusqlite::{Connection, TransactionBehavior};

use crate::classify::DeviceClassifier;
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{DeviceActivation, DeviceType, License, NewActivation};
use crate::util::normalize_license_code;

/// A policy refusal. These are values, not errors: the request itself
/// succeeded, the answer is no.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    InvalidCode,
    Revoked,
    Inactive,
    DeviceLimitExceeded {
        active_devices: i64,
        max_devices: i32,
    },
}

impl Denial {
    pub fn error_code(&self) -> &'static str {
        match self {
            Denial::InvalidCode => "INVALID_CODE",
            Denial::Revoked => "REVOKED",
            Denial::Inactive => "INACTIVE",
            Denial::DeviceLimitExceeded { .. } => "DEVICE_LIMIT_EXCEEDED",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Denial::InvalidCode => "License code not recognized".to_string(),
            Denial::Revoked => "This license has been revoked".to_string(),
            Denial::Inactive => "This license is no longer active".to_string(),
            Denial::DeviceLimitExceeded {
                active_devices,
                max_devices,
            } => format!(
                "Device limit reached ({}/{}). Contact support if you need help moving your license to a new device.",
                active_devices, max_devices
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LicenseValidation {
    pub license: License,
    /// Active seats across all categories.
    pub active_devices: i64,
    /// `max_devices - active_devices`. May go negative after lenient
    /// reactivations; reported as-is.
    pub remaining_activations: i64,
    /// Flat global comparison shown to the user. Not what gates
    /// admission.
    pub can_activate: bool,
}

#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    Valid(LicenseValidation),
    Denied(Denial),
}

/// Informational check: resolve the code, confirm the license is usable,
/// and report global occupancy against the advertised limit.
pub fn validate_license(conn: &Connection, code: &str) -> Result<ValidationOutcome> {
    let normalized = normalize_license_code(code);

    let Some(license) = queries::get_license_by_code(conn, &normalized)? else {
        return Ok(ValidationOutcome::Denied(Denial::InvalidCode));
    };

    if license.is_revoked {
        return Ok(ValidationOutcome::Denied(Denial::Revoked));
    }
    if !license.is_active {
        return Ok(ValidationOutcome::Denied(Denial::Inactive));
    }

    let active_devices = queries::count_active_activations(conn, &license.id)?;
    let max_devices = license.max_devices as i64;

    Ok(ValidationOutcome::Valid(LicenseValidation {
        can_activate: active_devices < max_devices,
        remaining_activations: max_devices - active_devices,
        active_devices,
        license,
    }))
}

#[derive(Debug, Clone)]
pub struct ActivationRequest<'a> {
    pub code: &'a str,
    pub fingerprint: &'a str,
    pub device_name: Option<&'a str>,
    pub device_type: DeviceType,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub enum ActivationOutcome {
    Activated {
        activation: DeviceActivation,
        remaining_activations: i64,
    },
    Denied(Denial),
}

/// Authoritative admission. Runs in an IMMEDIATE transaction so the
/// count-then-insert sequence is serialized across concurrent attempts
/// on the same store; the `(license_id, device_fingerprint)` unique
/// index backstops duplicate inserts.
pub fn activate_device(
    conn: &mut Connection,
    classifier: &dyn DeviceClassifier,
    category_limit: i32,
    req: &ActivationRequest<'_>,
) -> Result<ActivationOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let validation = match validate_license(&tx, req.code)? {
        ValidationOutcome::Valid(v) => v,
        ValidationOutcome::Denied(denial) => {
            return Ok(ActivationOutcome::Denied(denial));
        }
    };
    let license = &validation.license;

    if let Some(existing) = queries::get_activation(&tx, &license.id, req.fingerprint)? {
        if existing.is_active {
            // A device already holding a seat can always refresh it.
            queries::touch_activation(&tx, &existing.id)?;
            let activation = queries::get_activation(&tx, &license.id, req.fingerprint)?
                .ok_or_else(|| AppError::Internal("activation row disappeared".into()))?;
            tx.commit()?;
            tracing::debug!(
                license_id = %license.id,
                fingerprint = %req.fingerprint,
                "repeat activation, seat refreshed"
            );
            return Ok(ActivationOutcome::Activated {
                activation,
                remaining_activations: validation.remaining_activations,
            });
        }

        // A previously deactivated device returning. Let it back in
        // unconditionally, regardless of current occupancy.
        queries::reactivate_activation(&tx, &existing.id)?;
        let activation = queries::get_activation(&tx, &license.id, req.fingerprint)?
            .ok_or_else(|| AppError::Internal("activation row disappeared".into()))?;
        tx.commit()?;
        tracing::info!(
            license_id = %license.id,
            fingerprint = %req.fingerprint,
            "returning device reactivated"
        );
        return Ok(ActivationOutcome::Activated {
            activation,
            remaining_activations: license.max_devices as i64 - (validation.active_devices + 1),
        });
    }

    // Brand-new fingerprint: admission is gated per category, and the
    // category of every stored activation is recomputed here rather
    // than read from a column.
    let candidate_category = classifier.classify(req.device_type, req.user_agent);
    let active = queries::list_active_activations(&tx, &license.id)?;
    let same_category_count = active
        .iter()
        .filter(|a| classifier.classify(a.device_type, a.user_agent.as_deref()) == candidate_category)
        .count() as i64;

    if same_category_count >= category_limit as i64 {
        tracing::info!(
            license_id = %license.id,
            category = candidate_category.as_ref(),
            "admission denied, category full"
        );
        return Ok(ActivationOutcome::Denied(Denial::DeviceLimitExceeded {
            active_devices: validation.active_devices,
            max_devices: license.max_devices,
        }));
    }

    let activation = queries::create_activation(
        &tx,
        &NewActivation {
            license_id: &license.id,
            device_fingerprint: req.fingerprint,
            device_name: req.device_name,
            device_type: req.device_type,
            ip_address: req.ip_address,
            user_agent: req.user_agent,
        },
    )?;
    tx.commit()?;

    tracing::info!(
        license_id = %license.id,
        activation_id = %activation.id,
        category = candidate_category.as_ref(),
        "new device admitted"
    );

    Ok(ActivationOutcome::Activated {
        activation,
        remaining_activations: license.max_devices as i64 - (validation.active_devices + 1),
    })
}
