use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    /// The only credential the end user holds. Canonical uppercase,
    /// grouped as XXXX-XXXX-XXXX-XXXX.
    pub code: String,
    pub email: String,
    pub customer_name: Option<String>,
    /// Idempotency key from the upstream payment event. At most one
    /// license is ever minted per purchase reference.
    pub purchase_reference: String,
    pub amount_paid_cents: i64,
    pub currency: String,
    /// Device limit advertised to the customer. Not what admission
    /// enforces; see the per-category cap in the admission engine.
    pub max_devices: i32,
    pub is_active: bool,
    pub is_revoked: bool,
    pub purchased_at: i64,
    pub created_at: i64,
}

impl License {
    /// A license must be both active and not revoked to be usable.
    pub fn is_usable(&self) -> bool {
        self.is_active && !self.is_revoked
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueLicense {
    pub email: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub purchase_reference: String,
    pub amount_paid_cents: i64,
    pub currency: String,
    /// Advertised device limit override; falls back to the configured
    /// default when absent.
    #[serde(default)]
    pub max_devices: Option<i32>,
}
