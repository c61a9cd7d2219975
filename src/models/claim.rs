use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClaimType {
    DeviceLimit,
    LostCode,
    ActivationProblem,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportClaim {
    pub id: String,
    /// Human-referenceable, date-stamped: SUP-YYYYMMDD-NNNN.
    pub claim_number: String,
    /// Resolved license, when the supplied code matched one.
    pub license_id: Option<String>,
    /// Raw code string as the user typed it. Kept even when unresolvable.
    pub license_code: Option<String>,
    pub email: String,
    pub customer_name: Option<String>,
    pub claim_type: ClaimType,
    pub subject: String,
    pub message: String,
    pub device_info: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSupportClaim {
    #[serde(default)]
    pub license_code: Option<String>,
    pub email: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub claim_type: ClaimType,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub device_info: Option<String>,
}
