use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Platform tag reported by the client at activation time. Native tags
/// classify directly; `web` requires a user-agent sniff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceType {
    Ios,
    Android,
    Windows,
    Macos,
    Linux,
    Web,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceActivation {
    pub id: String,
    pub license_id: String,
    /// Opaque per-install/per-browser identifier supplied by the client.
    pub device_fingerprint: String,
    pub device_name: Option<String>,
    pub device_type: DeviceType,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub last_used_at: i64,
    pub deactivated_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewActivation<'a> {
    pub license_id: &'a str,
    pub device_fingerprint: &'a str,
    pub device_name: Option<&'a str>,
    pub device_type: DeviceType,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}
