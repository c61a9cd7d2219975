//! Device category classification.
//!
//! Categories are derived, never stored: every admission decision
//! re-classifies the stored activations, so a change to the marker list
//! changes the effective quota for existing activations without a
//! migration. Treat the list as policy.

use serde::Serialize;
use strum::AsRefStr;

use crate::models::DeviceType;

/// Coarse enforcement category. Never shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceCategory {
    Mobile,
    Desktop,
}

/// Classification strategy. Injectable so the marker list can change
/// without touching the admission engine, and so tests can pin behavior
/// for device types that do not exist yet.
pub trait DeviceClassifier: Send + Sync {
    fn classify(&self, device_type: DeviceType, user_agent: Option<&str>) -> DeviceCategory;
}

/// Substrings that mark a `web` user agent as mobile. Lowercase;
/// matching is case-insensitive.
const MOBILE_UA_MARKERS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "mobile",
    "windows phone",
    "blackberry",
    "opera mini",
    "iemobile",
    "webos",
];

/// Default classifier: native platform tags map directly; the generic
/// `web` tag falls back to user-agent sniffing, defaulting to desktop.
pub struct UserAgentClassifier {
    markers: Vec<String>,
}

impl UserAgentClassifier {
    pub fn new() -> Self {
        Self {
            markers: MOBILE_UA_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Build a classifier with a custom marker list (tests, staged
    /// rollout of marker changes).
    pub fn with_markers(markers: Vec<String>) -> Self {
        Self {
            markers: markers.into_iter().map(|m| m.to_lowercase()).collect(),
        }
    }
}

impl Default for UserAgentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceClassifier for UserAgentClassifier {
    fn classify(&self, device_type: DeviceType, user_agent: Option<&str>) -> DeviceCategory {
        match device_type {
            DeviceType::Ios | DeviceType::Android => DeviceCategory::Mobile,
            DeviceType::Windows | DeviceType::Macos | DeviceType::Linux => DeviceCategory::Desktop,
            DeviceType::Web => {
                let Some(ua) = user_agent else {
                    return DeviceCategory::Desktop;
                };
                let ua = ua.to_lowercase();
                if self.markers.iter().any(|m| ua.contains(m.as_str())) {
                    DeviceCategory::Mobile
                } else {
                    DeviceCategory::Desktop
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
         AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

    #[test]
    fn native_tags_classify_directly() {
        let c = UserAgentClassifier::new();
        assert_eq!(c.classify(DeviceType::Ios, None), DeviceCategory::Mobile);
        assert_eq!(c.classify(DeviceType::Android, None), DeviceCategory::Mobile);
        assert_eq!(c.classify(DeviceType::Windows, None), DeviceCategory::Desktop);
        assert_eq!(c.classify(DeviceType::Macos, None), DeviceCategory::Desktop);
        assert_eq!(c.classify(DeviceType::Linux, None), DeviceCategory::Desktop);
    }

    #[test]
    fn native_tags_ignore_user_agent() {
        // A misleading UA must not override an explicit platform tag.
        let c = UserAgentClassifier::new();
        assert_eq!(
            c.classify(DeviceType::Windows, Some(IPHONE_UA)),
            DeviceCategory::Desktop
        );
    }

    #[test]
    fn web_tag_sniffs_user_agent() {
        let c = UserAgentClassifier::new();
        assert_eq!(
            c.classify(DeviceType::Web, Some(IPHONE_UA)),
            DeviceCategory::Mobile
        );
        assert_eq!(
            c.classify(DeviceType::Web, Some(DESKTOP_UA)),
            DeviceCategory::Desktop
        );
    }

    #[test]
    fn web_tag_matching_is_case_insensitive() {
        let c = UserAgentClassifier::new();
        assert_eq!(
            c.classify(DeviceType::Web, Some("SomeBrowser/1.0 (ANDROID 14)")),
            DeviceCategory::Mobile
        );
    }

    #[test]
    fn web_tag_without_user_agent_defaults_to_desktop() {
        let c = UserAgentClassifier::new();
        assert_eq!(c.classify(DeviceType::Web, None), DeviceCategory::Desktop);
    }

    #[test]
    fn classification_is_deterministic() {
        let c = UserAgentClassifier::new();
        let first = c.classify(DeviceType::Web, Some(IPHONE_UA));
        for _ in 0..10 {
            assert_eq!(c.classify(DeviceType::Web, Some(IPHONE_UA)), first);
        }
    }

    #[test]
    fn custom_marker_list_reclassifies_unknown_agents() {
        // A future device type unknown to the default list.
        let ua = "VisionBrowser/2.1 (SpatialOS)";
        let default = UserAgentClassifier::new();
        assert_eq!(
            default.classify(DeviceType::Web, Some(ua)),
            DeviceCategory::Desktop
        );

        let custom = UserAgentClassifier::with_markers(vec!["spatialos".to_string()]);
        assert_eq!(
            custom.classify(DeviceType::Web, Some(ua)),
            DeviceCategory::Mobile
        );
    }
}
