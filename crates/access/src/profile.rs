use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Snapshot of the profile flags that drive access decisions.
///
/// Rows coming out of the profile table are loosely typed: a column can be
/// missing, `null`, or hold something other than a boolean. All of those read
/// as `false`, so deserialization never fails on a malformed flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    /// Irrevocable top-tier entitlement.
    #[serde(deserialize_with = "lenient_flag")]
    pub has_full_unlock: bool,

    /// Mid-tier entitlement (courses, not masterclasses).
    #[serde(deserialize_with = "lenient_flag")]
    pub has_course_pass: bool,

    /// Preview identity (e.g. intake-only visitor).
    #[serde(deserialize_with = "lenient_flag")]
    pub is_guest: bool,

    /// Styling-studio privileges; unrelated to the tier ladder.
    #[serde(deserialize_with = "lenient_flag")]
    pub active_studio_client: bool,
}

impl UserProfile {
    pub fn full_unlock() -> Self {
        Self {
            has_full_unlock: true,
            ..Self::default()
        }
    }

    pub fn course_pass() -> Self {
        Self {
            has_course_pass: true,
            ..Self::default()
        }
    }

    pub fn guest() -> Self {
        Self {
            is_guest: true,
            ..Self::default()
        }
    }

    pub fn studio_client() -> Self {
        Self {
            active_studio_client: true,
            ..Self::default()
        }
    }
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(matches!(value, JsonValue::Bool(true)))
}
