use serde::{Deserialize, Serialize};

/// Coarse entitlement tier derived from a profile.
///
/// Variants are declared lowest first so the derived `Ord` matches precedence:
/// `AllAccess > CoursePass > Restricted > Basic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Basic,
    Restricted,
    CoursePass,
    AllAccess,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 4] = [
        Self::AllAccess,
        Self::CoursePass,
        Self::Restricted,
        Self::Basic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllAccess => "all_access",
            Self::CoursePass => "course_pass",
            Self::Restricted => "restricted",
            Self::Basic => "basic",
        }
    }

    pub fn grants_masterclass(&self) -> bool {
        matches!(self, Self::AllAccess)
    }

    pub fn grants_course(&self) -> bool {
        matches!(self, Self::AllAccess | Self::CoursePass)
    }
}

impl core::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of gated content a page or component renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTier {
    /// Free lessons; hidden only from restricted identities.
    Free,
    /// Course chapters.
    Course,
    /// Masterclasses.
    Masterclass,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_precedence() {
        assert!(AccessLevel::AllAccess > AccessLevel::CoursePass);
        assert!(AccessLevel::CoursePass > AccessLevel::Restricted);
        assert!(AccessLevel::Restricted > AccessLevel::Basic);
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&AccessLevel::AllAccess).unwrap();
        assert_eq!(json, "\"all_access\"");
        let level: AccessLevel = serde_json::from_str("\"course_pass\"").unwrap();
        assert_eq!(level, AccessLevel::CoursePass);
    }

    #[test]
    fn display_matches_wire_name() {
        for level in AccessLevel::ALL {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json.trim_matches('"'), level.to_string());
        }
    }
}
