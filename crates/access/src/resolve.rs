//! Access level resolution and the capability checks built on it.
//!
//! All functions here are total: no IO, no panics, no clock.

use crate::{AccessLevel, ContentTier, UserProfile};

/// Resolve the access level of a (possibly absent) profile.
///
/// Evaluated in priority order, first match wins:
///
/// 1. no profile → `Restricted`
/// 2. full unlock → `AllAccess`
/// 3. course pass → `CoursePass`
/// 4. guest → `Restricted`
/// 5. otherwise → `Basic`
pub fn resolve(profile: Option<&UserProfile>) -> AccessLevel {
    let Some(profile) = profile else {
        return AccessLevel::Restricted;
    };

    if profile.has_full_unlock {
        AccessLevel::AllAccess
    } else if profile.has_course_pass {
        AccessLevel::CoursePass
    } else if profile.is_guest {
        AccessLevel::Restricted
    } else {
        AccessLevel::Basic
    }
}

/// Masterclass content requires full access; a course pass is not enough.
pub fn can_access_masterclass(profile: Option<&UserProfile>) -> bool {
    resolve(profile).grants_masterclass()
}

pub fn can_access_course(profile: Option<&UserProfile>) -> bool {
    resolve(profile).grants_course()
}

/// Studio privileges, independent of the tier ladder.
pub fn has_studio_access(profile: Option<&UserProfile>) -> bool {
    profile.is_some_and(|p| p.active_studio_client)
}

/// Whether content of the given tier renders as unlocked.
pub fn can_view(profile: Option<&UserProfile>, tier: ContentTier) -> bool {
    match tier {
        ContentTier::Free => resolve(profile) != AccessLevel::Restricted,
        ContentTier::Course => can_access_course(profile),
        ContentTier::Masterclass => can_access_masterclass(profile),
    }
}

/// Completion badges are hidden from guests and anonymous visitors.
pub fn show_completion_badge(profile: Option<&UserProfile>, completed: bool) -> bool {
    completed && profile.is_some_and(|p| !p.is_guest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(full: bool, course: bool, guest: bool, studio: bool) -> UserProfile {
        UserProfile {
            has_full_unlock: full,
            has_course_pass: course,
            is_guest: guest,
            active_studio_client: studio,
        }
    }

    #[test]
    fn full_unlock_resolves_to_all_access() {
        assert_eq!(resolve(Some(&UserProfile::full_unlock())), AccessLevel::AllAccess);
    }

    #[test]
    fn guest_resolves_to_restricted() {
        assert_eq!(resolve(Some(&UserProfile::guest())), AccessLevel::Restricted);
    }

    #[test]
    fn course_pass_resolves_to_course_pass() {
        assert_eq!(resolve(Some(&UserProfile::course_pass())), AccessLevel::CoursePass);
    }

    #[test]
    fn missing_profile_is_restricted_not_basic() {
        assert_eq!(resolve(None), AccessLevel::Restricted);
    }

    #[test]
    fn empty_profile_is_basic() {
        assert_eq!(resolve(Some(&UserProfile::default())), AccessLevel::Basic);
    }

    #[test]
    fn full_unlock_dominates_guest() {
        let p = profile(true, false, true, false);
        assert_eq!(resolve(Some(&p)), AccessLevel::AllAccess);
    }

    #[test]
    fn course_pass_dominates_guest() {
        let p = profile(false, true, true, false);
        assert_eq!(resolve(Some(&p)), AccessLevel::CoursePass);
    }

    #[test]
    fn masterclass_requires_all_access() {
        assert!(can_access_masterclass(Some(&UserProfile::full_unlock())));
        assert!(!can_access_masterclass(Some(&UserProfile::course_pass())));
        assert!(!can_access_masterclass(Some(&UserProfile::guest())));
        assert!(!can_access_masterclass(Some(&UserProfile::default())));
        assert!(!can_access_masterclass(None));
    }

    #[test]
    fn course_access_for_all_access_and_course_pass() {
        assert!(can_access_course(Some(&UserProfile::full_unlock())));
        assert!(can_access_course(Some(&UserProfile::course_pass())));
        assert!(!can_access_course(Some(&UserProfile::guest())));
        assert!(!can_access_course(Some(&UserProfile::default())));
    }

    #[test]
    fn studio_access_requires_present_profile_with_flag() {
        assert!(has_studio_access(Some(&UserProfile::studio_client())));
        assert!(!has_studio_access(Some(&UserProfile::full_unlock())));
        assert!(!has_studio_access(None));
    }

    #[test]
    fn free_content_hidden_only_from_restricted() {
        assert!(can_view(Some(&UserProfile::default()), ContentTier::Free));
        assert!(can_view(Some(&UserProfile::course_pass()), ContentTier::Free));
        assert!(!can_view(Some(&UserProfile::guest()), ContentTier::Free));
        assert!(!can_view(None, ContentTier::Free));
    }

    #[test]
    fn completion_badge_hidden_for_guests() {
        assert!(show_completion_badge(Some(&UserProfile::default()), true));
        assert!(!show_completion_badge(Some(&UserProfile::guest()), true));
        assert!(!show_completion_badge(Some(&UserProfile::default()), false));
        assert!(!show_completion_badge(None, true));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_profile() -> impl Strategy<Value = UserProfile> {
            (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>())
                .prop_map(|(full, course, guest, studio)| profile(full, course, guest, studio))
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: full unlock wins regardless of the other flags.
            #[test]
            fn full_unlock_always_all_access(course: bool, guest: bool, studio: bool) {
                let p = profile(true, course, guest, studio);
                prop_assert_eq!(resolve(Some(&p)), AccessLevel::AllAccess);
            }

            /// Property: without full unlock, a course pass wins over guest.
            #[test]
            fn course_pass_without_full_unlock(guest: bool, studio: bool) {
                let p = profile(false, true, guest, studio);
                prop_assert_eq!(resolve(Some(&p)), AccessLevel::CoursePass);
            }

            /// Property: the studio flag never changes the tier.
            #[test]
            fn studio_flag_is_orthogonal(p in any_profile()) {
                let toggled = UserProfile { active_studio_client: !p.active_studio_client, ..p };
                prop_assert_eq!(resolve(Some(&p)), resolve(Some(&toggled)));
            }

            /// Property: predicates agree with the resolved level.
            #[test]
            fn predicates_follow_level(p in any_profile()) {
                let level = resolve(Some(&p));
                prop_assert_eq!(can_access_masterclass(Some(&p)), level == AccessLevel::AllAccess);
                prop_assert_eq!(
                    can_access_course(Some(&p)),
                    matches!(level, AccessLevel::AllAccess | AccessLevel::CoursePass)
                );
            }

            /// Property: resolution is deterministic.
            #[test]
            fn resolve_is_deterministic(p in any_profile()) {
                prop_assert_eq!(resolve(Some(&p)), resolve(Some(&p)));
            }
        }
    }
}
