//! Per-object access check used by masterclass and chapter pages.

use vault_core::{ContentId, UserId};

use crate::ports::GrantStore;

/// Whether `user_id` holds a grant for the masterclass or chapter `object_id`.
///
/// Page code passes raw ids from the session and the route. Blank or malformed
/// ids and store failures all read as "no access"; failures are logged.
pub async fn check_access<S>(store: &S, user_id: &str, object_id: &str) -> bool
where
    S: GrantStore + ?Sized,
{
    if user_id.trim().is_empty() || object_id.trim().is_empty() {
        return false;
    }

    let (user_id, object_id) = match (user_id.parse::<UserId>(), object_id.parse::<ContentId>()) {
        (Ok(user), Ok(object)) => (user, object),
        (Err(e), _) | (_, Err(e)) => {
            tracing::debug!(error = %e, "access check with malformed id");
            return false;
        }
    };

    match store.has_grant(user_id, object_id).await {
        Ok(granted) => granted,
        Err(e) => {
            tracing::warn!(%user_id, %object_id, error = %e, "access check failed");
            false
        }
    }
}
