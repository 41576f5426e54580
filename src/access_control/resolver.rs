//! Page access resolver
//!
//! Answers "can this user open this page, and with what role?" from the
//! page grants alone. A user's effective roles are the union of grants held
//! directly and grants held by any group the user belongs to; the effective
//! role is the highest of them.
//!
//! Space-level membership is deliberately not consulted here. Callers that
//! want a space fallback combine this with their own space check.

use crate::access_control::role::Role;
use crate::access_control::types::{PageId, UserId};
use crate::error::StoreResult;
use crate::store::SharedPermissionStore;
use tracing::debug;

/// Page access resolver
///
/// Evaluates a user's effective page role from the permission store.
#[derive(Clone)]
pub struct AccessResolver {
    store: SharedPermissionStore,
}

impl AccessResolver {
    pub fn new(store: SharedPermissionStore) -> Self {
        Self { store }
    }

    /// Whether the user holds any role on the page
    pub async fn has_access(&self, user_id: UserId, page_id: PageId) -> StoreResult<bool> {
        let roles = self.store.user_page_roles(user_id, page_id).await?;
        let allowed = !roles.is_empty();
        debug!(user = %user_id, page = %page_id, allowed, "Page access resolved");
        Ok(allowed)
    }

    /// Effective role: the highest role held directly or via groups
    pub async fn highest_role(&self, user_id: UserId, page_id: PageId) -> StoreResult<Option<Role>> {
        let role = Role::highest(self.store.user_page_roles(user_id, page_id).await?);
        debug!(
            user = %user_id,
            page = %page_id,
            role = role.map(Role::as_str).unwrap_or("none"),
            "Effective page role resolved"
        );
        Ok(role)
    }

    /// Every distinct role the user holds on the page, lowest first
    pub async fn roles(&self, user_id: UserId, page_id: PageId) -> StoreResult<Vec<Role>> {
        let mut roles = self.store.user_page_roles(user_id, page_id).await?;
        roles.sort();
        roles.dedup();
        Ok(roles)
    }
}
