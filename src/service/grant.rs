//! Single grant pipeline

use crate::access_control::{
    GrantTarget, NewPagePermission, PageId, PagePermission, PermissionId, Role, UserId,
    escalation_check, shape_check,
};
use crate::directory::{SharedPageDirectory, SharedSpaceMembership};
use crate::error::{GrantError, GrantResult};
use crate::service::{require_page, space_role_cap};
use crate::store::{PagePermissionListing, Paginated, Pagination, SharedPermissionStore};
use tracing::{debug, info, warn};

/// Creates, updates and removes individual page grants
#[derive(Clone)]
pub struct GrantService {
    pages: SharedPageDirectory,
    spaces: SharedSpaceMembership,
    store: SharedPermissionStore,
}

impl GrantService {
    pub fn new(
        pages: SharedPageDirectory,
        spaces: SharedSpaceMembership,
        store: SharedPermissionStore,
    ) -> Self {
        Self {
            pages,
            spaces,
            store,
        }
    }

    /// Grant `role` on a page to the principal named by `target`.
    ///
    /// Checks run in order: page exists, target shape, no existing grant,
    /// role within the principal's space role. A duplicate that slips past
    /// the existence check is still rejected by the store.
    pub async fn grant(
        &self,
        page_id: PageId,
        role: Role,
        target: GrantTarget,
        added_by: UserId,
    ) -> GrantResult<PagePermission> {
        let page = require_page(self.pages.as_ref(), page_id).await?;
        let principal = shape_check(&target)?;

        if self
            .store
            .find_by_principal(page.id, principal)
            .await?
            .is_some()
        {
            debug!(page = %page.id, principal = %principal, "Grant already exists");
            return Err(GrantError::DuplicateGrant);
        }

        let cap = space_role_cap(self.spaces.as_ref(), principal, page.space_id).await?;
        if let Err(e) = escalation_check(role, cap) {
            warn!(page = %page.id, principal = %principal, role = %role, "Grant rejected: {}", e);
            return Err(e);
        }

        let grant = self
            .store
            .insert(NewPagePermission::for_page(&page, principal, role, added_by))
            .await?;

        info!(
            permission = %grant.id,
            page = %page.id,
            principal = %principal,
            role = %role,
            added_by = %added_by,
            "Page permission granted"
        );
        Ok(grant)
    }

    /// Change the role of an existing grant.
    ///
    /// The cap is re-resolved against the principal's current space role.
    pub async fn update_role(
        &self,
        permission_id: PermissionId,
        role: Role,
    ) -> GrantResult<PagePermission> {
        let existing = self
            .store
            .find_by_id(permission_id)
            .await?
            .ok_or(GrantError::PermissionNotFound)?;
        let page = require_page(self.pages.as_ref(), existing.page_id).await?;

        let cap = space_role_cap(self.spaces.as_ref(), existing.principal, page.space_id).await?;
        if let Err(e) = escalation_check(role, cap) {
            warn!(permission = %permission_id, role = %role, "Update rejected: {}", e);
            return Err(e);
        }

        let updated = self
            .store
            .update_role(permission_id, role)
            .await?
            .ok_or(GrantError::PermissionNotFound)?;

        info!(
            permission = %permission_id,
            from = %existing.role,
            to = %role,
            "Page permission updated"
        );
        Ok(updated)
    }

    /// Remove a grant. No escalation check applies.
    pub async fn remove(&self, permission_id: PermissionId) -> GrantResult<()> {
        self.store
            .find_by_id(permission_id)
            .await?
            .ok_or(GrantError::PermissionNotFound)?;

        if !self.store.delete(permission_id).await? {
            // Removed concurrently between lookup and delete
            return Err(GrantError::PermissionNotFound);
        }

        info!(permission = %permission_id, "Page permission removed");
        Ok(())
    }

    /// Grants on a page, oldest first
    pub async fn list_grants(
        &self,
        page_id: PageId,
        pagination: Pagination,
    ) -> GrantResult<Paginated<PagePermissionListing>> {
        let page = require_page(self.pages.as_ref(), page_id).await?;
        Ok(self.store.list_for_page(page.id, pagination).await?)
    }
}
