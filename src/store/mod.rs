//! Page grant storage
//!
//! [`PermissionStore`] is the durable record of page-level grants. Lookups
//! report "not found" as `Ok(None)`; rows that exist but cannot be decoded
//! surface as [`StoreError::Corrupt`](crate::error::StoreError::Corrupt).
//!
//! Uniqueness of `(page, principal)` is enforced by the store itself, so a
//! racing duplicate insert is rejected with
//! [`StoreError::Conflict`](crate::error::StoreError::Conflict) even when a
//! caller's pre-check passed.

pub mod pagination;
pub mod sqlite;

pub use pagination::{PageMeta, Paginated, Pagination};
pub use sqlite::SqlitePermissionStore;

use crate::access_control::{
    GroupId, NewPagePermission, PageId, PagePermission, PermissionId, Principal, Role, UserId,
};
use crate::error::StoreResult;
// async_trait required for dyn-compatibility with Arc<dyn PermissionStore>
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Display attributes of the principal behind a listed grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PrincipalSummary {
    #[serde(rename_all = "camelCase")]
    User {
        id: UserId,
        name: Option<String>,
        email: Option<String>,
        avatar_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Group {
        id: GroupId,
        name: Option<String>,
        is_default: bool,
    },
}

impl PrincipalSummary {
    pub fn principal(&self) -> Principal {
        match self {
            PrincipalSummary::User { id, .. } => Principal::User(*id),
            PrincipalSummary::Group { id, .. } => Principal::Group(*id),
        }
    }
}

/// A grant joined with its principal's display attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePermissionListing {
    pub id: PermissionId,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub principal: PrincipalSummary,
}

/// Durable record of page grants
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn find_by_id(&self, id: PermissionId) -> StoreResult<Option<PagePermission>>;

    async fn find_by_page_and_user(
        &self,
        page_id: PageId,
        user_id: UserId,
    ) -> StoreResult<Option<PagePermission>>;

    async fn find_by_page_and_group(
        &self,
        page_id: PageId,
        group_id: GroupId,
    ) -> StoreResult<Option<PagePermission>>;

    /// Look up the grant held by `principal` on a page
    async fn find_by_principal(
        &self,
        page_id: PageId,
        principal: Principal,
    ) -> StoreResult<Option<PagePermission>> {
        match principal {
            Principal::User(user_id) => self.find_by_page_and_user(page_id, user_id).await,
            Principal::Group(group_id) => self.find_by_page_and_group(page_id, group_id).await,
        }
    }

    /// Subset of `user_ids` that already hold a grant on the page
    async fn existing_user_ids(
        &self,
        page_id: PageId,
        user_ids: &[UserId],
    ) -> StoreResult<HashSet<UserId>>;

    /// Subset of `group_ids` that already hold a grant on the page
    async fn existing_group_ids(
        &self,
        page_id: PageId,
        group_ids: &[GroupId],
    ) -> StoreResult<HashSet<GroupId>>;

    async fn insert(&self, grant: NewPagePermission) -> StoreResult<PagePermission>;

    /// Insert all grants in one transaction.
    ///
    /// The returned flags line up with `grants`: `false` marks a row the
    /// uniqueness constraint rejected. Any other failure rolls back every row.
    async fn insert_many(&self, grants: &[NewPagePermission]) -> StoreResult<Vec<bool>>;

    /// Change the role of a grant, touching `updated_at`
    async fn update_role(&self, id: PermissionId, role: Role)
    -> StoreResult<Option<PagePermission>>;

    async fn delete(&self, id: PermissionId) -> StoreResult<bool>;

    /// Grants on a page ordered by creation time, oldest first
    async fn list_for_page(
        &self,
        page_id: PageId,
        pagination: Pagination,
    ) -> StoreResult<Paginated<PagePermissionListing>>;

    /// Roles a user holds on a page, directly and through group grants
    async fn user_page_roles(&self, user_id: UserId, page_id: PageId) -> StoreResult<Vec<Role>>;

    /// Remove every grant on a page
    async fn delete_for_page(&self, page_id: PageId) -> StoreResult<u64>;

    /// Remove every grant held by a user
    async fn delete_for_user(&self, user_id: UserId) -> StoreResult<u64>;

    /// Remove every grant held by a group
    async fn delete_for_group(&self, group_id: GroupId) -> StoreResult<u64>;
}

/// Shared store handle
pub type SharedPermissionStore = Arc<dyn PermissionStore>;
