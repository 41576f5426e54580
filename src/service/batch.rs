//! Batch grant pipeline
//!
//! Grants one role to many users and groups on a single page. Once the
//! request itself is valid the batch never fails per item: candidates that
//! already hold a grant or whose space role is below the requested role are
//! skipped and reported in the outcome. Only a storage fault aborts.

use crate::access_control::{
    GroupId, NewPagePermission, PageId, PageRef, Principal, PrincipalKind, Role, UserId,
    batch_size_check, escalation_check,
};
use crate::directory::{SharedPageDirectory, SharedSpaceMembership};
use crate::error::{GrantError, GrantResult};
use crate::service::{require_page, space_role_cap};
use crate::store::SharedPermissionStore;
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hash;
use tracing::{debug, info};

/// What happened to one candidate of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BatchStatus {
    Added,
    AlreadyGranted,
    ExceedsSpaceRole { cap: Role },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchEntry {
    pub principal: Principal,
    #[serde(flatten)]
    pub status: BatchStatus,
}

/// Result of a batch grant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Number of grants actually written
    pub added: usize,
    /// One entry per distinct candidate, users first, in request order
    pub entries: Vec<BatchEntry>,
}

impl BatchOutcome {
    pub fn added_principals(&self) -> impl Iterator<Item = Principal> + '_ {
        self.entries
            .iter()
            .filter(|e| e.status == BatchStatus::Added)
            .map(|e| e.principal)
    }

    pub fn count(&self, status: BatchStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }
}

/// Keep the first occurrence of every id
fn dedup_first<T: Copy + Eq + Hash>(ids: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Grants a role to many principals at once
#[derive(Clone)]
pub struct BatchGrantService {
    pages: SharedPageDirectory,
    spaces: SharedSpaceMembership,
    store: SharedPermissionStore,
    max_batch_size: usize,
}

impl BatchGrantService {
    pub fn new(
        pages: SharedPageDirectory,
        spaces: SharedSpaceMembership,
        store: SharedPermissionStore,
        max_batch_size: usize,
    ) -> Self {
        Self {
            pages,
            spaces,
            store,
            max_batch_size,
        }
    }

    pub async fn grant_batch(
        &self,
        page_id: PageId,
        role: Role,
        user_ids: &[UserId],
        group_ids: &[GroupId],
        added_by: UserId,
    ) -> GrantResult<BatchOutcome> {
        let page = require_page(self.pages.as_ref(), page_id).await?;

        if user_ids.is_empty() && group_ids.is_empty() {
            return Err(GrantError::EmptyBatch);
        }
        batch_size_check(PrincipalKind::User, user_ids.len(), self.max_batch_size)?;
        batch_size_check(PrincipalKind::Group, group_ids.len(), self.max_batch_size)?;

        let user_ids = dedup_first(user_ids);
        let group_ids = dedup_first(group_ids);

        let existing_users = if user_ids.is_empty() {
            HashSet::new()
        } else {
            self.store.existing_user_ids(page.id, &user_ids).await?
        };
        let existing_groups = if group_ids.is_empty() {
            HashSet::new()
        } else {
            self.store.existing_group_ids(page.id, &group_ids).await?
        };

        let candidates: Vec<(Principal, bool)> = user_ids
            .iter()
            .map(|id| (Principal::User(*id), existing_users.contains(id)))
            .chain(
                group_ids
                    .iter()
                    .map(|id| (Principal::Group(*id), existing_groups.contains(id))),
            )
            .collect();

        let mut entries = self.screen(&page, role, &candidates).await?;

        let pending: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.status == BatchStatus::Added)
            .map(|(i, _)| i)
            .collect();

        let grants: Vec<NewPagePermission> = pending
            .iter()
            .map(|&i| NewPagePermission::for_page(&page, entries[i].principal, role, added_by))
            .collect();

        let inserted = if grants.is_empty() {
            Vec::new()
        } else {
            self.store.insert_many(&grants).await?
        };

        for (&i, written) in pending.iter().zip(inserted) {
            if !written {
                debug!(principal = %entries[i].principal, "Granted concurrently, skipping");
                entries[i].status = BatchStatus::AlreadyGranted;
            }
        }

        let outcome = BatchOutcome {
            added: entries
                .iter()
                .filter(|e| e.status == BatchStatus::Added)
                .count(),
            entries,
        };

        info!(
            page = %page.id,
            role = %role,
            added = outcome.added,
            already_granted = outcome.count(BatchStatus::AlreadyGranted),
            candidates = outcome.entries.len(),
            added_by = %added_by,
            "Batch page permissions granted"
        );
        Ok(outcome)
    }

    /// Decide each candidate's provisional status.
    ///
    /// Space role lookups for the candidates that are not already granted
    /// run concurrently.
    async fn screen(
        &self,
        page: &PageRef,
        role: Role,
        candidates: &[(Principal, bool)],
    ) -> GrantResult<Vec<BatchEntry>> {
        let lookups = candidates.iter().map(|&(principal, exists)| async move {
            if exists {
                return Ok(BatchEntry {
                    principal,
                    status: BatchStatus::AlreadyGranted,
                });
            }
            let cap = space_role_cap(self.spaces.as_ref(), principal, page.space_id).await?;
            let status = match (escalation_check(role, cap), cap) {
                (Err(_), Some(cap)) => {
                    debug!(principal = %principal, cap = %cap, "Exceeds space role, skipping");
                    BatchStatus::ExceedsSpaceRole { cap }
                }
                _ => BatchStatus::Added,
            };
            Ok::<_, GrantError>(BatchEntry { principal, status })
        });

        try_join_all(lookups).await
    }
}
