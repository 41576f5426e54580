//! Space ability gate
//!
//! Decides whether a caller may act on page permissions of a space. Runs at
//! the transport boundary before any grant operation; the grant services
//! themselves assume the caller is authorized.

use crate::access_control::{Role, SpaceId, UserId};
use crate::directory::SharedSpaceMembership;
use crate::error::AuthError;
// async_trait required for dyn-compatibility with Arc<dyn SpaceAbility>
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// What the caller wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceAction {
    Read,
    Manage,
}

impl SpaceAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SpaceAction::Read => "read",
            SpaceAction::Manage => "manage",
        }
    }
}

impl fmt::Display for SpaceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the action applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceSubject {
    PagePermission,
}

impl SpaceSubject {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SpaceSubject::PagePermission => "page permissions",
        }
    }
}

/// Space-level authorization gate
#[async_trait]
pub trait SpaceAbility: Send + Sync {
    async fn can(
        &self,
        user_id: UserId,
        space_id: SpaceId,
        action: SpaceAction,
        subject: SpaceSubject,
    ) -> Result<bool, AuthError>;

    /// Like [`can`](Self::can) but fails with [`AuthError::Forbidden`]
    async fn authorize(
        &self,
        user_id: UserId,
        space_id: SpaceId,
        action: SpaceAction,
        subject: SpaceSubject,
    ) -> Result<(), AuthError> {
        if self.can(user_id, space_id, action, subject).await? {
            Ok(())
        } else {
            Err(AuthError::Forbidden {
                action: action.as_str(),
                subject: subject.as_str(),
            })
        }
    }
}

pub type SharedSpaceAbility = Arc<dyn SpaceAbility>;

/// Ability derived from the caller's space role.
///
/// Reading page permissions needs any role in the space. Managing them needs
/// `admin`.
pub struct RoleAbility {
    spaces: SharedSpaceMembership,
}

impl RoleAbility {
    pub fn new(spaces: SharedSpaceMembership) -> Self {
        Self { spaces }
    }

    /// Minimum space role an action needs, `None` meaning any role
    pub const fn required_role(action: SpaceAction) -> Option<Role> {
        match action {
            SpaceAction::Read => None,
            SpaceAction::Manage => Some(Role::Admin),
        }
    }
}

#[async_trait]
impl SpaceAbility for RoleAbility {
    async fn can(
        &self,
        user_id: UserId,
        space_id: SpaceId,
        action: SpaceAction,
        subject: SpaceSubject,
    ) -> Result<bool, AuthError> {
        let held = self.spaces.highest_user_space_role(user_id, space_id).await?;
        let allowed = match (held, Self::required_role(action)) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(held), Some(required)) => held >= required,
        };
        debug!(
            user = %user_id,
            space = %space_id,
            action = %action,
            subject = subject.as_str(),
            allowed,
            "Space ability checked"
        );
        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use rstest::rstest;

    #[rstest]
    #[case(None, SpaceAction::Read, false)]
    #[case(None, SpaceAction::Manage, false)]
    #[case(Some(Role::Reader), SpaceAction::Read, true)]
    #[case(Some(Role::Reader), SpaceAction::Manage, false)]
    #[case(Some(Role::Writer), SpaceAction::Manage, false)]
    #[case(Some(Role::Admin), SpaceAction::Manage, true)]
    #[tokio::test]
    async fn test_role_ability(
        #[case] held: Option<Role>,
        #[case] action: SpaceAction,
        #[case] expected: bool,
    ) {
        let directory = Arc::new(InMemoryDirectory::new());
        let (user, space) = (UserId::generate(), SpaceId::generate());
        if let Some(role) = held {
            directory.add_user_role(user, space, role);
        }

        let ability = RoleAbility::new(directory);
        let allowed = ability
            .can(user, space, action, SpaceSubject::PagePermission)
            .await
            .unwrap();
        assert_eq!(allowed, expected);
    }

    #[tokio::test]
    async fn test_authorize_forbidden() {
        let ability = RoleAbility::new(Arc::new(InMemoryDirectory::new()));
        let err = ability
            .authorize(
                UserId::generate(),
                SpaceId::generate(),
                SpaceAction::Manage,
                SpaceSubject::PagePermission,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Forbidden {
                action: "manage",
                ..
            }
        ));
    }
}
