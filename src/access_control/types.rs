//! Access control types
//!
//! Identifiers, principals and the page grant record shared by the store,
//! the services and the transport.

use crate::access_control::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh, time-ordered identifier
            pub fn generate() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }
    };
}

id_type!(
    /// Identifies a page grant
    PermissionId
);
id_type!(
    /// Identifies a page
    PageId
);
id_type!(
    /// Identifies a user
    UserId
);
id_type!(
    /// Identifies a group of users
    GroupId
);
id_type!(
    /// Identifies a space (the container a page lives in)
    SpaceId
);
id_type!(
    /// Identifies a tenant workspace
    WorkspaceId
);

/// Kind of principal a grant binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Group,
}

impl PrincipalKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "user",
            PrincipalKind::Group => "group",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The holder of a grant: exactly one user or exactly one group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Principal {
    User(UserId),
    Group(GroupId),
}

impl Principal {
    pub const fn kind(&self) -> PrincipalKind {
        match self {
            Principal::User(_) => PrincipalKind::User,
            Principal::Group(_) => PrincipalKind::Group,
        }
    }

    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Principal::User(id) => Some(*id),
            Principal::Group(_) => None,
        }
    }

    pub const fn group_id(&self) -> Option<GroupId> {
        match self {
            Principal::Group(id) => Some(*id),
            Principal::User(_) => None,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::User(id) => write!(f, "user:{}", id),
            Principal::Group(id) => write!(f, "group:{}", id),
        }
    }
}

/// Unvalidated grant target as supplied by a caller.
///
/// Becomes a [`Principal`] only after
/// [`shape_check`](crate::access_control::validator::shape_check).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantTarget {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

impl GrantTarget {
    pub fn user(id: UserId) -> Self {
        Self {
            user_id: Some(id),
            group_id: None,
        }
    }

    pub fn group(id: GroupId) -> Self {
        Self {
            user_id: None,
            group_id: Some(id),
        }
    }
}

impl From<Principal> for GrantTarget {
    fn from(principal: Principal) -> Self {
        Self {
            user_id: principal.user_id(),
            group_id: principal.group_id(),
        }
    }
}

/// A page as seen by the permission engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef {
    pub id: PageId,
    pub space_id: SpaceId,
    pub workspace_id: WorkspaceId,
}

/// A persisted page grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePermission {
    pub id: PermissionId,
    pub page_id: PageId,
    pub principal: Principal,
    pub role: Role,
    pub added_by_id: Option<UserId>,
    pub workspace_id: WorkspaceId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A grant about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPagePermission {
    pub page_id: PageId,
    pub principal: Principal,
    pub role: Role,
    pub added_by_id: UserId,
    pub workspace_id: WorkspaceId,
}

impl NewPagePermission {
    /// Build a grant for `principal` on `page`, copying the page's workspace
    pub fn for_page(page: &PageRef, principal: Principal, role: Role, added_by_id: UserId) -> Self {
        Self {
            page_id: page.id,
            principal,
            role,
            added_by_id,
            workspace_id: page.workspace_id,
        }
    }
}
