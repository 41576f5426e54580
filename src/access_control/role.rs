//! Role lattice
//!
//! Page and space roles share one totally ordered set:
//! `Reader < Writer < Admin`. Comparisons go through [`Role::rank`],
//! never through the role names.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A role held on a page or a space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Role {
    /// Can read the page
    Reader = 1,
    /// Can edit the page
    Writer = 2,
    /// Can edit the page and manage its permissions
    Admin = 3,
}

impl Role {
    /// Numeric rank, higher means more authority
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Get the role name as stored and serialised
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Writer => "writer",
            Role::Admin => "admin",
        }
    }

    /// Try to parse a role from its lower-case name
    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "reader" => Some(Role::Reader),
            "writer" => Some(Role::Writer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Get all roles, lowest first
    pub fn all() -> &'static [Role] {
        &[Role::Reader, Role::Writer, Role::Admin]
    }

    /// Whether this role strictly outranks `other`.
    ///
    /// An absent comparison role never blocks: `exceeds(None)` is always false.
    pub fn exceeds(self, other: Option<Role>) -> bool {
        match other {
            Some(other) => self > other,
            None => false,
        }
    }

    /// Highest role of a set, `None` for an empty set
    pub fn highest<I>(roles: I) -> Option<Role>
    where
        I: IntoIterator<Item = Role>,
    {
        roles.into_iter().max()
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a role name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::try_parse(s).ok_or_else(|| UnknownRole(s.to_string()))
    }
}
