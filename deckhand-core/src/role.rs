// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access level a user can hold on a deck.
///
/// Levels form a total order, `viewer < editor < owner`, with every level
/// including all weaker ones. The derived `Ord` instance is that order and is
/// what all authorization comparisons are built on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can read the deck and its cards.
    Viewer,

    /// Can read and change deck content.
    Editor,

    /// Full control, including managing roles and invites.
    Owner,
}

impl Role {
    /// Numeric rank of this role, higher meaning more access.
    pub fn rank(&self) -> u8 {
        match self {
            Role::Viewer => 1,
            Role::Editor => 2,
            Role::Owner => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Owner => "owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "viewer" => Ok(Role::Viewer),
            "editor" => Ok(Role::Editor),
            "owner" => Ok(Role::Owner),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Role string did not match any known role.
///
/// Stored role entries which fail to parse must be treated as "no role" by
/// the reader, they never grant access.
#[derive(Error, Debug)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

/// Returns `true` when `current` satisfies `required`.
///
/// `None` as `required` means there is no requirement; `None` as `current`
/// means no access at all. Unparseable role strings are dropped to `None`
/// before they reach this predicate, so the comparison fails closed. Total
/// and side-effect-free, the only comparison primitive used for authorization
/// decisions.
pub fn has_at_least(current: Option<Role>, required: Option<Role>) -> bool {
    match (current, required) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(current), Some(required)) => current >= required,
    }
}
