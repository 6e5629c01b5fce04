// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ids::{DeckId, UserId};
use crate::role::Role;
use crate::time::Timestamp;

/// The shared resource collaborators are granted access to.
///
/// `roles` maps users to their access level; the deck owner has full access
/// whether or not they appear in it. `collaborator_ids` is a denormalized
/// membership set and always contains every non-owner key of `roles`
/// (`collaborator_ids ⊇ keys(roles) \ {owner_id}`). Content fields beyond
/// `title` live outside this crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: DeckId,
    pub owner_id: UserId,
    pub title: String,
    pub roles: BTreeMap<UserId, Role>,
    pub collaborator_ids: BTreeSet<UserId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Deck {
    /// Returns a fresh deck without any collaborators.
    pub fn new(id: DeckId, owner_id: UserId, title: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id,
            owner_id,
            title: title.into(),
            roles: BTreeMap::new(),
            collaborator_ids: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Effective role of a user on this deck.
    ///
    /// The owner holds `owner` independent of the `roles` map; a stray map
    /// entry never overrides ownership. For everyone else absence from the
    /// map means no access.
    pub fn role_of(&self, user: &UserId) -> Option<Role> {
        if *user == self.owner_id {
            return Some(Role::Owner);
        }
        self.roles.get(user).copied()
    }

    /// Records a role entry and keeps `collaborator_ids` in sync with it.
    pub fn grant_role(&mut self, user: UserId, role: Role, now: Timestamp) {
        if user != self.owner_id {
            self.collaborator_ids.insert(user.clone());
        }
        self.roles.insert(user, role);
        self.updated_at = now;
    }
}
