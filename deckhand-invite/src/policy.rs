// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declarative authorization over decks.
//!
//! Every read or write outside invite redemption is gated by one predicate,
//! [`is_allowed`], built on the same role comparison the redemption
//! transaction uses. Redemption itself is the only sanctioned path by which
//! a user raises their own role; everything here merely checks.

use deckhand_core::{Deck, Role, UserId, has_at_least};

use crate::error::InviteError;

/// Things a user can try to do to a deck.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeckAction {
    /// See the deck and its cards.
    Read,
    /// Change deck content.
    WriteCards,
    /// Change role and collaborator entries directly, or administer invites.
    ManageRoles,
}

impl DeckAction {
    /// Minimum role the action demands.
    pub fn required_role(&self) -> Role {
        match self {
            DeckAction::Read => Role::Viewer,
            DeckAction::WriteCards => Role::Editor,
            DeckAction::ManageRoles => Role::Owner,
        }
    }
}

/// Whether `user` may perform `action` on `deck`.
///
/// The user's effective role is their `roles` entry, or `owner` when they own
/// the deck. Absence of a role entry, like any unrecognized role string
/// dropped at the parse boundary, allows nothing.
pub fn is_allowed(deck: &Deck, user: &UserId, action: DeckAction) -> bool {
    has_at_least(deck.role_of(user), Some(action.required_role()))
}

pub(crate) fn ensure_allowed(
    deck: &Deck,
    user: &UserId,
    action: DeckAction,
) -> Result<(), InviteError> {
    if is_allowed(deck, user, action) {
        Ok(())
    } else {
        Err(InviteError::Forbidden)
    }
}
