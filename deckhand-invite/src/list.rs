// SPDX-License-Identifier: MIT OR Apache-2.0

use deckhand_core::{DeckId, Invite, UserId};
use deckhand_store::DeckStore;

use crate::error::InviteError;
use crate::policy::{DeckAction, ensure_allowed};

/// All invites of a deck in creation order, pending and terminal ones alike.
///
/// Owner-only, this is the management view behind "who did I invite".
pub async fn invites_for_deck<S: DeckStore>(
    store: &S,
    actor: &UserId,
    deck_id: &DeckId,
) -> Result<Vec<Invite>, InviteError> {
    let deck = store
        .deck(deck_id)
        .await
        .map_err(InviteError::transient)?
        .ok_or(InviteError::NotFound)?;
    ensure_allowed(&deck, actor, DeckAction::ManageRoles)?;

    store
        .invites_for_deck(deck_id)
        .await
        .map_err(InviteError::transient)
}
