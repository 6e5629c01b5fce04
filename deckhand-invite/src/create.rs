// SPDX-License-Identifier: MIT OR Apache-2.0

use deckhand_core::{DeckId, Invite, InviteId, InviteToken, Role, Timestamp, UserId};
use deckhand_store::DeckStore;
use tracing::debug;

use crate::error::InviteError;
use crate::policy::{DeckAction, ensure_allowed};

/// A freshly minted invite together with its secret.
///
/// The secret exists only here, on its way into an invite link. The store
/// keeps nothing but its fingerprint, so this value can not be recovered
/// later.
#[derive(Clone, Debug)]
pub struct IssuedInvite {
    pub invite: Invite,
    pub secret: InviteToken,
}

/// Mints a pending invite for a deck.
///
/// Owner-only. The returned [`IssuedInvite::secret`] is handed out exactly
/// once; persist the invite id if the invite needs to be revoked later.
pub async fn create_invite<S: DeckStore>(
    store: &S,
    issuer: &UserId,
    deck_id: &DeckId,
    role: Role,
    expires_at: Option<Timestamp>,
) -> Result<IssuedInvite, InviteError> {
    let deck = store
        .deck(deck_id)
        .await
        .map_err(InviteError::transient)?
        .ok_or(InviteError::NotFound)?;
    ensure_allowed(&deck, issuer, DeckAction::ManageRoles)?;

    let secret = InviteToken::generate();
    let invite = Invite::new(
        InviteId::generate(),
        deck_id.clone(),
        secret.fingerprint(),
        role,
        expires_at,
        Timestamp::now(),
    );
    store
        .insert_invite(invite.clone())
        .await
        .map_err(InviteError::transient)?;

    debug!(
        deck_id = %deck_id,
        invite_id = %invite.id,
        role = %role,
        "minted invite"
    );
    Ok(IssuedInvite { invite, secret })
}
