// SPDX-License-Identifier: MIT OR Apache-2.0

use deckhand_core::{DeckId, InviteId, InviteStatus, Timestamp, UserId};
use deckhand_store::{DeckStore, Snapshot, WriteSet};
use tracing::debug;

use crate::error::InviteError;
use crate::policy::{DeckAction, ensure_allowed};

/// Withdraws a pending invite so its link stops working.
///
/// Owner-only. Revoking an invite that is already revoked is idempotent
/// success; revoking one that was accepted in the meantime fails with
/// [`InviteError::AlreadyAccepted`], terminal states never revert. Runs
/// inside the same optimistic transaction as redemption, so a race between
/// the two resolves by whichever commits first.
pub async fn revoke_invite<S: DeckStore>(
    store: &S,
    actor: &UserId,
    deck_id: &DeckId,
    invite_id: &InviteId,
) -> Result<(), InviteError> {
    let now = Timestamp::now();
    store
        .transact(invite_id, deck_id, |snapshot| revoke(snapshot, actor, now))
        .await?;

    debug!(deck_id = %deck_id, invite_id = %invite_id, "revoked invite");
    Ok(())
}

fn revoke(
    snapshot: Snapshot,
    actor: &UserId,
    now: Timestamp,
) -> Result<(WriteSet, ()), InviteError> {
    let deck = snapshot.deck.ok_or(InviteError::NotFound)?;
    ensure_allowed(&deck, actor, DeckAction::ManageRoles)?;

    let invite = snapshot.invite.ok_or(InviteError::NotFound)?;
    // The invite id and deck id arrive independently from the caller; an
    // invite of some other deck must stay invisible here.
    if invite.deck_id != deck.id {
        return Err(InviteError::NotFound);
    }

    match invite.status {
        InviteStatus::Revoked => Ok((WriteSet::default(), ())),
        InviteStatus::Accepted => Err(InviteError::AlreadyAccepted),
        InviteStatus::Pending => {
            let invite = invite.into_revoked(now);
            Ok((
                WriteSet {
                    invite: Some(invite),
                    deck: None,
                },
                (),
            ))
        }
    }
}
