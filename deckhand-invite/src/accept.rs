// SPDX-License-Identifier: MIT OR Apache-2.0

use deckhand_core::{
    DeckId, Invite, InviteStatus, Role, Timestamp, TokenHash, UserId, has_at_least,
};
use deckhand_store::{DeckStore, Snapshot, WriteSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InviteError;

/// Inbound redemption request, raw strings as they arrive from the caller.
///
/// `uid` is the pre-authenticated caller identity, never taken from the
/// request body of an untrusted client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequest {
    pub deck_id: String,
    pub token_hash: String,
    pub uid: String,
}

impl AcceptRequest {
    pub fn new(
        deck_id: impl Into<String>,
        token_hash: impl Into<String>,
        uid: impl Into<String>,
    ) -> Self {
        Self {
            deck_id: deck_id.into(),
            token_hash: token_hash.into(),
            uid: uid.into(),
        }
    }
}

/// Successful redemption outcome.
///
/// "Already a member" is success, not an error: the caller holds a valid
/// invite and ends up with at least the role it proposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Acceptance {
    /// A role entry was written for the caller.
    pub granted: bool,
    /// The role that was written, when one was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_granted: Option<Role>,
    /// The caller already held the proposed role or better.
    pub already_member: bool,
}

/// Redeems an invite and grants the proposed role on the deck, exactly once.
///
/// Runs in two phases. The fast path resolves the invite by its
/// `(deck_id, token_hash)` key and rejects invites which can not possibly be
/// redeemed, without paying for a transaction. The authoritative phase
/// re-validates everything inside one optimistic transaction over the invite
/// and the deck, so a concurrent revocation, expiry change or competing
/// redemption is either observed or retried against. No partial outcome is
/// ever observable.
///
/// Accepting the same invite twice for the same user is idempotent, and an
/// existing role entry of equal or higher rank is never lowered.
pub async fn accept_invite<S: DeckStore>(
    store: &S,
    request: AcceptRequest,
) -> Result<Acceptance, InviteError> {
    let deck_id: DeckId = request.deck_id.parse().map_err(InviteError::invalid)?;
    let token_hash: TokenHash = request.token_hash.parse().map_err(InviteError::invalid)?;
    let uid: UserId = request.uid.parse().map_err(InviteError::invalid)?;

    // Phase 1. Advisory only, everything is checked again on the
    // transaction's own snapshot.
    let candidate = store
        .find_invite(&deck_id, &token_hash)
        .await
        .map_err(InviteError::transient)?
        .ok_or(InviteError::NotFound)?;
    check_lifecycle(&candidate, Timestamp::now())?;

    // Phase 2. The body is a pure function of the snapshot, safe to re-run
    // however many times the commit loses.
    let invite_id = candidate.id;
    let now = Timestamp::now();
    let acceptance = store
        .transact(&invite_id, &deck_id, |snapshot| redeem(snapshot, &uid, now))
        .await?;

    if let Some(role) = acceptance.role_granted {
        debug!(
            deck_id = %deck_id,
            invite_id = %invite_id,
            user_id = %uid,
            role = %role,
            "invite redeemed, role granted"
        );
    }
    Ok(acceptance)
}

/// Rejects invites which are past redemption.
///
/// Revocation is checked before expiry, a revoked invite reports `Revoked` no
/// matter what its expiry timestamp says.
fn check_lifecycle(invite: &Invite, now: Timestamp) -> Result<(), InviteError> {
    if invite.status == InviteStatus::Revoked {
        return Err(InviteError::Revoked);
    }
    if invite.is_expired(now) {
        return Err(InviteError::Expired);
    }
    Ok(())
}

/// Decides the redemption against one consistent snapshot.
fn redeem(
    snapshot: Snapshot,
    uid: &UserId,
    now: Timestamp,
) -> Result<(WriteSet, Acceptance), InviteError> {
    let invite = snapshot.invite.ok_or(InviteError::NotFound)?;
    check_lifecycle(&invite, now)?;

    // A missing deck reads exactly like a missing invite, deck existence is
    // not revealed through this endpoint.
    let Some(mut deck) = snapshot.deck else {
        return Err(InviteError::NotFound);
    };

    // Someone already redeemed this invite, possibly this very caller a
    // moment ago. Nothing left to write.
    if invite.status == InviteStatus::Accepted {
        return Ok((
            WriteSet::default(),
            Acceptance {
                granted: false,
                role_granted: None,
                already_member: true,
            },
        ));
    }

    // An equal or higher role is left untouched, acceptance never lowers a
    // role entry. The invite still reaches its terminal state.
    if has_at_least(deck.role_of(uid), Some(invite.role_requested)) {
        let invite = invite.into_accepted(uid, now);
        return Ok((
            WriteSet {
                invite: Some(invite),
                deck: None,
            },
            Acceptance {
                granted: false,
                role_granted: None,
                already_member: true,
            },
        ));
    }

    let role = invite.role_requested;
    deck.grant_role(uid.clone(), role, now);
    let invite = invite.into_accepted(uid, now);
    Ok((
        WriteSet {
            invite: Some(invite),
            deck: Some(deck),
        },
        Acceptance {
            granted: true,
            role_granted: Some(role),
            already_member: false,
        },
    ))
}
