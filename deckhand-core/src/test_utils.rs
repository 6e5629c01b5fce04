// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture builders shared by the store and protocol test suites.

use std::time::Duration;

use crate::deck::Deck;
use crate::ids::{DeckId, InviteId, UserId};
use crate::invite::Invite;
use crate::role::Role;
use crate::time::Timestamp;
use crate::token::InviteToken;

pub fn deck_id(value: &str) -> DeckId {
    DeckId::new(value).expect("valid deck id")
}

pub fn user_id(value: &str) -> UserId {
    UserId::new(value).expect("valid user id")
}

/// Returns a deck owned by `owner` without any collaborators.
pub fn deck(id: &str, owner: &str) -> Deck {
    Deck::new(deck_id(id), user_id(owner), "Untitled deck", Timestamp::now())
}

/// Returns a deck owned by `owner` with the given role entries.
pub fn deck_with_roles(id: &str, owner: &str, entries: &[(&str, Role)]) -> Deck {
    let mut deck = deck(id, owner);
    let now = deck.created_at;
    for (user, role) in entries {
        deck.grant_role(user_id(user), *role, now);
    }
    deck
}

/// Returns a pending invite for `deck` plus the secret that redeems it.
pub fn pending_invite(deck: &DeckId, role: Role) -> (Invite, InviteToken) {
    let token = InviteToken::generate();
    let invite = Invite::new(
        InviteId::generate(),
        deck.clone(),
        token.fingerprint(),
        role,
        None,
        Timestamp::now(),
    );
    (invite, token)
}

/// Returns an invite whose expiry already lies in the past.
pub fn expired_invite(deck: &DeckId, role: Role) -> (Invite, InviteToken) {
    let (mut invite, token) = pending_invite(deck, role);
    invite.expires_at = Some(Timestamp::now() - Duration::from_secs(3_600));
    (invite, token)
}

/// Returns an invite that has already been revoked.
pub fn revoked_invite(deck: &DeckId, role: Role) -> (Invite, InviteToken) {
    let (invite, token) = pending_invite(deck, role);
    let invite = invite.into_revoked(Timestamp::now());
    (invite, token)
}
