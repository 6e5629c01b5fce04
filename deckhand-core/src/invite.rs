// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{DeckId, InviteId, UserId};
use crate::role::Role;
use crate::time::Timestamp;
use crate::token::TokenHash;

/// Lifecycle state of an invite.
///
/// Starts `pending`; `accepted` and `revoked` are terminal and never revert.
/// Expiry is not a status, it is derived from `expires_at` at read time (see
/// [`Invite::is_expired`]), so an expired invite still carries the status it
/// had when it lapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Revoked,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Revoked => "revoked",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InviteStatus::Accepted | InviteStatus::Revoked)
    }
}

impl fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InviteStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(InviteStatus::Pending),
            "accepted" => Ok(InviteStatus::Accepted),
            "revoked" => Ok(InviteStatus::Revoked),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Status string did not match any known invite status.
#[derive(Error, Debug)]
#[error("unknown invite status {0:?}")]
pub struct UnknownStatus(pub String);

/// A redeemable, time-bounded proposal to grant a role on a deck.
///
/// `deck_id`, `token_hash` and `role_requested` are immutable once created;
/// acceptance takes `role_requested` as authoritative. The secret behind
/// `token_hash` is never part of this record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: InviteId,
    pub deck_id: DeckId,
    pub token_hash: TokenHash,
    pub role_requested: Role,
    pub status: InviteStatus,
    pub expires_at: Option<Timestamp>,
    pub accepted_by: Option<UserId>,
    pub accepted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Invite {
    /// Returns a fresh `pending` invite.
    pub fn new(
        id: InviteId,
        deck_id: DeckId,
        token_hash: TokenHash,
        role_requested: Role,
        expires_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            deck_id,
            token_hash,
            role_requested,
            status: InviteStatus::Pending,
            expires_at,
            accepted_by: None,
            accepted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// An invite past its expiry is unredeemable regardless of its status.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    /// Stamps the terminal `accepted` state.
    ///
    /// `accepted_by` and `accepted_at` are written exactly once, here.
    pub fn into_accepted(mut self, user: &UserId, now: Timestamp) -> Self {
        self.status = InviteStatus::Accepted;
        self.accepted_by = Some(user.clone());
        self.accepted_at = Some(now);
        self.updated_at = now;
        self
    }

    /// Stamps the terminal `revoked` state.
    pub fn into_revoked(mut self, now: Timestamp) -> Self {
        self.status = InviteStatus::Revoked;
        self.updated_at = now;
        self
    }
}
