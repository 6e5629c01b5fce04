// SPDX-License-Identifier: MIT OR Apache-2.0

use deckhand_core::{IdError, TokenError};
use deckhand_store::TransactError;
use thiserror::Error;

/// Expected failure modes of the invite protocol.
///
/// Every variant maps onto a stable, machine-readable code (see
/// [`InviteError::code`]) which callers forward over the wire unchanged.
/// Invite-missing and deck-missing are deliberately merged into one
/// `NotFound` so responses never reveal which of the two records exists.
#[derive(Debug, Error)]
pub enum InviteError {
    /// The caller passed malformed input, no store access happened.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[source] ArgumentError),

    /// No invite matches, or its deck is gone.
    #[error("invite not found")]
    NotFound,

    /// The invite was revoked before it could be redeemed.
    #[error("invite was revoked")]
    Revoked,

    /// The invite's expiry timestamp lies in the past.
    #[error("invite link expired")]
    Expired,

    /// The actor lacks the role this operation demands.
    #[error("only the deck owner can manage invites")]
    Forbidden,

    /// The invite already reached its terminal `accepted` state.
    #[error("invite was already accepted")]
    AlreadyAccepted,

    /// The store failed or stayed contended past its retry budget. Safe to
    /// retry, acceptance is idempotent.
    #[error("storage failed transiently")]
    Transient(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl InviteError {
    /// Stable code identifying the failure independent of its message.
    pub fn code(&self) -> &'static str {
        match self {
            InviteError::InvalidArgument(_) => "invite/invalid-argument",
            InviteError::NotFound => "invite/not-found",
            InviteError::Revoked => "invite/revoked",
            InviteError::Expired => "invite/expired",
            InviteError::Forbidden => "invite/forbidden",
            InviteError::AlreadyAccepted => "invite/already-accepted",
            InviteError::Transient(_) => "invite/transient",
        }
    }

    pub(crate) fn invalid(err: impl Into<ArgumentError>) -> Self {
        InviteError::InvalidArgument(err.into())
    }

    pub(crate) fn transient(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        InviteError::Transient(Box::new(err))
    }
}

/// Reason an inbound string failed validation.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error(transparent)]
    Id(#[from] IdError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl<S> From<TransactError<S, InviteError>> for InviteError
where
    S: std::error::Error + Send + Sync + 'static,
{
    fn from(err: TransactError<S, InviteError>) -> Self {
        match err {
            // Protocol outcomes pass through unchanged.
            TransactError::Aborted(err) => err,
            TransactError::Backend(err) => InviteError::transient(err),
            TransactError::Contention(err) => InviteError::transient(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use assert_matches::assert_matches;
    use deckhand_core::IdError;
    use deckhand_store::{Contention, TransactError};

    use super::InviteError;

    #[test]
    fn codes_are_stable() {
        let exhausted: TransactError<Infallible, InviteError> =
            Contention { attempts: 5 }.into();
        let cases = [
            (
                InviteError::invalid(IdError::Empty("deck id")),
                "invite/invalid-argument",
            ),
            (InviteError::NotFound, "invite/not-found"),
            (InviteError::Revoked, "invite/revoked"),
            (InviteError::Expired, "invite/expired"),
            (InviteError::Forbidden, "invite/forbidden"),
            (InviteError::AlreadyAccepted, "invite/already-accepted"),
            (InviteError::from(exhausted), "invite/transient"),
        ];
        for (err, code) in cases {
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn aborts_pass_through_while_store_failures_collapse() {
        let aborted: TransactError<Infallible, InviteError> =
            TransactError::Aborted(InviteError::Revoked);
        assert_matches!(InviteError::from(aborted), InviteError::Revoked);

        let contended: TransactError<Infallible, InviteError> =
            Contention { attempts: 5 }.into();
        assert_matches!(InviteError::from(contended), InviteError::Transient(_));
    }
}
