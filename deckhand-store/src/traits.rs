// SPDX-License-Identifier: MIT OR Apache-2.0

use deckhand_core::{Deck, DeckId, Invite, InviteId, TokenHash};
use thiserror::Error;

/// Consistent view of the transaction read-set: one invite and one deck, as
/// of a single snapshot.
///
/// `None` means the document did not exist at snapshot time; that absence is
/// part of what the commit check validates.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub invite: Option<Invite>,
    pub deck: Option<Deck>,
}

/// Documents a transaction body wants written at commit time.
///
/// `None` leaves a document untouched, `Some` replaces it wholesale (creating
/// it if it did not exist). An empty write-set still commits against the
/// snapshot versions, so read-only outcomes get the same consistency check as
/// mutating ones.
#[derive(Debug, Default)]
pub struct WriteSet {
    pub invite: Option<Invite>,
    pub deck: Option<Deck>,
}

/// Commit kept losing against concurrent writers and gave up after the
/// configured number of attempts.
#[derive(Error, Debug)]
#[error("transaction commit contended after {attempts} attempts")]
pub struct Contention {
    pub attempts: u32,
}

/// Error raised by [`DeckStore::transact`].
#[derive(Error, Debug)]
pub enum TransactError<S, E>
where
    S: std::error::Error,
    E: std::error::Error,
{
    /// The transaction body rejected the snapshot; nothing was written.
    #[error(transparent)]
    Aborted(E),

    /// The storage backend failed.
    #[error("storage backend error")]
    Backend(#[source] S),

    /// The optimistic retry budget is exhausted.
    #[error(transparent)]
    Contention(#[from] Contention),
}

/// Interface for storing and querying decks and invites.
///
/// Documents are independent top-level records; the only multi-document
/// guarantee a backend must provide is [`transact`](DeckStore::transact).
pub trait DeckStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Inserts or replaces a deck document.
    ///
    /// Returns `true` if the deck was new or `false` if an existing document
    /// got replaced.
    fn insert_deck(&self, deck: Deck) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Returns a deck by id.
    ///
    /// Returns `None` if no deck was found under this id.
    fn deck(&self, id: &DeckId) -> impl Future<Output = Result<Option<Deck>, Self::Error>>;

    /// Inserts or replaces an invite document.
    ///
    /// Returns `true` if the invite was new or `false` if an existing
    /// document got replaced.
    fn insert_invite(&self, invite: Invite) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Returns an invite by id.
    ///
    /// Returns `None` if no invite was found under this id.
    fn invite(&self, id: &InviteId) -> impl Future<Output = Result<Option<Invite>, Self::Error>>;

    /// Looks up an invite by its compound key.
    ///
    /// Both parts must match exactly; a deck id alone never finds an invite.
    /// The key is unique by construction. If duplicates exist anyway,
    /// implementations return the first by creation order (ties broken by
    /// invite id) and log an integrity warning rather than failing.
    fn find_invite(
        &self,
        deck_id: &DeckId,
        token_hash: &TokenHash,
    ) -> impl Future<Output = Result<Option<Invite>, Self::Error>>;

    /// Returns all invites of a deck in creation order.
    fn invites_for_deck(
        &self,
        deck_id: &DeckId,
    ) -> impl Future<Output = Result<Vec<Invite>, Self::Error>>;

    /// Runs `apply` against a consistent snapshot of one invite and one deck
    /// and commits the returned writes atomically.
    ///
    /// When the commit loses against a concurrent writer the snapshot is
    /// re-read and `apply` re-run, so the body must stay re-runnable: pure
    /// except for reading the clock, no logging of outcomes, no external side
    /// effects. An `Err` from the body aborts the transaction without
    /// writing. Exhausting the retry budget surfaces as
    /// [`TransactError::Contention`].
    fn transact<T, E, F>(
        &self,
        invite_id: &InviteId,
        deck_id: &DeckId,
        apply: F,
    ) -> impl Future<Output = Result<T, TransactError<Self::Error, E>>>
    where
        F: Fn(Snapshot) -> Result<(WriteSet, T), E>,
        E: std::error::Error;
}
