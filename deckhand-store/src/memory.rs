// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use deckhand_core::{Deck, DeckId, Invite, InviteId, TokenHash};
use tracing::warn;

use crate::traits::{Contention, DeckStore, Snapshot, TransactError, WriteSet};

/// Optimistic commit attempts before a transaction gives up.
const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// In-memory store for tests and single-process deployments.
///
/// Every document carries a version counter. `transact` snapshots the
/// counters together with the documents and only commits while they are still
/// current, re-running its body otherwise; this mirrors the optimistic
/// transactions of the document databases the trait abstracts over. Clones
/// share the same state.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    pub(crate) state: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
pub(crate) struct State {
    decks: HashMap<DeckId, Versioned<Deck>>,
    invites: HashMap<InviteId, Versioned<Invite>>,
}

#[derive(Clone, Debug)]
struct Versioned<T> {
    version: u64,
    document: T,
}

impl State {
    pub(crate) fn put_deck(&mut self, deck: Deck) -> bool {
        match self.decks.get_mut(&deck.id) {
            Some(entry) => {
                entry.version += 1;
                entry.document = deck;
                false
            }
            None => {
                let id = deck.id.clone();
                self.decks.insert(
                    id,
                    Versioned {
                        version: 0,
                        document: deck,
                    },
                );
                true
            }
        }
    }

    pub(crate) fn put_invite(&mut self, invite: Invite) -> bool {
        match self.invites.get_mut(&invite.id) {
            Some(entry) => {
                entry.version += 1;
                entry.document = invite;
                false
            }
            None => {
                let id = invite.id.clone();
                self.invites.insert(
                    id,
                    Versioned {
                        version: 0,
                        document: invite,
                    },
                );
                true
            }
        }
    }

    fn deck_version(&self, id: &DeckId) -> Option<u64> {
        self.decks.get(id).map(|entry| entry.version)
    }

    fn invite_version(&self, id: &InviteId) -> Option<u64> {
        self.invites.get(id).map(|entry| entry.version)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().expect("state lock poisoned")
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().expect("state lock poisoned")
    }
}

impl DeckStore for MemoryStore {
    type Error = Infallible;

    async fn insert_deck(&self, deck: Deck) -> Result<bool, Self::Error> {
        Ok(self.write().put_deck(deck))
    }

    async fn deck(&self, id: &DeckId) -> Result<Option<Deck>, Self::Error> {
        let state = self.read();
        Ok(state.decks.get(id).map(|entry| entry.document.clone()))
    }

    async fn insert_invite(&self, invite: Invite) -> Result<bool, Self::Error> {
        Ok(self.write().put_invite(invite))
    }

    async fn invite(&self, id: &InviteId) -> Result<Option<Invite>, Self::Error> {
        let state = self.read();
        Ok(state.invites.get(id).map(|entry| entry.document.clone()))
    }

    async fn find_invite(
        &self,
        deck_id: &DeckId,
        token_hash: &TokenHash,
    ) -> Result<Option<Invite>, Self::Error> {
        let state = self.read();
        let matches: Vec<&Invite> = state
            .invites
            .values()
            .map(|entry| &entry.document)
            .filter(|invite| invite.deck_id == *deck_id && invite.token_hash == *token_hash)
            .collect();

        if matches.len() > 1 {
            // Unique by construction, finding more than one means the data
            // got corrupted somewhere else.
            warn!(
                deck_id = %deck_id,
                matches = matches.len(),
                "multiple invites share one token fingerprint"
            );
        }

        let first = matches
            .into_iter()
            .min_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(first.cloned())
    }

    async fn invites_for_deck(&self, deck_id: &DeckId) -> Result<Vec<Invite>, Self::Error> {
        let state = self.read();
        let mut invites: Vec<Invite> = state
            .invites
            .values()
            .map(|entry| entry.document.clone())
            .filter(|invite| invite.deck_id == *deck_id)
            .collect();
        invites.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(invites)
    }

    async fn transact<T, E, F>(
        &self,
        invite_id: &InviteId,
        deck_id: &DeckId,
        apply: F,
    ) -> Result<T, TransactError<Self::Error, E>>
    where
        F: Fn(Snapshot) -> Result<(WriteSet, T), E>,
        E: std::error::Error,
    {
        for _attempt in 0..MAX_COMMIT_ATTEMPTS {
            let (snapshot, invite_version, deck_version) = {
                let state = self.read();
                let invite = state.invites.get(invite_id);
                let deck = state.decks.get(deck_id);
                (
                    Snapshot {
                        invite: invite.map(|entry| entry.document.clone()),
                        deck: deck.map(|entry| entry.document.clone()),
                    },
                    invite.map(|entry| entry.version),
                    deck.map(|entry| entry.version),
                )
            };

            let (writes, value) = apply(snapshot).map_err(TransactError::Aborted)?;

            let mut state = self.write();
            // Commit only if neither document moved since the snapshot,
            // appearing or disappearing included.
            if state.invite_version(invite_id) != invite_version
                || state.deck_version(deck_id) != deck_version
            {
                continue;
            }
            if let Some(invite) = writes.invite {
                state.put_invite(invite);
            }
            if let Some(deck) = writes.deck {
                state.put_deck(deck);
            }
            return Ok(value);
        }

        Err(Contention {
            attempts: MAX_COMMIT_ATTEMPTS,
        }
        .into())
    }
}
