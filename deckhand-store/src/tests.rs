// SPDX-License-Identifier: MIT OR Apache-2.0

use std::convert::Infallible;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use deckhand_core::test_utils::{deck, deck_with_roles, pending_invite, user_id};
use deckhand_core::{DeckId, InviteId, InviteStatus, Role};
use thiserror::Error;

use crate::memory::MemoryStore;
use crate::test_utils::setup_logging;
use crate::{Contention, DeckStore, TransactError, WriteSet, assert_all_stores};

#[derive(Debug, Error)]
#[error("invite can not be redeemed")]
struct Rejected;

#[tokio::test]
async fn documents_roundtrip_across_backends() {
    setup_logging();
    assert_all_stores!(|store| async {
        let deck = deck_with_roles("deck-1", "owner-1", &[("reader-1", Role::Viewer)]);
        assert!(store.insert_deck(deck.clone()).await.unwrap());
        assert_eq!(store.deck(&deck.id).await.unwrap(), Some(deck.clone()));

        let (invite, token) = pending_invite(&deck.id, Role::Editor);
        assert!(store.insert_invite(invite.clone()).await.unwrap());
        assert_eq!(
            store.invite(&invite.id).await.unwrap(),
            Some(invite.clone())
        );
        assert_eq!(
            store
                .find_invite(&deck.id, &token.fingerprint())
                .await
                .unwrap(),
            Some(invite)
        );

        let unknown = DeckId::new("deck-2").unwrap();
        assert_eq!(store.deck(&unknown).await.unwrap(), None);
        assert_eq!(
            store
                .find_invite(&unknown, &token.fingerprint())
                .await
                .unwrap(),
            None
        );
    });
}

#[tokio::test]
async fn duplicate_fingerprints_resolve_to_the_oldest_invite() {
    setup_logging();
    assert_all_stores!(|store| async {
        let deck_id = DeckId::new("deck-1").unwrap();
        let (mut first, token) = pending_invite(&deck_id, Role::Viewer);
        first.id = InviteId::new("invite-b").unwrap();
        let mut second = first.clone();
        second.id = InviteId::new("invite-a").unwrap();
        second.created_at = second.created_at + Duration::from_secs(60);

        store.insert_invite(second).await.unwrap();
        store.insert_invite(first.clone()).await.unwrap();

        // Creation order wins over insertion order and identifier order.
        let found = store
            .find_invite(&deck_id, &token.fingerprint())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);

        // Identifiers tie-break invites created in the same instant.
        let mut third = first.clone();
        third.id = InviteId::new("invite-a").unwrap();
        assert!(!store.insert_invite(third.clone()).await.unwrap());
        let found = store
            .find_invite(&deck_id, &token.fingerprint())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, third.id);
    });
}

#[tokio::test]
async fn deck_listing_follows_creation_order() {
    setup_logging();
    assert_all_stores!(|store| async {
        let deck_id = DeckId::new("deck-1").unwrap();
        for (offset, name) in [(2, "late"), (0, "early"), (1, "middle")] {
            let (mut invite, _) = pending_invite(&deck_id, Role::Viewer);
            invite.id = InviteId::new(name).unwrap();
            invite.created_at = invite.created_at + Duration::from_secs(offset);
            store.insert_invite(invite).await.unwrap();
        }

        // Invites of other decks stay out of the listing.
        let other = DeckId::new("deck-2").unwrap();
        let (stray, _) = pending_invite(&other, Role::Viewer);
        store.insert_invite(stray).await.unwrap();

        let listed: Vec<_> = store
            .invites_for_deck(&deck_id)
            .await
            .unwrap()
            .into_iter()
            .map(|invite| invite.id)
            .collect();
        assert_eq!(
            listed,
            vec![
                InviteId::new("early").unwrap(),
                InviteId::new("middle").unwrap(),
                InviteId::new("late").unwrap(),
            ]
        );
    });
}

#[tokio::test]
async fn transactions_commit_their_write_set() {
    setup_logging();
    assert_all_stores!(|store| async {
        let deck = deck("deck-1", "owner-1");
        let (invite, _) = pending_invite(&deck.id, Role::Editor);
        store.insert_deck(deck.clone()).await.unwrap();
        store.insert_invite(invite.clone()).await.unwrap();

        let user = user_id("user-1");
        let granted = store
            .transact::<_, Infallible, _>(&invite.id, &deck.id, |snapshot| {
                let invite = snapshot.invite.unwrap();
                let mut deck = snapshot.deck.unwrap();
                let now = invite.created_at + Duration::from_secs(5);
                deck.grant_role(user.clone(), invite.role_requested, now);
                let accepted = invite.into_accepted(&user, now);
                Ok((
                    WriteSet {
                        invite: Some(accepted),
                        deck: Some(deck),
                    },
                    true,
                ))
            })
            .await
            .unwrap();
        assert!(granted);

        let stored = store.invite(&invite.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InviteStatus::Accepted);
        assert_eq!(stored.accepted_by, Some(user.clone()));

        let stored = store.deck(&deck.id).await.unwrap().unwrap();
        assert_eq!(stored.role_of(&user), Some(Role::Editor));
        assert!(stored.collaborator_ids.contains(&user));
    });
}

#[tokio::test]
async fn aborted_transactions_write_nothing() {
    setup_logging();
    assert_all_stores!(|store| async {
        let deck = deck("deck-1", "owner-1");
        let (invite, _) = pending_invite(&deck.id, Role::Editor);
        store.insert_deck(deck.clone()).await.unwrap();
        store.insert_invite(invite.clone()).await.unwrap();

        let result = store
            .transact::<bool, Rejected, _>(&invite.id, &deck.id, |_snapshot| Err(Rejected))
            .await;

        assert!(matches!(result, Err(TransactError::Aborted(Rejected))));
        let stored = store.invite(&invite.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InviteStatus::Pending);
    });
}

#[tokio::test]
async fn transactions_observe_and_create_missing_documents() {
    setup_logging();
    assert_all_stores!(|store| async {
        let deck_id = DeckId::new("deck-1").unwrap();
        let (invite, _) = pending_invite(&deck_id, Role::Viewer);

        let was_missing = store
            .transact::<_, Infallible, _>(&invite.id, &deck_id, |snapshot| {
                let missing = snapshot.invite.is_none() && snapshot.deck.is_none();
                Ok((
                    WriteSet {
                        invite: Some(invite.clone()),
                        deck: None,
                    },
                    missing,
                ))
            })
            .await
            .unwrap();

        assert!(was_missing);
        assert_eq!(
            store.invite(&invite.id).await.unwrap(),
            Some(invite.clone())
        );
    });
}

#[tokio::test]
async fn commits_retry_after_losing_to_a_concurrent_writer() {
    setup_logging();
    let store = MemoryStore::new();
    let deck = deck("deck-1", "owner-1");
    let (invite, _) = pending_invite(&deck.id, Role::Editor);
    store.insert_deck(deck.clone()).await.unwrap();
    store.insert_invite(invite.clone()).await.unwrap();

    let runs = AtomicU32::new(0);
    let observed = store
        .transact::<_, Infallible, _>(&invite.id, &deck.id, |snapshot| {
            let seen = snapshot.invite.unwrap();
            if runs.fetch_add(1, Ordering::SeqCst) == 0 {
                // A competing writer lands between snapshot and commit.
                let mut competing = seen.clone();
                competing.role_requested = Role::Viewer;
                store.write().put_invite(competing);
            }
            Ok((WriteSet::default(), seen.role_requested))
        })
        .await
        .unwrap();

    // The body ran once against the stale snapshot and once against the
    // committed state.
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(observed, Role::Viewer);
}

#[tokio::test]
async fn exhausted_retries_surface_as_contention() {
    setup_logging();
    let store = MemoryStore::new();
    let deck = deck("deck-1", "owner-1");
    let (invite, _) = pending_invite(&deck.id, Role::Editor);
    store.insert_deck(deck.clone()).await.unwrap();
    store.insert_invite(invite.clone()).await.unwrap();

    let runs = AtomicU32::new(0);
    let result = store
        .transact::<(), Infallible, _>(&invite.id, &deck.id, |snapshot| {
            runs.fetch_add(1, Ordering::SeqCst);
            // Every attempt loses against this writer.
            store.write().put_invite(snapshot.invite.unwrap());
            Ok((WriteSet::default(), ()))
        })
        .await;

    match result {
        Err(TransactError::Contention(Contention { attempts })) => {
            assert_eq!(attempts, runs.load(Ordering::SeqCst));
        }
        other => panic!("expected contention, got {other:?}"),
    }
}
