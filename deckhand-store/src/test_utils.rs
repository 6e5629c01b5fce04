// SPDX-License-Identifier: MIT OR Apache-2.0

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Macro to run the same test logic against all store backend implementations.
///
/// This macro takes a closure that will be executed against each store type:
/// - In-memory store (`MemoryStore`)
/// - SQLite store (`SqliteStore`)
///
/// ## Example
///
/// ```rust
/// # use deckhand_core::test_utils::deck;
/// # use deckhand_store::DeckStore;
/// # use deckhand_store::assert_all_stores;
/// # async fn run() {
/// assert_all_stores!(|store| async {
///     let deck = deck("deck-1", "owner-1");
///     assert!(store.insert_deck(deck.clone()).await.unwrap());
///     assert_eq!(store.deck(&deck.id).await.unwrap(), Some(deck));
/// });
/// # }
/// ```
#[macro_export]
macro_rules! assert_all_stores {
    (|$store:ident| $test_body:expr) => {
        // Test with MemoryStore.
        {
            let $store = $crate::memory::MemoryStore::new();
            $test_body.await;
        }

        // Test with SqliteStore.
        {
            let $store = $crate::sqlite::SqliteStore::temporary().await;
            $test_body.await;
        }
    };
}
