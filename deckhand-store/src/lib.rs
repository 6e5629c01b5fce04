// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage interface for deck collaboration.
//!
//! The [`DeckStore`] trait gives the invite protocol the two things it needs
//! from a database: plain document reads and an optimistic transaction over a
//! fixed read-set of one invite and one deck. A transaction body receives a
//! consistent [`Snapshot`], computes a [`WriteSet`] without performing any
//! side effects, and the store commits it only if neither document changed
//! since the snapshot was taken, re-running the body otherwise. All writes of
//! one commit become visible together or not at all.
//!
//! Two backends are provided: [`MemoryStore`](memory::MemoryStore) for tests
//! and single-process use, and [`SqliteStore`](sqlite::SqliteStore) for
//! persistent deployments.

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
#[cfg(test)]
mod tests;
mod traits;

pub use traits::{Contention, DeckStore, Snapshot, TransactError, WriteSet};
