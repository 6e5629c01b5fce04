// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invite redemption and collaborator role management for shared decks.
//!
//! A deck owner mints an invite carrying a proposed role and hands out a
//! secret link. Whoever presents the secret gets the role granted on the
//! deck, exactly once, through an optimistic transaction over the invite and
//! the deck. Redemption is idempotent, never lowers an existing role, and
//! stays race-safe against concurrent redemptions, revocations and role
//! changes.
//!
//! The crate is storage-agnostic over [`deckhand_store::DeckStore`]; pick the
//! in-memory backend for tests and the SQLite backend for deployments.
//!
//! ## Operations
//!
//! - [`accept_invite`] redeems a secret's fingerprint into a role entry.
//! - [`create_invite`] mints a pending invite and returns the secret once.
//! - [`revoke_invite`] withdraws a pending invite.
//! - [`invites_for_deck`] lists a deck's invites in creation order.
//! - [`policy`] holds the read/write/manage predicates the rest of an
//!   application enforces with.
//!
//! All failures surface as [`InviteError`] with a stable machine-readable
//! code per variant.
mod accept;
mod create;
mod error;
mod list;
pub mod policy;
mod revoke;

pub use accept::{AcceptRequest, Acceptance, accept_invite};
pub use create::{IssuedInvite, create_invite};
pub use error::{ArgumentError, InviteError};
pub use list::invites_for_deck;
pub use policy::{DeckAction, is_allowed};
pub use revoke::revoke_invite;
