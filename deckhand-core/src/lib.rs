// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-types for deck collaboration: decks, invites, the role lattice and
//! the capability tokens which redeem into roles.
//!
//! Everything here is plain data with validation at the parse boundary. Raw
//! strings coming from a caller or a database become typed identifiers, roles
//! and fingerprints before any protocol logic sees them; values which do not
//! parse are rejected (identifiers, tokens) or dropped to "no access" (role
//! entries), never passed through unchecked.

pub mod deck;
pub mod ids;
pub mod invite;
pub mod role;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod time;
pub mod token;

pub use deck::Deck;
pub use ids::{DeckId, IdError, InviteId, UserId};
pub use invite::{Invite, InviteStatus, UnknownStatus};
pub use role::{Role, UnknownRole, has_at_least};
pub use time::Timestamp;
pub use token::{InviteToken, TOKEN_LEN, TokenError, TokenHash};
