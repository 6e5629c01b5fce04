// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of invite secrets and their BLAKE3 fingerprints.
pub const TOKEN_LEN: usize = blake3::KEY_LEN;

/// The secret capability value embedded in an invite link.
///
/// The secret is handed out exactly once when the invite is created and is
/// never persisted; records and lookups only ever carry its fingerprint.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct InviteToken([u8; TOKEN_LEN]);

impl InviteToken {
    /// Mints a fresh random secret.
    pub fn generate() -> Self {
        let mut rng = OsRng;
        Self::from_rng(&mut rng)
    }

    pub fn from_rng<R: Rng>(rng: &mut R) -> Self {
        Self(rng.r#gen())
    }

    /// BLAKE3 fingerprint stored and compared in place of the secret.
    pub fn fingerprint(&self) -> TokenHash {
        TokenHash(blake3::hash(&self.0))
    }

    /// Hex rendition for embedding the secret into an invite link.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for InviteToken {
    type Err = TokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(value)?;
        let bytes_len = bytes.len();
        let checked: [u8; TOKEN_LEN] = bytes
            .try_into()
            .map_err(|_| TokenError::InvalidLength(bytes_len, TOKEN_LEN))?;
        Ok(Self(checked))
    }
}

// Keeps the secret out of logs and panic messages.
impl fmt::Debug for InviteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InviteToken(..)")
    }
}

/// 32-byte BLAKE3 fingerprint of an invite secret.
///
/// Together with the deck id this forms the compound key invites are looked
/// up by; knowing a deck id alone is not enough to find its invites.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenHash(blake3::Hash);

impl TokenHash {
    /// Create a `TokenHash` from its raw bytes representation.
    pub const fn from_bytes(bytes: [u8; TOKEN_LEN]) -> Self {
        Self(blake3::Hash::from_bytes(bytes))
    }

    /// Bytes of the fingerprint.
    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        self.0.as_bytes()
    }

    /// Convert the fingerprint to a hex string.
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

impl From<[u8; TOKEN_LEN]> for TokenHash {
    fn from(value: [u8; TOKEN_LEN]) -> Self {
        Self(blake3::Hash::from(value))
    }
}

impl From<TokenHash> for [u8; TOKEN_LEN] {
    fn from(value: TokenHash) -> Self {
        *value.as_bytes()
    }
}

impl TryFrom<&[u8]> for TokenHash {
    type Error = TokenError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let value_len = value.len();

        let checked_value: [u8; TOKEN_LEN] = value
            .try_into()
            .map_err(|_| TokenError::InvalidLength(value_len, TOKEN_LEN))?;

        Ok(Self(blake3::Hash::from(checked_value)))
    }
}

impl FromStr for TokenHash {
    type Err = TokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::try_from(hex::decode(value)?.as_slice())
    }
}

impl PartialOrd for TokenHash {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TokenHash {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TokenHash").field(&self.to_hex()).finish()
    }
}

impl Serialize for TokenHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TokenHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Error types for token secrets and fingerprints.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Value has an invalid length.
    #[error("invalid token length {0} bytes, expected {1} bytes")]
    InvalidLength(usize, usize),

    /// Value contains invalid hexadecimal characters.
    #[error("invalid hex encoding in token string")]
    InvalidHexEncoding(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::{InviteToken, TOKEN_LEN, TokenError, TokenHash};

    #[test]
    fn fingerprint_is_deterministic() {
        let token = InviteToken::generate();
        assert_eq!(token.fingerprint(), token.fingerprint());
        assert_ne!(
            token.fingerprint(),
            InviteToken::generate().fingerprint()
        );
    }

    #[test]
    fn secret_link_roundtrip() {
        let token = InviteToken::generate();
        let from_link: InviteToken = token.to_hex().parse().unwrap();
        assert_eq!(from_link.fingerprint(), token.fingerprint());
    }

    #[test]
    fn fingerprint_hex_roundtrip() {
        let fingerprint = InviteToken::generate().fingerprint();
        let parsed: TokenHash = fingerprint.to_hex().parse().unwrap();
        assert_eq!(parsed, fingerprint);
    }

    #[test]
    fn serialize_as_hex_string() {
        let fingerprint = TokenHash::from_bytes([7; TOKEN_LEN]);
        let json = serde_json::to_string(&fingerprint).unwrap();
        assert_eq!(json, format!("\"{}\"", fingerprint.to_hex()));
        let back: TokenHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fingerprint);
    }

    #[test]
    fn invalid_length() {
        let bytes = vec![254, 100, 4, 7];
        let result: Result<TokenHash, TokenError> = bytes.as_slice().try_into();
        assert!(matches!(result, Err(TokenError::InvalidLength(4, 32))));
    }

    #[test]
    fn invalid_hex_encoding() {
        let result: Result<TokenHash, TokenError> = "notreallyahexstring".parse();
        assert!(matches!(result, Err(TokenError::InvalidHexEncoding(_))));
    }

    #[test]
    fn debug_redacts_secret() {
        let token = InviteToken::generate();
        assert_eq!(format!("{token:?}"), "InviteToken(..)");
    }
}
