// SPDX-License-Identifier: MIT OR Apache-2.0

use std::ops::{Add, Sub};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
///
/// All record timestamps (`createdAt`, `updatedAt`, `expiresAt`,
/// `acceptedAt`) use this representation. Expiry is never a stored state, it
/// is decided by comparing `expiresAt` against a fresh `now` at the point of
/// the decision.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Current wall-clock time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is not behind")
            .as_millis() as u64;
        Self(millis)
    }

    pub const fn from_unix_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_unix_millis(&self) -> u64 {
        self.0
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, duration: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(duration.as_millis() as u64))
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, duration: Duration) -> Timestamp {
        Timestamp(self.0.saturating_sub(duration.as_millis() as u64))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Timestamp;

    #[test]
    fn ordering_and_arithmetic() {
        let now = Timestamp::now();
        assert!(now - Duration::from_secs(60) < now);
        assert!(now + Duration::from_secs(60) > now);
        assert_eq!(
            (now + Duration::from_secs(1)).as_unix_millis(),
            now.as_unix_millis() + 1_000
        );
    }

    #[test]
    fn serializes_as_plain_number() {
        let timestamp = Timestamp::from_unix_millis(1_700_000_000_000);
        assert_eq!(
            serde_json::to_string(&timestamp).unwrap(),
            "1700000000000"
        );
    }
}
