//! Type-safe player identifier around [`Uuid`].
//!
//! Players are identified by the UUID the host game assigns them. The
//! identifier is the unique key of the ledger and never changes after an
//! account is created. The relational backend stores it as 16 raw bytes.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors produced when decoding a [`PlayerId`].
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// The input was not a valid UUID.
    #[error("invalid player id: {0}")]
    Invalid(#[from] uuid::Error),
}

/// Unique identifier for a player account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Create a fresh random identifier (UUID v4, as game clients use).
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }

    /// Whether this is the nil UUID, which never names a real player.
    pub const fn is_nil(self) -> bool {
        self.0.is_nil()
    }

    /// Binary encoding used by the relational backend.
    pub const fn to_bytes(self) -> [u8; 16] {
        *self.0.as_bytes()
    }

    /// Decode the 16-byte binary form.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Invalid`] if `bytes` is not exactly 16 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdError> {
        Ok(Self(Uuid::from_slice(bytes)?))
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlayerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for PlayerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<PlayerId> for Uuid {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_form_roundtrips() {
        let id = PlayerId::new();
        let decoded = PlayerId::from_slice(&id.to_bytes());
        assert_eq!(decoded.ok(), Some(id));
    }

    #[test]
    fn short_binary_form_is_rejected() {
        assert!(PlayerId::from_slice(&[0_u8; 15]).is_err());
    }

    #[test]
    fn serializes_as_plain_uuid_string() {
        let id = PlayerId::new();
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json, Some(format!("\"{id}\"")));
    }

    #[test]
    fn parse_and_display_agree() {
        let id = PlayerId::new();
        let parsed: Result<PlayerId, _> = id.to_string().parse();
        assert_eq!(parsed.ok(), Some(id));
        assert!(PlayerId::from(Uuid::nil()).is_nil());
    }
}
