//! Call identifier types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Opaque correlation token for a single requested tool call.
///
/// Providers mint their own identifiers (`call_abc123`, `toolu_01...`), so the
/// token is kept as an arbitrary non-empty string rather than a UUID. It is
/// encoded as a bare string and decoding applies the same blank check as
/// [`CallId::new`].
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CallId(String);

impl CallId {
    /// Generates a random identifier backed by a v4 UUID.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates an identifier from a provider supplied token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCallId`] if the token is empty or only whitespace.
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidCallId {
                reason: "call id cannot be empty".into(),
            });
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::random()
    }
}

impl Display for CallId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for CallId {
    fn from(value: Uuid) -> Self {
        Self(value.to_string())
    }
}

impl From<CallId> for String {
    fn from(value: CallId) -> Self {
        value.0
    }
}

impl TryFrom<String> for CallId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for CallId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_distinct() {
        assert_ne!(CallId::random(), CallId::random());
    }

    #[test]
    fn parses_provider_tokens() {
        let id = "call_abc123".parse::<CallId>().expect("parse");
        assert_eq!(id.as_str(), "call_abc123");
        assert_eq!(id.to_string(), "call_abc123");
    }

    #[test]
    fn rejects_blank_ids() {
        let err = CallId::new("  ").expect_err("blank id should fail");
        assert!(matches!(err, Error::InvalidCallId { .. }));
    }

    #[test]
    fn serializes_transparently() {
        let id = CallId::new("toolu_01").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"toolu_01\"");
        let back: CallId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn blank_ids_fail_to_decode() {
        let err = serde_json::from_str::<CallId>("\"   \"").unwrap_err();
        assert!(err.to_string().contains("call id cannot be empty"), "{err}");
        assert!(serde_json::from_str::<CallId>("\"\"").is_err());
    }
}
