//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Durable anonymous identifier for one installation.
///
/// Created once by an `IdentityStore` and never regenerated while local
/// persisted state survives. Treated as opaque everywhere else: ids written
/// by older installs need not be UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Generates a fresh random identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier, returning error if blank.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("client_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientIdentity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ClientIdentity {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClientIdentity> for String {
    fn from(id: ClientIdentity) -> Self {
        id.0
    }
}

/// Payment-provider checkout session identifier (e.g. `cs_test_...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutSessionId(String);

impl CheckoutSessionId {
    /// Creates a new CheckoutSessionId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("session_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckoutSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identities_are_unique() {
        let a = ClientIdentity::generate();
        let b = ClientIdentity::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_identity_is_a_uuid() {
        let id = ClientIdentity::generate();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn blank_identity_is_rejected() {
        assert!(ClientIdentity::new("").is_err());
        assert!(ClientIdentity::new("   ").is_err());
    }

    #[test]
    fn legacy_identity_format_is_accepted() {
        let id: ClientIdentity = "user_1700000000000_abc123".parse().unwrap();
        assert_eq!(id.as_str(), "user_1700000000000_abc123");
    }

    #[test]
    fn identity_deserialization_rejects_blank() {
        let result: Result<ClientIdentity, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn identity_serializes_as_plain_string() {
        let id = ClientIdentity::new("U1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"U1\"");
    }

    #[test]
    fn checkout_session_id_rejects_empty() {
        assert!(CheckoutSessionId::new("").is_err());
        assert_eq!(CheckoutSessionId::new("cs_test_1").unwrap().as_str(), "cs_test_1");
    }
}
