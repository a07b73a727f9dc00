use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AggregateError;

/// Identifier of an item or collection stream.
///
/// Wraps a time-ordered (v7) UUID so identifiers generated later sort after
/// identifiers generated earlier. The nil UUID is never a valid identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Uuid", into = "Uuid")]
pub struct AggregateId(Uuid);

impl AggregateId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates an aggregate ID from an existing UUID.
    ///
    /// Fails with [`AggregateError::InvalidAggregateId`] for the nil UUID.
    pub fn from_uuid(uuid: Uuid) -> Result<Self, AggregateError> {
        if uuid.is_nil() {
            return Err(AggregateError::InvalidAggregateId(uuid.to_string()));
        }
        Ok(Self(uuid))
    }

    /// Parses an aggregate ID from its hyphenated string form.
    pub fn parse(raw: &str) -> Result<Self, AggregateError> {
        let trimmed = raw.trim();
        let uuid = Uuid::parse_str(trimmed)
            .map_err(|_| AggregateError::InvalidAggregateId(trimmed.to_string()))?;
        Self::from_uuid(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if the identifier is non-nil.
    pub fn is_valid(&self) -> bool {
        !self.0.is_nil()
    }
}

impl Default for AggregateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for AggregateId {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Uuid> for AggregateId {
    type Error = AggregateError;

    fn try_from(uuid: Uuid) -> Result<Self, Self::Error> {
        Self::from_uuid(uuid)
    }
}

impl From<AggregateId> for Uuid {
    fn from(id: AggregateId) -> Self {
        id.0
    }
}
