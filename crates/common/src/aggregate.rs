//! Typed identity of an event stream.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AggregateError, AggregateId};

/// The kinds of entity an event stream can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateType {
    /// A single clipboard item.
    Item,
    /// A named collection of items.
    Collection,
}

impl AggregateType {
    /// Returns the stable tag stored alongside every event.
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateType::Item => "item",
            AggregateType::Collection => "collection",
        }
    }
}

impl std::fmt::Display for AggregateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateType {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "item" => Ok(AggregateType::Item),
            "collection" => Ok(AggregateType::Collection),
            other => Err(AggregateError::InvalidAggregateType(other.to_string())),
        }
    }
}

/// A typed, globally unique stream identifier.
///
/// An aggregate names a stream of events, not a stored row. Its string form is
/// `type:id`, e.g. `item:0190f5c2-...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Aggregate {
    aggregate_type: AggregateType,
    id: AggregateId,
}

impl Aggregate {
    /// Creates an aggregate of the given type with a freshly generated ID.
    pub fn new(aggregate_type: AggregateType) -> Self {
        Self {
            aggregate_type,
            id: AggregateId::new(),
        }
    }

    /// Wraps an existing raw identifier after validating it.
    pub fn with_id(aggregate_type: AggregateType, raw_id: &str) -> Result<Self, AggregateError> {
        Ok(Self {
            aggregate_type,
            id: AggregateId::parse(raw_id)?,
        })
    }

    /// Builds an aggregate from an already validated identifier.
    pub fn from_parts(aggregate_type: AggregateType, id: AggregateId) -> Self {
        Self { aggregate_type, id }
    }

    /// Parses the `type:id` string form.
    pub fn parse(s: &str) -> Result<Self, AggregateError> {
        let (raw_type, raw_id) = s
            .split_once(':')
            .ok_or_else(|| AggregateError::InvalidAggregateString(s.to_string()))?;

        let aggregate_type = raw_type.parse()?;
        Self::with_id(aggregate_type, raw_id)
    }

    /// Returns the aggregate type.
    pub fn aggregate_type(&self) -> AggregateType {
        self.aggregate_type
    }

    /// Returns the aggregate ID.
    pub fn id(&self) -> AggregateId {
        self.id
    }

    /// Returns true when the ID is non-nil.
    ///
    /// The type is always valid because it is a closed enum.
    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }
}

impl std::fmt::Display for Aggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.aggregate_type, self.id)
    }
}

impl FromStr for Aggregate {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Aggregate {
    type Error = AggregateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Aggregate> for String {
    fn from(aggregate: Aggregate) -> Self {
        aggregate.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_valid_aggregate() {
        let aggregate = Aggregate::new(AggregateType::Item);
        assert!(aggregate.is_valid());
        assert_eq!(aggregate.aggregate_type(), AggregateType::Item);
    }

    #[test]
    fn string_form_roundtrips() {
        let aggregate = Aggregate::new(AggregateType::Collection);
        let rendered = aggregate.to_string();
        assert!(rendered.starts_with("collection:"));

        let parsed = Aggregate::parse(&rendered).unwrap();
        assert_eq!(parsed, aggregate);
    }

    #[test]
    fn parse_trims_parts() {
        let id = AggregateId::new();
        let parsed = Aggregate::parse(&format!(" item : {id} ")).unwrap();
        assert_eq!(parsed.id(), id);
        assert_eq!(parsed.aggregate_type(), AggregateType::Item);
    }

    #[test]
    fn parse_rejects_unknown_type() {
        let id = AggregateId::new();
        let result = Aggregate::parse(&format!("clip:{id}"));
        assert_eq!(
            result,
            Err(AggregateError::InvalidAggregateType("clip".to_string()))
        );
    }

    #[test]
    fn parse_rejects_missing_separator() {
        let result = Aggregate::parse("item");
        assert!(matches!(
            result,
            Err(AggregateError::InvalidAggregateString(_))
        ));
    }

    #[test]
    fn with_id_rejects_zero_and_malformed_ids() {
        let zero = Aggregate::with_id(
            AggregateType::Item,
            "00000000-0000-0000-0000-000000000000",
        );
        assert!(matches!(zero, Err(AggregateError::InvalidAggregateId(_))));

        let malformed = Aggregate::with_id(AggregateType::Item, "12345");
        assert!(matches!(malformed, Err(AggregateError::InvalidAggregateId(_))));
    }

    #[test]
    fn serializes_as_string() {
        let aggregate = Aggregate::new(AggregateType::Item);
        let json = serde_json::to_string(&aggregate).unwrap();
        assert_eq!(json, format!("\"{aggregate}\""));

        let back: Aggregate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, aggregate);
    }
}
