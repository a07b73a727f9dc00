use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use common::Aggregate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EventStoreError, Payload};

/// Time-ordered event identifier. Appending an already recorded ID is a
/// no-op, so a log can be replayed into itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for EventId {
    type Err = EventStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| EventStoreError::InvalidEventId(s.to_string()))
    }
}

macro_rules! log_counter {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

log_counter!(
    /// Position of an event within its aggregate's stream.
    ///
    /// A stream with no events is at version 0; its first event is version 1
    /// and versions never skip.
    Version
);

log_counter!(
    /// Global position of an event in the log, assigned by the database on insert.
    Sequence
);

impl Version {
    /// Version of a stream that has no events yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Version of a stream's first event.
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        self.advance(1)
    }

    pub fn advance(&self, offset: i64) -> Self {
        Self(self.0 + offset)
    }
}

/// An event waiting to be appended: a payload bound to its target aggregate.
///
/// The version is not part of the envelope; the event manager assigns it at
/// append time.
#[derive(Debug, Clone)]
pub struct EventEnvelope<P> {
    pub id: EventId,
    pub aggregate: Aggregate,
    pub payload: P,
    /// Stamped at append time if unset.
    pub occurred_at: Option<DateTime<Utc>>,
}

impl<P: Payload> EventEnvelope<P> {
    pub fn new(aggregate: Aggregate, payload: P) -> Self {
        Self {
            id: EventId::new(),
            aggregate,
            payload,
            occurred_at: None,
        }
    }

    /// Reuses an ID recorded elsewhere, e.g. when importing a log.
    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = id;
        self
    }

    pub fn occurred_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.occurred_at = Some(timestamp);
        self
    }

    pub fn action(&self) -> &'static str {
        self.payload.action()
    }
}

/// A persisted, immutable event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    /// Monotonic across the whole log.
    pub sequence: Sequence,
    pub aggregate: Aggregate,
    /// Stream version reached by this event.
    pub version: Version,
    /// Tag identifying the payload shape.
    pub action: String,
    /// Encoded payload bytes.
    pub payload: Vec<u8>,
    pub occurred_at: DateTime<Utc>,
}

impl EventRecord {
    /// Decodes the stored payload into its concrete type.
    pub fn decode<P: Payload>(&self) -> crate::Result<P> {
        P::decode(&self.payload, &self.action)
    }
}
