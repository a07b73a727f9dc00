//! Stable tags identifying payload shapes.

use std::str::FromStr;

use event_store::EventStoreError;
use serde::{Deserialize, Serialize};

/// The kind of mutation an event records.
///
/// The string form is persisted with every event and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateItem,
    BumpItem,
    DeleteItem,
    CreateCollection,
    RenameCollection,
    DeleteCollection,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::CreateItem,
        Action::BumpItem,
        Action::DeleteItem,
        Action::CreateCollection,
        Action::RenameCollection,
        Action::DeleteCollection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateItem => "create_item",
            Action::BumpItem => "bump_item",
            Action::DeleteItem => "delete_item",
            Action::CreateCollection => "create_collection",
            Action::RenameCollection => "rename_collection",
            Action::DeleteCollection => "delete_collection",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = EventStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| EventStoreError::UnknownEventAction(s.to_string()))
    }
}
