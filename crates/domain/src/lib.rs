//! Domain payloads for the clipboard vault.
//!
//! This crate provides:
//! - [`Action`] tags identifying each payload shape in the log
//! - [`ClipboardPayload`], the closed set of mutations the vault records
//! - the projections each payload applies to the item and collection read models

pub mod action;
pub mod error;
pub mod payload;

pub use action::Action;
pub use error::{PayloadError, Result};
pub use payload::{
    BumpItem, ClipboardPayload, CreateCollection, CreateItem, DeleteCollection, DeleteItem,
    RenameCollection,
};

/// The event manager specialised to clipboard payloads.
pub type ClipboardEventManager = event_store::EventManager<ClipboardPayload>;
