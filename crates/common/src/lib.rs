//! Shared types for the clipboard vault.
//!
//! - [`AggregateId`] and [`Aggregate`]: typed identity of an event stream
//! - [`MimeType`]: the content types an item may carry
//! - [`checksum`]: content digest used for deduplication

pub mod aggregate;
pub mod checksum;
pub mod error;
pub mod mimetype;
pub mod types;

pub use aggregate::{Aggregate, AggregateType};
pub use checksum::checksum;
pub use error::AggregateError;
pub use mimetype::{MimeType, UnknownMimeType};
pub use types::AggregateId;
