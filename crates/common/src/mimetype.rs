//! Content types a clipboard item may carry.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a mimetype string is not supported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown mime type: {0:?}")]
pub struct UnknownMimeType(pub String);

/// Supported mimetypes for stored content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MimeType {
    #[default]
    TextPlain,
    ApplicationJson,
    OctetStream,
}

impl MimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::TextPlain => "text/plain",
            MimeType::ApplicationJson => "application/json",
            MimeType::OctetStream => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MimeType {
    type Err = UnknownMimeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text/plain" => Ok(MimeType::TextPlain),
            "application/json" => Ok(MimeType::ApplicationJson),
            "application/octet-stream" => Ok(MimeType::OctetStream),
            _ => Err(UnknownMimeType(s.to_string())),
        }
    }
}

impl TryFrom<String> for MimeType {
    type Error = UnknownMimeType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MimeType> for String {
    fn from(mimetype: MimeType) -> Self {
        mimetype.as_str().to_string()
    }
}
