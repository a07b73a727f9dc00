//! Collection name rules and collision suffixing.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{RepositoryError, Result};

/// Highest counter tried when suffixing a taken name.
pub const MAX_NAME_SUFFIX: u16 = 999;

static COLLECTION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9 _-]{1,50}$").expect("valid collection name regex"));

/// Trims `name` and checks it against the collection name rule.
///
/// Returns the trimmed name.
pub fn validate_collection_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if COLLECTION_NAME_RE.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(RepositoryError::InvalidCollectionName(name.to_string()))
    }
}

/// Formats the `n`th collision candidate for `name`, e.g. `Notes 001`.
pub fn suffixed_name(name: &str, n: u16) -> String {
    format!("{name} {n:03}")
}

/// Candidate names in the order they are tried: the name itself, then
/// `name 001` up to `name 999`.
pub fn name_candidates(name: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(name.to_string())
        .chain((1..=MAX_NAME_SUFFIX).map(move |n| suffixed_name(name, n)))
}
