use crate::Version;

/// Concurrency check applied by [`EventManager::apply_n`](crate::EventManager::apply_n).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOptions {
    /// The stream must be at exactly this version before the append.
    /// `None` appends unconditionally.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// Last writer wins.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// The stream must not have any events yet.
    pub fn expect_new() -> Self {
        Self::expect_version(Version::initial())
    }

    /// Builds options from a raw expected version where any negative value
    /// disables the check.
    pub fn from_raw(expected_version: i64) -> Self {
        if expected_version >= 0 {
            Self::expect_version(Version::new(expected_version))
        } else {
            Self::new()
        }
    }
}
