//! Per-install device identity.
//!
//! The identifier lives in a file inside the data directory rather than in the
//! database, so copying or resetting the database never clones an identity.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use uuid::Uuid;

use crate::error::IdentityError;

pub const IDENTITY_FILE: &str = ".identity";

/// Reads or creates the stable identifier of this install.
#[derive(Debug)]
pub struct DeviceIdentity {
    path: PathBuf,
    cached: Mutex<Option<String>>,
}

impl DeviceIdentity {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(IDENTITY_FILE),
            cached: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the device identifier, creating the identity file on first use.
    ///
    /// A file holding anything other than a valid identifier is overwritten.
    pub fn get(&self) -> Result<String, IdentityError> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let id = match fs::read_to_string(&self.path) {
            Ok(contents) if is_valid_identifier(contents.trim()) => contents.trim().to_string(),
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "invalid identity file, regenerating");
                self.create()?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.create()?,
            Err(e) => return Err(e.into()),
        };

        *cached = Some(id.clone());
        Ok(id)
    }

    /// Forgets the identifier and removes the identity file.
    pub fn reset(&self) -> Result<(), IdentityError> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *cached = None;
        Ok(())
    }

    fn create(&self) -> Result<String, IdentityError> {
        let id = Uuid::now_v7().to_string();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, &id)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        tracing::info!(device_id = %id, "created device identity");
        Ok(id)
    }
}

/// Returns true for a non-nil UUID.
pub fn is_valid_identifier(id: &str) -> bool {
    Uuid::parse_str(id).is_ok_and(|uuid| !uuid.is_nil())
}
