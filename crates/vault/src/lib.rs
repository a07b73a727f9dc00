//! Event-sourced clipboard vault.
//!
//! Every copy, paste-and-delete and collection change is recorded as an event
//! and projected into the item and collection read models in the same
//! transaction.
//!
//! ```no_run
//! # async fn run() -> vault::Result<()> {
//! use vault::{Config, CopyOptions, PasteOptions, Vault};
//!
//! let vault = Vault::open(Config::default()).await?;
//! vault.clipboard().set(b"hello", CopyOptions::default()).await?;
//! let pasted = vault.clipboard().get(PasteOptions::default()).await?;
//! assert_eq!(pasted.map(|p| p.content), Some(b"hello".to_vec()));
//! # Ok(())
//! # }
//! ```

pub mod clipboard;
pub mod collections;
pub mod config;
pub mod error;
pub mod identity;
pub mod native;
pub mod telemetry;

use std::sync::Arc;

use domain::ClipboardEventManager;
use event_store::database;
use projections::Repository;
use sqlx::SqlitePool;

pub use clipboard::{Clipboard, CopyOptions, PasteOptions, PasteResult};
pub use collections::{CreatedCollection, Collections};
pub use config::Config;
pub use error::{ClipboardError, ConfigError, IdentityError, Result, VaultError};
pub use identity::DeviceIdentity;
pub use native::{CommandClipboard, MemoryClipboard, NativeClipboard, Unavailable};

/// An open vault: storage, system clipboard and device identity.
pub struct Vault {
    config: Config,
    manager: ClipboardEventManager,
    native: Arc<dyn NativeClipboard>,
    identity: DeviceIdentity,
}

impl Vault {
    /// Opens the vault in `config.data_dir`, creating and migrating it if needed.
    #[tracing::instrument(skip(config), fields(data_dir = %config.data_dir.display()))]
    pub async fn open(config: Config) -> Result<Self> {
        config.ensure_data_dir()?;
        let pool = database::connect(&config.data_dir).await?;
        Ok(Self::with_parts(config, pool, native::detect()))
    }

    /// Assembles a vault from an already migrated pool and a clipboard adapter.
    pub fn with_parts(config: Config, pool: SqlitePool, native: Arc<dyn NativeClipboard>) -> Self {
        let identity = DeviceIdentity::new(&config.data_dir);
        let manager = ClipboardEventManager::new(pool, Arc::new(Repository::sqlite()));
        Self {
            config,
            manager,
            native,
            identity,
        }
    }

    pub fn clipboard(&self) -> Clipboard<'_> {
        Clipboard::new(self)
    }

    pub fn collections(&self) -> Collections<'_> {
        Collections::new(self)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &ClipboardEventManager {
        &self.manager
    }

    pub fn native(&self) -> &dyn NativeClipboard {
        self.native.as_ref()
    }

    pub(crate) fn repository(&self) -> &Repository {
        self.manager.repository()
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        self.manager.pool()
    }

    /// Returns this install's stable identifier.
    pub fn device_id(&self) -> Result<String> {
        Ok(self.identity.get()?)
    }

    /// Rebuilds the read models from the event log.
    pub async fn rebuild(&self) -> Result<u64> {
        Ok(self.manager.rebuild_projections().await?)
    }

    /// Closes the database pool.
    pub async fn close(self) {
        self.manager.pool().close().await;
    }

    /// Closes the vault and deletes its data directory, identity included.
    #[tracing::instrument(skip(self), fields(data_dir = %self.config.data_dir.display()))]
    pub async fn reset(self) -> Result<()> {
        self.manager.pool().close().await;
        self.identity.reset()?;
        match std::fs::remove_dir_all(&self.config.data_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!("vault reset");
        Ok(())
    }
}
