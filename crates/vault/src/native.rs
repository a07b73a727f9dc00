//! Adapters for the operating system clipboard.
//!
//! The system clipboard is reached through the platform's command-line tools
//! (`pbcopy`, `wl-copy`, `xclip`, ...). Each call is bounded by a timeout. When
//! no tool is found the vault degrades to [`Unavailable`].

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::ClipboardError;

/// Upper bound for a single clipboard command.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

type Result<T> = std::result::Result<T, ClipboardError>;

/// The system clipboard.
#[async_trait]
pub trait NativeClipboard: Send + Sync {
    /// Returns true if the clipboard can be used.
    fn available(&self) -> bool;

    async fn write(&self, data: &[u8]) -> Result<()>;

    async fn read(&self) -> Result<Vec<u8>>;

    async fn clear(&self) -> Result<()>;
}

/// An external program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ClipboardCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    async fn run(&self, input: Option<&[u8]>, timeout: Duration) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let program = self.program.clone();
        let run = async move {
            if let (Some(data), Some(mut stdin)) = (input, child.stdin.take()) {
                stdin.write_all(data).await?;
                stdin.shutdown().await?;
            }
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| ClipboardError::Timeout {
                program: program.clone(),
                timeout,
            })??;

        if !output.status.success() {
            return Err(ClipboardError::CommandFailed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Clipboard access through copy and paste programs.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    copy: ClipboardCommand,
    paste: ClipboardCommand,
    timeout: Duration,
}

impl CommandClipboard {
    pub fn new(copy: ClipboardCommand, paste: ClipboardCommand) -> Self {
        Self {
            copy,
            paste,
            timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Finds the first clipboard tool pair installed on this system.
    pub fn detect() -> Option<Self> {
        candidates()
            .into_iter()
            .find(|(copy, paste)| on_path(&copy.program) && on_path(&paste.program))
            .map(|(copy, paste)| Self::new(copy, paste))
    }
}

#[async_trait]
impl NativeClipboard for CommandClipboard {
    fn available(&self) -> bool {
        true
    }

    #[tracing::instrument(skip(self, data), fields(program = %self.copy.program, len = data.len()))]
    async fn write(&self, data: &[u8]) -> Result<()> {
        self.copy.run(Some(data), self.timeout).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(program = %self.paste.program))]
    async fn read(&self) -> Result<Vec<u8>> {
        self.paste.run(None, self.timeout).await
    }

    async fn clear(&self) -> Result<()> {
        self.write(&[]).await
    }
}

/// Stand-in used when no system clipboard exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

#[async_trait]
impl NativeClipboard for Unavailable {
    fn available(&self) -> bool {
        false
    }

    async fn write(&self, _data: &[u8]) -> Result<()> {
        Err(ClipboardError::Unavailable)
    }

    async fn read(&self) -> Result<Vec<u8>> {
        Err(ClipboardError::Unavailable)
    }

    async fn clear(&self) -> Result<()> {
        Err(ClipboardError::Unavailable)
    }
}

/// A process-local clipboard.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Vec<u8>>,
    fail_writes: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard whose writes always fail.
    pub fn failing() -> Self {
        Self {
            contents: Mutex::default(),
            fail_writes: true,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.contents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl NativeClipboard for MemoryClipboard {
    fn available(&self) -> bool {
        true
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(ClipboardError::CommandFailed {
                program: "memory".to_string(),
                status: "write refused".to_string(),
                stderr: String::new(),
            });
        }
        *self.contents.lock().unwrap_or_else(|e| e.into_inner()) = data.to_vec();
        Ok(())
    }

    async fn read(&self) -> Result<Vec<u8>> {
        Ok(self.contents())
    }

    async fn clear(&self) -> Result<()> {
        self.contents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }
}

/// Returns the system clipboard, or [`Unavailable`] if none is installed.
pub fn detect() -> Arc<dyn NativeClipboard> {
    match CommandClipboard::detect() {
        Some(clipboard) => {
            tracing::debug!(program = %clipboard.copy.program, "using system clipboard");
            Arc::new(clipboard)
        }
        None => {
            tracing::debug!("no system clipboard found");
            Arc::new(Unavailable)
        }
    }
}

fn candidates() -> Vec<(ClipboardCommand, ClipboardCommand)> {
    if cfg!(target_os = "macos") {
        return vec![(
            ClipboardCommand::new("pbcopy", &[]),
            ClipboardCommand::new("pbpaste", &[]),
        )];
    }

    if cfg!(windows) {
        return vec![(
            ClipboardCommand::new("clip.exe", &[]),
            ClipboardCommand::new(
                "powershell.exe",
                &["-NoProfile", "-Command", "Get-Clipboard -Raw"],
            ),
        )];
    }

    let mut found = Vec::new();
    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        found.push((
            ClipboardCommand::new("wl-copy", &[]),
            ClipboardCommand::new("wl-paste", &["--no-newline"]),
        ));
    }
    if std::env::var_os("DISPLAY").is_some() {
        found.push((
            ClipboardCommand::new("xclip", &["-selection", "clipboard", "-in"]),
            ClipboardCommand::new("xclip", &["-selection", "clipboard", "-out"]),
        ));
        found.push((
            ClipboardCommand::new("xsel", &["--clipboard", "--input"]),
            ClipboardCommand::new("xsel", &["--clipboard", "--output"]),
        ));
    }
    found
}

fn on_path(program: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir: PathBuf| dir.join(program).is_file())
}
