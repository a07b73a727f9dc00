//! `vault copy` stores stdin, `vault paste` writes the latest item to stdout.

use std::process::ExitCode;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use vault::config::default_config_path;
use vault::{Config, CopyOptions, PasteOptions, Vault, VaultError};

const USAGE: &str = "usage: vault <copy|paste>";

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = vault::telemetry::init() {
        eprintln!("failed to initialize logging: {e}");
    }

    let Some(command) = std::env::args().nth(1) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    match run(&command).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, %command, "command failed");
            eprintln!("vault: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: &str) -> Result<ExitCode, VaultError> {
    let config = Config::load_or_default(&default_config_path()?)?;
    let vault = Vault::open(config).await?;

    let code = match command {
        "copy" => {
            let mut data = Vec::new();
            tokio::io::stdin().read_to_end(&mut data).await?;
            let id = vault.clipboard().set(&data, CopyOptions::default()).await?;
            tracing::info!(item = %id, "copied");
            ExitCode::SUCCESS
        }
        "paste" => match vault.clipboard().get(PasteOptions::default()).await? {
            Some(pasted) => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(&pasted.content).await?;
                stdout.flush().await?;
                ExitCode::SUCCESS
            }
            None => {
                tracing::info!("vault is empty");
                ExitCode::SUCCESS
            }
        },
        other => {
            eprintln!("unknown command {other:?}\n{USAGE}");
            ExitCode::from(2)
        }
    };

    vault.close().await;
    Ok(code)
}
