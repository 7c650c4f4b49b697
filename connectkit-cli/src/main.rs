//! Connectkit CLI
//!
//! Command-line driver that checks API keys against the users endpoint.
//!
//! # Usage
//!
//! ```bash
//! # List users, trying every account type and key backend
//! connectkit users --issuer-id 57246542-96fe-1a63-e053-0824d011072a \
//!     --key-id 2X9R4HXF34 --key-file AuthKey_2X9R4HXF34.p8
//!
//! # Only try the enterprise account with the native backend
//! connectkit users --account enterprise --backend native
//!
//! # Check that a key file imports
//! connectkit check-key AuthKey_2X9R4HXF34.p8
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use connectkit_core::{
    AccountContext, ApiClient, ApiCredential, ClientError, KeyBackend, import_private_key,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod config;

use config::{Overrides, UsersSettings};

#[derive(Parser)]
#[command(name = "connectkit")]
#[command(about = "Check App Store Connect style API credentials")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the team's users with the first account type and key backend that work
    Users(UsersArgs),

    /// Import a private key with each backend and report the result
    CheckKey {
        /// Path to the .p8 private key file
        path: PathBuf,
    },
}

#[derive(Args)]
struct UsersArgs {
    /// Issuer id of the API key
    #[arg(long)]
    issuer_id: Option<String>,

    /// Key id of the API key
    #[arg(long)]
    key_id: Option<String>,

    /// Path to the .p8 private key file
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Account type to try (repeatable: standard, enterprise)
    #[arg(long = "account")]
    accounts: Vec<AccountContext>,

    /// Key backend to try (repeatable: portable, native)
    #[arg(long = "backend")]
    backends: Vec<KeyBackend>,

    /// Seconds to move the token issue time into the past
    #[arg(long)]
    backdate: Option<u64>,

    /// Token lifetime in seconds
    #[arg(long)]
    expire_after: Option<u64>,

    /// Send requests to this URL instead of the account's API host
    #[arg(long)]
    base_url: Option<String>,
}

impl From<UsersArgs> for Overrides {
    fn from(args: UsersArgs) -> Self {
        Overrides {
            issuer_id: args.issuer_id,
            key_id: args.key_id,
            private_key_path: args.key_file,
            accounts: args.accounts,
            backends: args.backends,
            backdate_seconds: args.backdate,
            expire_after_seconds: args.expire_after,
            base_url: args.base_url,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref())?;
    init_logging(&config.log_level, cli.verbose);

    match &config.config_path {
        Some(path) => debug!("Loaded configuration from {:?}", path),
        None => debug!("No configuration file found, using defaults"),
    }

    match cli.command {
        Commands::Users(args) => {
            let settings = config.with_overrides(args.into()).users_settings()?;
            list_users(settings).await
        }
        Commands::CheckKey { path } => check_key(&path, &config.backends),
    }
}

fn init_logging(level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel `token` on Ctrl+C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling request...");
            token.cancel();
        }
    });
}

async fn list_users(settings: UsersSettings) -> Result<()> {
    let key_path = &settings.private_key_path;
    let pem = std::fs::read_to_string(key_path)
        .with_context(|| format!("Failed to read private key from {:?}", key_path))?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    for &account in &settings.accounts {
        for &backend in &settings.backends {
            println!("Trying {} account with {} key backend...", account, backend);

            let credential = match ApiCredential::from_pem(
                &settings.issuer_id,
                &settings.key_id,
                &pem,
                &[backend],
            ) {
                Ok(credential) => credential.into_shared(),
                Err(e) => {
                    println!("  Key import failed: {}", e);
                    continue;
                }
            };

            let mut client = ApiClient::new(account, credential)
                .with_token_parameters(settings.token_parameters);
            if let Some(base_url) = &settings.base_url {
                client = client.with_base_url(base_url.as_str());
            }

            match client.get_users(&cancel).await {
                Ok(users) => {
                    println!();
                    println!("Found {} users with the {} account:", users.len(), account);
                    for user in &users {
                        println!("  {}", user);
                    }
                    return Ok(());
                }
                Err(ClientError::Api(exception)) => {
                    println!("  {}", exception);
                    for error in exception.errors() {
                        println!("    - {}", error);
                    }
                }
                Err(ClientError::Cancelled) => bail!("cancelled"),
                Err(e) => {
                    warn!("Request with {} account failed: {}", account, e);
                    println!("  Request failed: {}", e);
                }
            }
        }
    }

    bail!("no account type and key backend combination succeeded")
}

fn check_key(path: &Path, backends: &[KeyBackend]) -> Result<()> {
    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read private key from {:?}", path))?;

    let mut imported = 0;
    for &backend in backends {
        match import_private_key(&pem, backend) {
            Ok(key) => {
                imported += 1;
                println!("{}: ok ({}, {:?})", backend, key.curve(), key.algorithm());
            }
            Err(e) => println!("{}: failed: {}", backend, e),
        }
    }

    if imported == 0 {
        bail!("no key backend could import {:?}", path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_users_flags() {
        let cli = Cli::try_parse_from([
            "connectkit",
            "users",
            "--issuer-id",
            "issuer",
            "--account",
            "enterprise",
            "--backend",
            "native",
            "--backend",
            "portable",
            "--expire-after",
            "300",
        ])
        .unwrap();

        let Commands::Users(args) = cli.command else {
            panic!("expected users command");
        };
        let overrides = Overrides::from(args);
        assert_eq!(overrides.issuer_id.as_deref(), Some("issuer"));
        assert_eq!(overrides.accounts, vec![AccountContext::Enterprise]);
        assert_eq!(overrides.backends, vec![KeyBackend::Native, KeyBackend::Portable]);
        assert_eq!(overrides.expire_after_seconds, Some(300));
        assert!(overrides.backdate_seconds.is_none());
    }

    #[test]
    fn test_rejects_unknown_account() {
        assert!(Cli::try_parse_from(["connectkit", "users", "--account", "personal"]).is_err());
    }

    #[test]
    fn test_check_key_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("AuthKey_NOPE.p8");

        assert!(check_key(&missing, KeyBackend::ALL).is_err());
    }

    #[test]
    fn test_check_key_imports_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AuthKey_TEST.p8");
        std::fs::write(
            &path,
            include_str!("../../connectkit-core/tests/fixtures/p256_pkcs8.pem"),
        )
        .unwrap();

        assert!(check_key(&path, KeyBackend::ALL).is_ok());
        assert!(check_key(&path, &[]).is_err());
    }
}
