//! CLI configuration handling.

use anyhow::{Context, Result, bail};
use connectkit_core::{AccountContext, KeyBackend, TokenParameters};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "connectkit.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Issuer id shown next to the API keys in the developer portal.
    pub issuer_id: Option<String>,

    /// Key id of the private key.
    pub key_id: Option<String>,

    /// Path to the `.p8` private key file.
    pub private_key_path: Option<PathBuf>,

    /// Account contexts to try, in order.
    pub accounts: Vec<AccountContext>,

    /// Key backends to try, in order.
    pub backends: Vec<KeyBackend>,

    /// Logging level.
    pub log_level: String,

    /// Send requests here instead of the account's API host.
    pub base_url: Option<String>,

    /// Token timing.
    pub token: TokenConfig,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            issuer_id: None,
            key_id: None,
            private_key_path: None,
            accounts: AccountContext::ALL.to_vec(),
            backends: KeyBackend::ALL.to_vec(),
            log_level: default_log_level(),
            base_url: None,
            token: TokenConfig::default(),
            config_path: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Token timing as written in the config file.
///
/// Defaults to no backdating and a two minute lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub backdate_seconds: u64,
    pub expire_after_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            backdate_seconds: 0,
            expire_after_seconds: 120,
        }
    }
}

/// Values given on the command line. Each one replaces the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub issuer_id: Option<String>,
    pub key_id: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub accounts: Vec<AccountContext>,
    pub backends: Vec<KeyBackend>,
    pub backdate_seconds: Option<u64>,
    pub expire_after_seconds: Option<u64>,
    pub base_url: Option<String>,
}

/// Everything needed to list users.
#[derive(Debug, Clone)]
pub struct UsersSettings {
    pub issuer_id: String,
    pub key_id: String,
    pub private_key_path: PathBuf,
    pub accounts: Vec<AccountContext>,
    pub backends: Vec<KeyBackend>,
    pub token_parameters: TokenParameters,
    pub base_url: Option<String>,
}

impl CliConfig {
    /// Apply command-line overrides on top of the file values.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.issuer_id.is_some() {
            self.issuer_id = overrides.issuer_id;
        }
        if overrides.key_id.is_some() {
            self.key_id = overrides.key_id;
        }
        if overrides.private_key_path.is_some() {
            self.private_key_path = overrides.private_key_path;
        }
        if !overrides.accounts.is_empty() {
            self.accounts = overrides.accounts;
        }
        if !overrides.backends.is_empty() {
            self.backends = overrides.backends;
        }
        if let Some(backdate) = overrides.backdate_seconds {
            self.token.backdate_seconds = backdate;
        }
        if let Some(expire_after) = overrides.expire_after_seconds {
            self.token.expire_after_seconds = expire_after;
        }
        if overrides.base_url.is_some() {
            self.base_url = overrides.base_url;
        }
        self
    }

    /// Validate the merged configuration.
    pub fn users_settings(&self) -> Result<UsersSettings> {
        let issuer_id = required(&self.issuer_id, "issuer_id", "--issuer-id")?;
        let key_id = required(&self.key_id, "key_id", "--key-id")?;
        let Some(private_key_path) = self.private_key_path.clone() else {
            bail!("missing private_key_path (set it in the config file or pass --key-file)");
        };

        if self.accounts.is_empty() {
            bail!("at least one account type must be configured");
        }
        if self.backends.is_empty() {
            bail!("at least one key backend must be configured");
        }

        let token_parameters =
            TokenParameters::new(self.token.backdate_seconds, self.token.expire_after_seconds)
                .context("invalid [token] settings")?;

        Ok(UsersSettings {
            issuer_id,
            key_id,
            private_key_path,
            accounts: self.accounts.clone(),
            backends: self.backends.clone(),
            token_parameters,
            base_url: self.base_url.clone(),
        })
    }
}

fn required(value: &Option<String>, field: &str, flag: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => bail!("missing {} (set it in the config file or pass {})", field, flag),
    }
}

/// Load configuration from `path`, or from the default location.
///
/// An explicit path must exist. A missing default file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let (config_path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (default_config_path(), false),
    };

    if !config_path.exists() {
        if explicit {
            bail!("config file {:?} does not exist", config_path);
        }
        return Ok(CliConfig::default());
    }

    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config from {:?}", config_path))?;
    let mut config: CliConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config from {:?}", config_path))?;

    config.config_path = Some(config_path);
    Ok(config)
}

fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "connectkit", "connectkit")
}
