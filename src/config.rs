use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::remote::sheets::SHEETS_API_BASE;
use crate::sync::{ColumnOwnership, ColumnRef, DEFAULT_COOLDOWN, DEFAULT_PACING, TableTarget};
use crate::table::HeaderMode;

/// Default environment variable holding the API access token.
pub const DEFAULT_TOKEN_ENV: &str = "TABSYNC_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub tables: BTreeMap<String, TableConfig>,
}

impl Config {
    /// Load from `explicit_path`, else `TABSYNC_CONFIG`, else the user config
    /// directory. A missing default file yields the defaults; a missing
    /// explicit file is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| env_string("TABSYNC_CONFIG").map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(SyncError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::load_file(&path)?
            }
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_overrides(env_string)?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| SyncError::Config(format!("read config {}: {err}", path.display())))?;
        Self::parse(&raw)
            .map_err(|err| SyncError::Config(format!("parse config {}: {err}", path.display())))
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Apply `TABSYNC_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TABSYNC_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(secs) = parse_u64(&lookup, "TABSYNC_COOLDOWN_SECS")? {
            self.transport.cooldown = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_u64(&lookup, "TABSYNC_PACING_SECS")? {
            self.transport.pacing = Duration::from_secs(secs);
        }
        if let Some(token_env) = lookup("TABSYNC_TOKEN_ENV") {
            self.remote.credentials = Credentials::TokenEnv { token_env };
        }
        Ok(())
    }

    /// Resolved database path.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("tabsync").join("tabsync.db"))
            .ok_or_else(|| SyncError::MissingConfig("database.path".to_string()))
    }

    /// Sync targets for every configured table.
    #[must_use]
    pub fn targets(&self) -> BTreeMap<String, TableTarget> {
        self.tables
            .iter()
            .map(|(name, table)| (name.clone(), table.target()))
            .collect()
    }

    pub fn table(&self, name: &str) -> Result<&TableConfig> {
        self.tables
            .get(name)
            .ok_or_else(|| SyncError::UnknownTable(name.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file; `:memory:` for a throwaway database.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            credentials: Credentials::default(),
            timeout: default_timeout(),
        }
    }
}

/// Where the API access token comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Credentials {
    /// Token read from an environment variable.
    TokenEnv { token_env: String },
    /// JSON file with an `access_token` field.
    TokenFile { path: PathBuf },
}

impl Default for Credentials {
    fn default() -> Self {
        Self::TokenEnv {
            token_env: DEFAULT_TOKEN_ENV.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct TokenFile {
    access_token: String,
}

impl Credentials {
    pub fn resolve(&self) -> Result<String> {
        let token = match self {
            Self::TokenEnv { token_env } => env_string(token_env).ok_or_else(|| {
                SyncError::Credentials(format!("environment variable {token_env} is not set"))
            })?,
            Self::TokenFile { path } => {
                let raw = std::fs::read_to_string(path).map_err(|err| {
                    SyncError::Credentials(format!("read {}: {err}", path.display()))
                })?;
                let file: TokenFile = serde_json::from_str(&raw).map_err(|err| {
                    SyncError::Credentials(format!("parse {}: {err}", path.display()))
                })?;
                file.access_token
            }
        };
        if token.trim().is_empty() {
            return Err(SyncError::Credentials("access token is empty".to_string()));
        }
        Ok(token.trim().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_cooldown", with = "humantime_serde")]
    pub cooldown: Duration,
    #[serde(default = "default_pacing", with = "humantime_serde")]
    pub pacing: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            pacing: DEFAULT_PACING,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Spreadsheet URL or id.
    pub locator: String,
    #[serde(default)]
    pub numeric_header: bool,
    /// Remote-authoritative columns for uploads that name none.
    #[serde(default)]
    pub owned: Vec<ColumnRef>,
}

impl TableConfig {
    #[must_use]
    pub fn target(&self) -> TableTarget {
        let mode = if self.numeric_header {
            HeaderMode::Numeric
        } else {
            HeaderMode::Named
        };
        TableTarget::new(self.locator.clone())
            .with_header_mode(mode)
            .with_owned(ColumnOwnership::remote(self.owned.iter().cloned()))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tabsync").join("config.toml"))
}

fn default_base_url() -> String {
    SHEETS_API_BASE.to_string()
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_cooldown() -> Duration {
    DEFAULT_COOLDOWN
}

const fn default_pacing() -> Duration {
    DEFAULT_PACING
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| SyncError::Config(format!("invalid {key} value {value}: {err}"))),
        None => Ok(None),
    }
}
