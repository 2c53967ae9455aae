//! Configuration for boardsync.
//!
//! Settings live in a `boardsync.toml` file:
//!
//! ```toml
//! [api]
//! endpoint = "https://api.monday.com/v2"
//! timeout_secs = 30
//!
//! [sync]
//! source_board = "18269603341"
//! dest_board = "18399599376"
//! link_column = "source_item_id"
//!
//! [remap]
//! status_src = "status_dst"
//! ```
//!
//! # Resolution
//!
//! The first of these that exists is loaded:
//!
//! 1. An explicit path (the CLI's `--config`)
//! 2. The path in `BOARDSYNC_CONFIG`
//! 3. `boardsync.toml` in the current directory, then in each parent
//! 4. `boardsync/boardsync.toml` under the XDG config directory
//!
//! Finding nothing is not an error; an explicit or environment path that
//! does not exist is.
//!
//! The API token is taken from `MONDAY_API_TOKEN` before `[api].token`, so
//! it can be kept out of the file. All environment access goes through
//! [`ConfigEnv`].

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    gateway::DEFAULT_API_ENDPOINT,
    sync::{DEFAULT_LINK_COLUMN, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, SyncOptions},
    translate::RemapTable,
};

pub const CONFIG_FILE_NAME: &str = "boardsync.toml";
pub const CONFIG_PATH_ENV: &str = "BOARDSYNC_CONFIG";
pub const TOKEN_ENV: &str = "MONDAY_API_TOKEN";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while resolving, loading or validating config.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The process environment as config resolution sees it.
///
/// [`ConfigEnv::from_process`] captures the real environment; tests build
/// one by hand so they never touch process-wide state.
#[derive(Debug, Clone, Default)]
pub struct ConfigEnv {
    vars: BTreeMap<String, String>,
    current_dir: Option<PathBuf>,
    config_dir: Option<PathBuf>,
}

impl ConfigEnv {
    pub fn from_process() -> Self {
        let vars = [CONFIG_PATH_ENV, TOKEN_ENV]
            .into_iter()
            .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect();

        Self {
            vars,
            current_dir: std::env::current_dir().ok(),
            config_dir: dirs::config_dir(),
        }
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// A variable's value, ignoring unset and blank values.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Contents of `boardsync.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    /// Source column id to destination column id.
    #[serde(default)]
    pub remap: RemapTable,
}

/// The `[api]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Used when `MONDAY_API_TOKEN` is not set.
    pub token: Option<String>,

    /// Request timeout; `0` disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// The `[sync]` table. Every field may be overridden on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source_board: Option<String>,
    pub dest_board: Option<String>,
    pub link_column: Option<String>,
    pub source_key_column: Option<String>,
    pub page_limit: Option<u32>,
}

/// Command-line values that take precedence over `[sync]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOverrides {
    pub source_board: Option<String>,
    pub dest_board: Option<String>,
    pub link_column: Option<String>,
    pub limit: Option<usize>,
    pub dry_run: bool,
}

/// A config together with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: Config,
}

fn default_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Config {
    /// Loads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file does not exist,
    /// [`ConfigError::Io`] if it cannot be read and [`ConfigError::Parse`]
    /// if it is not a valid config.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io(err),
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Finds and loads the config file, see the module docs for the order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if `explicit` or `BOARDSYNC_CONFIG`
    /// names a missing file, and any error from [`Config::load`] for the file
    /// that was found.
    pub fn resolve(
        explicit: Option<&Path>,
        env: &ConfigEnv,
    ) -> Result<Option<LoadedConfig>, ConfigError> {
        if let Some(path) = explicit {
            return load_from(path).map(Some);
        }

        if let Some(path) = env.var(CONFIG_PATH_ENV) {
            return load_from(Path::new(path)).map(Some);
        }

        if let Some(current) = &env.current_dir {
            for dir in current.ancestors() {
                let path = dir.join(CONFIG_FILE_NAME);
                if path.is_file() {
                    return load_from(&path).map(Some);
                }
            }
        }

        if let Some(config_dir) = &env.config_dir {
            let path = config_dir.join("boardsync").join(CONFIG_FILE_NAME);
            if path.is_file() {
                return load_from(&path).map(Some);
            }
        }

        debug!("no config file found");
        Ok(None)
    }

    /// The API token, from `MONDAY_API_TOKEN` or else `[api].token`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if neither is set.
    pub fn api_token(&self, env: &ConfigEnv) -> Result<String, ConfigError> {
        env.var(TOKEN_ENV)
            .or_else(|| {
                self.api
                    .token
                    .as_deref()
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
            })
            .map(str::to_string)
            .ok_or_else(|| {
                ConfigError::Invalid(format!("no API token: set {TOKEN_ENV} or [api].token"))
            })
    }

    /// Builds the options for a sync run, applying command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a board id or the link column is
    /// missing or blank, `page_limit` is outside `1..=500`, or the remap
    /// table has a blank entry or targets the link column.
    pub fn sync_options(&self, overrides: &SyncOverrides) -> Result<SyncOptions, ConfigError> {
        let source_board = required(
            "source board",
            overrides.source_board.as_deref().or(self.sync.source_board.as_deref()),
        )?;
        let dest_board = required(
            "destination board",
            overrides.dest_board.as_deref().or(self.sync.dest_board.as_deref()),
        )?;
        let link_column = match overrides.link_column.as_deref().or(self.sync.link_column.as_deref()) {
            Some(column) => required("link column", Some(column))?,
            None => DEFAULT_LINK_COLUMN.to_string(),
        };

        let page_limit = self.sync.page_limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&page_limit) {
            return Err(ConfigError::Invalid(format!(
                "page_limit must be between 1 and {MAX_PAGE_LIMIT}, got {page_limit}"
            )));
        }

        for (source, destination) in self.remap.entries() {
            if source.trim().is_empty() || destination.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "remap entry `{source}` = `{destination}` has a blank column id"
                )));
            }
            if destination == link_column {
                return Err(ConfigError::Invalid(format!(
                    "remap entry `{source}` targets the link column `{link_column}`"
                )));
            }
        }

        let mut options = SyncOptions::new(source_board, dest_board)
            .link_column(link_column)
            .remap(self.remap.clone())
            .page_limit(page_limit)
            .dry_run(overrides.dry_run);
        if let Some(column) = self
            .sync
            .source_key_column
            .as_deref()
            .map(str::trim)
            .filter(|column| !column.is_empty())
        {
            options = options.source_key_column(column);
        }
        if let Some(limit) = overrides.limit {
            options = options.limit(limit);
        }
        Ok(options)
    }
}

fn load_from(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let config = Config::load(path)?;
    debug!(path = %path.display(), "loaded config");
    Ok(LoadedConfig {
        path: path.to_path_buf(),
        config,
    })
}

fn required(what: &str, value: Option<&str>) -> Result<String, ConfigError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::Invalid(format!("{what} is not set")))
}
