//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result};
use boardsync_core::{Config, ConfigEnv, MondayClient};
use tracing::debug;

pub mod boards;
pub mod inspect;
pub mod links;
pub mod sync;

/// Loads `boardsync.toml`, falling back to defaults when none is found.
pub fn load_config(explicit: Option<&Path>, env: &ConfigEnv) -> Result<Config> {
    match Config::resolve(explicit, env).context("failed to load configuration")? {
        Some(loaded) => {
            debug!(path = %loaded.path.display(), "using config file");
            Ok(loaded.config)
        }
        None => {
            debug!("no config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Builds the API client from the `[api]` table and the token.
pub fn client(config: &Config, env: &ConfigEnv) -> Result<MondayClient> {
    let token = config.api_token(env)?;
    MondayClient::new(&config.api.endpoint, token, config.api.timeout())
        .context("failed to create API client")
}


#[cfg(test)]
mod tests {
    use std::fs;

    use boardsync_core::config::{CONFIG_FILE_NAME, TOKEN_ENV};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_load_config_defaults_when_nothing_found() {
        let temp = TempDir::new().unwrap();
        let env = ConfigEnv::default().with_config_dir(temp.path());

        let config = load_config(None, &env).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_reports_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join(CONFIG_FILE_NAME);

        let err = load_config(Some(missing.as_path()), &ConfigEnv::default()).unwrap_err();

        assert!(err.to_string().contains("failed to load configuration"));
    }

    #[test]
    fn test_load_config_reads_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[sync]\nsource_board = \"111\"\n").unwrap();

        let config = load_config(Some(path.as_path()), &ConfigEnv::default()).unwrap();

        assert_eq!(config.sync.source_board.as_deref(), Some("111"));
    }

    #[test]
    fn test_client_requires_token() {
        let err = client(&Config::default(), &ConfigEnv::default()).unwrap_err();
        assert!(err.to_string().contains(TOKEN_ENV));
    }
}
