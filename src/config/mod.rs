// Tool settings
use crate::error::{CredentialError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "awsmp";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Account id to profile name
    #[serde(default)]
    pub accounts: BTreeMap<String, String>,
    #[serde(default)]
    pub discovery: Discovery,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Discovery {
    /// Derive mappings from the account ids found in the AWS config file
    #[serde(default = "default_discovery")]
    pub enabled: bool,
}

fn default_discovery() -> bool {
    true
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            enabled: default_discovery(),
        }
    }
}

impl Settings {
    /// Get the settings directory path
    ///
    /// Priority:
    /// 1. XDG_CONFIG_HOME/awsmp (if env var is set)
    /// 2. ~/.config/awsmp (if ~/.config exists)
    /// 3. ~/.awsmp (fallback on Unix)
    /// 4. Platform default on Windows
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(xdg_config) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(xdg_config).join(APP_DIR));
        }

        #[cfg(unix)]
        {
            if let Some(home_dir) = dirs::home_dir() {
                let xdg_config = home_dir.join(".config");
                if xdg_config.exists() {
                    return Ok(xdg_config.join(APP_DIR));
                }
                return Ok(home_dir.join(format!(".{}", APP_DIR)));
            }
        }

        #[cfg(not(unix))]
        {
            if let Some(config_dir) = dirs::config_dir() {
                return Ok(config_dir.join(APP_DIR));
            }
        }

        Err(CredentialError::ConfigError(
            "Could not determine config directory".to_string(),
        ))
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load settings from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Settings file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        tracing::debug!("Loading settings from: {}", path.display());
        let contents = fs::read_to_string(path).map_err(|e| {
            CredentialError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Ok(toml::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(settings.accounts.is_empty());
        assert!(settings.discovery.enabled);
    }

    #[test]
    fn test_load_accounts_and_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[accounts]
"111111111111" = "dev-sso"
"222222222222" = "prod-static"

[discovery]
enabled = false
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.accounts.len(), 2);
        assert_eq!(settings.accounts["111111111111"], "dev-sso");
        assert!(!settings.discovery.enabled);
    }

    #[test]
    fn test_partial_file_keeps_discovery_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[accounts]\n\"111111111111\" = \"dev-sso\"\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert!(settings.discovery.enabled);
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[accounts\n").unwrap();

        assert!(matches!(
            Settings::load_from(&path),
            Err(CredentialError::Toml(_))
        ));
    }
}
