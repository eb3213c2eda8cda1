// Environment variables and default AWS file locations
use crate::error::{CredentialError, Result};
use std::path::PathBuf;

pub const CONFIG_FILE_VAR: &str = "AWS_CONFIG_FILE";
pub const CREDENTIALS_FILE_VAR: &str = "AWS_SHARED_CREDENTIALS_FILE";

/// Comma separated `ACCOUNT=PROFILE` pairs
pub const PROFILES_VAR: &str = "AWSMP_PROFILES";

/// Kill switch: when set to a non-empty value the provider is never registered
pub const IGNORE_VAR: &str = "AWSMP_IGNORE";

/// Check whether the provider has been switched off via `AWSMP_IGNORE`
pub fn is_disabled() -> bool {
    let disabled = kill_switch_set(std::env::var(IGNORE_VAR).ok().as_deref());
    if disabled {
        tracing::debug!("Credential provider disabled: {} is set", IGNORE_VAR);
    }
    disabled
}

fn kill_switch_set(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn aws_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".aws"))
        .ok_or_else(|| CredentialError::ConfigError("Could not determine home directory".to_string()))
}

/// AWS config file: `$AWS_CONFIG_FILE` or `~/.aws/config`
pub fn config_file_path() -> Result<PathBuf> {
    match std::env::var_os(CONFIG_FILE_VAR) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(aws_dir()?.join("config")),
    }
}

/// Shared credentials file: `$AWS_SHARED_CREDENTIALS_FILE` or `~/.aws/credentials`
pub fn credentials_file_path() -> Result<PathBuf> {
    match std::env::var_os(CREDENTIALS_FILE_VAR) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(aws_dir()?.join("credentials")),
    }
}

/// Directory the AWS CLI writes SSO logins to
pub fn sso_cache_dir() -> Result<PathBuf> {
    Ok(aws_dir()?.join("sso").join("cache"))
}
