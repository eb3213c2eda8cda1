use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the credential engine.
///
/// The type is `Clone` so a single in-flight resolution can hand the same
/// outcome to every caller waiting on it. Non-cloneable sources are kept
/// behind an `Arc`.
#[derive(Error, Debug, Clone)]
pub enum CredentialError {
    #[error("No profile is mapped to account {0}")]
    UnknownAccount(String),

    #[error("Profile '{0}' not found in AWS config")]
    ProfileNotFound(String),

    #[error("Profile '{0}' is not an SSO profile")]
    WrongProfileKind(String),

    #[error("No valid SSO login for {0} - run `aws sso login` first")]
    ExpiredOrMissingLogin(String),

    #[error("Invalid role credentials returned for {account_id}/{role_name}: missing {missing}")]
    InvalidRoleCredentials {
        account_id: String,
        role_name: String,
        missing: &'static str,
    },

    #[error("Token {token} has already been used in this run")]
    DuplicateMfaToken { serial: String, token: String },

    #[error("Credential resolution failed for profile '{profile}': {message}")]
    Resolution { profile: String, message: String },

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Credential provider disabled: {0} is set")]
    Disabled(&'static str),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("JSON serialization error: {0}")]
    Json(Arc<serde_json::Error>),

    #[error("TOML parse error: {0}")]
    Toml(Arc<toml::de::Error>),
}

impl CredentialError {
    pub fn resolution(profile: &str, message: impl Into<String>) -> Self {
        CredentialError::Resolution {
            profile: profile.to_string(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CredentialError {
    fn from(err: std::io::Error) -> Self {
        CredentialError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for CredentialError {
    fn from(err: serde_json::Error) -> Self {
        CredentialError::Json(Arc::new(err))
    }
}

impl From<toml::de::Error> for CredentialError {
    fn from(err: toml::de::Error) -> Self {
        CredentialError::Toml(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CredentialError>;
