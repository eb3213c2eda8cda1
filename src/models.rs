use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection settings that select a cached SSO login and the role to exchange it for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SsoSettings {
    pub start_url: String,
    pub region: String,
    pub account_id: String,
    pub role_name: String,
    /// Name of the `[sso-session]` section the profile refers to.
    /// When present the login cache is keyed by this name instead of the start URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
}

/// The account/role pair an SSO profile assumes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoleReference {
    pub account_id: String,
    pub role_name: String,
}

impl RoleReference {
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.account_id, self.role_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileKind {
    Static,
    Sso,
}

impl ProfileKind {
    pub fn as_str(&self) -> &str {
        match self {
            ProfileKind::Static => "static",
            ProfileKind::Sso => "sso",
        }
    }
}

/// A profile as parsed from the AWS config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub kind: ProfileKind,
    pub sso_settings: Option<SsoSettings>,
    pub role_reference: Option<RoleReference>,
    pub region: Option<String>,
}

/// A login written by `aws sso login` to `~/.aws/sso/cache`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
}

impl SsoToken {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn expires_in_minutes(&self) -> i64 {
        (self.expires_at - Utc::now()).num_minutes().max(0)
    }

    pub fn expiration_display(&self) -> String {
        match self.expires_in_minutes() {
            0 => "EXPIRED".to_string(),
            mins if mins >= 60 => format!("{}h {}m", mins / 60, mins % 60),
            mins => format!("{} minutes", mins),
        }
    }
}

/// Resolved AWS credentials.
///
/// Long-lived access keys carry no session token and no expiration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn is_expired(&self) -> bool {
        self.expiration
            .map(|expiration| Utc::now() >= expiration)
            .unwrap_or(false)
    }

    pub fn expires_in_seconds(&self) -> Option<i64> {
        self.expiration
            .map(|expiration| (expiration - Utc::now()).num_seconds().max(0))
    }

    /// Format expiration time as human-readable string
    pub fn expiration_display(&self) -> String {
        let Some(total) = self.expires_in_seconds() else {
            return "never".to_string();
        };
        let mins = total / 60;
        let secs = total % 60;

        if mins > 60 {
            format!("{}h {}m", mins / 60, mins % 60)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else if secs > 0 {
            format!("{}s", secs)
        } else {
            "EXPIRED".to_string()
        }
    }
}

/// Raw `GetRoleCredentials` payload; every field may be missing on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCredentialsResponse {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
}

/// What the caller intends to do with the credentials. Only used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    #[default]
    #[value(name = "reading")]
    ForReading,
    #[value(name = "writing")]
    ForWriting,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::ForReading => f.write_str("ForReading"),
            Mode::ForWriting => f.write_str("ForWriting"),
        }
    }
}
