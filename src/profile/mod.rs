// AWS config file profiles
mod ini;
pub mod mapper;

pub use ini::{IniFile, Section};
pub use mapper::{AccountProfileMap, PrecedenceProfileMapper};

use crate::error::{CredentialError, Result};
use crate::models::{Profile, ProfileKind, RoleReference, SsoSettings};
use std::path::{Path, PathBuf};

/// Profiles parsed from the AWS config file.
///
/// The file is read once at construction; later edits are not picked up.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    path: PathBuf,
    ini: IniFile,
}

impl ProfileConfig {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        tracing::debug!("Loading AWS config from: {}", path.display());
        let ini = IniFile::load(&path)?;
        Ok(Self::from_ini(path, ini))
    }

    pub fn from_ini(path: impl Into<PathBuf>, ini: IniFile) -> Self {
        Self {
            path: path.into(),
            ini,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn section(&self, name: &str) -> Option<&Section> {
        if name == "default" {
            self.ini
                .section("default")
                .or_else(|| self.ini.section("profile default"))
        } else {
            self.ini.section(&format!("profile {}", name))
        }
    }

    fn require_section(&self, name: &str) -> Result<&Section> {
        self.section(name)
            .ok_or_else(|| CredentialError::ProfileNotFound(name.to_string()))
    }

    /// Profile names in file order
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for section in self.ini.sections() {
            let name = if section.name == "default" {
                Some("default")
            } else {
                section.name.strip_prefix("profile ").map(str::trim)
            };
            if let Some(name) = name {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    pub fn is_sso_profile(&self, name: &str) -> bool {
        self.section(name).map(is_sso_section).unwrap_or(false)
    }

    pub fn get_profile(&self, name: &str) -> Result<Profile> {
        let section = self.require_section(name)?;

        let profile = if is_sso_section(section) {
            let role_reference = match (section.get("sso_account_id"), section.get("sso_role_name")) {
                (Some(account_id), Some(role_name)) => Some(RoleReference {
                    account_id: account_id.to_string(),
                    role_name: role_name.to_string(),
                }),
                _ => None,
            };

            Profile {
                name: name.to_string(),
                kind: ProfileKind::Sso,
                sso_settings: self.sso_settings_for(name, section).ok(),
                role_reference,
                region: section.get("region").map(str::to_string),
            }
        } else {
            Profile {
                name: name.to_string(),
                kind: ProfileKind::Static,
                sso_settings: None,
                role_reference: section.get("role_arn").and_then(parse_role_arn),
                region: section.get("region").map(str::to_string),
            }
        };

        Ok(profile)
    }

    pub fn get_sso_settings(&self, name: &str) -> Result<SsoSettings> {
        let section = self.require_section(name)?;

        if !is_sso_section(section) {
            return Err(CredentialError::WrongProfileKind(name.to_string()));
        }

        self.sso_settings_for(name, section)
    }

    fn sso_settings_for(&self, name: &str, section: &Section) -> Result<SsoSettings> {
        let session_name = section.get("sso_session");

        // [sso-session] values take priority over legacy keys on the profile itself
        let session = match session_name {
            Some(session_name) => Some(
                self.ini
                    .section(&format!("sso-session {}", session_name))
                    .ok_or_else(|| {
                        CredentialError::InvalidConfig(format!(
                            "Profile '{}' refers to missing [sso-session {}]",
                            name, session_name
                        ))
                    })?,
            ),
            None => None,
        };

        let lookup = |key: &str| {
            session
                .and_then(|s| s.get(key))
                .or_else(|| section.get(key))
                .map(str::to_string)
                .ok_or_else(|| {
                    CredentialError::InvalidConfig(format!(
                        "SSO profile '{}' is missing {}",
                        name, key
                    ))
                })
        };

        Ok(SsoSettings {
            start_url: lookup("sso_start_url")?,
            region: lookup("sso_region")?,
            account_id: lookup("sso_account_id")?,
            role_name: lookup("sso_role_name")?,
            session_name: session_name.map(str::to_string),
        })
    }
}

fn is_sso_section(section: &Section) -> bool {
    section.contains_key("sso_start_url") || section.contains_key("sso_session")
}

/// Extract account and role name from `arn:aws:iam::<account>:role/<path>/<name>`
fn parse_role_arn(arn: &str) -> Option<RoleReference> {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    if parts.len() != 6 || parts[0] != "arn" || parts[2] != "iam" {
        return None;
    }

    let account_id = parts[4];
    let role_name = parts[5].strip_prefix("role/")?.rsplit('/').next()?;

    if account_id.is_empty() || role_name.is_empty() {
        return None;
    }

    Some(RoleReference {
        account_id: account_id.to_string(),
        role_name: role_name.to_string(),
    })
}
