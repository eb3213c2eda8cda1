use crate::error::{CredentialError, Result};
use crate::models::{SsoSettings, SsoToken};
use sha1::{Digest, Sha1};
use std::fs;
use std::path::PathBuf;

/// Read-only view of the AWS CLI v2 SSO login cache (~/.aws/sso/cache/).
///
/// Logins are written by `aws sso login`; this type never creates,
/// refreshes or removes them.
#[derive(Debug, Clone)]
pub struct SsoLoginCache {
    cache_dir: PathBuf,
}

impl SsoLoginCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Generate cache key (compatible with AWS CLI v2)
    /// Uses SHA1 of session_name when available (modern [sso-session] format),
    /// otherwise falls back to SHA1 of start_url (legacy SSO format)
    fn cache_key(settings: &SsoSettings) -> String {
        let key_material = settings
            .session_name
            .as_deref()
            .unwrap_or(&settings.start_url);

        let mut hasher = Sha1::new();
        hasher.update(key_material.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn cache_file_path(&self, settings: &SsoSettings) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", Self::cache_key(settings)))
    }

    fn read_entry(&self, settings: &SsoSettings) -> Result<Option<SsoToken>> {
        let cache_file = self.cache_file_path(settings);

        if !cache_file.exists() {
            tracing::debug!("No SSO login cached at {}", cache_file.display());
            return Ok(None);
        }

        let contents = fs::read_to_string(&cache_file)?;
        let token: SsoToken = serde_json::from_str(&contents)?;
        Ok(Some(token))
    }

    /// Cached login for `settings`, failing when it is missing or expired
    pub fn get_cached_login(&self, settings: &SsoSettings) -> Result<SsoToken> {
        match self.read_entry(settings)? {
            Some(token) if !token.is_expired() => {
                tracing::debug!(
                    "Using SSO login for {} (expires in {})",
                    settings.start_url,
                    token.expiration_display()
                );
                Ok(token)
            }
            Some(token) => {
                tracing::debug!("SSO login for {} expired at {}", settings.start_url, token.expires_at);
                Err(CredentialError::ExpiredOrMissingLogin(
                    settings.start_url.clone(),
                ))
            }
            None => Err(CredentialError::ExpiredOrMissingLogin(
                settings.start_url.clone(),
            )),
        }
    }

    /// Cached login regardless of expiry, for status display.
    /// Unreadable entries are reported as absent.
    pub fn login_status(&self, settings: &SsoSettings) -> Option<SsoToken> {
        match self.read_entry(settings) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Ignoring unreadable SSO cache entry: {}", e);
                None
            }
        }
    }
}
