use super::{
    ProfileCredentialsCache, SsoTokenExchange, StaticProfileResolver, StaticResolver,
    TokenExchange,
};
use crate::auth::{
    MfaTokenCache, MfaTokenEntry, SsoLoginCache, StdinTokenPrompt, TokenPrompt,
};
use crate::env;
use crate::error::{CredentialError, Result};
use crate::models::{Credentials, Mode, RoleCredentialsResponse, RoleReference};
use crate::profile::{AccountProfileMap, ProfileConfig};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a host needs from a credential provider
#[async_trait]
pub trait CredentialProviderSource: Send + Sync {
    /// Whether `account_id` is mapped to a profile
    async fn can_provide_credentials(&self, account_id: &str) -> bool;

    /// Whether the provider was configured with any accounts and a credentials file
    async fn is_available(&self) -> bool;

    /// Credentials for `account_id`. `mode` is only used for logging.
    async fn get_credentials(&self, account_id: &str, mode: Mode) -> Result<Arc<Credentials>>;
}

/// Collaborators shared with in-flight resolutions
struct Engine {
    profile_config: Arc<ProfileConfig>,
    login_cache: SsoLoginCache,
    exchange: Arc<dyn TokenExchange>,
    static_resolver: Arc<dyn StaticResolver>,
    mfa: MfaTokenEntry,
    credentials_file: PathBuf,
}

impl Engine {
    async fn resolve(&self, profile: &str) -> Result<Credentials> {
        if self.profile_config.is_sso_profile(profile) {
            self.resolve_sso(profile).await
        } else {
            tracing::debug!("Resolving static profile '{}'", profile);
            self.static_resolver
                .resolve(profile, &self.credentials_file, &self.mfa)
                .await
        }
    }

    async fn resolve_sso(&self, profile: &str) -> Result<Credentials> {
        let sso_profile = self.profile_config.get_profile(profile)?;
        let settings = self.profile_config.get_sso_settings(profile)?;
        let role = sso_profile.role_reference.ok_or_else(|| {
            CredentialError::InvalidConfig(format!(
                "SSO profile '{}' has no sso_account_id/sso_role_name",
                profile
            ))
        })?;

        let login = self.login_cache.get_cached_login(&settings)?;

        tracing::debug!(
            "Resolving SSO profile '{}' as {}",
            sso_profile.name,
            role.display_name()
        );
        let response = self
            .exchange
            .get_role_credentials(
                &settings.region,
                &login.access_token,
                &role.account_id,
                &role.role_name,
            )
            .await?;

        validate_role_credentials(response, &role)
    }
}

fn validate_role_credentials(
    response: RoleCredentialsResponse,
    role: &RoleReference,
) -> Result<Credentials> {
    let invalid = |missing: &'static str| CredentialError::InvalidRoleCredentials {
        account_id: role.account_id.clone(),
        role_name: role.role_name.clone(),
        missing,
    };
    let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

    let access_key_id = non_empty(response.access_key_id).ok_or_else(|| invalid("accessKeyId"))?;
    let secret_access_key =
        non_empty(response.secret_access_key).ok_or_else(|| invalid("secretAccessKey"))?;
    let session_token = non_empty(response.session_token).ok_or_else(|| invalid("sessionToken"))?;

    Ok(Credentials {
        access_key_id,
        secret_access_key,
        session_token: Some(session_token),
        expiration: response.expiration,
    })
}

/// Resolves credentials for mapped accounts from SSO or static profiles.
///
/// Each resolver owns its credential and MFA caches; they live as long as the
/// resolver does and are never written to disk.
pub struct CredentialResolver {
    profiles: AccountProfileMap,
    cache: ProfileCredentialsCache,
    engine: Arc<Engine>,
}

impl CredentialResolver {
    pub fn builder(
        profiles: AccountProfileMap,
        credentials_file: impl Into<PathBuf>,
        profile_config: Arc<ProfileConfig>,
    ) -> CredentialResolverBuilder {
        CredentialResolverBuilder {
            profiles,
            credentials_file: credentials_file.into(),
            profile_config,
            login_cache: None,
            exchange: None,
            static_resolver: None,
            prompt: None,
        }
    }

    pub fn profiles(&self) -> &AccountProfileMap {
        &self.profiles
    }
}

#[async_trait]
impl CredentialProviderSource for CredentialResolver {
    async fn can_provide_credentials(&self, account_id: &str) -> bool {
        self.profiles.contains(account_id)
    }

    async fn is_available(&self) -> bool {
        !self.engine.credentials_file.as_os_str().is_empty() && !self.profiles.is_empty()
    }

    async fn get_credentials(&self, account_id: &str, mode: Mode) -> Result<Arc<Credentials>> {
        let profile = self
            .profiles
            .profile_for(account_id)
            .ok_or_else(|| CredentialError::UnknownAccount(account_id.to_string()))?;

        tracing::info!(
            "Using profile {} for account {} in mode {}",
            profile,
            account_id,
            mode
        );

        if !self.cache.has(profile) {
            tracing::debug!("No cached credentials for profile '{}'", profile);
        }

        let engine = self.engine.clone();
        let name = profile.to_string();
        self.cache
            .get_or_resolve(profile, move || async move { engine.resolve(&name).await })
            .await
    }
}

/// Builder for [`CredentialResolver`]. Unset collaborators use the production
/// implementations; tests swap them out through the setters.
pub struct CredentialResolverBuilder {
    profiles: AccountProfileMap,
    credentials_file: PathBuf,
    profile_config: Arc<ProfileConfig>,
    login_cache: Option<SsoLoginCache>,
    exchange: Option<Arc<dyn TokenExchange>>,
    static_resolver: Option<Arc<dyn StaticResolver>>,
    prompt: Option<Arc<dyn TokenPrompt>>,
}

impl CredentialResolverBuilder {
    #[cfg(test)]
    pub fn login_cache(mut self, login_cache: SsoLoginCache) -> Self {
        self.login_cache = Some(login_cache);
        self
    }

    #[cfg(test)]
    pub fn token_exchange(mut self, exchange: Arc<dyn TokenExchange>) -> Self {
        self.exchange = Some(exchange);
        self
    }

    #[cfg(test)]
    pub fn static_resolver(mut self, static_resolver: Arc<dyn StaticResolver>) -> Self {
        self.static_resolver = Some(static_resolver);
        self
    }

    #[cfg(test)]
    pub fn token_prompt(mut self, prompt: Arc<dyn TokenPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn build(self) -> Result<CredentialResolver> {
        let login_cache = match self.login_cache {
            Some(cache) => cache,
            None => SsoLoginCache::new(env::sso_cache_dir()?),
        };
        let static_resolver = self.static_resolver.unwrap_or_else(|| {
            Arc::new(StaticProfileResolver::new(self.profile_config.path()))
        });
        let prompt = self
            .prompt
            .unwrap_or_else(|| Arc::new(StdinTokenPrompt));

        let engine = Engine {
            login_cache,
            exchange: self.exchange.unwrap_or_else(|| Arc::new(SsoTokenExchange)),
            static_resolver,
            mfa: MfaTokenEntry::new(Arc::new(MfaTokenCache::new()), prompt),
            credentials_file: self.credentials_file,
            profile_config: self.profile_config,
        };

        Ok(CredentialResolver {
            profiles: self.profiles,
            cache: ProfileCredentialsCache::new(),
            engine: Arc::new(engine),
        })
    }
}
