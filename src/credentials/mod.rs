// Credential resolution
mod cache;
mod fetcher;
mod resolver;
mod static_chain;

pub use cache::ProfileCredentialsCache;
pub use fetcher::SsoTokenExchange;
pub use resolver::{CredentialProviderSource, CredentialResolver};
pub use static_chain::StaticProfileResolver;

use crate::auth::MfaTokenSource;
use crate::error::Result;
use crate::models::{Credentials, RoleCredentialsResponse};
use async_trait::async_trait;
use std::path::Path;

/// Exchanges an SSO access token for credentials of a role in an account
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn get_role_credentials(
        &self,
        region: &str,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentialsResponse>;
}

/// Resolves a non-SSO profile from the shared credentials/config files.
/// `mfa` is consulted whenever the profile needs a token code.
#[async_trait]
pub trait StaticResolver: Send + Sync {
    async fn resolve(
        &self,
        profile: &str,
        credentials_file: &Path,
        mfa: &dyn MfaTokenSource,
    ) -> Result<Credentials>;
}
