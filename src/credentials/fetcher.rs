use super::TokenExchange;
use crate::error::{CredentialError, Result};
use crate::models::RoleCredentialsResponse;
use async_trait::async_trait;
use aws_sdk_sso::Client as SsoClient;
use aws_types::region::Region;
use chrono::{TimeZone, Utc};

/// Fetches role credentials from AWS SSO
pub struct CredentialFetcher {
    client: SsoClient,
}

impl CredentialFetcher {
    pub async fn new(region: &str) -> Self {
        // GetRoleCredentials is authorized by the bearer access token alone,
        // so the default credential chain is never consulted.
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .no_credentials()
            .load()
            .await;

        Self {
            client: SsoClient::new(&config),
        }
    }

    /// Fetch credentials for a specific account/role. Fields are passed
    /// through as returned; validation is the caller's job.
    pub async fn fetch_credentials(
        &self,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentialsResponse> {
        let response = self
            .client
            .get_role_credentials()
            .access_token(access_token)
            .account_id(account_id)
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| CredentialError::AwsSdk(format!("Failed to get role credentials: {}", e)))?;

        let Some(role_creds) = response.role_credentials() else {
            return Ok(RoleCredentialsResponse::default());
        };

        // The API reports a missing expiration as 0
        let expiration = match role_creds.expiration() {
            0 => None,
            millis => Utc.timestamp_millis_opt(millis).single(),
        };

        Ok(RoleCredentialsResponse {
            access_key_id: role_creds.access_key_id().map(str::to_string),
            secret_access_key: role_creds.secret_access_key().map(str::to_string),
            session_token: role_creds.session_token().map(str::to_string),
            expiration,
        })
    }
}

/// Token exchange backed by the AWS SSO portal API
#[derive(Debug, Default)]
pub struct SsoTokenExchange;

#[async_trait]
impl TokenExchange for SsoTokenExchange {
    async fn get_role_credentials(
        &self,
        region: &str,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentialsResponse> {
        tracing::debug!(
            "Exchanging SSO token for {}/{} in {}",
            account_id,
            role_name,
            region
        );
        CredentialFetcher::new(region)
            .await
            .fetch_credentials(access_token, account_id, role_name)
            .await
    }
}
