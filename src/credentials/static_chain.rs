use super::StaticResolver;
use crate::auth::MfaTokenSource;
use crate::error::{CredentialError, Result};
use crate::models::Credentials;
use crate::profile::{IniFile, Section};
use async_trait::async_trait;
#[allow(deprecated)]
use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_sts::Client as StsClient;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_types::region::Region;
use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};

const DEFAULT_STS_REGION: &str = "us-east-1";

/// A role profile that requires an MFA code to assume
#[derive(Debug, Clone, PartialEq, Eq)]
struct MfaRole {
    role_arn: String,
    mfa_serial: String,
    source_profile: String,
    region: Option<String>,
    role_session_name: Option<String>,
    external_id: Option<String>,
    duration_seconds: Option<i32>,
}

/// Resolves non-SSO profiles.
///
/// Plain profiles go through the SDK's profile file provider. Role profiles
/// with `mfa_serial` are assumed here, because the SDK provider cannot prompt
/// for a token code.
pub struct StaticProfileResolver {
    config_file: PathBuf,
}

impl StaticProfileResolver {
    pub fn new(config_file: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
        }
    }

    #[allow(deprecated)]
    fn provider(&self, profile: &str, credentials_file: &Path) -> ProfileFileCredentialsProvider {
        let files = ProfileFiles::builder()
            .with_file(ProfileFileKind::Config, &self.config_file)
            .with_file(ProfileFileKind::Credentials, credentials_file)
            .build();

        ProfileFileCredentialsProvider::builder()
            .profile_files(files)
            .profile_name(profile)
            .build()
    }

    async fn provide(&self, profile: &str, credentials_file: &Path) -> Result<Credentials> {
        let creds = self
            .provider(profile, credentials_file)
            .provide_credentials()
            .await
            .map_err(|e| CredentialError::resolution(profile, DisplayErrorContext(&e).to_string()))?;

        Ok(Credentials {
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: creds.secret_access_key().to_string(),
            session_token: creds.session_token().map(str::to_string),
            expiration: creds.expiry().map(DateTime::<Utc>::from),
        })
    }

    /// Read the MFA role settings of `profile`, if it has any.
    /// Keys in the credentials file win over the config file.
    fn mfa_role(&self, profile: &str, credentials_file: &Path) -> Result<Option<MfaRole>> {
        let credentials = IniFile::load(credentials_file)?;
        let config = IniFile::load(&self.config_file)?;

        let config_section = if profile == "default" {
            "default".to_string()
        } else {
            format!("profile {}", profile)
        };
        let sections: Vec<&Section> = [credentials.section(profile), config.section(&config_section)]
            .into_iter()
            .flatten()
            .collect();
        let lookup = |key: &str| {
            sections
                .iter()
                .find_map(|s| s.get(key))
                .map(str::to_string)
        };

        let (Some(role_arn), Some(mfa_serial)) = (lookup("role_arn"), lookup("mfa_serial")) else {
            return Ok(None);
        };

        let source_profile = lookup("source_profile").ok_or_else(|| {
            CredentialError::resolution(
                profile,
                "role_arn with mfa_serial requires source_profile",
            )
        })?;

        let duration_seconds = match lookup("duration_seconds") {
            Some(value) => Some(value.parse::<i32>().map_err(|_| {
                CredentialError::resolution(profile, format!("invalid duration_seconds '{}'", value))
            })?),
            None => None,
        };

        Ok(Some(MfaRole {
            role_arn,
            mfa_serial,
            source_profile,
            region: lookup("region"),
            role_session_name: lookup("role_session_name"),
            external_id: lookup("external_id"),
            duration_seconds,
        }))
    }

    async fn assume_with_mfa(
        &self,
        profile: &str,
        role: MfaRole,
        credentials_file: &Path,
        mfa: &dyn MfaTokenSource,
    ) -> Result<Credentials> {
        let source = self
            .provider(&role.source_profile, credentials_file)
            .provide_credentials()
            .await
            .map_err(|e| CredentialError::resolution(profile, DisplayErrorContext(&e).to_string()))?;

        let token_code = mfa.token_code(&role.mfa_serial).await?;

        let region = role.region.as_deref().unwrap_or(DEFAULT_STS_REGION);
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(source)
            .load()
            .await;

        let session_name = role
            .role_session_name
            .unwrap_or_else(|| format!("awsmp-{}", uuid::Uuid::new_v4().simple()));

        tracing::debug!(
            "Assuming {} as {} with MFA device {}",
            role.role_arn,
            session_name,
            role.mfa_serial
        );

        let response = StsClient::new(&config)
            .assume_role()
            .role_arn(&role.role_arn)
            .role_session_name(session_name)
            .serial_number(&role.mfa_serial)
            .token_code(token_code)
            .set_external_id(role.external_id)
            .set_duration_seconds(role.duration_seconds)
            .send()
            .await
            .map_err(|e| CredentialError::resolution(profile, DisplayErrorContext(&e).to_string()))?;

        let sts_creds = response
            .credentials()
            .ok_or_else(|| CredentialError::resolution(profile, "STS returned no credentials"))?;

        let expiration = sts_creds.expiration();
        Ok(Credentials {
            access_key_id: sts_creds.access_key_id().to_string(),
            secret_access_key: sts_creds.secret_access_key().to_string(),
            session_token: Some(sts_creds.session_token().to_string()),
            expiration: Utc
                .timestamp_opt(expiration.secs(), expiration.subsec_nanos())
                .single(),
        })
    }
}

#[async_trait]
impl StaticResolver for StaticProfileResolver {
    async fn resolve(
        &self,
        profile: &str,
        credentials_file: &Path,
        mfa: &dyn MfaTokenSource,
    ) -> Result<Credentials> {
        match self.mfa_role(profile, credentials_file)? {
            Some(role) => self.assume_with_mfa(profile, role, credentials_file, mfa).await,
            None => self.provide(profile, credentials_file).await,
        }
    }
}
