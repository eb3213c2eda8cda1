use crate::cli::{Context, OutputFormat};
use crate::credentials::CredentialProviderSource;
use crate::error::Result;
use crate::models::{Credentials, Mode};
use serde::Serialize;

/// `credential_process` output document
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ProcessCredentials<'a> {
    version: u8,
    access_key_id: &'a str,
    secret_access_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration: Option<String>,
}

impl<'a> From<&'a Credentials> for ProcessCredentials<'a> {
    fn from(creds: &'a Credentials) -> Self {
        Self {
            version: 1,
            access_key_id: &creds.access_key_id,
            secret_access_key: &creds.secret_access_key,
            session_token: creds.session_token.as_deref(),
            expiration: creds.expiration.map(|e| e.to_rfc3339()),
        }
    }
}

fn render(creds: &Credentials, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(creds)?),
        OutputFormat::Process => Ok(serde_json::to_string(&ProcessCredentials::from(creds))?),
        OutputFormat::Env => {
            let mut lines = vec![
                format!("export AWS_ACCESS_KEY_ID=\"{}\"", creds.access_key_id),
                format!("export AWS_SECRET_ACCESS_KEY=\"{}\"", creds.secret_access_key),
            ];
            match &creds.session_token {
                Some(token) => lines.push(format!("export AWS_SESSION_TOKEN=\"{}\"", token)),
                None => lines.push("unset AWS_SESSION_TOKEN".to_string()),
            }
            if let Some(expiration) = creds.expiration {
                lines.push(format!(
                    "# Credentials expire at: {}",
                    expiration.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
            Ok(lines.join("\n"))
        }
    }
}

pub async fn execute(
    context: Context,
    account_id: &str,
    mode: Mode,
    format: OutputFormat,
) -> Result<()> {
    let resolver = context.resolver()?;
    let creds = resolver.get_credentials(account_id, mode).await?;

    println!("{}", render(&creds, format)?);
    if format == OutputFormat::Env {
        eprintln!("Expires: {}", creds.expiration_display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn session_creds() -> Credentials {
        Credentials {
            access_key_id: "ASIAEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: Some("token".to_string()),
            expiration: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).single(),
        }
    }

    #[test]
    fn test_process_format() {
        let out = render(&session_creds(), OutputFormat::Process).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["Version"], 1);
        assert_eq!(doc["AccessKeyId"], "ASIAEXAMPLE");
        assert_eq!(doc["SecretAccessKey"], "secret");
        assert_eq!(doc["SessionToken"], "token");
        assert_eq!(doc["Expiration"], "2030-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_process_format_for_long_lived_keys() {
        let creds = Credentials {
            session_token: None,
            expiration: None,
            ..session_creds()
        };
        let out = render(&creds, OutputFormat::Process).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(doc.get("SessionToken").is_none());
        assert!(doc.get("Expiration").is_none());
    }

    #[test]
    fn test_env_format() {
        let out = render(&session_creds(), OutputFormat::Env).unwrap();
        assert!(out.contains("export AWS_ACCESS_KEY_ID=\"ASIAEXAMPLE\""));
        assert!(out.contains("export AWS_SESSION_TOKEN=\"token\""));
        assert!(out.contains("# Credentials expire at: 2030-01-02 03:04:05 UTC"));

        let static_keys = Credentials {
            session_token: None,
            expiration: None,
            ..session_creds()
        };
        let out = render(&static_keys, OutputFormat::Env).unwrap();
        assert!(out.contains("unset AWS_SESSION_TOKEN"));
        assert!(!out.contains("expire"));
    }
}
