use crate::auth::SsoLoginCache;
use crate::cli::Context;
use crate::env;
use crate::error::Result;
use crate::profile::{AccountProfileMap, ProfileConfig};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum LoginState {
    Active,
    Expired,
    NoLogin,
}

#[derive(Debug, Serialize)]
struct ProfileRow {
    account_id: String,
    profile: String,
    /// `sso`, `static`, or `missing` when the profile is not in the config file
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    login: Option<LoginState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in_minutes: Option<i64>,
}

fn describe(
    profiles: &AccountProfileMap,
    config: &ProfileConfig,
    login_cache: &SsoLoginCache,
) -> Vec<ProfileRow> {
    profiles
        .iter()
        .map(|(account_id, name)| {
            let mut row = ProfileRow {
                account_id: account_id.to_string(),
                profile: name.to_string(),
                kind: "missing".to_string(),
                region: None,
                login: None,
                expires_in_minutes: None,
            };

            let Ok(profile) = config.get_profile(name) else {
                return row;
            };
            row.kind = profile.kind.as_str().to_string();
            row.region = profile.region.clone();

            if let Some(settings) = profile.sso_settings {
                row.region = Some(settings.region.clone());
                match login_cache.login_status(&settings) {
                    Some(token) if !token.is_expired() => {
                        row.login = Some(LoginState::Active);
                        row.expires_in_minutes = Some(token.expires_in_minutes());
                    }
                    Some(_) => row.login = Some(LoginState::Expired),
                    None => row.login = Some(LoginState::NoLogin),
                }
            }
            row
        })
        .collect()
}

pub fn execute(context: Context, json: bool) -> Result<()> {
    let login_cache = SsoLoginCache::new(env::sso_cache_dir()?);
    let rows = describe(&context.profiles, &context.profile_config, &login_cache);

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No accounts mapped to profiles");
        return Ok(());
    }

    println!("Mapped accounts:\n");
    for row in rows {
        let login = match (&row.login, row.expires_in_minutes) {
            (Some(LoginState::Active), Some(mins)) => format!(" login active ({} minutes left)", mins),
            (Some(LoginState::Expired), _) => " login expired".to_string(),
            (Some(LoginState::NoLogin), _) => " no login".to_string(),
            _ => String::new(),
        };
        println!(
            "  {} -> {} [{}]{}",
            row.account_id, row.profile, row.kind, login
        );
    }
    Ok(())
}
