// Account id -> profile name resolution
use super::ProfileConfig;
use crate::error::{CredentialError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Final account id -> profile name mapping. Built once, then read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccountProfileMap(BTreeMap<String, String>);

impl AccountProfileMap {
    pub fn profile_for(&self, account_id: &str) -> Option<&str> {
        self.0.get(account_id).map(String::as_str)
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.0.contains_key(account_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AccountProfileMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One candidate source of account -> profile pairs
pub trait MappingSource {
    fn name(&self) -> &str;
    fn candidates(&self) -> Result<BTreeMap<String, String>>;
}

/// Pairs given explicitly on the command line
pub struct ExplicitMapping(BTreeMap<String, String>);

impl ExplicitMapping {
    /// Parse `ACCOUNT=PROFILE` arguments. Unlike the environment source, a
    /// malformed pair here is an error.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut map = BTreeMap::new();
        for pair in pairs {
            let (account, profile) = split_pair(pair.as_ref()).ok_or_else(|| {
                CredentialError::InvalidConfig(format!(
                    "Expected ACCOUNT=PROFILE, got '{}'",
                    pair.as_ref()
                ))
            })?;
            map.insert(account, profile);
        }
        Ok(Self(map))
    }
}

impl MappingSource for ExplicitMapping {
    fn name(&self) -> &str {
        "command line"
    }

    fn candidates(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.0.clone())
    }
}

/// Comma separated pairs from an environment variable
pub struct EnvMapping {
    var: String,
}

impl EnvMapping {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl MappingSource for EnvMapping {
    fn name(&self) -> &str {
        &self.var
    }

    fn candidates(&self) -> Result<BTreeMap<String, String>> {
        match std::env::var(&self.var) {
            Ok(value) => Ok(parse_env_pairs(&self.var, &value)),
            Err(_) => Ok(BTreeMap::new()),
        }
    }
}

/// The `[accounts]` table of the tool settings file
pub struct SettingsMapping(BTreeMap<String, String>);

impl SettingsMapping {
    pub fn new(accounts: BTreeMap<String, String>) -> Self {
        Self(accounts)
    }
}

impl MappingSource for SettingsMapping {
    fn name(&self) -> &str {
        "settings file"
    }

    fn candidates(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.0.clone())
    }
}

/// Accounts named by the profiles themselves: `sso_account_id` for SSO
/// profiles, the account in `role_arn` for role profiles. First profile in
/// file order wins.
pub struct DiscoveredMapping {
    config: Arc<ProfileConfig>,
}

impl DiscoveredMapping {
    pub fn new(config: Arc<ProfileConfig>) -> Self {
        Self { config }
    }
}

impl MappingSource for DiscoveredMapping {
    fn name(&self) -> &str {
        "discovered profiles"
    }

    fn candidates(&self) -> Result<BTreeMap<String, String>> {
        let mut map = BTreeMap::new();

        for name in self.config.profile_names() {
            let profile = self.config.get_profile(&name)?;
            let Some(role) = profile.role_reference else {
                continue;
            };

            if let Some(existing) = map.get(&role.account_id) {
                tracing::debug!(
                    "Account {} already discovered via '{}', ignoring '{}'",
                    role.account_id,
                    existing,
                    name
                );
                continue;
            }
            map.insert(role.account_id, name);
        }

        Ok(map)
    }
}

/// Merges mapping sources key by key. Sources are added highest precedence first.
#[derive(Default)]
pub struct PrecedenceProfileMapper {
    sources: Vec<Box<dyn MappingSource>>,
}

impl PrecedenceProfileMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl MappingSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn resolve(&self) -> Result<AccountProfileMap> {
        let mut merged: BTreeMap<String, (String, &str)> = BTreeMap::new();

        for source in self.sources.iter().rev() {
            for (account, profile) in source.candidates()? {
                if let Some((previous, from)) = merged.get(&account) {
                    tracing::debug!(
                        "Account {}: '{}' from {} overrides '{}' from {}",
                        account,
                        profile,
                        source.name(),
                        previous,
                        from
                    );
                }
                merged.insert(account, (profile, source.name()));
            }
        }

        for (account, (profile, from)) in &merged {
            tracing::debug!("Account {} -> profile '{}' ({})", account, profile, from);
        }

        Ok(merged
            .into_iter()
            .map(|(account, (profile, _))| (account, profile))
            .collect())
    }
}

fn split_pair(pair: &str) -> Option<(String, String)> {
    let (account, profile) = pair.split_once('=')?;
    let account = account.trim();
    let profile = profile.trim();
    if account.is_empty() || profile.is_empty() {
        return None;
    }
    Some((account.to_string(), profile.to_string()))
}

fn parse_env_pairs(var: &str, value: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for pair in value.split(',').filter(|p| !p.trim().is_empty()) {
        match split_pair(pair) {
            Some((account, profile)) => {
                map.insert(account, profile);
            }
            None => tracing::warn!("Ignoring malformed entry '{}' in {}", pair.trim(), var),
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::tests::sample_config;

    struct Fixed(&'static str, Vec<(&'static str, &'static str)>);

    impl MappingSource for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn candidates(&self) -> Result<BTreeMap<String, String>> {
            Ok(self
                .1
                .iter()
                .map(|(a, p)| (a.to_string(), p.to_string()))
                .collect())
        }
    }

    #[test]
    fn test_higher_precedence_wins_per_key() {
        let map = PrecedenceProfileMapper::new()
            .with_source(Fixed("high", vec![("111", "explicit")]))
            .with_source(Fixed("low", vec![("111", "fallback"), ("222", "only-low")]))
            .resolve()
            .unwrap();

        assert_eq!(map.profile_for("111"), Some("explicit"));
        // Key-wise merge: the low source still contributes accounts it alone knows
        assert_eq!(map.profile_for("222"), Some("only-low"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_no_sources_is_empty() {
        assert!(PrecedenceProfileMapper::new().resolve().unwrap().is_empty());
    }

    #[test]
    fn test_explicit_pairs() {
        let explicit =
            ExplicitMapping::from_pairs(&["111111111111=dev-sso", " 222222222222 = prod "]).unwrap();
        let candidates = explicit.candidates().unwrap();
        assert_eq!(candidates.get("111111111111").map(String::as_str), Some("dev-sso"));
        assert_eq!(candidates.get("222222222222").map(String::as_str), Some("prod"));

        assert!(matches!(
            ExplicitMapping::from_pairs(&["no-separator"]),
            Err(CredentialError::InvalidConfig(_))
        ));
        assert!(ExplicitMapping::from_pairs(&["111="]).is_err());
    }

    #[test]
    fn test_env_pairs_skip_malformed_entries() {
        let map = parse_env_pairs("X", "111=a, bogus ,222=b,,=c");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("111").map(String::as_str), Some("a"));
        assert_eq!(map.get("222").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_env_source_reads_variable() {
        let var = "AWSMP_TEST_MAPPER_PROFILES";
        std::env::set_var(var, "555555555555=from-env");
        let candidates = EnvMapping::new(var).candidates().unwrap();
        std::env::remove_var(var);

        assert_eq!(
            candidates.get("555555555555").map(String::as_str),
            Some("from-env")
        );
        assert!(EnvMapping::new("AWSMP_TEST_MAPPER_UNSET").candidates().unwrap().is_empty());
    }

    #[test]
    fn test_discovered_from_profiles() {
        let discovered = DiscoveredMapping::new(Arc::new(sample_config()))
            .candidates()
            .unwrap();

        assert_eq!(discovered.get("111111111111").map(String::as_str), Some("dev-sso"));
        assert_eq!(discovered.get("222222222222").map(String::as_str), Some("prod-static"));
        assert_eq!(discovered.get("333333333333").map(String::as_str), Some("modern-sso"));
        // broken-sso has no role name, default has no role at all
        assert!(!discovered.contains_key("444444444444"));
        assert_eq!(discovered.len(), 3);
    }

    #[test]
    fn test_full_precedence_chain() {
        let var = "AWSMP_TEST_MAPPER_CHAIN";
        std::env::set_var(var, "111111111111=env-profile,222222222222=env-prod");

        let mut accounts = BTreeMap::new();
        accounts.insert("222222222222".to_string(), "settings-prod".to_string());
        accounts.insert("777777777777".to_string(), "settings-only".to_string());

        let map = PrecedenceProfileMapper::new()
            .with_source(ExplicitMapping::from_pairs(&["111111111111=cli-profile"]).unwrap())
            .with_source(EnvMapping::new(var))
            .with_source(SettingsMapping::new(accounts))
            .with_source(DiscoveredMapping::new(Arc::new(sample_config())))
            .resolve()
            .unwrap();
        std::env::remove_var(var);

        assert_eq!(map.profile_for("111111111111"), Some("cli-profile"));
        assert_eq!(map.profile_for("222222222222"), Some("env-prod"));
        assert_eq!(map.profile_for("777777777777"), Some("settings-only"));
        assert_eq!(map.profile_for("333333333333"), Some("modern-sso"));
        assert_eq!(map.len(), 4);
    }
}
