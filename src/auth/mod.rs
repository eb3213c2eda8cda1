// Cached SSO logins and MFA token entry
mod mfa;
mod token_cache;

pub use mfa::{MfaTokenCache, MfaTokenEntry, MfaTokenSource, StdinTokenPrompt, TokenPrompt};
pub use token_cache::SsoLoginCache;

#[cfg(test)]
pub(crate) mod test_support {
    pub(crate) use super::mfa::tests::ScriptedPrompt;
    pub(crate) use super::token_cache::tests::{settings, write_login};
}
