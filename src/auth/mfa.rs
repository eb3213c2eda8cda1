use crate::error::{CredentialError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// MFA codes already entered during this run, keyed by (device serial, code)
#[derive(Debug, Default)]
pub struct MfaTokenCache {
    used: Mutex<HashSet<(String, String)>>,
}

impl MfaTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, serial: &str, token: &str) -> bool {
        self.used
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(serial.to_string(), token.to_string()))
    }

    pub fn set(&self, serial: &str, token: &str) {
        self.used
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((serial.to_string(), token.to_string()));
    }
}

/// Supplies an MFA code for a device serial. Handed to the static resolver.
#[async_trait]
pub trait MfaTokenSource: Send + Sync {
    async fn token_code(&self, serial: &str) -> Result<String>;
}

/// Raw interactive input. `rejection` carries the reason the previous entry was refused.
#[async_trait]
pub trait TokenPrompt: Send + Sync {
    async fn read_token(&self, serial: &str, rejection: Option<&str>) -> Result<String>;
}

/// Prompts until a code not yet used in this run is entered, then records it
pub struct MfaTokenEntry {
    cache: Arc<MfaTokenCache>,
    prompt: Arc<dyn TokenPrompt>,
}

impl MfaTokenEntry {
    pub fn new(cache: Arc<MfaTokenCache>, prompt: Arc<dyn TokenPrompt>) -> Self {
        Self { cache, prompt }
    }

    fn validate(&self, serial: &str, token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(CredentialError::Prompt("MFA token must not be empty".to_string()));
        }
        if self.cache.has(serial, token) {
            return Err(CredentialError::DuplicateMfaToken {
                serial: serial.to_string(),
                token: token.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MfaTokenSource for MfaTokenEntry {
    async fn token_code(&self, serial: &str) -> Result<String> {
        let mut rejection: Option<String> = None;

        loop {
            let input = self.prompt.read_token(serial, rejection.as_deref()).await?;
            let token = input.trim();

            match self.validate(serial, token) {
                Ok(()) => {
                    self.cache.set(serial, token);
                    return Ok(token.to_string());
                }
                Err(e) => {
                    tracing::debug!("Rejected MFA entry for {}: {}", serial, e);
                    rejection = Some(e.to_string());
                }
            }
        }
    }
}

/// Reads codes from the terminal. The prompt goes to stderr so stdout stays clean.
pub struct StdinTokenPrompt;

#[async_trait]
impl TokenPrompt for StdinTokenPrompt {
    async fn read_token(&self, serial: &str, rejection: Option<&str>) -> Result<String> {
        let serial = serial.to_string();
        let rejection = rejection.map(str::to_string);

        tokio::task::spawn_blocking(move || -> Result<String> {
            let mut stderr = io::stderr();
            if let Some(reason) = rejection {
                writeln!(stderr, ">> {}", reason)?;
            }
            write!(stderr, "MFA token for {}: ", serial)?;
            stderr.flush()?;

            let mut line = String::new();
            let read = io::stdin().lock().read_line(&mut line)?;
            if read == 0 {
                return Err(CredentialError::Prompt(
                    "stdin closed before an MFA token was entered".to_string(),
                ));
            }
            Ok(line)
        })
        .await
        .map_err(|e| CredentialError::Prompt(format!("MFA prompt task failed: {}", e)))?
    }
}
