// CLI interface
pub mod commands;

use crate::config::Settings;
use crate::credentials::CredentialResolver;
use crate::env;
use crate::error::{CredentialError, Result};
use crate::models::Mode;
use crate::profile::mapper::{DiscoveredMapping, EnvMapping, ExplicitMapping, SettingsMapping};
use crate::profile::{AccountProfileMap, PrecedenceProfileMapper, ProfileConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "awsmp")]
#[command(about = "Resolve AWS credentials per account from SSO and static profiles", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AWS config file holding the profiles
    #[arg(long, env = "AWS_CONFIG_FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Shared credentials file handed to static profiles
    #[arg(long, env = "AWS_SHARED_CREDENTIALS_FILE", global = true)]
    pub credentials_file: Option<PathBuf>,

    /// Map an account to a profile, overriding every other source (repeatable)
    #[arg(long = "map", value_name = "ACCOUNT=PROFILE", global = true)]
    pub mappings: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve credentials for an account
    Credentials {
        /// Target account id
        account_id: String,

        /// Access mode of the request (only logged)
        #[arg(long, value_enum, default_value_t = Mode::ForReading)]
        mode: Mode,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Env)]
        format: OutputFormat,
    },

    /// Check whether an account can be served
    Check {
        /// Target account id
        account_id: String,
    },

    /// Show the account to profile mapping
    Profiles {
        /// Output in JSON format for scripting
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    ///
    /// INSTALLATION:
    ///
    /// Bash:
    ///   eval "$(awsmp completions bash)"    # Add to ~/.bashrc
    ///
    /// Zsh:
    ///   eval "$(awsmp completions zsh)"     # Add to ~/.zshrc
    ///
    /// Fish:
    ///   awsmp completions fish > ~/.config/fish/completions/awsmp.fish
    Completions {
        /// Shell type to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Shell export statements
    Env,
    /// Pretty JSON
    Json,
    /// AWS `credential_process` document
    Process,
}

#[derive(Debug, Clone, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Everything loaded from disk and the environment before resolving
pub struct Context {
    pub profile_config: Arc<ProfileConfig>,
    pub credentials_file: PathBuf,
    pub profiles: AccountProfileMap,
}

impl Context {
    pub fn load(args: &Cli) -> Result<Self> {
        let explicit = ExplicitMapping::from_pairs(&args.mappings)?;

        let config_file = match &args.config_file {
            Some(path) => path.clone(),
            None => env::config_file_path()?,
        };
        let credentials_file = match &args.credentials_file {
            Some(path) => path.clone(),
            None => env::credentials_file_path()?,
        };

        tracing::debug!(
            "Using config file {} and credentials file {}",
            config_file.display(),
            credentials_file.display()
        );

        let profile_config = Arc::new(ProfileConfig::load(config_file)?);
        let settings = Settings::load()?;

        let mut mapper = PrecedenceProfileMapper::new()
            .with_source(explicit)
            .with_source(EnvMapping::new(env::PROFILES_VAR))
            .with_source(SettingsMapping::new(settings.accounts));
        if settings.discovery.enabled {
            mapper = mapper.with_source(DiscoveredMapping::new(profile_config.clone()));
        }

        let profiles = mapper.resolve()?;
        tracing::debug!("{} account(s) mapped to profiles", profiles.len());

        Ok(Self {
            profiles,
            profile_config,
            credentials_file,
        })
    }

    pub fn resolver(self) -> Result<CredentialResolver> {
        CredentialResolver::builder(self.profiles, self.credentials_file, self.profile_config)
            .build()
    }
}

pub async fn execute(args: Cli) -> Result<()> {
    run(args, env::is_disabled()).await
}

/// Dispatch a parsed command. When `disabled`, nothing is loaded and every
/// command but `completions` fails.
async fn run(args: Cli, disabled: bool) -> Result<()> {
    if let Commands::Completions { shell } = &args.command {
        commands::completions::execute(shell.clone());
        return Ok(());
    }

    if disabled {
        return Err(CredentialError::Disabled(env::IGNORE_VAR));
    }

    let context = Context::load(&args)?;

    match args.command {
        Commands::Credentials {
            account_id,
            mode,
            format,
        } => commands::credentials::execute(context, &account_id, mode, format).await,
        Commands::Check { account_id } => commands::check::execute(context, &account_id).await,
        Commands::Profiles { json } => commands::profiles::execute(context, json),
        Commands::Completions { .. } => Ok(()),
    }
}
