use crate::cli::{Cli, Shell};
use clap::CommandFactory;
use clap_complete::{generate, Shell as ClapShell};
use std::io::{self, Write};

const BIN_NAME: &str = "awsmp";

impl From<Shell> for ClapShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => ClapShell::Bash,
            Shell::Zsh => ClapShell::Zsh,
            Shell::Fish => ClapShell::Fish,
            Shell::PowerShell => ClapShell::PowerShell,
            Shell::Elvish => ClapShell::Elvish,
        }
    }
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    generate(ClapShell::from(shell), &mut cmd, BIN_NAME, out);
}

fn install_hint(shell: &Shell) -> String {
    match shell {
        Shell::Bash => format!("eval \"$({0} completions bash)\"  # in ~/.bashrc", BIN_NAME),
        Shell::Zsh => format!("eval \"$({0} completions zsh)\"  # in ~/.zshrc", BIN_NAME),
        Shell::Fish => format!(
            "{0} completions fish > ~/.config/fish/completions/{0}.fish",
            BIN_NAME
        ),
        Shell::PowerShell => format!(
            "{} completions powershell | Out-String | Invoke-Expression",
            BIN_NAME
        ),
        Shell::Elvish => format!("eval ({} completions elvish | slurp)", BIN_NAME),
    }
}

pub fn execute(shell: Shell) {
    let hint = install_hint(&shell);
    write_completions(shell, &mut io::stdout());
    eprintln!("\n# Install with:\n#   {}", hint);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completions_name_subcommands() {
        let mut out = Vec::new();
        write_completions(Shell::Bash, &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains(BIN_NAME));
        assert!(script.contains("credentials"));
        assert!(script.contains("profiles"));
    }

    #[test]
    fn test_install_hint_uses_binary_name() {
        assert!(install_hint(&Shell::Fish).contains("fish/completions/awsmp.fish"));
    }
}
