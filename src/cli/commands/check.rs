use crate::cli::Context;
use crate::credentials::CredentialProviderSource;
use crate::error::Result;

pub async fn execute(context: Context, account_id: &str) -> Result<()> {
    let resolver = context.resolver()?;

    let available = resolver.is_available().await;
    let can_provide = resolver.can_provide_credentials(account_id).await;

    println!("Provider available: {}", if available { "yes" } else { "no" });
    match resolver.profiles().profile_for(account_id) {
        Some(profile) => println!("Account {} is served by profile '{}'", account_id, profile),
        None => println!("Account {} is not mapped to any profile", account_id),
    }

    if !(available && can_provide) {
        std::process::exit(1);
    }
    Ok(())
}
