use anyhow::Result;

use crate::config::AppConfig;

#[derive(Debug)]
pub struct Args {
    pub config: AppConfig,
}

/// Sign out. Always succeeds locally, even if the server is unreachable.
/// # Errors
/// Returns an error only if the session cannot be set up from the config.
pub async fn execute(args: Args) -> Result<()> {
    let session = super::mounted_session(&args.config).await?;
    let previous = session.user();
    session.sign_out().await;
    match previous {
        Some(user) => println!("Signed out {}", user.email),
        None => println!("Signed out"),
    }
    Ok(())
}
