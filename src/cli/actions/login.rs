use anyhow::Result;

use crate::{config::AppConfig, session::Credentials};

#[derive(Debug)]
pub struct Args {
    pub config: AppConfig,
    pub credentials: Credentials,
}

/// Sign in with the given credentials.
/// # Errors
/// Returns the server-provided message when the sign-in is rejected.
pub async fn execute(args: Args) -> Result<()> {
    let session = super::mounted_session(&args.config).await?;
    let user = session.sign_in(&args.credentials).await?;
    println!("Signed in as {} ({})", user.email, user.role);
    Ok(())
}
