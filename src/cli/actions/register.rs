use anyhow::Result;

use crate::{config::AppConfig, session::Credentials};

#[derive(Debug)]
pub struct Args {
    pub config: AppConfig,
    pub credentials: Credentials,
}

/// Create an account; the server signs the new user in directly.
/// # Errors
/// Returns the server-provided message when registration is rejected.
pub async fn execute(args: Args) -> Result<()> {
    let session = super::mounted_session(&args.config).await?;
    let user = session.sign_up(&args.credentials).await?;
    println!("Account created, signed in as {} ({})", user.email, user.role);
    Ok(())
}
