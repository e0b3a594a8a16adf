use crate::cli::actions::{login, logout, register, status, Action};
use anyhow::Result;

/// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Login(args) => login::execute(args).await,
        Action::Register(args) => register::execute(args).await,
        Action::Logout(args) => logout::execute(args).await,
        Action::Status(args) => status::execute(args).await,
    }
}
