pub mod login;
pub mod logout;
pub mod register;
pub mod status;

mod navigator;
// Interpreter for `Action`; new variants get a matching arm in `run::execute`.
mod run;

use crate::{config::AppConfig, session::SessionContext};
use std::sync::Arc;

#[derive(Debug)]
pub enum Action {
    Login(login::Args),
    Register(register::Args),
    Logout(logout::Args),
    Status(status::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}

/// Session context for `config` after the mount-time check has settled.
async fn mounted_session(config: &AppConfig) -> anyhow::Result<SessionContext> {
    let session = SessionContext::from_config(config, Arc::new(navigator::TerminalNavigator))?;
    session.mount().await;
    Ok(session)
}
