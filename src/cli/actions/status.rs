use anyhow::Result;
use secrecy::ExposeSecret;

use crate::{
    config::AppConfig,
    session::{token, Claims},
};

#[derive(Debug)]
pub struct Args {
    pub config: AppConfig,
}

/// Print the signed-in user, refreshing an expired session first.
/// # Errors
/// Returns an error only if the session cannot be set up from the config.
pub async fn execute(args: Args) -> Result<()> {
    let session = super::mounted_session(&args.config).await?;
    let claims = session
        .token()
        .and_then(|token| token::decode(token.expose_secret()));

    println!(
        "{}",
        render(&args.config.api_base_url, claims.as_ref(), token::now_millis())
    );
    Ok(())
}

fn render(api: &str, claims: Option<&Claims>, now_millis: i64) -> String {
    match claims {
        None => format!("Not signed in ({api})"),
        Some(claims) => format!(
            "Signed in to {api}\n  user:    {}\n  id:      {}\n  role:    {}\n  expires: {}",
            claims.email,
            claims.sub,
            claims.role,
            remaining(claims.exp, now_millis)
        ),
    }
}

fn remaining(exp_secs: i64, now_millis: i64) -> String {
    let left_ms = exp_secs.saturating_mul(1000).saturating_sub(now_millis);
    if left_ms < 0 {
        return "expired".to_string();
    }
    let left = left_ms / 1000;

    let (hours, minutes, seconds) = (left / 3600, left % 3600 / 60, left % 60);
    if hours > 0 {
        format!("in {hours}h {minutes}m")
    } else if minutes > 0 {
        format!("in {minutes}m {seconds}s")
    } else {
        format!("in {seconds}s")
    }
}
