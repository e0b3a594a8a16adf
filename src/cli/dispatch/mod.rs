use crate::{
    cli::{
        actions::{login, logout, register, status, Action},
        commands::{
            api::{ARG_API_URL, ARG_REFRESH_RETRIES, ARG_STORE_DIR, ARG_TIMEOUT},
            session::{
                ARG_EMAIL, ARG_PASSWORD, SUBCOMMAND_LOGIN, SUBCOMMAND_LOGOUT,
                SUBCOMMAND_REGISTER, SUBCOMMAND_STATUS,
            },
        },
    },
    config::{normalize_value, AppConfig, ConfigOverrides},
    session::Credentials,
};
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use std::{path::PathBuf, time::Duration};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let config = config(matches)?;

    match matches.subcommand() {
        Some((SUBCOMMAND_LOGIN, sub)) => Ok(Action::Login(login::Args {
            config,
            credentials: credentials(sub)?,
        })),
        Some((SUBCOMMAND_REGISTER, sub)) => Ok(Action::Register(register::Args {
            config,
            credentials: credentials(sub)?,
        })),
        Some((SUBCOMMAND_LOGOUT, _)) => Ok(Action::Logout(logout::Args { config })),
        Some((SUBCOMMAND_STATUS, _)) => Ok(Action::Status(status::Args { config })),
        Some((other, _)) => Err(anyhow!("unknown subcommand: {other}")),
        None => Err(anyhow!("missing subcommand")),
    }
}

/// Environment defaults with command-line values layered on top.
fn config(matches: &ArgMatches) -> Result<AppConfig> {
    let mut config = AppConfig::load();
    config.apply_overrides(ConfigOverrides {
        api_base_url: matches
            .get_one::<String>(ARG_API_URL)
            .and_then(|value| normalize_value(value)),
        request_timeout: matches
            .get_one::<u64>(ARG_TIMEOUT)
            .map(|secs| Duration::from_secs(*secs)),
        refresh_retries: matches.get_one::<u32>(ARG_REFRESH_RETRIES).copied(),
        store_dir: matches.get_one::<PathBuf>(ARG_STORE_DIR).cloned(),
    });

    config
        .api_url()
        .with_context(|| format!("invalid --{ARG_API_URL}: {}", config.api_base_url))?;

    Ok(config)
}

fn credentials(matches: &ArgMatches) -> Result<Credentials> {
    let email = matches
        .get_one::<String>(ARG_EMAIL)
        .and_then(|value| normalize_value(value))
        .context("missing required argument: --email")?;
    let password = matches
        .get_one::<String>(ARG_PASSWORD)
        .filter(|value| !value.is_empty())
        .context("missing required argument: --password")?;

    Ok(Credentials::new(email, password.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    const ENV_VARS: [&str; 8] = [
        "OPSPILOT_API_URL",
        "OPSPILOT_TIMEOUT_SECONDS",
        "OPSPILOT_REFRESH_RETRIES",
        "OPSPILOT_STORE_DIR",
        "OPSPILOT_LOG_LEVEL",
        "OPSPILOT_LOG_FORMAT",
        "OPSPILOT_EMAIL",
        "OPSPILOT_PASSWORD",
    ];

    fn dispatch(args: &[&str]) -> Result<Action> {
        temp_env::with_vars(
            ENV_VARS.iter().map(|key| (*key, None::<&str>)).collect::<Vec<_>>(),
            || handler(&commands::new().get_matches_from(args)),
        )
    }

    #[test]
    fn test_login_action() -> Result<()> {
        let action = dispatch(&[
            "opspilot",
            "--api-url",
            " https://api.opspilot.dev ",
            "--timeout",
            "4",
            "--store-dir",
            "/tmp/opspilot",
            "login",
            "--email",
            " a@b.com ",
            "--password",
            "pw",
        ])?;

        let Action::Login(args) = action else {
            return Err(anyhow!("expected login action"));
        };
        assert_eq!(args.config.api_base_url, "https://api.opspilot.dev");
        assert_eq!(args.config.request_timeout, Duration::from_secs(4));
        assert_eq!(args.config.refresh_retries, 2);
        assert_eq!(args.config.store_dir, PathBuf::from("/tmp/opspilot"));
        assert_eq!(args.credentials.email, "a@b.com");
        assert_eq!(args.credentials.password.expose_secret(), "pw");
        Ok(())
    }

    #[test]
    fn test_register_action() -> Result<()> {
        let action = dispatch(&[
            "opspilot",
            "register",
            "-e",
            "new@b.com",
            "-p",
            "secret",
            "--refresh-retries",
            "0",
        ])?;

        let Action::Register(args) = action else {
            return Err(anyhow!("expected register action"));
        };
        assert_eq!(args.credentials.email, "new@b.com");
        assert_eq!(args.config.refresh_retries, 0);
        assert_eq!(args.config.api_base_url, "http://localhost:8080");
        Ok(())
    }

    #[test]
    fn test_logout_and_status_actions() -> Result<()> {
        assert!(matches!(dispatch(&["opspilot", "logout"])?, Action::Logout(_)));
        assert!(matches!(dispatch(&["opspilot", "status"])?, Action::Status(_)));
        Ok(())
    }

    #[test]
    fn test_invalid_api_url() {
        let result = dispatch(&["opspilot", "--api-url", "ftp://files", "status"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_email_is_rejected() {
        let result = dispatch(&["opspilot", "login", "--email", "  ", "--password", "pw"]);
        assert!(result.is_err());
    }
}
