use anyhow::{anyhow, Result};
use std::{io, str::FromStr};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("invalid log format: {other}")),
        }
    }
}

fn filter(verbosity_level: Level) -> Result<EnvFilter> {
    // RUST_LOG= still wins over the verbosity flag
    Ok(EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("hyper_util=error".parse()?)
        .add_directive("reqwest=warn".parse()?))
}

/// Initialize logging on stderr; stdout is reserved for command output.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init(verbosity_level: Option<Level>, format: LogFormat) -> Result<()> {
    let filter = filter(verbosity_level.unwrap_or(Level::ERROR))?;

    match format {
        LogFormat::Text => {
            let fmt_layer = fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .compact();
            let subscriber = Registry::default().with(fmt_layer).with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .json();
            let subscriber = Registry::default().with(fmt_layer).with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().ok(), Some(LogFormat::Text));
        assert_eq!(" JSON ".parse::<LogFormat>().ok(), Some(LogFormat::Json));
        assert!("yaml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn test_filter_builds_for_every_level() {
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            assert!(filter(level).is_ok());
        }
    }
}
