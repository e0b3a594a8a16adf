use clap::{Arg, Command};
use std::path::PathBuf;

use crate::config::{ENV_API_URL, ENV_REFRESH_RETRIES, ENV_STORE_DIR, ENV_TIMEOUT_SECONDS};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_TIMEOUT: &str = "timeout";
pub const ARG_REFRESH_RETRIES: &str = "refresh-retries";
pub const ARG_STORE_DIR: &str = "store-dir";

/// Connection arguments shared by every subcommand. No clap defaults: unset
/// values fall through to `AppConfig`.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("OpsPilot API base URL (default: http://localhost:8080)")
                .env(ENV_API_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("Per-request timeout in seconds (default: 10)")
                .env(ENV_TIMEOUT_SECONDS)
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_REFRESH_RETRIES)
                .long(ARG_REFRESH_RETRIES)
                .help("Extra attempts for a failed token refresh (default: 2)")
                .env(ENV_REFRESH_RETRIES)
                .global(true)
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_STORE_DIR)
                .long(ARG_STORE_DIR)
                .help("Directory holding the stored session")
                .long_help(
                    "Directory holding the stored session. One file per API origin; defaults to <config dir>/opspilot.",
                )
                .env(ENV_STORE_DIR)
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
}
