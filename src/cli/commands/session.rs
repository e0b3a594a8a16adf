use clap::{Arg, Command};

pub const SUBCOMMAND_LOGIN: &str = "login";
pub const SUBCOMMAND_REGISTER: &str = "register";
pub const SUBCOMMAND_LOGOUT: &str = "logout";
pub const SUBCOMMAND_STATUS: &str = "status";

pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";

#[must_use]
pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand(with_credentials(
            Command::new(SUBCOMMAND_LOGIN).about("Sign in and store the session"),
        ))
        .subcommand(with_credentials(
            Command::new(SUBCOMMAND_REGISTER).about("Create an account and sign in"),
        ))
        .subcommand(Command::new(SUBCOMMAND_LOGOUT).about("Sign out and forget the stored session"))
        .subcommand(Command::new(SUBCOMMAND_STATUS).about("Show the signed-in user"))
}

fn with_credentials(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_EMAIL)
                .short('e')
                .long(ARG_EMAIL)
                .help("Account email")
                .env("OPSPILOT_EMAIL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .short('p')
                .long(ARG_PASSWORD)
                .help("Account password")
                .env("OPSPILOT_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
}
