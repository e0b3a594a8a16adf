//! # OpsPilot (Session Client)
//!
//! `opspilot` is the client side of the OpsPilot incident and performance
//! platform's authentication. It keeps a terminal (or any embedding process)
//! signed in against the platform API and exposes the current identity to the
//! views that render dashboards.
//!
//! ## Session Lifecycle
//!
//! The API issues a short-lived access token on register, login and refresh.
//! The token is a compact three-segment credential whose payload carries the
//! subject, email, role, issued-at and expiry claims. The refresh credential
//! never reaches this crate directly; it is an `HttpOnly` cookie that the HTTP
//! client replays automatically.
//!
//! 1. **Mount:** Read the stored token. If it is still valid, decode it and
//!    become authenticated without any network call. If it expired, try a
//!    single refresh; on failure the stored token is removed.
//! 2. **Sign in / sign up:** Exchange credentials for a token, persist it and
//!    navigate to the dashboard.
//! 3. **Sign out:** Tell the server (best effort), forget the token and
//!    navigate to the sign-in view.
//!
//! ## Trust Boundary
//!
//! Claims are decoded without verifying the signature. They drive what the UI
//! shows and nothing else; authorization stays with the server.

pub mod cli;
pub mod config;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
