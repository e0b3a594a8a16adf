use thiserror::Error;

/// Failures surfaced by the auth client and the session context.
///
/// `Http` displays as the bare server message so sign-in forms can show it
/// verbatim. Network failures share this type; callers do not need to tell
/// them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("Unable to reach the server: {0}")]
    Network(String),
    #[error("Request timed out. Please try again.")]
    Timeout,
    #[error("Failed to decode response: {0}")]
    Parse(String),
    #[error("Server returned an unreadable access token")]
    InvalidToken,
    #[error("Another sign-in request is already in progress")]
    InFlight,
    #[error("Session storage error: {0}")]
    Store(String),
    #[error("Config error: {0}")]
    Config(String),
}

impl AuthError {
    /// HTTP status for server rejections, `None` for everything else.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether another attempt could reasonably succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(err: std::io::Error) -> Self {
        Self::Store(err.to_string())
    }
}
