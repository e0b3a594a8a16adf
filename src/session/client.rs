//! HTTP client for the platform auth endpoints. Every request goes through a
//! cookie-aware `reqwest` client so the server's `HttpOnly` refresh cookie
//! round-trips like it would in a browser. The jar can be exported and
//! restored so the cookie outlives a single process. Credentials, tokens and
//! cookies are never logged.

use rand::Rng;
use reqwest::{
    cookie::{CookieStore, Jar},
    Client, Response,
};
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{
    error::AuthError,
    types::{AuthResponse, Credentials},
};
use crate::{config::AppConfig, APP_USER_AGENT};

pub const REGISTER_PATH: &str = "/api/auth/register";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// Maximum number of error body characters surfaced to the caller.
const MAX_ERROR_CHARS: usize = 200;

/// Bounded exponential backoff with jitter, applied to `refresh` only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_retries(retries: u32) -> Self {
        Self {
            retries,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (zero based), jitter excluded.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn delay(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let jitter = if base_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..base_ms)
        };
        self.backoff(attempt) + Duration::from_millis(jitter)
    }
}

#[derive(Clone, Debug)]
pub struct AuthClient {
    http: Client,
    jar: Arc<Jar>,
    base_url: Url,
    refresh_retry: RetryPolicy,
}

impl AuthClient {
    /// Builds a client against `base_url` with a cookie store and request timeout.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the HTTP client cannot be initialised.
    pub fn new(
        base_url: Url,
        timeout: Duration,
        refresh_retry: RetryPolicy,
    ) -> Result<Self, AuthError> {
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()
            .map_err(|err| AuthError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            jar,
            base_url,
            refresh_retry,
        })
    }

    /// Builds a client from application configuration.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the base URL is invalid or the client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, AuthError> {
        Self::new(
            config.api_url()?,
            config.request_timeout,
            RetryPolicy::with_retries(config.refresh_retries),
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Cookies the jar would send to the API origin, as a `Cookie` header
    /// value (`name=value; name2=value2`). `None` when the jar is empty.
    #[must_use]
    pub fn cookies(&self) -> Option<String> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|value| value.to_str().ok().map(ToString::to_string))
            .filter(|value| !value.trim().is_empty())
    }

    /// Seeds the jar from a value previously returned by [`AuthClient::cookies`].
    pub fn restore_cookies(&self, header: &str) {
        for pair in header.split(';').map(str::trim).filter(|pair| pair.contains('=')) {
            self.jar
                .add_cookie_str(&format!("{pair}; Path=/"), &self.base_url);
        }
    }

    /// Creates an account and returns its first access token.
    ///
    /// # Errors
    /// Returns `AuthError::Http` carrying the server text on rejection, or a
    /// network/timeout/parse error.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn register(&self, credentials: &Credentials) -> Result<AuthResponse, AuthError> {
        self.post_credentials(REGISTER_PATH, credentials, "Registration failed")
            .await
    }

    /// Exchanges credentials for an access token.
    ///
    /// # Errors
    /// Returns `AuthError::Http` carrying the server text on rejection, or a
    /// network/timeout/parse error.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, AuthError> {
        self.post_credentials(LOGIN_PATH, credentials, "Login failed")
            .await
    }

    /// Invalidates the server-side session. Best effort: failures are logged
    /// and dropped because local sign-out proceeds regardless.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        match self.post_empty(LOGOUT_PATH).await {
            Ok(response) if response.status().is_success() => debug!("server session closed"),
            Ok(response) => warn!("logout returned {}", response.status()),
            Err(err) => warn!("logout request failed: {err}"),
        }
    }

    /// Obtains a fresh access token using the refresh cookie.
    ///
    /// Transient failures (network, timeout, 5xx) are retried per the
    /// configured [`RetryPolicy`]; client errors are final.
    ///
    /// # Errors
    /// Returns `AuthError::Http` with a generic message on rejection, or the
    /// last transient error once retries are exhausted.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<AuthResponse, AuthError> {
        let mut attempt = 0;
        loop {
            match self.refresh_once().await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt < self.refresh_retry.retries => {
                    let delay = self.refresh_retry.delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        "token refresh failed ({err}), retrying in {delay:?}"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn refresh_once(&self) -> Result<AuthResponse, AuthError> {
        let response = self.post_empty(REFRESH_PATH).await?;
        if response.status().is_success() {
            return parse_auth_response(response).await;
        }

        Err(AuthError::Http {
            status: response.status().as_u16(),
            message: "Token refresh failed".to_string(),
        })
    }

    async fn post_credentials(
        &self,
        path: &str,
        credentials: &Credentials,
        fallback: &str,
    ) -> Result<AuthResponse, AuthError> {
        let url = build_url(&self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(&credentials.body())
            .send()
            .await?;

        if response.status().is_success() {
            parse_auth_response(response).await
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            debug!("{path} rejected with {status}");
            Err(AuthError::Http {
                status,
                message: sanitize_body(&body, fallback),
            })
        }
    }

    async fn post_empty(&self, path: &str) -> Result<Response, AuthError> {
        let url = build_url(&self.base_url, path);
        Ok(self.http.post(&url).send().await?)
    }
}

/// Joins `path` onto the base URL, tolerating stray slashes on either side.
fn build_url(base_url: &Url, path: &str) -> String {
    let base = base_url.as_str().trim_end_matches('/');
    format!("{}/{}", base, path.trim().trim_start_matches('/'))
}

async fn parse_auth_response(response: Response) -> Result<AuthResponse, AuthError> {
    response
        .json::<AuthResponse>()
        .await
        .map_err(|err| AuthError::Parse(err.to_string()))
}

/// Trims and truncates server error text, falling back when it is empty.
fn sanitize_body(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
