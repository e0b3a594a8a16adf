//! Session context: the single owner of the authenticated-user state. It runs
//! the mount-time check once, performs sign-in, sign-up and sign-out, and
//! publishes every change through a `watch` channel so views re-render from a
//! consistent snapshot. Nothing else writes session state.

use secrecy::{ExposeSecret, SecretString};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::{
    client::AuthClient,
    error::AuthError,
    store::{FileStore, SessionStore},
    token::{self, Claims},
    types::{AuthResponse, Credentials, Route, User},
};
use crate::config::AppConfig;

/// Receives the route changes triggered by session transitions.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator for embedders without routing; only logs the transition.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: Route) {
        debug!("navigate to {}", route.path());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// Snapshot consumed by views.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<SecretString>,
    pub loading: bool,
}

impl SessionState {
    fn initializing() -> Self {
        Self {
            user: None,
            token: None,
            loading: true,
        }
    }

    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        if self.loading {
            SessionStatus::Initializing
        } else if self.user.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        }
    }
}

/// Cheaply cloneable handle; clones share the same state.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

struct Inner {
    client: AuthClient,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<SessionState>,
    mounted: AtomicBool,
    submitting: AtomicBool,
}

/// Clears the in-flight flag when a sign-in or sign-up attempt ends.
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionContext {
    #[must_use]
    pub fn new(
        client: AuthClient,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        if let Some(cookies) = store.load_cookies() {
            debug!("restoring stored cookies");
            client.restore_cookies(&cookies);
        }

        let (state, _) = watch::channel(SessionState::initializing());
        Self {
            inner: Arc::new(Inner {
                client,
                store,
                navigator,
                state,
                mounted: AtomicBool::new(false),
                submitting: AtomicBool::new(false),
            }),
        }
    }

    /// Context backed by the file store for the configured API origin.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the configuration is invalid.
    pub fn from_config(
        config: &AppConfig,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, AuthError> {
        let client = AuthClient::from_config(config)?;
        let store = FileStore::new(&config.store_dir, client.base_url());
        debug!("session store at {}", store.path().display());
        Ok(Self::new(client, Arc::new(store), navigator))
    }

    /// Mount-time check. Restores a stored session, refreshing it once if it
    /// expired. `loading` turns false when this settles; later calls do nothing.
    /// A sign-in or sign-out that lands while the refresh is pending wins over
    /// the refresh outcome.
    #[instrument(skip(self))]
    pub async fn mount(&self) {
        if self.inner.mounted.swap(true, Ordering::AcqRel) {
            debug!("session already mounted");
            return;
        }

        let stored = self.inner.store.load();
        let claims = stored.as_deref().and_then(valid_claims);
        let restored = match claims {
            Some(claims) => {
                debug!("restored stored session");
                stored.map(|token| (token, claims))
            }
            None if stored.is_none() => {
                debug!("no stored session");
                None
            }
            None => {
                let rx = self.inner.state.subscribe();
                let refreshed = self.refresh_on_mount().await;
                if rx.has_changed().unwrap_or(false) {
                    debug!("session changed during refresh, keeping it");
                    self.inner.state.send_modify(|state| state.loading = false);
                    return;
                }
                self.settle_refresh(refreshed)
            }
        };

        self.inner.state.send_modify(|state| {
            match restored {
                Some((token, claims)) => {
                    state.user = Some(claims.user());
                    state.token = Some(SecretString::from(token));
                }
                None => {
                    state.user = None;
                    state.token = None;
                }
            }
            state.loading = false;
        });
    }

    /// Refreshes once, returning a token that decodes and has not expired.
    async fn refresh_on_mount(&self) -> Option<(String, Claims)> {
        debug!("stored session expired, attempting refresh");
        let outcome = self.inner.client.refresh().await;
        self.persist_cookies();
        match outcome {
            Ok(response) => {
                if let Some(claims) = valid_claims(&response.access_token) {
                    info!("session refreshed");
                    return Some((response.access_token, claims));
                }
                warn!("refresh returned an unusable access token");
            }
            Err(err) => info!("session refresh failed: {err}"),
        }
        None
    }

    fn settle_refresh(&self, refreshed: Option<(String, Claims)>) -> Option<(String, Claims)> {
        match &refreshed {
            Some((token, _)) => {
                if let Err(err) = self.inner.store.save(token) {
                    warn!("failed to persist refreshed session: {err}");
                }
            }
            None => self.clear_store(),
        }
        refreshed
    }

    /// Signs in and navigates to the dashboard.
    ///
    /// # Errors
    /// Returns `AuthError::InFlight` while another attempt is pending, the
    /// server or network error on failure, `AuthError::InvalidToken` if the
    /// issued token cannot be decoded or is already expired. State is
    /// unchanged on error.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let _guard = self.begin_submit()?;
        let response = self.inner.client.login(credentials).await;
        self.persist_cookies();
        self.establish(response?)
    }

    /// Registers, signs in and navigates to the dashboard.
    ///
    /// # Errors
    /// Same contract as [`SessionContext::sign_in`].
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn sign_up(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let _guard = self.begin_submit()?;
        let response = self.inner.client.register(credentials).await;
        self.persist_cookies();
        self.establish(response?)
    }

    /// Signs out locally regardless of the server outcome and navigates to sign-in.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        self.inner.client.logout().await;
        self.persist_cookies();
        self.clear_store();
        self.inner.state.send_modify(|state| {
            state.user = None;
            state.token = None;
        });
        info!("signed out");
        self.inner.navigator.navigate(Route::SignIn);
    }

    /// Re-reads the store and converges with whatever another process wrote.
    /// Makes no network calls; skipped while the mount check is pending.
    pub fn resync(&self) -> SessionStatus {
        if self.loading() {
            return SessionStatus::Initializing;
        }

        let stored = self
            .inner
            .store
            .load()
            .and_then(|stored| valid_claims(&stored).map(|claims| (stored, claims)));
        let user = stored.as_ref().map(|(_, claims)| claims.user());

        self.inner.state.send_if_modified(|state| {
            let held = state.token.as_ref().map(|token| token.expose_secret());
            let current = stored.as_ref().map(|(token, _)| token.as_str());
            if state.user == user && held == current {
                return false;
            }
            debug!("session changed outside this process");
            state.user = user;
            state.token = stored.map(|(token, _)| SecretString::from(token));
            true
        });

        self.status()
    }

    fn begin_submit(&self) -> Result<SubmitGuard<'_>, AuthError> {
        self.inner
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AuthError::InFlight)?;
        Ok(SubmitGuard(&self.inner.submitting))
    }

    fn establish(&self, response: AuthResponse) -> Result<User, AuthError> {
        let claims = valid_claims(&response.access_token).ok_or(AuthError::InvalidToken)?;
        self.inner.store.save(&response.access_token)?;

        let user = claims.user();
        self.inner.state.send_modify(|state| {
            state.user = Some(user.clone());
            state.token = Some(SecretString::from(response.access_token));
        });
        info!(role = %user.role, "signed in");
        self.inner.navigator.navigate(Route::Dashboard);
        Ok(user)
    }

    /// Mirrors the client's cookie jar into the store so the refresh cookie
    /// survives the process, and disappears once the server expires it.
    fn persist_cookies(&self) {
        let cookies = self.inner.client.cookies();
        if let Err(err) = self.inner.store.save_cookies(cookies.as_deref()) {
            warn!("failed to persist cookies: {err}");
        }
    }

    fn clear_store(&self) {
        if let Err(err) = self.inner.store.clear() {
            warn!("failed to clear stored session: {err}");
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.inner.state.borrow().token.clone()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }
}

/// Claims of `token` if it decodes and has not expired.
fn valid_claims(token: &str) -> Option<Claims> {
    token::decode(token).filter(|claims| !claims.is_expired_at(token::now_millis()))
}
