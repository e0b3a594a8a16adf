//! Durable session storage: the raw access token plus the HTTP client's cookies
//! (the refresh cookie) so a later process can pick the session up. Expiry and
//! decoding belong to the codec. Storage is scoped per API origin so two
//! deployments never share a session.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::RwLock,
};
use tracing::debug;
use url::Url;

use super::error::AuthError;

/// Persistence seam for the session context.
pub trait SessionStore: Send + Sync {
    /// Returns the stored token, `None` when nothing usable is stored.
    fn load(&self) -> Option<String>;

    /// Replaces the stored token.
    ///
    /// # Errors
    /// Returns `AuthError::Store` if the token cannot be written.
    fn save(&self, token: &str) -> Result<(), AuthError>;

    /// Removes the stored token. Clearing an empty store succeeds.
    ///
    /// # Errors
    /// Returns `AuthError::Store` if the token cannot be removed.
    fn clear(&self) -> Result<(), AuthError>;

    /// Returns the persisted `Cookie` header value for the API origin.
    fn load_cookies(&self) -> Option<String>;

    /// Replaces the persisted cookies; `None` removes them.
    ///
    /// # Errors
    /// Returns `AuthError::Store` if the cookies cannot be written or removed.
    fn save_cookies(&self, cookies: Option<&str>) -> Result<(), AuthError>;
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    #[serde(rename = "accessToken")]
    access_token: String,
}

#[derive(Serialize, Deserialize)]
struct StoredCookies {
    cookies: String,
}

/// File-backed store: `<origin>.json` holds the token and
/// `<origin>.cookies.json` the cookie jar, both owner-only on Unix.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    cookies_path: PathBuf,
}

impl FileStore {
    /// Store for `origin` inside `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, origin: &Url) -> Self {
        let dir = dir.into();
        let key = origin_key(origin);
        Self {
            path: dir.join(format!("{key}.json")),
            cookies_path: dir.join(format!("{key}.cookies.json")),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn cookies_path(&self) -> &Path {
        &self.cookies_path
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            debug!("failed to read {}: {err}", path.display());
            return None;
        }
    };

    match serde_json::from_slice(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("ignoring malformed file {}: {err}", path.display());
            None
        }
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // A leftover temp file would keep its old mode through the rename.
    let tmp = path.with_extension("tmp");
    match fs::remove_file(&tmp) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&tmp)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()?;
    fs::rename(&tmp, path)
}

fn remove_if_present(path: &Path) -> Result<(), AuthError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("{} removed", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Option<String> {
        read_json::<StoredSession>(&self.path)
            .map(|stored| stored.access_token)
            .filter(|token| !token.is_empty())
    }

    fn save(&self, token: &str) -> Result<(), AuthError> {
        let stored = StoredSession {
            access_token: token.to_string(),
        };
        let contents = serde_json::to_vec(&stored)
            .map_err(|err| AuthError::Store(format!("Failed to encode session: {err}")))?;
        write_atomically(&self.path, &contents)?;
        debug!("session saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        remove_if_present(&self.path)
    }

    fn load_cookies(&self) -> Option<String> {
        read_json::<StoredCookies>(&self.cookies_path)
            .map(|stored| stored.cookies)
            .filter(|cookies| !cookies.trim().is_empty())
    }

    fn save_cookies(&self, cookies: Option<&str>) -> Result<(), AuthError> {
        let Some(cookies) = cookies.filter(|cookies| !cookies.trim().is_empty()) else {
            return remove_if_present(&self.cookies_path);
        };
        let stored = StoredCookies {
            cookies: cookies.to_string(),
        };
        let contents = serde_json::to_vec(&stored)
            .map_err(|err| AuthError::Store(format!("Failed to encode cookies: {err}")))?;
        write_atomically(&self.cookies_path, &contents)?;
        Ok(())
    }
}

/// In-process store for tests and embedders that manage persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    token: RwLock<Option<String>>,
    cookies: RwLock<Option<String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
            cookies: RwLock::new(None),
        }
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Option<String> {
        self.token.read().ok()?.clone()
    }

    fn save(&self, token: &str) -> Result<(), AuthError> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| AuthError::Store("session lock poisoned".to_string()))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| AuthError::Store("session lock poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }

    fn load_cookies(&self) -> Option<String> {
        self.cookies.read().ok()?.clone()
    }

    fn save_cookies(&self, cookies: Option<&str>) -> Result<(), AuthError> {
        let mut guard = self
            .cookies
            .write()
            .map_err(|_| AuthError::Store("session lock poisoned".to_string()))?;
        *guard = cookies.map(ToString::to_string);
        Ok(())
    }
}

/// File-name-safe key for an origin, e.g. `https_api.opspilot.dev_443`.
fn origin_key(origin: &Url) -> String {
    let host = origin.host_str().unwrap_or("local");
    let port = origin
        .port_or_known_default()
        .map_or_else(String::new, |port| format!("_{port}"));

    format!("{}_{host}{port}", origin.scheme())
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
