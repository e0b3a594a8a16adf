//! Client-side session lifecycle for the OpsPilot API.
//!
//! Flow summary:
//! - `AuthClient` talks to the `/api/auth/*` endpoints; the refresh credential
//!   travels as an HttpOnly cookie held by the client's cookie jar.
//! - `SessionStore` persists the access token and that cookie between runs.
//! - `token` decodes claims for display; it never verifies signatures.
//! - `SessionContext` owns the state and is the only writer.

pub mod client;
pub mod error;
pub mod state;
pub mod store;
pub mod token;
pub mod types;

pub use client::{AuthClient, RetryPolicy};
pub use error::AuthError;
pub use state::{Navigator, NoopNavigator, SessionContext, SessionState, SessionStatus};
pub use store::{FileStore, MemoryStore, SessionStore};
pub use token::Claims;
pub use types::{AuthResponse, Credentials, Route, User};
