//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `AuthManager`: the magic-link login / validate / check / logout flow
//! - `Session`: the active session token and the cookie it is sent as
//! - `TokenStore`: persistence of session tokens keyed by email, with
//!   file, OS keychain and in-memory implementations
//!
//! Session tokens expire 48 hours after the magic link is validated.

pub mod credentials;
pub mod manager;
pub mod session;
pub mod storage;

pub use credentials::KeyringTokenStore;
pub use manager::{AuthManager, AuthState, LoginOutcome};
pub use session::{Session, SESSION_COOKIE, TOKEN_LIFETIME_HOURS};
pub use storage::{FileTokenStore, MemoryTokenStore, StoredToken, TokenStore};
