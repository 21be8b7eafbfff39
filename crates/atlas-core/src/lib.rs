//! Client library for the Atlas research paper API.
//!
//! The crate is split the same way the remote service is:
//!
//! - [`auth`]: magic-link login, session tokens and their persistence
//! - [`api`]: the [`AtlasClient`] façade over features, papers and projects
//! - [`models`]: the JSON records the API sends and accepts
//! - [`config`]: client settings and the CLI's persisted preferences
//!
//! ```no_run
//! # async fn run() -> atlas_core::Result<()> {
//! use atlas_core::{AtlasClient, ClientConfig, LoginOutcome};
//!
//! let mut client = AtlasClient::new(ClientConfig::default())?;
//! if let LoginOutcome::MagicLinkSent { .. } = client.login("user@example.com", true).await? {
//!     client.validate_magic_link("token-from-email", None).await?;
//! }
//! let features = client.list_features(None).await?;
//! # Ok(()) }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{AtlasClient, AtlasError, DEFAULT_STRATEGY};
pub use auth::{
    AuthManager, AuthState, FileTokenStore, KeyringTokenStore, LoginOutcome, MemoryTokenStore,
    Session, StoredToken, TokenStore,
};
pub use config::{ClientConfig, Config, TokenStoreKind};
pub use models::{Feature, FeatureCreate, FeatureType, Paper, PaperList, ProcessingTask, ServerMessage};

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, AtlasError>;
