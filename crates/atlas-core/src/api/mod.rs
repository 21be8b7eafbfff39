//! REST API façade for the Atlas service.
//!
//! `AtlasClient` composes the credential manager's session cookie with
//! one HTTP request per call. Every non-success status is translated by
//! [`AtlasError::from_status`].

pub mod client;
pub mod error;

pub use client::{AtlasClient, DEFAULT_STRATEGY};
pub use error::AtlasError;
