//! Data models for Atlas API entities.
//!
//! This module contains the records the API exchanges:
//!
//! - `Feature`, `FeatureCreate`: extraction fields defined for papers
//! - `Paper`, `PaperList`: uploaded papers and paginated listings
//! - `ProcessingTask`: server-side processing work tracked by id
//! - `ServerMessage`: free-form acknowledgement bodies

pub mod feature;
pub mod message;
pub mod paper;
pub mod task;

pub use feature::{Feature, FeatureCreate, FeatureType};
pub use message::ServerMessage;
pub use paper::{Paper, PaperList};
pub use task::ProcessingTask;

use serde::{Deserialize, Deserializer};

/// Decode `null` as the type's default instead of failing.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
