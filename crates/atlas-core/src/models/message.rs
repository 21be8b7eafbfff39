use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Acknowledgement body returned by mutating endpoints.
///
/// Only `message` is common to all of them; anything else the server
/// sends is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerMessage {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}
