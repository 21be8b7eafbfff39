use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use keyring::Entry;

use super::{StoredToken, TokenStore};

const SERVICE_NAME: &str = "atlas-sdk";

/// Session tokens in the OS keychain, one entry per email.
///
/// Entries are opened once per email and reused; clones share them.
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    service: String,
    entries: Arc<Mutex<HashMap<String, Arc<Entry>>>>,
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Arc::default(),
        }
    }

    fn entry(&self, email: &str) -> Result<Arc<Entry>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("keyring entry cache poisoned"))?;
        if let Some(entry) = entries.get(email) {
            return Ok(Arc::clone(entry));
        }
        let entry = Arc::new(
            Entry::new(&self.service, email).context("Failed to create keyring entry")?,
        );
        entries.insert(email.to_string(), Arc::clone(&entry));
        Ok(entry)
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self, email: &str) -> Result<Option<StoredToken>> {
        match self.entry(email)?.get_password() {
            Ok(secret) => {
                let token = serde_json::from_str(&secret)
                    .context("Failed to parse token from keychain")?;
                Ok(Some(token))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn save(&self, email: &str, token: &StoredToken) -> Result<()> {
        let secret = serde_json::to_string(token)?;
        self.entry(email)?
            .set_password(&secret)
            .context("Failed to store token in keychain")
    }

    fn delete(&self, email: &str) -> Result<()> {
        match self.entry(email)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}
