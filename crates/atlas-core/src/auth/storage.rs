use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config;

/// Token file name in the config directory
const TOKENS_FILE: &str = "tokens.json";

/// A persisted session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Key-value persistence of session tokens, keyed by email.
pub trait TokenStore: Send + Sync {
    fn get(&self, email: &str) -> Result<Option<StoredToken>>;
    fn save(&self, email: &str, token: &StoredToken) -> Result<()>;
    fn delete(&self, email: &str) -> Result<()>;
}

/// Tokens kept in process memory only.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<Mutex<HashMap<String, StoredToken>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredToken>>> {
        self.tokens
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, email: &str) -> Result<Option<StoredToken>> {
        Ok(self.lock()?.get(email).cloned())
    }

    fn save(&self, email: &str, token: &StoredToken) -> Result<()> {
        self.lock()?.insert(email.to_string(), token.clone());
        Ok(())
    }

    fn delete(&self, email: &str) -> Result<()> {
        self.lock()?.remove(email);
        Ok(())
    }
}

/// Tokens for all users in one JSON file, readable only by the owner.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/atlas/tokens.json`
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(config::config_dir()?.join(TOKENS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, StoredToken>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file {}", self.path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse token file")
    }

    /// Like `read_all`, but an unparsable file counts as empty so the next
    /// write replaces it.
    fn read_for_update(&self) -> Result<HashMap<String, StoredToken>> {
        match self.read_all() {
            Ok(tokens) => Ok(tokens),
            Err(e) if e.downcast_ref::<serde_json::Error>().is_some() => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding unparsable token file"
                );
                Ok(HashMap::new())
            }
            Err(e) => Err(e),
        }
    }

    fn write_all(&self, tokens: &HashMap<String, StoredToken>) -> Result<()> {
        use std::io::Write;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(tokens)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .with_context(|| format!("Failed to open token file {}", self.path.display()))?;

        // `mode` only applies on creation; tighten a file that already existed.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write token file {}", self.path.display()))?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, email: &str) -> Result<Option<StoredToken>> {
        Ok(self.read_all()?.remove(email))
    }

    fn save(&self, email: &str, token: &StoredToken) -> Result<()> {
        let mut tokens = self.read_for_update()?;
        tokens.insert(email.to_string(), token.clone());
        self.write_all(&tokens)
    }

    fn delete(&self, email: &str) -> Result<()> {
        let mut tokens = self.read_for_update()?;
        if tokens.remove(email).is_some() {
            self.write_all(&tokens)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(value: &str) -> StoredToken {
        StoredToken {
            token: value.to_string(),
            expires_at: Utc::now() + Duration::hours(48),
        }
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let store = MemoryTokenStore::new();
        let other = store.clone();
        let t1 = token("t1");
        store.save("a@example.com", &t1).unwrap();
        assert_eq!(other.get("a@example.com").unwrap(), Some(t1));
        other.delete("a@example.com").unwrap();
        assert!(store.get("a@example.com").unwrap().is_none());
    }

    #[test]
    fn test_file_store_keeps_users_apart() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("atlas").join("tokens.json"));

        assert!(store.get("a@example.com").unwrap().is_none());

        let a = token("token-a");
        let b = token("token-b");
        store.save("a@example.com", &a).unwrap();
        store.save("b@example.com", &b).unwrap();

        assert_eq!(store.get("a@example.com").unwrap(), Some(a));
        store.delete("b@example.com").unwrap();
        assert!(store.get("b@example.com").unwrap().is_none());
        assert!(store.get("a@example.com").unwrap().is_some());
    }

    #[test]
    fn test_file_store_delete_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));
        store.delete("nobody@example.com").unwrap();
        assert!(!store.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));
        store.save("a@example.com", &token("t")).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileTokenStore::new(&path);
        store.save("a@example.com", &token("t")).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileTokenStore::new(&path);
        assert!(store.get("a@example.com").is_err());
        store.delete("a@example.com").unwrap();

        let t = token("fresh");
        store.save("a@example.com", &t).unwrap();
        assert_eq!(store.get("a@example.com").unwrap(), Some(t));
    }

    #[test]
    fn test_stored_token_expiry() {
        let mut t = token("t");
        assert!(!t.is_expired());
        t.expires_at = Utc::now() - Duration::seconds(1);
        assert!(t.is_expired());
    }
}
