//! Client and CLI configuration.
//!
//! `ClientConfig` holds the settings an `AtlasClient` is constructed with.
//! `Config` is the small preferences file the CLI keeps between runs,
//! stored at `~/.config/atlas/config.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config directory paths
pub(crate) const APP_NAME: &str = "atlas";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Production API endpoint
pub const DEFAULT_BASE_URL: &str = "https://atlas.seas.upenn.edu/api";

/// HTTP request timeout in seconds, applied to every request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where persisted session tokens live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    #[default]
    File,
    Keyring,
}

impl std::str::FromStr for TokenStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(TokenStoreKind::File),
            "keyring" => Ok(TokenStoreKind::Keyring),
            other => Err(anyhow::anyhow!("unknown token store: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub auto_save_token: bool,
    pub token_store: TokenStoreKind,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auto_save_token: true,
            token_store: TokenStoreKind::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(&base_url.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_auto_save_token(mut self, auto_save_token: bool) -> Self {
        self.auto_save_token = auto_save_token;
        self
    }

    pub fn with_token_store(mut self, token_store: TokenStoreKind) -> Self {
        self.token_store = token_store;
        self
    }

    /// Defaults overlaid with `ATLAS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup("ATLAS_BASE_URL") {
            config = config.with_base_url(url);
        }
        if let Some(timeout) = lookup("ATLAS_TIMEOUT_SECS") {
            config.timeout_secs = timeout
                .parse()
                .with_context(|| format!("Invalid ATLAS_TIMEOUT_SECS: {}", timeout))?;
        }
        if let Some(save) = lookup("ATLAS_AUTO_SAVE_TOKEN") {
            config.auto_save_token = parse_bool(&save)
                .with_context(|| format!("Invalid ATLAS_AUTO_SAVE_TOKEN: {}", save))?;
        }
        if let Some(store) = lookup("ATLAS_TOKEN_STORE") {
            config.token_store = store.parse()?;
        }
        Ok(config)
    }
}

pub(crate) fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!("expected a boolean")),
    }
}

/// Preferences the CLI remembers between invocations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Drop `last_email` if it is `email`. Returns whether anything changed.
    pub fn forget_email(&mut self, email: &str) -> bool {
        if self.last_email.as_deref() == Some(email) {
            self.last_email = None;
            true
        } else {
            false
        }
    }

    fn config_path() -> Result<PathBuf> {
        Ok(config_dir()?.join(CONFIG_FILE))
    }
}

/// `~/.config/atlas` (or the platform equivalent).
pub fn config_dir() -> Result<PathBuf> {
    let config_dir =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
    Ok(config_dir.join(APP_NAME))
}
