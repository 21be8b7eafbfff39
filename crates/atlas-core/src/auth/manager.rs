//! Magic-link authentication flow.
//!
//! `login` asks the server to email a one-time link; `validate_magic_link`
//! exchanges that link for a session token, which is persisted so later
//! runs can skip the email step until it expires.

use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{Session, StoredToken, TokenStore, SESSION_COOKIE};
use crate::api::AtlasError;
use crate::models::ServerMessage;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// A magic link was emailed and has not been validated yet.
    PendingMagicLink,
    Authenticated,
    /// The held session ran past its expiry or was rejected by the server.
    Expired,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// A persisted token was still accepted by the server.
    StoredCredentials,
    MagicLinkSent { message: Option<String> },
}

impl LoginOutcome {
    pub fn message(&self) -> &str {
        match self {
            LoginOutcome::StoredCredentials => "Using stored credentials",
            LoginOutcome::MagicLinkSent { message } => message
                .as_deref()
                .unwrap_or("Check your email for the magic link"),
        }
    }
}

pub struct AuthManager {
    http: Client,
    base_url: String,
    store: Option<Box<dyn TokenStore>>,
    email: Option<String>,
    session: Option<Session>,
    state: AuthState,
}

impl AuthManager {
    /// `store` of `None` disables token persistence entirely.
    pub fn new(base_url: impl Into<String>, http: Client, store: Option<Box<dyn TokenStore>>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            store,
            email: None,
            session: None,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn state(&self) -> AuthState {
        match (&self.state, &self.session) {
            (AuthState::Authenticated, Some(session)) if session.is_expired() => AuthState::Expired,
            (state, _) => *state,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == AuthState::Authenticated
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Session cookies to attach to API requests; empty when logged out.
    pub fn cookies(&self) -> HashMap<String, String> {
        self.session.as_ref().map(Session::cookies).unwrap_or_default()
    }

    /// Session headers to attach to API requests; empty when logged out.
    pub fn headers(&self) -> HeaderMap {
        self.session.as_ref().map(Session::headers).unwrap_or_default()
    }

    pub(crate) fn set_session(&mut self, session: Session) {
        self.email = Some(session.email.clone());
        self.session = Some(session);
        self.state = AuthState::Authenticated;
    }

    fn clear_session(&mut self) {
        self.session = None;
        self.state = AuthState::Unauthenticated;
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Start a login for `email`.
    ///
    /// With `use_stored`, a persisted token the server still accepts is
    /// adopted without emailing a new link.
    pub async fn login(&mut self, email: &str, use_stored: bool) -> Result<LoginOutcome> {
        self.email = Some(email.to_string());

        if use_stored && self.restore(email).await {
            info!(email, "Using stored credentials");
            return Ok(LoginOutcome::StoredCredentials);
        }

        self.clear_session();
        let response = self
            .http
            .post(self.url("/login"))
            .json(&json!({ "email": email }))
            .send()
            .await
            .map_err(|e| AtlasError::Authentication(format!("Login failed: {}", e)))?;

        let response = Self::ensure_success(response, "Login failed").await?;
        let body = Self::parse_message(response, "Login failed").await?;

        self.state = AuthState::PendingMagicLink;
        info!(email, "Magic link sent");
        Ok(LoginOutcome::MagicLinkSent {
            message: body.message,
        })
    }

    /// Adopt a persisted token for `email` if the server still accepts it.
    ///
    /// Expired or rejected tokens are removed from the store. Never sends a
    /// magic link.
    pub async fn restore(&mut self, email: &str) -> bool {
        self.email = Some(email.to_string());

        let Some(stored) = self.load_stored(email) else {
            return false;
        };
        if stored.is_expired() {
            debug!(email, "Stored token expired");
            self.forget_stored(email);
            return false;
        }

        self.session = Some(Session::from_stored(email, stored));
        self.state = AuthState::Authenticated;
        if self.check_auth().await {
            return true;
        }

        debug!(email, "Stored token rejected by server");
        self.forget_stored(email);
        self.clear_session();
        false
    }

    /// Exchange the emailed magic-link token for a session.
    ///
    /// Uses `email` if given, otherwise the email of the preceding `login`.
    pub async fn validate_magic_link(
        &mut self,
        magic_link: &str,
        email: Option<&str>,
    ) -> Result<ServerMessage> {
        let email = email
            .map(str::to_string)
            .or_else(|| self.email.clone())
            .ok_or_else(|| {
                AtlasError::Authentication("Email is required for validation".to_string())
            })?;

        let response = self
            .http
            .post(self.url("/validate"))
            .json(&json!({ "email": email, "magic_link": magic_link }))
            .send()
            .await
            .map_err(|e| AtlasError::Authentication(format!("Validation failed: {}", e)))?;

        if response.status().as_u16() == 400 {
            return Err(AtlasError::Authentication(
                "Invalid or expired magic link".to_string(),
            ));
        }
        let response = Self::ensure_success(response, "Validation failed").await?;

        let token = response
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| c.value().to_string());
        let body = Self::parse_message(response, "Validation failed").await?;

        let token = token.ok_or_else(|| {
            AtlasError::Authentication(
                "Validation failed: no session token in response".to_string(),
            )
        })?;

        let session = Session::issue(email.as_str(), token, Utc::now());
        self.persist(&email, &session.to_stored());
        self.set_session(session);
        info!(email = %email, "Authentication successful");
        Ok(body)
    }

    /// Ask the server whether the held token is still valid.
    ///
    /// Returns true only on HTTP 200. Any failure, including a network
    /// error, counts as not authenticated.
    pub async fn check_auth(&mut self) -> bool {
        let Some(session) = self.session.as_ref() else {
            return false;
        };

        match self
            .http
            .get(self.url("/check"))
            .headers(session.headers())
            .send()
            .await
        {
            Ok(response) if response.status().as_u16() == 200 => {
                self.state = AuthState::Authenticated;
                true
            }
            Ok(response) => {
                debug!(status = %response.status(), "Session rejected");
                self.state = AuthState::Expired;
                false
            }
            Err(e) => {
                warn!(error = %e, "Auth check failed");
                false
            }
        }
    }

    /// Invalidate the session on the server and forget it locally.
    ///
    /// Without a held session there is nothing to invalidate; local state is
    /// cleared and no request is made.
    pub async fn logout(&mut self) -> Result<ServerMessage> {
        let Some(session) = self.session.as_ref() else {
            if let Some(email) = self.email.take() {
                self.forget_stored(&email);
            }
            self.clear_session();
            return Ok(ServerMessage {
                message: Some("Not logged in".to_string()),
                ..Default::default()
            });
        };

        let response = self
            .http
            .post(self.url("/logout"))
            .headers(session.headers())
            .send()
            .await
            .map_err(|e| AtlasError::Authentication(format!("Logout failed: {}", e)))?;
        let response = Self::ensure_success(response, "Logout failed").await?;
        let text = response
            .text()
            .await
            .map_err(|e| AtlasError::Authentication(format!("Logout failed: {}", e)))?;

        if let Some(email) = self.email.take() {
            self.forget_stored(&email);
        }
        self.clear_session();
        info!("Logged out");

        if text.trim().is_empty() {
            return Ok(ServerMessage::default());
        }
        serde_json::from_str(&text)
            .map_err(|e| AtlasError::Authentication(format!("Logout failed: {}", e)))
    }

    async fn ensure_success(response: Response, context: &str) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "{}", context);
            Err(AtlasError::Authentication(format!("{}: {}", context, body)))
        }
    }

    async fn parse_message(response: Response, context: &str) -> Result<ServerMessage> {
        response
            .json()
            .await
            .map_err(|e| AtlasError::Authentication(format!("{}: {}", context, e)))
    }

    fn load_stored(&self, email: &str) -> Option<StoredToken> {
        let store = self.store.as_ref()?;
        match store.get(email) {
            Ok(token) => token,
            Err(e) => {
                warn!(email, error = %e, "Failed to read stored token");
                None
            }
        }
    }

    fn persist(&self, email: &str, token: &StoredToken) {
        if let Some(store) = self.store.as_ref() {
            if let Err(e) = store.save(email, token) {
                warn!(email, error = %e, "Failed to save token");
            }
        }
    }

    fn forget_stored(&self, email: &str) {
        if let Some(store) = self.store.as_ref() {
            if let Err(e) = store.delete(email) {
                warn!(email, error = %e, "Failed to delete stored token");
            }
        }
    }
}
