use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};

use super::StoredToken;

/// Name of the cookie the server issues the session token in
pub const SESSION_COOKIE: &str = "jwt";

/// Session token lifetime in hours, counted from magic-link validation.
pub const TOKEN_LIFETIME_HOURS: i64 = 48;

/// An authenticated session for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A freshly issued session, valid for `TOKEN_LIFETIME_HOURS` from `issued_at`.
    pub fn issue(email: impl Into<String>, token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            email: email.into(),
            expires_at: issued_at + Duration::hours(TOKEN_LIFETIME_HOURS),
        }
    }

    pub fn from_stored(email: impl Into<String>, stored: StoredToken) -> Self {
        Self {
            token: stored.token,
            email: email.into(),
            expires_at: stored.expires_at,
        }
    }

    pub fn to_stored(&self) -> StoredToken {
        StoredToken {
            token: self.token.clone(),
            expires_at: self.expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Hours remaining until expiry (for display)
    pub fn hours_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_hours().max(0)
    }

    pub fn cookies(&self) -> HashMap<String, String> {
        HashMap::from([(SESSION_COOKIE.to_string(), self.token.clone())])
    }

    /// The `Cookie` header carrying the session token.
    ///
    /// A token that is not a valid header value yields an empty map.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, self.token)) {
            headers.insert(header::COOKIE, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_sets_48_hour_expiry() {
        let now = Utc::now();
        let session = Session::issue("user@example.com", "tok", now);
        assert_eq!(session.expires_at - now, Duration::hours(48));
        assert!(!session.is_expired());
        assert!(session.hours_until_expiry() >= 47);
    }

    #[test]
    fn test_expired_session() {
        let session = Session::issue("user@example.com", "tok", Utc::now() - Duration::hours(49));
        assert!(session.is_expired());
        assert_eq!(session.hours_until_expiry(), 0);
    }

    #[test]
    fn test_cookie_header() {
        let session = Session::issue("user@example.com", "abc.def", Utc::now());
        let headers = session.headers();
        assert_eq!(headers.get(header::COOKIE).unwrap(), "jwt=abc.def");
        assert_eq!(session.cookies().get("jwt").map(String::as_str), Some("abc.def"));
    }

    #[test]
    fn test_invalid_token_yields_no_header() {
        let session = Session::issue("user@example.com", "bad\ntoken", Utc::now());
        assert!(session.headers().is_empty());
    }

    #[test]
    fn test_stored_conversion_keeps_expiry() {
        let session = Session::issue("user@example.com", "tok", Utc::now());
        let restored = Session::from_stored("user@example.com", session.to_stored());
        assert_eq!(restored, session);
    }
}
