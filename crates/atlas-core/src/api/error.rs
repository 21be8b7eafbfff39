use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error (status {}): {}", .status, truncate_body(.body))]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token storage error: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid printing excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

impl AtlasError {
    /// Map a non-success HTTP status to the error taxonomy.
    pub fn from_status(status: reqwest::StatusCode, body: &str, endpoint: &str) -> Self {
        match status.as_u16() {
            401 => AtlasError::Authentication(
                "Authentication required. Please login first.".to_string(),
            ),
            404 => AtlasError::NotFound(endpoint.to_string()),
            code => AtlasError::Api {
                status: code,
                body: body.to_string(),
            },
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            AtlasError::Authentication(_) => None,
            AtlasError::NotFound(_) => Some(404),
            AtlasError::Api { status, .. } => Some(*status),
            AtlasError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_unauthorized() {
        let err = AtlasError::from_status(StatusCode::UNAUTHORIZED, "nope", "/features");
        assert!(matches!(err, AtlasError::Authentication(_)));
        assert!(err.to_string().contains("login first"));
    }

    #[test]
    fn test_from_status_not_found_names_endpoint() {
        let err = AtlasError::from_status(StatusCode::NOT_FOUND, "", "/features/abc");
        assert!(matches!(err, AtlasError::NotFound(ref e) if e == "/features/abc"));
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_from_status_keeps_code_and_body() {
        let err = AtlasError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad field", "/x");
        match err {
            AtlasError::Api { status, ref body } => {
                assert_eq!(status, 422);
                assert_eq!(body, "bad field");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display_truncates_long_body() {
        let body = "x".repeat(2000);
        let err = AtlasError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body, "/x");
        let msg = err.to_string();
        assert!(msg.contains("truncated, 2000 total bytes"));
        assert!(msg.len() < 700);
        // the field itself is untouched
        assert!(matches!(err, AtlasError::Api { ref body, .. } if body.len() == 2000));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let body = "é".repeat(400);
        let out = truncate_body(&body);
        assert!(out.starts_with('é'));
    }
}
