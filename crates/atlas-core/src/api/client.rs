//! API client for the Atlas REST API.
//!
//! `AtlasClient` owns the credential manager and issues exactly one
//! request per operation, attaching the current session cookie.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::AtlasError;
use crate::auth::{AuthManager, FileTokenStore, KeyringTokenStore, LoginOutcome, TokenStore};
use crate::config::{normalize_base_url, ClientConfig, TokenStoreKind};
use crate::models::{Feature, FeatureCreate, PaperList, ProcessingTask, ServerMessage};
use crate::Result;

/// Processing strategy used when the caller has no preference.
pub const DEFAULT_STRATEGY: &str = "assistant_api";

/// Content type sent for uploaded papers
const PAPER_MIME_TYPE: &str = "application/pdf";

#[derive(Debug, Deserialize)]
struct FeaturesResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct FeatureResponse {
    feature: Feature,
}

pub struct AtlasClient {
    http: Client,
    base_url: String,
    auth: AuthManager,
}

impl AtlasClient {
    /// Create a client from `config`, opening the configured token store.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let store: Option<Box<dyn TokenStore>> = match (config.auto_save_token, config.token_store) {
            (false, _) => None,
            (true, TokenStoreKind::File) => {
                let store = FileTokenStore::default_location()
                    .map_err(|e| AtlasError::Storage(format!("{:#}", e)))?;
                Some(Box::new(store))
            }
            (true, TokenStoreKind::Keyring) => Some(Box::new(KeyringTokenStore::new())),
        };

        Ok(Self::with_parts(&config.base_url, http, store))
    }

    /// Create a client from an existing HTTP client and token store.
    pub fn with_parts(base_url: &str, http: Client, store: Option<Box<dyn TokenStore>>) -> Self {
        let base_url = normalize_base_url(base_url);
        let auth = AuthManager::new(base_url.clone(), http.clone(), store);
        Self {
            http,
            base_url,
            auth,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    pub fn auth_mut(&mut self) -> &mut AuthManager {
        &mut self.auth
    }

    // ===== Authentication =====

    pub async fn login(&mut self, email: &str, use_stored: bool) -> Result<LoginOutcome> {
        self.auth.login(email, use_stored).await
    }

    pub async fn restore(&mut self, email: &str) -> bool {
        self.auth.restore(email).await
    }

    pub async fn validate_magic_link(
        &mut self,
        token: &str,
        email: Option<&str>,
    ) -> Result<ServerMessage> {
        self.auth.validate_magic_link(token, email).await
    }

    pub async fn check_auth(&mut self) -> bool {
        self.auth.check_auth().await
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    pub async fn logout(&mut self) -> Result<ServerMessage> {
        self.auth.logout().await
    }

    // ===== Request plumbing =====

    /// Human-readable path used in logs and errors, e.g. `/features/abc`.
    fn endpoint(segments: &[&str]) -> String {
        format!("/{}", segments.join("/"))
    }

    /// Base URL with `segments` appended, each one percent-encoded so an id
    /// containing `/`, `?` or `#` stays inside its own path segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            AtlasError::Validation(format!("Invalid base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                AtlasError::Validation(format!("Invalid base URL {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        Ok(self
            .http
            .request(method, self.url(segments)?)
            .headers(self.auth.headers()))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response, endpoint: &str) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint, status = %status, "Request failed");
            Err(AtlasError::from_status(status, &body, endpoint))
        }
    }

    /// Issue one request to `segments` and decode the JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<T> {
        let endpoint = Self::endpoint(segments);
        let request = build(self.request(method, segments)?);
        debug!(endpoint = %endpoint, "Sending request");
        let response = request.send().await?;
        let response = Self::check_response(response, &endpoint).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| AtlasError::InvalidResponse(format!("{}: {}", endpoint, e)))
    }

    fn require(name: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(AtlasError::Validation(format!("{} must not be empty", name)));
        }
        Ok(())
    }

    // ===== Features =====

    /// List features, optionally only those of one project.
    pub async fn list_features(&self, project_id: Option<&str>) -> Result<Vec<Feature>> {
        let response: FeaturesResponse = self
            .send(Method::GET, &["features"], |request| match project_id {
                Some(project_id) => request.query(&[("project_id", project_id)]),
                None => request,
            })
            .await?;
        Ok(response.features)
    }

    pub async fn create_feature(&self, feature: &FeatureCreate) -> Result<Feature> {
        feature.validate().map_err(AtlasError::Validation)?;
        let response: FeatureResponse = self
            .send(Method::POST, &["features"], |request| request.json(feature))
            .await?;
        Ok(response.feature)
    }

    pub async fn delete_feature(&self, feature_id: &str) -> Result<ServerMessage> {
        Self::require("feature_id", feature_id)?;
        self.send(Method::DELETE, &["features", feature_id], |request| request)
            .await
    }

    // ===== Papers =====

    /// Fetch one page of the user's papers.
    ///
    /// `page` and `page_size` go to the server as given.
    pub async fn list_papers(&self, page: u32, page_size: u32) -> Result<PaperList> {
        self.send(Method::GET, &["user", "papers"], |request| {
            request.query(&[("page", page), ("page_size", page_size)])
        })
        .await
    }

    /// Upload a PDF to a project, returning file name → task id.
    pub async fn upload_paper(
        &self,
        project_id: &str,
        file_path: impl AsRef<Path>,
        strategy_type: &str,
    ) -> Result<HashMap<String, String>> {
        let path = file_path.as_ref();
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                return Err(AtlasError::Validation(format!(
                    "File not found: {}",
                    path.display()
                )))
            }
        };
        Self::require("project_id", project_id)?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AtlasError::Validation(format!("Not a file path: {}", path.display()))
            })?;

        let file = tokio::fs::File::open(path).await?;
        let part = Part::stream_with_length(Body::from(file), metadata.len())
            .file_name(file_name)
            .mime_str(PAPER_MIME_TYPE)?;
        let form = Form::new()
            .text("project_id", project_id.to_string())
            .text("strategy_type", strategy_type.to_string())
            .part("files[]", part);

        debug!(project_id, path = %path.display(), "Uploading paper");
        self.send(Method::POST, &["add_paper"], |request| request.multipart(form))
            .await
    }

    /// Current state of a processing task. Does not wait for completion.
    pub async fn check_task_status(&self, task_id: &str) -> Result<ProcessingTask> {
        Self::require("task_id", task_id)?;
        let task: ProcessingTask = self
            .send(Method::GET, &["add_paper"], |request| {
                request.query(&[("task_id", task_id)])
            })
            .await?;
        Ok(task.with_fallback_id(task_id))
    }

    pub async fn reprocess_paper(
        &self,
        paper_id: &str,
        project_id: &str,
        strategy_type: &str,
    ) -> Result<ProcessingTask> {
        Self::require("paper_id", paper_id)?;
        let body = json!({
            "project_id": project_id,
            "strategy_type": strategy_type,
        });
        self.send(Method::POST, &["reprocess_paper", paper_id], |request| {
            request.json(&body)
        })
        .await
    }

    // ===== Projects =====

    pub async fn get_project_features(&self, project_id: &str) -> Result<Vec<Feature>> {
        Self::require("project_id", project_id)?;
        let response: FeaturesResponse = self
            .send(Method::GET, &["projects", project_id, "features"], |request| request)
            .await?;
        Ok(response.features)
    }

    /// Assign features to a project.
    pub async fn update_project_features(
        &self,
        project_id: &str,
        feature_ids: &[String],
    ) -> Result<ServerMessage> {
        Self::require("project_id", project_id)?;
        let body = json!({
            "project_id": project_id,
            "feature_ids": feature_ids,
        });
        self.send(Method::POST, &["projects", project_id, "features"], |request| {
            request.json(&body)
        })
        .await
    }

    pub async fn remove_project_features(
        &self,
        project_id: &str,
        feature_ids: &[String],
    ) -> Result<ServerMessage> {
        Self::require("project_id", project_id)?;
        let body = json!({ "feature_ids": feature_ids });
        self.send(Method::DELETE, &["projects", project_id, "features"], |request| {
            request.json(&body)
        })
        .await
    }

    /// Queue every paper in a project for reprocessing.
    pub async fn reprocess_project(
        &self,
        project_id: &str,
        strategy_type: &str,
    ) -> Result<ServerMessage> {
        Self::require("project_id", project_id)?;
        let body = json!({ "strategy_type": strategy_type });
        self.send(Method::POST, &["reprocess_project", project_id], |request| {
            request.json(&body)
        })
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================
