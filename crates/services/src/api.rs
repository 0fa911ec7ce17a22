use async_trait::async_trait;
use progress_core::model::{ChildId, DashboardSnapshot, EventAck, ProgressEvent};
use reqwest::{Client, RequestBuilder, Url};

use crate::config::ApiConfig;
use crate::decode::{parse_ack, parse_snapshot};
use crate::error::ApiError;

/// Backend the sync engine talks to.
#[async_trait]
pub trait ProgressApi: Send + Sync {
    /// Fetch the server-computed dashboard for a child.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failures, non-success statuses or
    /// unreadable bodies.
    async fn fetch_dashboard(&self, child: &ChildId) -> Result<DashboardSnapshot, ApiError>;

    /// Submit one progress event.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failures, non-success statuses or
    /// unreadable bodies.
    async fn post_event(&self, event: &ProgressEvent) -> Result<EventAck, ApiError>;
}

/// `ProgressApi` over HTTP JSON.
#[derive(Clone)]
pub struct HttpProgressApi {
    client: Client,
    config: Option<ApiConfig>,
}

impl HttpProgressApi {
    #[must_use]
    pub fn new(config: Option<ApiConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    fn config(&self) -> Result<&ApiConfig, ApiError> {
        self.config.as_ref().ok_or(ApiError::NotConfigured)
    }
}

fn authorize(request: RequestBuilder, config: &ApiConfig) -> RequestBuilder {
    match &config.token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// `{base}/children/{child}/dashboard`.
///
/// # Errors
///
/// Returns `ApiError::InvalidUrl` if `base_url` cannot carry a path.
pub fn dashboard_url(base_url: &str, child: &ChildId) -> Result<Url, ApiError> {
    child_url(base_url, child, "dashboard")
}

/// `{base}/children/{child}/progress-events`.
///
/// # Errors
///
/// Returns `ApiError::InvalidUrl` if `base_url` cannot carry a path.
pub fn events_url(base_url: &str, child: &ChildId) -> Result<Url, ApiError> {
    child_url(base_url, child, "progress-events")
}

/// The child id goes in as a single percent-encoded segment.
fn child_url(base_url: &str, child: &ChildId, leaf: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(base_url).map_err(|err| ApiError::InvalidUrl(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| ApiError::InvalidUrl(format!("{base_url} cannot be a base")))?
        .pop_if_empty()
        .extend(["children", child.as_str(), leaf]);
    Ok(url)
}

#[async_trait]
impl ProgressApi for HttpProgressApi {
    async fn fetch_dashboard(&self, child: &ChildId) -> Result<DashboardSnapshot, ApiError> {
        let config = self.config()?;
        let request = self.client.get(dashboard_url(&config.base_url, child)?);
        let response = authorize(request, config).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status()));
        }

        let body = response.text().await?;
        parse_snapshot(&body)
    }

    async fn post_event(&self, event: &ProgressEvent) -> Result<EventAck, ApiError> {
        let config = self.config()?;
        let request = self
            .client
            .post(events_url(&config.base_url, &event.child_id)?)
            .json(event);
        let response = authorize(request, config).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status()));
        }

        let body = response.text().await?;
        parse_ack(&body)
    }
}
