//! HTTP target adapter for migration-runner APIs.
//!
//! Endpoints, relative to `base_url`:
//! - `GET {status_path}` returns `{"pending_count": n, "applied_count": m}`
//! - `GET {pending_path}?limit=1` returns `{"items": [{"label": "..."}]}`
//! - `POST {apply_path}` with `{"label": "..."}` applies one item

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::errors::{AdapterError, AdapterResult};
use crate::domain::models::{ObservedState, PendingItem, RawSignal, TargetConfig};
use crate::domain::ports::TargetAdapter;
use crate::infrastructure::logging::SecretScrubber;

#[derive(Debug, Deserialize)]
struct PendingResponse {
    #[serde(default)]
    items: Vec<PendingItem>,
}

#[derive(Debug, Serialize)]
struct ApplyRequest<'a> {
    label: &'a str,
}

/// Direct API client for a migration runner.
pub struct HttpTargetAdapter {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    status_path: String,
    pending_path: String,
    apply_path: String,
    scrubber: SecretScrubber,
}

impl HttpTargetAdapter {
    pub fn new(config: &TargetConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("migrate-converge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            status_path: config.status_path.clone(),
            pending_path: config.pending_path.clone(),
            apply_path: config.apply_path.clone(),
            scrubber: SecretScrubber::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.api_token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn scrub(&self, message: impl AsRef<str>) -> String {
        self.scrubber.scrub_message(message.as_ref())
    }
}

#[async_trait]
impl TargetAdapter for HttpTargetAdapter {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn observe(&self) -> AdapterResult<ObservedState> {
        let response = self
            .request(Method::GET, &self.status_path)
            .send()
            .await
            .map_err(|e| AdapterError::ObserveFailed(self.scrub(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::ObserveFailed(format!(
                "status endpoint returned {}",
                status.as_u16()
            )));
        }

        response
            .json::<ObservedState>()
            .await
            .map_err(|e| AdapterError::ObserveFailed(format!("invalid status payload: {e}")))
    }

    async fn select_next(&self) -> AdapterResult<PendingItem> {
        let response = self
            .request(Method::GET, &self.pending_path)
            .query(&[("limit", "1")])
            .send()
            .await
            .map_err(|e| AdapterError::ApplyFailed(self.scrub(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::ApplyFailed(format!(
                "pending endpoint returned {}",
                status.as_u16()
            )));
        }

        let pending: PendingResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::ApplyFailed(format!("invalid pending payload: {e}")))?;

        pending.items.into_iter().next().ok_or_else(|| {
            AdapterError::NoSelectableItem("pending endpoint returned no items".to_string())
        })
    }

    async fn apply_next(&self, item: &PendingItem) -> AdapterResult<RawSignal> {
        debug!(item = %item.display_label(), url = %self.base_url, "posting apply request");

        let response = self
            .request(Method::POST, &self.apply_path)
            .json(&ApplyRequest { label: &item.label })
            .send()
            .await
            .map_err(|e| AdapterError::ApplyFailed(self.scrub(e.to_string())))?;

        let code = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AdapterError::ApplyFailed(self.scrub(e.to_string())))?;

        Ok(RawSignal::status(code, self.scrub(body)))
    }
}
