use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

use crate::auth::AuthenticatedSession;
use crate::error::ApiError;

/// Google Ads REST API version every endpoint path is rooted at
pub const API_VERSION: &str = "v19";

/// Transport for the Google Ads REST API.
///
/// Attaches the bearer token, developer token, and manager account header to
/// every request and classifies non-success responses into
/// `RemoteServiceError`. Performs no retries; failures propagate to the
/// caller.
pub struct AdsClient {
    http: Client,
    base_url: String,
    session: AuthenticatedSession,
}

impl AdsClient {
    pub fn new(
        session: AuthenticatedSession,
        base_url: &str,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_VERSION, path)
    }

    fn apply_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.session.credential.access_token)
            .header("developer-token", &self.session.developer_token)
            .header(
                "login-customer-id",
                self.session.login_customer_id.to_string(),
            )
    }

    /// GET an API path, returning the parsed JSON payload
    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(path);
        tracing::debug!(%url, "Sending GET request");
        let builder = self.apply_headers(self.http.get(&url));
        self.execute(builder, &url).await
    }

    /// POST a JSON body to an API path, returning the parsed JSON payload
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = self.endpoint(path);
        tracing::debug!(%url, "Sending POST request");
        let builder = self.apply_headers(self.http.post(&url)).json(body);
        self.execute(builder, &url).await
    }

    async fn execute(&self, builder: RequestBuilder, url: &str) -> Result<Value, ApiError> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, %url, "HTTP request error");
            ApiError::Internal(anyhow::anyhow!("HTTP request to {url} failed: {e}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ApiError::Internal(anyhow::anyhow!("failed to read response from {url}: {e}"))
        })?;

        if !status.is_success() {
            tracing::warn!(status = %status, %url, "Received error response");
            return Err(classify_remote_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            ApiError::Internal(anyhow::anyhow!("malformed JSON response from {url}: {e}"))
        })
    }
}

/// Turn a Google Ads error payload into a `RemoteServiceError`.
///
/// The API reports failures as `{"error": {"code", "message", "status"}}`;
/// streaming endpoints wrap that object in a one-element array. Anything
/// unparseable falls back to the raw body.
pub fn classify_remote_error(status: u16, body: &str) -> ApiError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            let object = match value {
                Value::Array(items) => items.into_iter().next()?,
                other => other,
            };
            let error = object.get("error")?;
            let message = error.get("message")?.as_str()?.to_string();
            match error.get("status").and_then(|s| s.as_str()) {
                Some(code) => Some(format!("{code}: {message}")),
                None => Some(message),
            }
        })
        .unwrap_or_else(|| body.to_string());

    ApiError::RemoteServiceError { status, detail }
}
