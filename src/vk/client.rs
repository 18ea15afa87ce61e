// VK API client: form-encoded POSTs to the method endpoint.
//
// The fetch loop only ever calls the `execute` method, which runs a small
// VKScript program containing up to 25 API calls server-side and returns
// their results as one array. The `ExecuteApi` trait is the seam between
// the batching logic and the network, so tests can swap in a fake.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Default VK method endpoint.
pub const DEFAULT_API_URL: &str = "https://api.vk.com/method";

/// API version the tool was written against.
pub const DEFAULT_API_VERSION: &str = "5.103";

/// Anything that can run a VKScript program through `execute`.
#[async_trait]
pub trait ExecuteApi: Send + Sync {
    /// Run `code` and return the `response` field of the reply.
    async fn execute(&self, code: &str) -> Result<Value>;
}

/// HTTP client for the VK method endpoint.
pub struct VkClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    version: String,
}

impl VkClient {
    /// Create a new client pointing at the given base URL.
    pub fn new(base_url: &str, access_token: &str, version: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("walltopics/0.1 (topic-modeling)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            version: version.to_string(),
        })
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        config.require_token()?;
        Self::new(&config.api_url, &config.access_token, &config.api_version)
    }

    /// The API version sent with every call.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// POST a method call with form parameters and unwrap the envelope.
    pub async fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, method);

        let mut form: Vec<(&str, &str)> = params.to_vec();
        form.push(("access_token", self.access_token.as_str()));
        form.push(("v", self.version.as_str()));

        debug!(method = method, "VK API request");

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .with_context(|| format!("VK request failed: {method}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("VK {method} returned {status}: {body}");
        }

        let envelope: Envelope = response
            .json()
            .await
            .with_context(|| format!("Failed to deserialize {method} response"))?;

        envelope.into_response(method)
    }
}

#[async_trait]
impl ExecuteApi for VkClient {
    async fn execute(&self, code: &str) -> Result<Value> {
        self.call("execute", &[("code", code)]).await
    }
}

// -- Serde types for the response envelope --

/// Every VK reply is either `{"response": ...}` or `{"error": {...}}`.
/// `execute` may also attach `execute_errors` describing failed sub-calls.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub response: Option<Value>,
    pub error: Option<ApiError>,
    #[serde(default)]
    pub execute_errors: Vec<ApiError>,
}

/// An error object as reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub error_code: i64,
    pub error_msg: String,
    /// Present on `execute_errors` entries.
    pub method: Option<String>,
}

impl Envelope {
    /// Turn the envelope into the `response` value or an error.
    pub fn into_response(self, method: &str) -> Result<Value> {
        if let Some(err) = self.error {
            anyhow::bail!(
                "VK {method} failed with error {}: {}",
                err.error_code,
                err.error_msg
            );
        }

        for err in &self.execute_errors {
            tracing::warn!(
                code = err.error_code,
                method = err.method.as_deref().unwrap_or("?"),
                "execute sub-call failed: {}",
                err.error_msg
            );
        }

        self.response
            .ok_or_else(|| anyhow::anyhow!("VK {method} reply has neither response nor error"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_response() {
        let json = r#"{"response": [{"count": 1, "items": []}]}"#;
        let env: Envelope = serde_json::from_str(json).unwrap();
        let value = env.into_response("execute").unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_envelope_error() {
        let json = r#"{"error": {"error_code": 5, "error_msg": "User authorization failed"}}"#;
        let env: Envelope = serde_json::from_str(json).unwrap();
        let err = env.into_response("execute").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("5"));
        assert!(msg.contains("User authorization failed"));
    }

    #[test]
    fn test_envelope_execute_errors_keep_response() {
        let json = r#"{
            "response": [false],
            "execute_errors": [
                {"method": "wall.get", "error_code": 15, "error_msg": "Access denied"}
            ]
        }"#;
        let env: Envelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.execute_errors.len(), 1);
        assert_eq!(env.execute_errors[0].method.as_deref(), Some("wall.get"));
        let value = env.into_response("execute").unwrap();
        assert_eq!(value, serde_json::json!([false]));
    }

    #[test]
    fn test_envelope_empty_is_error() {
        let env: Envelope = serde_json::from_str("{}").unwrap();
        assert!(env.into_response("execute").is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = VkClient::new("https://api.vk.com/method/", "t", "5.103").unwrap();
        assert_eq!(client.base_url, "https://api.vk.com/method");
        assert_eq!(client.version(), "5.103");
    }
}
