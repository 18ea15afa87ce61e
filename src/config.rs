use std::env;
use std::path::PathBuf;

use anyhow::Result;

/// Default location of the rendered visualization.
pub const DEFAULT_OUTPUT: &str = "LDA.html";

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
pub struct Config {
    /// VK access token. Only needed for fetching; `analyze --input` works offline.
    pub access_token: String,
    /// Method endpoint base (defaults to https://api.vk.com/method).
    pub api_url: String,
    /// API version sent with every call.
    pub api_version: String,
    /// Where the HTML visualization is written unless `--output` is given.
    pub output_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything except the access token has a default.
    pub fn load() -> Result<Self> {
        Ok(Self {
            access_token: env::var("VK_ACCESS_TOKEN").unwrap_or_default(),
            api_url: env::var("VK_API_URL")
                .unwrap_or_else(|_| crate::vk::client::DEFAULT_API_URL.to_string()),
            api_version: env::var("VK_API_VERSION")
                .unwrap_or_else(|_| crate::vk::client::DEFAULT_API_VERSION.to_string()),
            output_path: env::var("WALLTOPICS_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT)),
        })
    }

    /// Check that the access token is configured.
    /// Call this before any operation that talks to the API.
    pub fn require_token(&self) -> Result<()> {
        if self.access_token.is_empty() {
            anyhow::bail!(
                "VK_ACCESS_TOKEN not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }
}
