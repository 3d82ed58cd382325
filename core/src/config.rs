//! Client configuration.
//!
//! `ClientOptions` is what callers pass in; `ClientConfig` is the resolved,
//! immutable form the client works from.

use std::collections::BTreeMap;

use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.clarify.io";
pub const DEFAULT_API_VERSION: u32 = 1;

/// Optional overrides accepted by `Client::new`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientOptions {
    pub base_url: Option<String>,
    pub api_version: Option<u32>,
    pub headers: BTreeMap<String, String>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_version(mut self, version: u32) -> Self {
        self.api_version = Some(version);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Resolved configuration. Immutable after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub(crate) base_url: String,
    pub(crate) api_version: u32,
    pub(crate) headers: Vec<(String, String)>,
}

impl ClientConfig {
    /// Resolve `options` against the defaults and attach the bearer token.
    ///
    /// Empty overrides fall back to the defaults. Any caller header named
    /// `Authorization` is dropped; the bearer header is always appended last.
    pub fn resolve(api_token: &str, options: ClientOptions) -> Result<Self> {
        if api_token.trim().is_empty() {
            return Err(Error::Configuration("API token required".to_string()));
        }

        let base_url = options
            .base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let api_version = options
            .api_version
            .filter(|v| *v != 0)
            .unwrap_or(DEFAULT_API_VERSION);

        let mut headers = Vec::with_capacity(options.headers.len() + 1);
        for (name, value) in options.headers {
            if name.eq_ignore_ascii_case("authorization") {
                continue;
            }
            validate_header(&name, &value)?;
            headers.push((name, value));
        }

        let authorization = format!("Bearer {api_token}");
        validate_header("Authorization", &authorization)?;
        headers.push(("Authorization".to_string(), authorization));

        Ok(Self {
            base_url,
            api_version,
            headers,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Absolute URL for `path` under the versioned prefix.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/v{}/{}",
            self.base_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }
}

// Keeps the bearer token out of debug output.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case("authorization") {
                    (k.as_str(), "Bearer ***")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("headers", &headers)
            .finish()
    }
}

fn validate_header(name: &str, value: &str) -> Result<()> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::Configuration(format!("invalid header name {name:?}: {e}")))?;
    HeaderValue::from_str(value)
        .map_err(|e| Error::Configuration(format!("invalid value for header {name:?}: {e}")))?;
    Ok(())
}
