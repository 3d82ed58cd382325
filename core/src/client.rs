//! Async, stateless client for the Clarify REST API.
//!
//! # Design
//! Every resource method is a fixed (verb, path) mapping that funnels through
//! one dispatcher, `Client::request`. Dispatch is split the same way as the
//! request lifecycle: `build_request` turns a verb, path and options into an
//! `HttpRequest`, the `Transport` performs the round trip, and
//! `parse_response` either returns the JSON body unchanged or reclassifies a
//! status >= 400 into `ApiError`.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ClientConfig, ClientOptions};
use crate::error::{ApiError, Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestOptions};
use crate::transport::{ReqwestTransport, Transport};

const JSON: &str = "application/json";

/// Client for the Clarify API.
///
/// Cheap to clone; clones share configuration and transport. Holds no mutable
/// state, so a single instance can serve concurrent calls from many tasks.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client using the default reqwest transport.
    ///
    /// Fails with `Error::Configuration` when `api_token` is empty.
    pub fn new(api_token: &str, options: Option<ClientOptions>) -> Result<Self> {
        Self::with_transport(api_token, options, Arc::new(ReqwestTransport::new()))
    }

    /// Like `new`, for hosts where the token may be absent.
    pub fn from_optional_token(api_token: Option<&str>, options: Option<ClientOptions>) -> Result<Self> {
        let token = api_token.ok_or_else(|| Error::Configuration("API token required".to_string()))?;
        Self::new(token, options)
    }

    pub fn with_transport(
        api_token: &str,
        options: Option<ClientOptions>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let config = ClientConfig::resolve(api_token, options.unwrap_or_default())?;
        Ok(Self {
            config: Arc::new(config),
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    pub fn api_version(&self) -> u32 {
        self.config.api_version()
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Build the request for `method` on `path` under `/v{api_version}/`.
    ///
    /// GET requests never carry a body. Query parameters are kept for every
    /// method.
    pub fn build_request(&self, method: HttpMethod, path: &str, opts: RequestOptions) -> HttpRequest {
        let body = match method {
            HttpMethod::Get => None,
            _ => opts.body,
        };

        let configured = self.config.headers();
        let has = |name: &str| configured.iter().any(|(k, _)| k.eq_ignore_ascii_case(name));

        let mut headers = Vec::with_capacity(configured.len() + 2);
        if !has("accept") {
            headers.push(("accept".to_string(), JSON.to_string()));
        }
        if body.is_some() && !has("content-type") {
            headers.push(("content-type".to_string(), JSON.to_string()));
        }
        headers.extend(configured.iter().cloned());

        HttpRequest {
            method,
            url: self.config.url_for(path),
            headers,
            query: opts.query,
            body,
        }
    }

    /// Turn a response into the parsed JSON body or an error.
    ///
    /// Status >= 400 always becomes `Error::Api`. A success never fails: an
    /// empty body resolves to `Value::Null`, and a body that is not JSON (or
    /// is declared with a non-JSON content type) resolves to `Value::String`.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value> {
        if response.status >= 400 {
            let err = ApiError::from_response(response.status, &response.body);
            warn!(status = err.status, message = %err.message, "clarify api returned an error");
            return Err(err.into());
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }

        let declared_json = response
            .header("content-type")
            .map_or(true, |ct| ct.to_ascii_lowercase().contains("json"));
        if !declared_json {
            return Ok(Value::String(response.body));
        }

        match serde_json::from_str(&response.body) {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!(status = response.status, error = %err, "success body is not JSON, returning raw text");
                Ok(Value::String(response.body))
            }
        }
    }

    /// Perform one round trip. Transport errors are returned unchanged and
    /// nothing is retried.
    pub async fn request(&self, method: HttpMethod, path: &str, opts: RequestOptions) -> Result<Value> {
        let request = self.build_request(method, path, opts);
        debug!(method = %request.method, url = %request.url, "sending clarify request");

        let response = self.transport.execute(request).await?;
        debug!(status = response.status, "received clarify response");

        self.parse_response(response)
    }

    // -----------------------------------------------------------------------
    // Verb helpers
    // -----------------------------------------------------------------------

    pub async fn get(&self, path: &str, opts: Option<RequestOptions>) -> Result<Value> {
        self.request(HttpMethod::Get, path, opts.unwrap_or_default()).await
    }

    pub async fn post(&self, path: &str, opts: impl Into<RequestOptions>) -> Result<Value> {
        self.request(HttpMethod::Post, path, opts.into()).await
    }

    pub async fn put(&self, path: &str, opts: impl Into<RequestOptions>) -> Result<Value> {
        self.request(HttpMethod::Put, path, opts.into()).await
    }

    pub async fn delete(&self, path: &str, opts: Option<RequestOptions>) -> Result<Value> {
        self.request(HttpMethod::Delete, path, opts.unwrap_or_default()).await
    }

    // -----------------------------------------------------------------------
    // Bundles
    // -----------------------------------------------------------------------

    pub async fn get_bundles(&self, opts: Option<RequestOptions>) -> Result<Value> {
        self.get("bundles", opts).await
    }

    pub async fn create_bundle<T: Serialize + ?Sized>(&self, data: &T) -> Result<Value> {
        self.post("bundles", payload(data)?).await
    }

    pub async fn get_bundle(&self, bundle_id: &str, opts: Option<RequestOptions>) -> Result<Value> {
        self.get(&format!("bundles/{bundle_id}"), opts).await
    }

    pub async fn update_bundle<T: Serialize + ?Sized>(&self, bundle_id: &str, data: &T) -> Result<Value> {
        self.put(&format!("bundles/{bundle_id}"), payload(data)?).await
    }

    pub async fn remove_bundle(&self, bundle_id: &str) -> Result<Value> {
        self.delete(&format!("bundles/{bundle_id}"), None).await
    }

    /// Alias of `remove_bundle`.
    pub async fn delete_bundle(&self, bundle_id: &str) -> Result<Value> {
        self.remove_bundle(bundle_id).await
    }

    // -----------------------------------------------------------------------
    // Insights
    // -----------------------------------------------------------------------

    pub async fn get_insights(&self, bundle_id: &str, opts: Option<RequestOptions>) -> Result<Value> {
        self.get(&format!("bundles/{bundle_id}/insights"), opts).await
    }

    pub async fn create_insight<T: Serialize + ?Sized>(&self, bundle_id: &str, data: &T) -> Result<Value> {
        self.post(&format!("bundles/{bundle_id}/insights"), payload(data)?).await
    }

    pub async fn get_insight(&self, bundle_id: &str, insight_id: &str) -> Result<Value> {
        self.get(&format!("bundles/{bundle_id}/insights/{insight_id}"), None).await
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    pub async fn get_metadata(&self, bundle_id: &str, opts: Option<RequestOptions>) -> Result<Value> {
        self.get(&format!("bundles/{bundle_id}/metadata"), opts).await
    }

    pub async fn update_metadata<T: Serialize + ?Sized>(&self, bundle_id: &str, data: &T) -> Result<Value> {
        self.put(&format!("bundles/{bundle_id}/metadata"), payload(data)?).await
    }

    pub async fn remove_metadata(&self, bundle_id: &str) -> Result<Value> {
        self.delete(&format!("bundles/{bundle_id}/metadata"), None).await
    }

    /// Alias of `remove_metadata`.
    pub async fn delete_metadata(&self, bundle_id: &str) -> Result<Value> {
        self.remove_metadata(bundle_id).await
    }

    // -----------------------------------------------------------------------
    // Tracks
    // -----------------------------------------------------------------------

    pub async fn get_tracks(&self, bundle_id: &str, opts: Option<RequestOptions>) -> Result<Value> {
        self.get(&format!("bundles/{bundle_id}/tracks"), opts).await
    }

    pub async fn create_track<T: Serialize + ?Sized>(&self, bundle_id: &str, data: &T) -> Result<Value> {
        self.post(&format!("bundles/{bundle_id}/tracks"), payload(data)?).await
    }

    /// `track` is a positional index or a label.
    pub async fn update_track<T: Serialize + ?Sized>(
        &self,
        bundle_id: &str,
        track: impl fmt::Display,
        data: &T,
    ) -> Result<Value> {
        self.put(&format!("bundles/{bundle_id}/tracks/{track}"), payload(data)?).await
    }

    pub async fn remove_track(&self, bundle_id: &str, track: impl fmt::Display) -> Result<Value> {
        self.delete(&format!("bundles/{bundle_id}/tracks/{track}"), None).await
    }

    /// Alias of `remove_track`.
    pub async fn delete_track(&self, bundle_id: &str, track: impl fmt::Display) -> Result<Value> {
        self.remove_track(bundle_id, track).await
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Search bundles. Every field of `params` becomes a query parameter.
    pub async fn search<T: Serialize + ?Sized>(&self, params: &T) -> Result<Value> {
        let opts = match serde_json::to_value(params).map_err(Error::Serialization)? {
            Value::Object(map) => RequestOptions::query(&map),
            Value::Null => RequestOptions::new(),
            _ => {
                return Err(Error::Serialization(serde::ser::Error::custom(
                    "search parameters must serialize to an object",
                )))
            }
        };
        self.get("search", Some(opts)).await
    }
}

fn payload<T: Serialize + ?Sized>(data: &T) -> Result<RequestOptions> {
    serde_json::to_value(data)
        .map(RequestOptions::from)
        .map_err(Error::Serialization)
}
