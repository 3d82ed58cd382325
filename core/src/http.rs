//! HTTP request/response types described as plain data.
//!
//! # Design
//! `Client` builds an `HttpRequest`, hands it to a `Transport`, and parses the
//! returned `HttpResponse`. Keeping both ends as owned data makes request
//! construction deterministic and lets tests swap the network for a recorder.

use std::fmt;

use serde_json::{Map, Value};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Per-call options: an optional JSON body and query string parameters.
///
/// Converting from a JSON value follows the wire convention of the API: an
/// object with a non-null `data` field uses that field as the body, any other
/// value is the body itself, and an object `qs` field supplies query
/// parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options whose body is `body`, with no query parameters.
    pub fn body(body: Value) -> Self {
        Self {
            body: Some(body),
            query: Vec::new(),
        }
    }

    /// Options carrying every entry of `params` as a query parameter.
    pub fn query(params: &Map<String, Value>) -> Self {
        Self {
            body: None,
            query: query_pairs(params),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

impl From<Value> for RequestOptions {
    fn from(value: Value) -> Self {
        let query = value
            .get("qs")
            .and_then(Value::as_object)
            .map(query_pairs)
            .unwrap_or_default();

        let data = value.get("data").filter(|d| !d.is_null()).cloned();
        let body = data.unwrap_or(value);

        Self {
            body: Some(body),
            query,
        }
    }
}

/// Flatten a JSON object into query pairs using bracket notation.
///
/// Nested objects become `key[sub]`, arrays become `key[0]`, `key[1]`.
/// Strings are used verbatim, other scalars use their JSON text, and nulls
/// are skipped at any depth.
fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten_query(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten_query(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Object(fields) => {
            for (sub, v) in fields {
                flatten_query(format!("{key}[{sub}]"), v, pairs);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_query(format!("{key}[{i}]"), v, pairs);
            }
        }
        other => pairs.push((key, other.to_string())),
    }
}

/// An HTTP request described as plain data.
///
/// Built by `Client::build_request`. `url` is absolute and does not include
/// the query string; `query` is appended by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
