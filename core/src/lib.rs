//! Async client for the Clarify bundle, track, metadata, insight and search API.
//!
//! # Overview
//! `Client` holds an immutable configuration (base URL, API version, headers
//! with the bearer token) and exposes one async method per API operation.
//! Every method is a single request/response round trip through the same
//! dispatcher.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest` / `HttpResponse`),
//!   so request building is deterministic and testable without a network.
//! - A `Transport` executes requests; `ReqwestTransport` is the default.
//! - Responses with status >= 400 are always reclassified into `ApiError`,
//!   which keeps every field of the server's error body.
//! - Return values are the parsed JSON body, untouched. Typed payloads in
//!   `types` are optional helpers for building requests.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::{ClientConfig, ClientOptions, DEFAULT_API_VERSION, DEFAULT_BASE_URL};
pub use error::{ApiError, Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestOptions};
pub use transport::{ReqwestTransport, Transport};
pub use types::{BundleUpdate, NewBundle, NewInsight, NewTrack, SearchQuery, TrackUpdate};
