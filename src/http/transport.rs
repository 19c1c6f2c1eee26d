//! Probe transport
//!
//! "Send request, get response" is an injected primitive: runs can be
//! driven against the shared reqwest client or a scripted double in
//! tests.

use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::{ProbeRequest, ProbeResponse};
use crate::app::HttpConfig;
use crate::error::TransportError;

/// Synchronous-per-attempt dispatch primitive. Implementations must be
/// safe to share across concurrently running probes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ProbeRequest) -> Result<ProbeResponse, TransportError>;
}

/// reqwest-backed transport shared by every run.
pub struct ReqwestTransport {
    /// Inner reqwest client
    client: reqwest::Client,

    /// Configured timeout, reported on timeout errors
    timeout_ms: u64,
}

impl ReqwestTransport {
    /// Create a new transport
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(config.max_redirects)
            } else {
                reqwest::redirect::Policy::none()
            })
            .user_agent(&config.user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            timeout_ms: config.request_timeout * 1000,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ProbeRequest) -> Result<ProbeResponse, TransportError> {
        let start = Instant::now();

        let method = reqwest::Method::from_str(&request.method)
            .map_err(|_| TransportError::Malformed(format!("invalid HTTP method: {}", request.method)))?;

        // A header the wire format cannot carry is a template defect,
        // not a per-candidate hiccup.
        let mut headers = HeaderMap::new();
        for (key, value) in &request.headers {
            let name = HeaderName::from_str(key)
                .map_err(|_| TransportError::Malformed(format!("invalid header name: {key}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| TransportError::Malformed(format!("invalid value for header {key}")))?;
            headers.insert(name, value);
        }

        let mut builder = self.client.request(method, &request.url).headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout_ms)
            } else if e.is_builder() {
                TransportError::Malformed(e.to_string())
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?
            .to_vec();

        Ok(ProbeResponse {
            status,
            status_text,
            headers,
            size: body.len(),
            body,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
