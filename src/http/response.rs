//! HTTP response types

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Response to one probe attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResponse {
    /// HTTP status code
    pub status: u16,

    /// Status text (e.g., "OK", "Not Found")
    pub status_text: String,

    /// Header pairs in wire order. A list, not a map, because repeated
    /// Set-Cookie headers must all survive.
    pub headers: Vec<(String, String)>,

    /// Response body
    pub body: Vec<u8>,

    /// Response time in milliseconds
    pub duration_ms: u64,

    /// Size of the response body in bytes
    pub size: usize,
}

/// Server-issued cookie pulled from a Set-Cookie header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
}

impl ProbeResponse {
    pub fn new(status: u16, status_text: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            status_text: status_text.to_string(),
            headers: Vec::new(),
            size: body.len(),
            body,
            duration_ms: 0,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Body as text. Invalid UTF-8 degrades lossily so classification
    /// still sees the readable part.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Every cookie the server issued on this response.
    pub fn set_cookies(&self) -> Vec<SetCookie> {
        self.headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, value)| {
                let pair = value.split(';').next()?;
                let (name, value) = pair.split_once('=')?;
                Some(SetCookie {
                    name: name.trim().to_string(),
                    value: value.trim().to_string(),
                })
            })
            .collect()
    }
}
