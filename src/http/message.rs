//! HTTP request template types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const COOKIE: &str = "Cookie";
pub const CONTENT_LENGTH: &str = "Content-Length";

/// One name/value pair of an ordered parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Immutable request template, cloned once per probe attempt.
///
/// Form parameters are an ordered sequence, not a map: separator
/// positions may be significant to the target application, so
/// re-serialization must preserve the original order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRequest {
    /// Unique request ID
    pub id: String,

    /// HTTP method
    pub method: String,

    /// Request URL
    pub url: String,

    /// Request headers
    pub headers: HashMap<String, String>,

    /// Form parameters in original order
    pub form_params: Vec<Parameter>,

    /// Request body
    pub body: Option<String>,
}

impl Default for ProbeRequest {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method: "GET".to_string(),
            url: String::new(),
            headers: HashMap::new(),
            form_params: Vec::new(),
            body: None,
        }
    }
}

impl ProbeRequest {
    /// Create a new request
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// Create a builder for constructing requests
    pub fn builder() -> ProbeRequestBuilder {
        ProbeRequestBuilder::default()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing spelling of the name.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.remove_header(name);
        self.headers.insert(name.to_string(), value.to_string());
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
    }

    /// Drop the session cookie so the next dispatch elicits a freshly
    /// issued token.
    pub fn strip_cookies(&mut self) {
        self.remove_header(COOKIE);
    }

    /// Replace the body and keep Content-Length in step with it.
    pub fn set_body(&mut self, body: String) {
        self.set_header(CONTENT_LENGTH, &body.len().to_string());
        self.body = Some(body);
    }
}

/// Builder for constructing request templates
#[derive(Debug, Default)]
pub struct ProbeRequestBuilder {
    request: ProbeRequest,
}

impl ProbeRequestBuilder {
    /// Set the request method
    pub fn method(mut self, method: &str) -> Self {
        self.request.method = method.to_uppercase();
        self
    }

    /// Set the request URL
    pub fn url(mut self, url: &str) -> Self {
        self.request.url = url.to_string();
        self
    }

    /// Add a header
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request
            .headers
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Append a form parameter, preserving insertion order
    pub fn form_param(mut self, name: &str, value: &str) -> Self {
        self.request.form_params.push(Parameter::new(name, value));
        self
    }

    /// Build the request
    pub fn build(self) -> ProbeRequest {
        self.request
    }
}
