//! Blocking HTTP transport.
//!
//! Every remote call in CareBridge goes through [`HttpTransport::send`]. Production code
//! uses [`ReqwestTransport`]; tests substitute a scripted transport that replays canned
//! responses and records what was sent.
//!
//! The transport only moves bytes. Status handling (which codes count as success) is
//! left to the callers because the servers disagree: the destination returns `201` on
//! create, the source and terminology servers return `200`.

#[cfg(test)]
pub(crate) mod scripted;

use crate::{BridgeError, BridgeResult};
use std::time::Duration;

/// HTTP method subset used by the toolkit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request to be sent by an [`HttpTransport`].
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Query parameters, URL-encoded by the transport.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: Some(body),
            timeout: None,
        }
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Value of the first header called `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of the first query parameter called `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A fully-read response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// Final URL of the request, including the encoded query.
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `200 OK` or `201 Created`, the two codes a FHIR create may return.
    pub fn is_created(&self) -> bool {
        matches!(self.status, 200 | 201)
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ResponseUnparseable`] if the body is not valid JSON for `T`.
    pub fn json<T>(&self) -> BridgeResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_str(&self.body).map_err(|e| BridgeError::ResponseUnparseable {
            url: self.url.clone(),
            reason: e.to_string(),
        })
    }

    /// Turn the response into a [`BridgeError::RemoteRequestFailed`].
    pub fn into_failure(self) -> BridgeError {
        BridgeError::RemoteRequestFailed {
            url: self.url,
            status: self.status,
            body: self.body,
        }
    }
}

/// Sends HTTP requests and reads the whole response body.
pub trait HttpTransport {
    /// # Errors
    ///
    /// Returns [`BridgeError::RemoteRequestTimedOut`] when the request exceeded its
    /// timeout and [`BridgeError::RemoteUnreachable`] for any other network failure.
    /// Non-2xx statuses are *not* errors at this layer.
    fn send(&self, request: &HttpRequest) -> BridgeResult<HttpResponse>;
}

/// [`HttpTransport`] backed by `reqwest`'s blocking client.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Build a transport with no client-wide timeout; requests set their own.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidInput`] if the TLS backend cannot be initialised.
    pub fn new() -> BridgeResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| BridgeError::InvalidInput(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> BridgeResult<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        tracing::debug!("{:?} {}", request.method, request.url);
        let response = builder
            .send()
            .map_err(|e| classify_error(&request.url, e))?;

        let url = response.url().to_string();
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| classify_error(&url, e))?;

        Ok(HttpResponse { url, status, body })
    }
}

fn classify_error(url: &str, err: reqwest::Error) -> BridgeError {
    if err.is_timeout() {
        BridgeError::RemoteRequestTimedOut {
            url: url.to_owned(),
        }
    } else {
        BridgeError::RemoteUnreachable {
            url: url.to_owned(),
            reason: err.to_string(),
        }
    }
}
