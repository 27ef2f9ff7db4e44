//! HTTP transport types and the pluggable `Transport` seam.
//!
//! # Design
//! The core describes a request as plain data and hands it to whatever
//! `Transport` the bot was built with. The request borrows its URL, headers
//! and body from the caller so a pooled scratch buffer can be posted without
//! copying. The response exposes the body as a reader; dropping it closes the
//! underlying stream.
//!
//! `UreqTransport` is the default blocking implementation. Tests substitute
//! an in-memory transport.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use crate::error::TransportError;

/// HTTP method for a request. The webhook API only accepts POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
        }
    }
}

/// An outbound HTTP request described as borrowed plain data.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    pub method: HttpMethod,
    pub url: &'a str,
    pub headers: &'a [(&'a str, &'a str)],
    pub body: &'a [u8],
}

impl HttpRequest<'_> {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }
}

/// A response whose body has not been read yet.
pub struct HttpResponse {
    pub status: u16,
    pub body: Box<dyn Read>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Read + 'static) -> Self {
        Self {
            status,
            body: Box::new(body),
        }
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Executes a single HTTP request.
///
/// Implementations own connection pooling, TLS and deadlines. A non-2xx
/// status is not a transport failure: the body is still returned so the
/// service's error envelope can be decoded.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest<'_>) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Bound every request (connect, send and receive) by `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }

    pub fn from_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest<'_>) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Post => self.agent.post(request.url),
        };
        for (name, value) in request.headers {
            builder = builder.header(*name, *value);
        }

        let response = builder.send(request.body)?;
        let status = response.status().as_u16();
        Ok(HttpResponse::new(status, response.into_body().into_reader()))
    }
}
