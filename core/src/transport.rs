//! The boundary where requests meet the network.
//!
//! # Design
//! The provider only builds `HttpRequest` values and interprets
//! `HttpResponse` values; a `Transport` performs the round-trip. Tests swap in
//! in-memory transports, while `UreqTransport` is the blocking default.
//! HTTP error statuses are data here, never transport failures: status
//! interpretation belongs to the provider's validation.

use std::io::Read;

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::config::TransportConfig;
use crate::http::{HttpRequest, HttpResponse};

const READ_CHUNK: usize = 16 * 1024;

/// Bytes transferred so far, with the total when the server announced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: u64,
    pub total: Option<u64>,
}

impl Progress {
    /// Fraction completed in `0.0..=1.0`; `0.0` while the total is unknown.
    pub fn fraction_completed(&self) -> f64 {
        match self.total {
            Some(total) if total > 0 => (self.completed as f64 / total as f64).min(1.0),
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("failed to read response body: {0}")]
    Io(String),
}

/// Executes requests. Implementations must be shareable across threads.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: &HttpRequest,
        progress: Option<&dyn Fn(Progress)>,
    ) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(
        &self,
        request: &HttpRequest,
        progress: Option<&dyn Fn(Progress)>,
    ) -> Result<HttpResponse, TransportError> {
        (**self).execute(request, progress)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    config: TransportConfig,
}

impl UreqTransport {
    pub fn new(config: TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout())
            .build()
            .new_agent();
        Self { agent, config }
    }

    fn build(&self, request: &HttpRequest) -> ureq::http::request::Builder {
        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.header("User-Agent").is_none() {
            builder = builder.header("User-Agent", self.config.user_agent.as_str());
        }
        for (name, value) in &self.config.default_headers {
            if request.header(name).is_none() {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        builder
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl Transport for UreqTransport {
    fn execute(
        &self,
        request: &HttpRequest,
        progress: Option<&dyn Fn(Progress)>,
    ) -> Result<HttpResponse, TransportError> {
        let builder = self.build(request);
        let result = match &request.body {
            Some(body) => builder
                .body(body.to_vec())
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))
                .and_then(|req| self.agent.run(req).map_err(map_ureq_error)),
            None => builder
                .body(())
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))
                .and_then(|req| self.agent.run(req).map_err(map_ureq_error)),
        };
        let mut response = result?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let total = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<u64>().ok());

        let body = read_body(response.body_mut().as_reader(), total, progress)?;
        Ok(HttpResponse { status, headers, body })
    }
}

fn read_body(
    mut reader: impl Read,
    total: Option<u64>,
    progress: Option<&dyn Fn(Progress)>,
) -> Result<Bytes, TransportError> {
    let mut body = BytesMut::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let read = reader
            .read(&mut chunk)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
        if let Some(progress) = progress {
            progress(Progress {
                completed: body.len() as u64,
                total,
            });
        }
    }
    Ok(body.freeze())
}

fn map_ureq_error(error: ureq::Error) -> TransportError {
    match error {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        other => TransportError::Connection(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;

    #[test]
    fn fraction_completed_needs_a_total() {
        assert_eq!(Progress { completed: 5, total: None }.fraction_completed(), 0.0);
        assert_eq!(Progress { completed: 5, total: Some(10) }.fraction_completed(), 0.5);
        assert_eq!(Progress { completed: 0, total: Some(0) }.fraction_completed(), 0.0);
    }

    #[test]
    fn body_is_read_in_chunks_with_progress() {
        let data = vec![7u8; READ_CHUNK * 2 + 10];
        let seen = RefCell::new(Vec::new());
        let report = |p: Progress| seen.borrow_mut().push(p);
        let body = read_body(Cursor::new(data.clone()), Some(data.len() as u64), Some(&report)).unwrap();

        assert_eq!(body.len(), data.len());
        let seen = seen.into_inner();
        assert!(seen.len() >= 3);
        assert_eq!(seen.last().unwrap().completed, data.len() as u64);
        assert_eq!(seen.last().unwrap().fraction_completed(), 1.0);
    }

    #[test]
    fn connection_failures_are_transport_errors() {
        let transport = UreqTransport::new(TransportConfig {
            timeout_secs: Some(2),
            ..TransportConfig::default()
        });
        let request = HttpRequest::new(crate::Method::Get, "http://127.0.0.1:1/unreachable");
        let err = transport.execute(&request, None).unwrap_err();
        assert!(matches!(err, TransportError::Connection(_) | TransportError::Timeout));
    }
}
