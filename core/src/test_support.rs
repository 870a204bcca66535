//! Targets and helpers shared by unit tests.

use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::http::{HttpRequest, HttpResponse, Method};
use crate::plugins::{AuthorizationType, Plugin};
use crate::response::Response;
use crate::target::{TargetType, ValidationType};
use crate::task::Task;
use crate::transport::{Progress, Transport, TransportError};
use crate::CourierResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHub {
    Zen,
    UserProfile(String),
    Protected,
    Validated,
}

impl TargetType for GitHub {
    fn base_url(&self) -> String {
        "http://api.example.com".to_string()
    }

    fn path(&self) -> String {
        match self {
            GitHub::Zen => "zen".to_string(),
            GitHub::UserProfile(name) => format!("users/{name}"),
            GitHub::Protected => "protected".to_string(),
            GitHub::Validated => "validated".to_string(),
        }
    }

    fn method(&self) -> Method {
        Method::Get
    }

    fn task(&self) -> Task {
        Task::RequestPlain
    }

    fn sample_data(&self) -> Bytes {
        match self {
            GitHub::Zen => Bytes::from_static(b"Half measures are as bad as nothing at all."),
            GitHub::UserProfile(name) => {
                Bytes::from(format!(r#"{{"login":"{name}","id":100}}"#))
            }
            GitHub::Protected | GitHub::Validated => Bytes::new(),
        }
    }

    fn validation_type(&self) -> ValidationType {
        match self {
            GitHub::Validated => ValidationType::SuccessCodes,
            _ => ValidationType::None,
        }
    }

    fn authorization_type(&self) -> Option<AuthorizationType> {
        match self {
            GitHub::Protected => Some(AuthorizationType::Bearer),
            _ => None,
        }
    }
}

/// Records every hook invocation in order.
#[derive(Default, Clone)]
pub struct RecordingPlugin {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingPlugin {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Plugin for RecordingPlugin {
    fn prepare(&self, mut request: HttpRequest, _target: &dyn TargetType) -> HttpRequest {
        self.events.lock().unwrap().push("prepare".to_string());
        request.set_header("X-Prepared", "true");
        request
    }

    fn will_send(&self, request: &HttpRequest, _target: &dyn TargetType) {
        self.events
            .lock()
            .unwrap()
            .push(format!("will_send prepared={}", request.header("X-Prepared").unwrap_or("false")));
    }

    fn did_receive(&self, result: &CourierResult<Response>, _target: &dyn TargetType) {
        let outcome = match result {
            Ok(response) => format!("ok {}", response.status_code),
            Err(e) if e.is_cancelled() => "cancelled".to_string(),
            Err(_) => "err".to_string(),
        };
        self.events.lock().unwrap().push(format!("did_receive {outcome}"));
    }

    fn process(
        &self,
        result: CourierResult<Response>,
        _target: &dyn TargetType,
    ) -> CourierResult<Response> {
        self.events.lock().unwrap().push("process".to_string());
        result
    }
}

/// A transport answering every request with a fixed response and keeping
/// the requests it saw.
pub struct FixedTransport {
    pub status: u16,
    pub body: Bytes,
    pub seen: Mutex<Vec<HttpRequest>>,
}

impl FixedTransport {
    pub fn new(status: u16, body: &'static [u8]) -> Self {
        Self {
            status,
            body: Bytes::from_static(body),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl Transport for FixedTransport {
    fn execute(
        &self,
        request: &HttpRequest,
        progress: Option<&dyn Fn(Progress)>,
    ) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        if let Some(progress) = progress {
            let total = self.body.len() as u64;
            progress(Progress { completed: total, total: Some(total) });
        }
        Ok(HttpResponse {
            status: self.status,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: self.body.clone(),
        })
    }
}

/// A transport that always fails.
pub struct FailingTransport;

impl Transport for FailingTransport {
    fn execute(
        &self,
        _request: &HttpRequest,
        _progress: Option<&dyn Fn(Progress)>,
    ) -> Result<HttpResponse, TransportError> {
        Err(TransportError::Connection("connection refused".to_string()))
    }
}
