//! Reified targets.
//!
//! # Design
//! An `Endpoint` is the concrete, inspectable form of a target: URL, method,
//! task, headers and a closure producing the sample response. The provider's
//! endpoint closure may tweak it (extra headers, another task) before it is
//! turned into an `HttpRequest`.
//!
//! Endpoint identity is the request it maps to, which is what the inflight
//! cache keys on. Endpoints that cannot be mapped fall back to their URL.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::{CourierError, CourierResult};
use crate::http::{HttpRequest, Method};
use crate::stub::SampleResponse;
use crate::target::Headers;
use crate::task::Task;

pub type SampleResponseClosure = Arc<dyn Fn() -> SampleResponse + Send + Sync>;

#[derive(Clone)]
pub struct Endpoint {
    pub url: String,
    pub sample_response_closure: SampleResponseClosure,
    pub method: Method,
    pub task: Task,
    pub headers: Option<Headers>,
}

/// Identity of an endpoint, used to coalesce identical inflight requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndpointKey {
    Request(HttpRequest),
    Unmappable(String),
}

impl Endpoint {
    pub fn new(
        url: impl Into<String>,
        sample_response_closure: impl Fn() -> SampleResponse + Send + Sync + 'static,
        method: Method,
        task: Task,
        headers: Option<Headers>,
    ) -> Self {
        Self {
            url: url.into(),
            sample_response_closure: Arc::new(sample_response_closure),
            method,
            task,
            headers,
        }
    }

    pub fn sample_response(&self) -> SampleResponse {
        (self.sample_response_closure)()
    }

    /// A copy with `new_headers` merged over the existing ones.
    pub fn adding(&self, new_headers: Headers) -> Self {
        let headers = if new_headers.is_empty() {
            self.headers.clone()
        } else {
            let mut merged = self.headers.clone().unwrap_or_default();
            merged.extend(new_headers);
            Some(merged)
        };
        Self {
            headers,
            ..self.clone()
        }
    }

    /// A copy with `task` in place of the current task.
    pub fn replacing(&self, task: Task) -> Self {
        Self {
            task,
            ..self.clone()
        }
    }

    /// Map the endpoint to a request: validated URL, method, headers and
    /// every parameter set of the task.
    pub fn url_request(&self) -> CourierResult<HttpRequest> {
        let url = Url::parse(&self.url).map_err(|_| CourierError::RequestMapping(self.url.clone()))?;
        let mut request = HttpRequest::new(self.method, url.to_string());
        if let Some(headers) = &self.headers {
            for (name, value) in headers {
                request.set_header(name.clone(), value.clone());
            }
        }

        match &self.task {
            Task::RequestData(data) | Task::RequestCompositeData { body: data, .. } => {
                request.body = Some(data.clone());
            }
            Task::RequestJsonEncodable(value) => {
                let body = serde_json::to_vec(value)
                    .map_err(|e| CourierError::EncodableMapping(e.to_string()))?;
                crate::encoding::set_json_body(&mut request, body);
            }
            _ => {}
        }

        if let Task::RequestCompositeParameters { body_encoding, .. } = &self.task {
            if !body_encoding.writes_body() {
                return Err(CourierError::ParameterEncoding(
                    "a query string encoding cannot be used as body encoding".to_string(),
                ));
            }
        }
        for (parameters, encoding) in self.task.parameter_sets() {
            encoding.encode(&mut request, parameters)?;
        }
        Ok(request)
    }

    pub fn key(&self) -> EndpointKey {
        match self.url_request() {
            Ok(request) => EndpointKey::Request(request),
            Err(_) => EndpointKey::Unmappable(self.url.clone()),
        }
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Endpoint {}

impl std::hash::Hash for Endpoint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("task", &self.task)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
