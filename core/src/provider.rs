//! The façade that turns targets into responses.
//!
//! # Design
//! `Provider` owns the mapping pipeline (target → endpoint → request), the
//! ordered plugin list and a `Transport`. Every step is a replaceable closure
//! so tests can stub responses, rewrite endpoints or reject requests without
//! touching the network.
//!
//! Requests are synchronous: `request` blocks until a result is available.
//! Cancellation is cooperative through a shared `Cancellable` flag, checked
//! before sending, after a stub delay and after the transport returns.

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::config::TransportConfig;
use crate::endpoint::Endpoint;
use crate::error::{CourierError, CourierResult, UnderlyingError};
use crate::http::HttpRequest;
use crate::multipart::MultipartBody;
use crate::plugins::Plugin;
use crate::response::Response;
use crate::stub::{SampleResponse, StubBehavior};
use crate::target::{target_url, TargetType};
use crate::task::Task;
use crate::transport::{Progress, Transport, UreqTransport};

pub type EndpointClosure<T> = Arc<dyn Fn(&T) -> Endpoint + Send + Sync>;
pub type RequestClosure = Arc<dyn Fn(&Endpoint) -> CourierResult<HttpRequest> + Send + Sync>;
pub type StubClosure<T> = Arc<dyn Fn(&T) -> StubBehavior + Send + Sync>;

const STUB_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A shareable cancellation flag for an in-progress request.
#[derive(Debug, Clone, Default)]
pub struct Cancellable {
    cancelled: Arc<AtomicBool>,
}

impl Cancellable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Progress of a request, and its response once completed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressResponse {
    pub progress: Option<Progress>,
    pub response: Option<Response>,
}

impl ProgressResponse {
    pub fn from_progress(progress: Progress) -> Self {
        Self {
            progress: Some(progress),
            response: None,
        }
    }

    pub fn from_response(response: Response) -> Self {
        Self {
            progress: None,
            response: Some(response),
        }
    }

    /// Fraction of the work completed: `1.0` once a response is present,
    /// `0.0` while the total size is unknown.
    pub fn progress(&self) -> f64 {
        if self.completed() {
            return 1.0;
        }
        self.progress.map(|p| p.fraction_completed()).unwrap_or(0.0)
    }

    pub fn completed(&self) -> bool {
        self.response.is_some()
    }
}

/// Per-call knobs for `Provider::request_with`.
#[derive(Clone, Copy, Default)]
pub struct RequestOptions<'a> {
    pub cancellable: Option<&'a Cancellable>,
    pub progress: Option<&'a (dyn Fn(ProgressResponse) + Send + Sync)>,
}

impl RequestOptions<'_> {
    fn is_cancelled(&self) -> bool {
        self.cancellable.is_some_and(Cancellable::is_cancelled)
    }
}

/// Request provider. Requests should be made through this type only.
pub struct Provider<T> {
    endpoint_closure: EndpointClosure<T>,
    request_closure: RequestClosure,
    stub_closure: StubClosure<T>,
    transport: Arc<dyn Transport>,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl<T: TargetType + 'static> Default for Provider<T> {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<T: TargetType + 'static> Provider<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ProviderBuilder<T> {
        ProviderBuilder::new()
    }

    /// URL from `target_url`, sample response `NetworkResponse(200, sample_data)`,
    /// and the target's method, task and headers.
    pub fn default_endpoint_mapping(target: &T) -> Endpoint {
        let sample = target.sample_data();
        Endpoint::new(
            target_url(target),
            move || SampleResponse::NetworkResponse(200, sample.clone()),
            target.method(),
            target.task(),
            target.headers(),
        )
    }

    pub fn default_request_mapping(endpoint: &Endpoint) -> CourierResult<HttpRequest> {
        endpoint.url_request()
    }

    pub fn never_stub(_: &T) -> StubBehavior {
        StubBehavior::Never
    }

    pub fn immediately_stub(_: &T) -> StubBehavior {
        StubBehavior::Immediate
    }

    pub fn delayed_stub(delay: Duration) -> impl Fn(&T) -> StubBehavior + Send + Sync + 'static {
        move |_| StubBehavior::Delayed(delay)
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    pub fn endpoint(&self, target: &T) -> Endpoint {
        (self.endpoint_closure)(target)
    }

    pub fn stub_behavior(&self, target: &T) -> StubBehavior {
        (self.stub_closure)(target)
    }

    pub fn request(&self, target: &T) -> CourierResult<Response> {
        self.request_with(target, RequestOptions::default())
    }

    /// Run `target` through the endpoint/request mapping, the plugins and
    /// either the stub or the transport.
    pub fn request_with(&self, target: &T, options: RequestOptions<'_>) -> CourierResult<Response> {
        let endpoint = self.endpoint(target);
        let stub_behavior = self.stub_behavior(target);
        let span = tracing::debug_span!(
            "courier.request",
            method = %endpoint.method,
            url = %endpoint.url,
            stub = ?stub_behavior
        );
        let _enter = span.enter();

        if options.is_cancelled() {
            return self.cancel_completion(target);
        }

        let request = match (self.request_closure)(&endpoint) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "request mapping failed");
                return self.complete(Err(e), target);
            }
        };

        match stub_behavior {
            StubBehavior::Never => self.send_request(target, request, &endpoint, options),
            StubBehavior::Immediate | StubBehavior::Delayed(_) => {
                self.stub_request(target, request, &endpoint, stub_behavior, options)
            }
        }
    }

    /// Serve `endpoint`'s sample response. Plugins are notified exactly as
    /// for a network request.
    pub fn stub_request(
        &self,
        target: &T,
        request: HttpRequest,
        endpoint: &Endpoint,
        stub_behavior: StubBehavior,
        options: RequestOptions<'_>,
    ) -> CourierResult<Response> {
        let prepared = self.notify_plugins_of_impending_request(request, target);

        if let StubBehavior::Delayed(delay) = stub_behavior {
            wait_for_stub(delay, &options);
        }
        if options.is_cancelled() {
            return self.cancel_completion(target);
        }

        let result = match endpoint.sample_response() {
            SampleResponse::NetworkResponse(status, data) => {
                validate(Response::new(status, data).with_request(prepared), target)
            }
            SampleResponse::Response { status, headers, data } => {
                let mut response = Response::new(status, data).with_request(prepared);
                response.headers = Some(headers);
                validate(response, target)
            }
            SampleResponse::NetworkError(message) => {
                Err(CourierError::underlying(UnderlyingError::Stubbed(message)))
            }
        };
        tracing::debug!(ok = result.is_ok(), "stubbed response delivered");
        self.finish(result, target, options)
    }

    fn send_request(
        &self,
        target: &T,
        request: HttpRequest,
        endpoint: &Endpoint,
        options: RequestOptions<'_>,
    ) -> CourierResult<Response> {
        let request = match materialize_body(request, endpoint) {
            Ok(request) => request,
            Err(e) => return self.complete(Err(e), target),
        };
        let prepared = self.notify_plugins_of_impending_request(request, target);

        let report = options
            .progress
            .map(|sink| move |progress: Progress| sink(ProgressResponse::from_progress(progress)));
        let outcome = self
            .transport
            .execute(&prepared, report.as_ref().map(|f| f as &dyn Fn(Progress)));

        let result = if options.is_cancelled() {
            Err(CourierError::cancelled())
        } else {
            match outcome {
                Ok(response) => validate(Response::from_http(response, prepared), target)
                    .and_then(|response| write_download(response, &endpoint.task)),
                Err(e) => {
                    tracing::warn!(error = %e, "transport failed");
                    Err(CourierError::underlying(UnderlyingError::Transport(e.to_string())))
                }
            }
        };
        self.finish(result, target, options)
    }

    fn notify_plugins_of_impending_request(&self, request: HttpRequest, target: &T) -> HttpRequest {
        let prepared = self
            .plugins
            .iter()
            .fold(request, |request, plugin| plugin.prepare(request, target));
        for plugin in &self.plugins {
            plugin.will_send(&prepared, target);
        }
        prepared
    }

    fn finish(
        &self,
        result: CourierResult<Response>,
        target: &T,
        options: RequestOptions<'_>,
    ) -> CourierResult<Response> {
        for plugin in &self.plugins {
            plugin.did_receive(&result, target);
        }
        let result = self.complete(result, target);
        if let (Some(sink), Ok(response)) = (options.progress, &result) {
            sink(ProgressResponse::from_response(response.clone()));
        }
        result
    }

    fn cancel_completion(&self, target: &T) -> CourierResult<Response> {
        tracing::debug!("request cancelled");
        let result = Err(CourierError::cancelled());
        for plugin in &self.plugins {
            plugin.did_receive(&result, target);
        }
        self.complete(result, target)
    }

    fn complete(&self, result: CourierResult<Response>, target: &T) -> CourierResult<Response> {
        self.plugins
            .iter()
            .fold(result, |result, plugin| plugin.process(result, target))
    }
}

fn validate(response: Response, target: &dyn TargetType) -> CourierResult<Response> {
    if target.validation_type().accepts(response.status_code) {
        Ok(response)
    } else {
        Err(CourierError::StatusCode(response))
    }
}

/// Attach file and multipart bodies, which only exist on the network path.
fn materialize_body(mut request: HttpRequest, endpoint: &Endpoint) -> CourierResult<HttpRequest> {
    if let Task::UploadFile(path) = &endpoint.task {
        request.body = Some(Bytes::from(fs::read(path)?));
    }
    if let Some(parts) = endpoint.task.multipart_parts() {
        if parts.is_empty() || !endpoint.method.supports_multipart() {
            return Err(CourierError::ParameterEncoding(format!(
                "{} {} is not a multipart upload target",
                endpoint.method, endpoint.url
            )));
        }
        let encoded = MultipartBody::encode(parts)?;
        request.set_header("Content-Type", encoded.content_type);
        request.body = Some(encoded.body);
    }
    Ok(request)
}

fn write_download(response: Response, task: &Task) -> CourierResult<Response> {
    if let Some(destination) = task.download_destination() {
        fs::write(destination, &response.data)?;
    }
    Ok(response)
}

fn wait_for_stub(delay: Duration, options: &RequestOptions<'_>) {
    let deadline = Instant::now() + delay;
    loop {
        let now = Instant::now();
        if now >= deadline || options.is_cancelled() {
            return;
        }
        thread::sleep((deadline - now).min(STUB_POLL_INTERVAL));
    }
}

/// Builder for `Provider`.
pub struct ProviderBuilder<T> {
    endpoint_closure: Option<EndpointClosure<T>>,
    request_closure: Option<RequestClosure>,
    stub_closure: Option<StubClosure<T>>,
    transport: Option<Arc<dyn Transport>>,
    transport_config: TransportConfig,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl<T: TargetType + 'static> ProviderBuilder<T> {
    pub fn new() -> Self {
        Self {
            endpoint_closure: None,
            request_closure: None,
            stub_closure: None,
            transport: None,
            transport_config: TransportConfig::default(),
            plugins: Vec::new(),
        }
    }

    pub fn endpoint_closure(mut self, closure: impl Fn(&T) -> Endpoint + Send + Sync + 'static) -> Self {
        self.endpoint_closure = Some(Arc::new(closure));
        self
    }

    pub fn request_closure(
        mut self,
        closure: impl Fn(&Endpoint) -> CourierResult<HttpRequest> + Send + Sync + 'static,
    ) -> Self {
        self.request_closure = Some(Arc::new(closure));
        self
    }

    pub fn stub_closure(mut self, closure: impl Fn(&T) -> StubBehavior + Send + Sync + 'static) -> Self {
        self.stub_closure = Some(Arc::new(closure));
        self
    }

    /// Stub every target with the same behavior.
    pub fn stub_behavior(self, behavior: StubBehavior) -> Self {
        self.stub_closure(move |_| behavior)
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Configuration for the default `UreqTransport`. Ignored when a
    /// transport is set explicitly.
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn build(self) -> Provider<T> {
        let transport_config = self.transport_config;
        Provider {
            endpoint_closure: self
                .endpoint_closure
                .unwrap_or_else(|| Arc::new(Provider::<T>::default_endpoint_mapping)),
            request_closure: self
                .request_closure
                .unwrap_or_else(|| Arc::new(Provider::<T>::default_request_mapping)),
            stub_closure: self
                .stub_closure
                .unwrap_or_else(|| Arc::new(Provider::<T>::never_stub)),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(UreqTransport::new(transport_config))),
            plugins: self.plugins,
        }
    }
}

impl<T: TargetType + 'static> Default for ProviderBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
