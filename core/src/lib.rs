//! Declarative network abstraction over a pluggable HTTP transport.
//!
//! # Overview
//! An API is described once as a `TargetType` (base URL, path, method, task,
//! headers, sample data). A `Provider` maps each target to an `Endpoint`,
//! the endpoint to an `HttpRequest`, runs the request through its plugins
//! and either a `Transport` or the target's sample response, and hands back
//! a `Response` or a `CourierError`.
//!
//! # Design
//! - The provider never performs IO itself; `Transport` does. `UreqTransport`
//!   is the default, tests use in-memory transports.
//! - Endpoint mapping, request mapping and stubbing are closures, replaceable
//!   per provider.
//! - Plugins see every request, stubbed or not, in registration order.
//! - Requests are blocking; the `courier-reactive` crate wraps them in
//!   futures with inflight deduplication.

pub mod config;
pub mod encoding;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod multipart;
pub mod plugins;
pub mod provider;
pub mod response;
pub mod stub;
pub mod target;
pub mod task;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::TransportConfig;
pub use encoding::{JsonEncoding, ParameterEncoding, Parameters, UrlEncoding};
pub use endpoint::{Endpoint, EndpointKey};
pub use error::{CourierError, CourierResult, UnderlyingError};
pub use http::{HttpRequest, HttpResponse, Method};
pub use multipart::{FormDataProvider, MultipartFormData};
pub use plugins::Plugin;
pub use provider::{Cancellable, ProgressResponse, Provider, ProviderBuilder, RequestOptions};
pub use response::Response;
pub use stub::{SampleResponse, StubBehavior};
pub use target::{target_url, Headers, MultiTarget, TargetType, ValidationType};
pub use task::Task;
pub use transport::{Progress, Transport, TransportError, UreqTransport};
