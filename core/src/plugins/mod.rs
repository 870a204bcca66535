//! Lifecycle hooks around every request.
//!
//! # Design
//! A provider holds an ordered list of plugins. `prepare` and `process` are
//! folds, so each plugin sees the output of the one before it. `will_send`
//! and `did_receive` are notifications and fire for stubbed requests too, so
//! cross-cutting behavior (logging, auth, activity indicators) is identical
//! whether or not the network is involved.

mod access_token;
mod credentials;
mod network_activity;
mod network_logger;

pub use access_token::{AccessTokenPlugin, AuthorizationType};
pub use credentials::{Credential, CredentialsPlugin};
pub use network_activity::{NetworkActivityChange, NetworkActivityPlugin};
pub use network_logger::{
    LoggerConfiguration, NetworkLoggerPlugin, RequestLogOptions, ResponseLogOptions,
};

use crate::error::CourierResult;
use crate::http::HttpRequest;
use crate::response::Response;
use crate::target::TargetType;

/// Receives callbacks wherever a request is sent or received.
pub trait Plugin: Send + Sync {
    /// Modify a request before it is sent.
    fn prepare(&self, request: HttpRequest, _target: &dyn TargetType) -> HttpRequest {
        request
    }

    /// Called immediately before a request is sent over the network (or stubbed).
    fn will_send(&self, _request: &HttpRequest, _target: &dyn TargetType) {}

    /// Called after a result is available, before `process` and before the
    /// caller sees it.
    fn did_receive(&self, _result: &CourierResult<Response>, _target: &dyn TargetType) {}

    /// Modify a result before completion.
    fn process(
        &self,
        result: CourierResult<Response>,
        _target: &dyn TargetType,
    ) -> CourierResult<Response> {
        result
    }
}
