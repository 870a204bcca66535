//! Response combinators for futures returned by `ReactiveProvider`.

use std::future::Future;

use courier_core::{CourierResult, Response};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub trait ResponseFutureExt: Future<Output = CourierResult<Response>> + Sized + Send + 'static {
    /// Fail with `StatusCode` unless the status is in `200..=299`.
    fn filter_successful_status_codes(self) -> BoxFuture<'static, CourierResult<Response>> {
        self.map(|result| result.and_then(Response::filter_successful_status_codes))
            .boxed()
    }

    /// Fail with `StatusCode` unless the status is in `200..=399`.
    fn filter_successful_status_and_redirect_codes(self) -> BoxFuture<'static, CourierResult<Response>> {
        self.map(|result| result.and_then(Response::filter_successful_status_and_redirect_codes))
            .boxed()
    }

    fn filter_status_code(self, code: u16) -> BoxFuture<'static, CourierResult<Response>> {
        self.map(move |result| result.and_then(|response| response.filter_status_code(code)))
            .boxed()
    }

    fn map_json(self, fails_on_empty_data: bool) -> BoxFuture<'static, CourierResult<Value>> {
        self.map(move |result| result.and_then(|response| response.map_json(fails_on_empty_data)))
            .boxed()
    }

    fn map_string(self, key_path: Option<String>) -> BoxFuture<'static, CourierResult<String>> {
        self.map(move |result| result.and_then(|response| response.map_string(key_path.as_deref())))
            .boxed()
    }

    /// Decode the body, or the value at `key_path`, into `D`.
    fn map_to<D: DeserializeOwned + Send + 'static>(
        self,
        key_path: Option<String>,
        fails_on_empty_data: bool,
    ) -> BoxFuture<'static, CourierResult<D>> {
        self.map(move |result| {
            result.and_then(|response| response.map::<D>(key_path.as_deref(), fails_on_empty_data))
        })
        .boxed()
    }
}

impl<F> ResponseFutureExt for F where F: Future<Output = CourierResult<Response>> + Send + 'static {}
