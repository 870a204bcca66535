//! Canned responses served instead of hitting the network.

use std::time::Duration;

use bytes::Bytes;

/// Controls how stub responses are returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StubBehavior {
    /// Do not stub.
    #[default]
    Never,
    /// Return the sample response immediately.
    Immediate,
    /// Return the sample response after a delay.
    Delayed(Duration),
}

/// What a stubbed request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleResponse {
    /// The network returned a response with this status and body.
    NetworkResponse(u16, Bytes),
    /// A fully customised response.
    Response {
        status: u16,
        headers: Vec<(String, String)>,
        data: Bytes,
    },
    /// The request failed before producing a response (e.g. a timeout).
    NetworkError(String),
}
