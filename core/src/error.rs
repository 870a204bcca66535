//! Error types for the courier provider.
//!
//! # Design
//! Mapping failures carry the `Response` they failed on so callers can still
//! inspect status and body. Everything the provider could not turn into a
//! response at all (transport failures, cancellation, I/O on upload/download
//! files, canned network errors from stubs) lands in `Underlying`.
//!
//! Errors are `Clone` because a single result may be handed to several
//! waiters of the same inflight request.

use thiserror::Error;

use crate::response::Response;

pub type CourierResult<T> = Result<T, CourierError>;

/// Errors returned by the provider and by `Response` mapping helpers.
#[derive(Debug, Clone, Error)]
pub enum CourierError {
    /// The response body could not be read as JSON.
    #[error("failed to map data to JSON ({0})")]
    JsonMapping(Response),

    /// The response body could not be read as a string.
    #[error("failed to map data to a string ({0})")]
    StringMapping(Response),

    /// The response body could not be decoded into the requested type.
    #[error("failed to map data to a decodable object: {reason}")]
    ObjectMapping { reason: String, response: Response },

    /// A value could not be serialized into a request body.
    #[error("failed to encode encodable object into data: {0}")]
    EncodableMapping(String),

    /// The status code did not pass validation or a `filter_*` call.
    #[error("status code didn't fall within the given range ({0})")]
    StatusCode(Response),

    /// The request failed before or while producing a response.
    #[error("{error}")]
    Underlying {
        error: UnderlyingError,
        response: Option<Box<Response>>,
    },

    /// The endpoint could not be turned into a request (invalid URL).
    #[error("failed to map endpoint to a request: {0}")]
    RequestMapping(String),

    /// Parameters or body parts could not be encoded.
    #[error("failed to encode parameters: {0}")]
    ParameterEncoding(String),
}

/// Causes behind `CourierError::Underlying`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnderlyingError {
    #[error("request cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("i/o error: {0}")]
    Io(String),

    /// A canned `SampleResponse::NetworkError`.
    #[error("stubbed network error: {0}")]
    Stubbed(String),

    /// The async runtime failed to drive the request to completion.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl CourierError {
    pub fn underlying(error: UnderlyingError) -> Self {
        CourierError::Underlying { error, response: None }
    }

    pub fn cancelled() -> Self {
        Self::underlying(UnderlyingError::Cancelled)
    }

    /// The response attached to this error, if any.
    pub fn response(&self) -> Option<&Response> {
        match self {
            CourierError::JsonMapping(response)
            | CourierError::StringMapping(response)
            | CourierError::StatusCode(response)
            | CourierError::ObjectMapping { response, .. } => Some(response),
            CourierError::Underlying { response, .. } => response.as_deref(),
            CourierError::EncodableMapping(_)
            | CourierError::RequestMapping(_)
            | CourierError::ParameterEncoding(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            CourierError::Underlying {
                error: UnderlyingError::Cancelled,
                ..
            }
        )
    }
}

impl From<std::io::Error> for CourierError {
    fn from(e: std::io::Error) -> Self {
        Self::underlying(UnderlyingError::Io(e.to_string()))
    }
}
