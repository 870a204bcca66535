//! The kind of HTTP work a target performs.

use std::path::PathBuf;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::encoding::{ParameterEncoding, Parameters, UrlEncoding};
use crate::error::{CourierError, CourierResult};
use crate::multipart::MultipartFormData;

/// Represents an HTTP task.
#[derive(Debug, Clone)]
pub enum Task {
    /// A request with no additional data.
    RequestPlain,
    /// A request body set with raw data.
    RequestData(Bytes),
    /// A request body set with a JSON-serialized value. See [`Task::json`].
    RequestJsonEncodable(Value),
    /// Parameters written with the given encoding.
    RequestParameters {
        parameters: Parameters,
        encoding: ParameterEncoding,
    },
    /// Raw body data combined with query string parameters.
    RequestCompositeData {
        body: Bytes,
        url_parameters: Parameters,
    },
    /// Encoded body parameters combined with query string parameters.
    RequestCompositeParameters {
        body_parameters: Parameters,
        body_encoding: ParameterEncoding,
        url_parameters: Parameters,
    },
    /// Upload the contents of a file as the request body.
    UploadFile(PathBuf),
    /// A `multipart/form-data` upload.
    UploadMultipart(Vec<MultipartFormData>),
    /// A `multipart/form-data` upload combined with query string parameters.
    UploadCompositeMultipart {
        parts: Vec<MultipartFormData>,
        url_parameters: Parameters,
    },
    /// Download the response body into a file.
    DownloadDestination(PathBuf),
    /// Download into a file, sending parameters with the given encoding.
    DownloadParameters {
        parameters: Parameters,
        encoding: ParameterEncoding,
        destination: PathBuf,
    },
}

impl Task {
    /// A `RequestJsonEncodable` task for any serializable value.
    pub fn json<E: Serialize>(value: &E) -> CourierResult<Self> {
        serde_json::to_value(value)
            .map(Task::RequestJsonEncodable)
            .map_err(|e| CourierError::EncodableMapping(e.to_string()))
    }

    /// Parameter sets in the order they are applied to a request.
    pub(crate) fn parameter_sets(&self) -> Vec<(&Parameters, ParameterEncoding)> {
        match self {
            Task::RequestParameters { parameters, encoding }
            | Task::DownloadParameters {
                parameters,
                encoding,
                ..
            } => vec![(parameters, encoding.clone())],
            Task::RequestCompositeParameters {
                body_parameters,
                body_encoding,
                url_parameters,
            } => vec![
                (body_parameters, body_encoding.clone()),
                (url_parameters, ParameterEncoding::Url(UrlEncoding::query_string())),
            ],
            Task::RequestCompositeData { url_parameters, .. }
            | Task::UploadCompositeMultipart { url_parameters, .. } => {
                vec![(url_parameters, ParameterEncoding::Url(UrlEncoding::query_string()))]
            }
            Task::RequestPlain
            | Task::RequestData(_)
            | Task::RequestJsonEncodable(_)
            | Task::UploadFile(_)
            | Task::UploadMultipart(_)
            | Task::DownloadDestination(_) => Vec::new(),
        }
    }

    /// Multipart parts carried by upload tasks.
    pub(crate) fn multipart_parts(&self) -> Option<&[MultipartFormData]> {
        match self {
            Task::UploadMultipart(parts) | Task::UploadCompositeMultipart { parts, .. } => {
                Some(parts)
            }
            _ => None,
        }
    }

    /// Where a download task writes its body.
    pub fn download_destination(&self) -> Option<&PathBuf> {
        match self {
            Task::DownloadDestination(destination) | Task::DownloadParameters { destination, .. } => {
                Some(destination)
            }
            _ => None,
        }
    }
}
