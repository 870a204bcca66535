//! `multipart/form-data` bodies.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::error::CourierResult;

const DEFAULT_FILE_MIME_TYPE: &str = "application/octet-stream";

/// Where the bytes of a form part come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormDataProvider {
    Data(Bytes),
    File(PathBuf),
}

/// One part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFormData {
    pub provider: FormDataProvider,
    pub name: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

impl MultipartFormData {
    pub fn data(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            provider: FormDataProvider::Data(data.into()),
            name: name.into(),
            file_name: None,
            mime_type: None,
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            provider: FormDataProvider::File(path.into()),
            name: name.into(),
            file_name: None,
            mime_type: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// An encoded multipart body and the `Content-Type` that announces its boundary.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub boundary: String,
    pub content_type: String,
    pub body: Bytes,
}

impl MultipartBody {
    pub fn encode(parts: &[MultipartFormData]) -> CourierResult<Self> {
        let boundary = format!("courier.boundary.{}", Uuid::new_v4().simple());
        let mut body = BytesMut::new();
        for part in parts {
            let (data, file_name, mime_type) = match &part.provider {
                FormDataProvider::Data(data) => {
                    (data.clone(), part.file_name.clone(), part.mime_type.clone())
                }
                FormDataProvider::File(path) => (
                    Bytes::from(fs::read(path)?),
                    part.file_name.clone().or_else(|| last_component(path)),
                    Some(
                        part.mime_type
                            .clone()
                            .unwrap_or_else(|| DEFAULT_FILE_MIME_TYPE.to_string()),
                    ),
                ),
            };

            body.put_slice(format!("--{boundary}\r\n").as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
            if let Some(file_name) = &file_name {
                disposition.push_str(&format!("; filename=\"{file_name}\""));
            }
            body.put_slice(disposition.as_bytes());
            body.put_slice(b"\r\n");
            if let Some(mime_type) = &mime_type {
                body.put_slice(format!("Content-Type: {mime_type}\r\n").as_bytes());
            }
            body.put_slice(b"\r\n");
            body.put_slice(&data);
            body.put_slice(b"\r\n");
        }
        body.put_slice(format!("--{boundary}--\r\n").as_bytes());

        Ok(Self {
            content_type: format!("multipart/form-data; boundary={boundary}"),
            boundary,
            body: body.freeze(),
        })
    }
}

fn last_component(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn data_parts_are_framed_by_boundary() {
        let parts = vec![
            MultipartFormData::data("title", "Moya"),
            MultipartFormData::data("logo", vec![1u8, 2, 3])
                .with_file_name("logo.png")
                .with_mime_type("image/png"),
        ];
        let encoded = MultipartBody::encode(&parts).unwrap();
        let body = String::from_utf8_lossy(&encoded.body);
        let b = &encoded.boundary;

        assert_eq!(encoded.content_type, format!("multipart/form-data; boundary={b}"));
        assert!(body.starts_with(&format!("--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nMoya\r\n")));
        assert!(body.contains(
            "Content-Disposition: form-data; name=\"logo\"; filename=\"logo.png\"\r\nContent-Type: image/png\r\n\r\n"
        ));
        assert!(body.ends_with(&format!("--{b}--\r\n")));
    }

    #[test]
    fn file_parts_default_name_and_mime_type() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"file contents").unwrap();
        let expected_name = file.path().file_name().unwrap().to_string_lossy().into_owned();

        let encoded = MultipartBody::encode(&[MultipartFormData::file("doc", file.path())]).unwrap();
        let body = String::from_utf8_lossy(&encoded.body);
        assert!(body.contains(&format!("filename=\"{expected_name}\"")));
        assert!(body.contains("Content-Type: application/octet-stream"));
        assert!(body.contains("file contents"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = MultipartBody::encode(&[MultipartFormData::file("doc", "/nonexistent/file")])
            .unwrap_err();
        assert!(matches!(
            err,
            crate::CourierError::Underlying {
                error: crate::UnderlyingError::Io(_),
                ..
            }
        ));
    }

    #[test]
    fn boundaries_are_unique() {
        let a = MultipartBody::encode(&[]).unwrap();
        let b = MultipartBody::encode(&[]).unwrap();
        assert_ne!(a.boundary, b.boundary);
    }
}
