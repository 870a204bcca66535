//! The value a provider hands back for a completed request.
//!
//! Besides carrying status and body, `Response` offers the usual mapping
//! helpers: status filtering, JSON, strings and typed decoding, optionally at
//! a dotted key path inside a JSON object.

use std::fmt;
use std::ops::{RangeBounds, RangeInclusive};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CourierError, CourierResult};
use crate::http::{HttpRequest, HttpResponse};

/// Response to a `Provider::request`.
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    pub data: Bytes,
    /// The request that produced this response, after plugins prepared it.
    pub request: Option<HttpRequest>,
    /// Headers of a real network response. Stubbed responses only carry
    /// headers when the sample response specified them.
    pub headers: Option<Vec<(String, String)>>,
}

impl Response {
    pub fn new(status_code: u16, data: impl Into<Bytes>) -> Self {
        Self {
            status_code,
            data: data.into(),
            request: None,
            headers: None,
        }
    }

    pub(crate) fn from_http(response: HttpResponse, request: HttpRequest) -> Self {
        Self {
            status_code: response.status,
            data: response.body,
            request: Some(request),
            headers: Some(response.headers),
        }
    }

    pub fn with_request(mut self, request: HttpRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Case-insensitive lookup in the response headers.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_ref()?
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the response if its status code falls within `range`.
    pub fn filter<R: RangeBounds<u16>>(self, range: R) -> CourierResult<Self> {
        if range.contains(&self.status_code) {
            Ok(self)
        } else {
            Err(CourierError::StatusCode(self))
        }
    }

    pub fn filter_status_code(self, code: u16) -> CourierResult<Self> {
        self.filter(code..=code)
    }

    pub fn filter_successful_status_codes(self) -> CourierResult<Self> {
        self.filter(SUCCESS_CODES)
    }

    pub fn filter_successful_status_and_redirect_codes(self) -> CourierResult<Self> {
        self.filter(SUCCESS_AND_REDIRECT_CODES)
    }

    /// Parse the body as JSON. Empty data maps to `Value::Null` when
    /// `fails_on_empty_data` is false.
    pub fn map_json(&self, fails_on_empty_data: bool) -> CourierResult<Value> {
        match serde_json::from_slice(&self.data) {
            Ok(value) => Ok(value),
            Err(_) if self.data.is_empty() && !fails_on_empty_data => Ok(Value::Null),
            Err(_) => Err(CourierError::JsonMapping(self.clone())),
        }
    }

    /// The body as UTF-8, or the string found at `key_path` inside a JSON
    /// object body.
    pub fn map_string(&self, key_path: Option<&str>) -> CourierResult<String> {
        match key_path {
            Some(path) => {
                let json = self
                    .map_json(true)
                    .map_err(|_| CourierError::StringMapping(self.clone()))?;
                value_at_key_path(&json, path)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| CourierError::StringMapping(self.clone()))
            }
            None => String::from_utf8(self.data.to_vec())
                .map_err(|_| CourierError::StringMapping(self.clone())),
        }
    }

    /// Decode the body (or the value at `key_path`) into `D`.
    ///
    /// With `fails_on_empty_data` false, an empty body decodes from JSON
    /// `null`, which suits `Option<_>` and unit targets.
    pub fn map<D: DeserializeOwned>(
        &self,
        key_path: Option<&str>,
        fails_on_empty_data: bool,
    ) -> CourierResult<D> {
        let json = if self.data.is_empty() && !fails_on_empty_data {
            Value::Null
        } else {
            serde_json::from_slice::<Value>(&self.data).map_err(|e| self.object_mapping(e))?
        };
        let value = match key_path {
            Some(path) => value_at_key_path(&json, path)
                .cloned()
                .ok_or_else(|| self.object_mapping(format!("no value at key path `{path}`")))?,
            None => json,
        };
        serde_json::from_value(value).map_err(|e| self.object_mapping(e))
    }

    fn object_mapping(&self, reason: impl fmt::Display) -> CourierError {
        CourierError::ObjectMapping {
            reason: reason.to_string(),
            response: self.clone(),
        }
    }
}

const SUCCESS_CODES: RangeInclusive<u16> = 200..=299;
const SUCCESS_AND_REDIRECT_CODES: RangeInclusive<u16> = 200..=399;

/// Walk a dotted key path (`"owner.login"`) through nested JSON objects.
fn value_at_key_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.as_object()?.get(key))
}

impl PartialEq for Response {
    fn eq(&self, other: &Self) -> bool {
        self.status_code == other.status_code
            && self.data == other.data
            && self.headers == other.headers
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status Code: {}, Data Length: {}", self.status_code, self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Owner {
        login: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Repo {
        name: String,
        owner: Owner,
    }

    fn json(status: u16, body: &str) -> Response {
        Response::new(status, body.to_string())
    }

    #[test]
    fn filter_accepts_codes_in_range() {
        assert!(json(204, "").filter_successful_status_codes().is_ok());
        assert!(json(302, "").filter_successful_status_and_redirect_codes().is_ok());
        assert!(json(418, "").filter_status_code(418).is_ok());
    }

    #[test]
    fn filter_rejects_codes_out_of_range() {
        let err = json(302, "").filter_successful_status_codes().unwrap_err();
        assert!(matches!(err, CourierError::StatusCode(ref r) if r.status_code == 302));

        let err = json(404, "").filter(200..300).unwrap_err();
        assert_eq!(err.response().unwrap().status_code, 404);
    }

    #[test]
    fn map_json_parses_body() {
        let value = json(200, r#"{"login":"ashfurrow"}"#).map_json(true).unwrap();
        assert_eq!(value["login"], "ashfurrow");
    }

    #[test]
    fn map_json_empty_data() {
        assert_eq!(json(204, "").map_json(false).unwrap(), Value::Null);
        assert!(matches!(
            json(204, "").map_json(true).unwrap_err(),
            CourierError::JsonMapping(_)
        ));
    }

    #[test]
    fn map_json_rejects_invalid_body() {
        let err = json(200, "not json").map_json(false).unwrap_err();
        assert!(matches!(err, CourierError::JsonMapping(_)));
    }

    #[test]
    fn map_string_whole_body_and_key_path() {
        let resp = json(200, r#"{"owner":{"login":"moya"}}"#);
        assert_eq!(resp.map_string(None).unwrap(), r#"{"owner":{"login":"moya"}}"#);
        assert_eq!(resp.map_string(Some("owner.login")).unwrap(), "moya");
    }

    #[test]
    fn map_string_fails_on_non_string_or_missing_path() {
        let resp = json(200, r#"{"count":3}"#);
        assert!(matches!(
            resp.map_string(Some("count")).unwrap_err(),
            CourierError::StringMapping(_)
        ));
        assert!(resp.map_string(Some("missing")).is_err());

        let binary = Response::new(200, vec![0xff, 0xfe]);
        assert!(binary.map_string(None).is_err());
    }

    #[test]
    fn map_decodes_whole_body() {
        let resp = json(200, r#"{"name":"Moya","owner":{"login":"moya"}}"#);
        let repo: Repo = resp.map(None, true).unwrap();
        assert_eq!(repo.name, "Moya");
        assert_eq!(repo.owner.login, "moya");
    }

    #[test]
    fn map_decodes_at_key_path() {
        let resp = json(200, r#"{"data":{"owner":{"login":"moya"}}}"#);
        let owner: Owner = resp.map(Some("data.owner"), true).unwrap();
        assert_eq!(owner, Owner { login: "moya".to_string() });
    }

    #[test]
    fn map_empty_body_when_allowed() {
        let none: Option<Owner> = json(204, "").map(None, false).unwrap();
        assert!(none.is_none());
        assert!(json(204, "").map::<Option<Owner>>(None, true).is_err());
    }

    #[test]
    fn map_reports_decode_failures() {
        let err = json(200, r#"{"name":1}"#).map::<Repo>(None, true).unwrap_err();
        assert!(matches!(err, CourierError::ObjectMapping { .. }));
    }

    #[test]
    fn equality_ignores_request() {
        let a = json(200, "x").with_request(HttpRequest::new(crate::Method::Get, "http://a"));
        let b = json(200, "x");
        assert_eq!(a, b);
        assert_ne!(a, json(201, "x"));
    }

    #[test]
    fn display_summarises_status_and_length() {
        assert_eq!(json(200, "abc").to_string(), "Status Code: 200, Data Length: 3");
    }
}
