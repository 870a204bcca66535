//! Parameter encodings applied to a request.
//!
//! # Design
//! URL encoding flattens nested JSON values into `key[sub]=value` pairs with
//! keys in sorted order, so the same parameters always produce the same
//! request (and therefore the same inflight identity).

use serde_json::{Map, Value};
use url::form_urlencoded;
use url::Url;

use crate::error::{CourierError, CourierResult};
use crate::http::HttpRequest;

/// Parameters attached to a task.
pub type Parameters = Map<String, Value>;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json";

/// How parameters are written into a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterEncoding {
    Url(UrlEncoding),
    Json(JsonEncoding),
}

impl ParameterEncoding {
    /// Method-dependent URL encoding.
    pub fn url() -> Self {
        ParameterEncoding::Url(UrlEncoding::default())
    }

    pub fn query_string() -> Self {
        ParameterEncoding::Url(UrlEncoding::query_string())
    }

    pub fn http_body() -> Self {
        ParameterEncoding::Url(UrlEncoding::http_body())
    }

    pub fn json() -> Self {
        ParameterEncoding::Json(JsonEncoding::default())
    }

    pub fn json_pretty() -> Self {
        ParameterEncoding::Json(JsonEncoding { pretty: true })
    }

    pub fn encode(&self, request: &mut HttpRequest, parameters: &Parameters) -> CourierResult<()> {
        match self {
            ParameterEncoding::Url(encoding) => encoding.encode(request, parameters),
            ParameterEncoding::Json(encoding) => encoding.encode(request, parameters),
        }
    }

    /// Whether this encoding can be used for the body half of a composite task.
    pub(crate) fn writes_body(&self) -> bool {
        !matches!(
            self,
            ParameterEncoding::Url(UrlEncoding {
                destination: UrlDestination::QueryString,
                ..
            })
        )
    }
}

/// Where URL-encoded parameters go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UrlDestination {
    /// Query string for GET, HEAD and DELETE; body otherwise.
    #[default]
    MethodDependent,
    QueryString,
    HttpBody,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrayEncoding {
    /// `key[]=a&key[]=b`
    #[default]
    Brackets,
    /// `key=a&key=b`
    NoBrackets,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoolEncoding {
    /// `1` / `0`
    #[default]
    Numeric,
    /// `true` / `false`
    Literal,
}

/// `application/x-www-form-urlencoded` style encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlEncoding {
    pub destination: UrlDestination,
    pub array_encoding: ArrayEncoding,
    pub bool_encoding: BoolEncoding,
}

impl UrlEncoding {
    pub fn query_string() -> Self {
        Self {
            destination: UrlDestination::QueryString,
            ..Self::default()
        }
    }

    pub fn http_body() -> Self {
        Self {
            destination: UrlDestination::HttpBody,
            ..Self::default()
        }
    }

    pub fn encode(&self, request: &mut HttpRequest, parameters: &Parameters) -> CourierResult<()> {
        if parameters.is_empty() {
            return Ok(());
        }
        let query = self.query(parameters);
        let in_url = match self.destination {
            UrlDestination::MethodDependent => request.method.encodes_parameters_in_url(),
            UrlDestination::QueryString => true,
            UrlDestination::HttpBody => false,
        };
        if in_url {
            request.url = append_query(&request.url, &query)?;
        } else {
            if request.header("Content-Type").is_none() {
                request.set_header("Content-Type", FORM_CONTENT_TYPE);
            }
            request.body = Some(query.into_bytes().into());
        }
        Ok(())
    }

    /// Percent-encoded `key=value` pairs joined with `&`.
    pub fn query(&self, parameters: &Parameters) -> String {
        let mut keys: Vec<&String> = parameters.keys().collect();
        keys.sort();
        let mut components = Vec::new();
        for key in keys {
            self.components(key, &parameters[key.as_str()], &mut components);
        }
        components
            .iter()
            .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn components(&self, key: &str, value: &Value, out: &mut Vec<(String, String)>) {
        match value {
            Value::Object(map) => {
                let mut nested: Vec<&String> = map.keys().collect();
                nested.sort();
                for nested_key in nested {
                    self.components(&format!("{key}[{nested_key}]"), &map[nested_key.as_str()], out);
                }
            }
            Value::Array(items) => {
                let item_key = match self.array_encoding {
                    ArrayEncoding::Brackets => format!("{key}[]"),
                    ArrayEncoding::NoBrackets => key.to_string(),
                };
                for item in items {
                    self.components(&item_key, item, out);
                }
            }
            Value::Bool(b) => {
                let rendered = match (self.bool_encoding, b) {
                    (BoolEncoding::Numeric, true) => "1",
                    (BoolEncoding::Numeric, false) => "0",
                    (BoolEncoding::Literal, true) => "true",
                    (BoolEncoding::Literal, false) => "false",
                };
                out.push((key.to_string(), rendered.to_string()));
            }
            Value::Null => out.push((key.to_string(), String::new())),
            Value::Number(n) => out.push((key.to_string(), n.to_string())),
            Value::String(s) => out.push((key.to_string(), s.clone())),
        }
    }
}

/// JSON body encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonEncoding {
    pub pretty: bool,
}

impl JsonEncoding {
    pub fn encode(&self, request: &mut HttpRequest, parameters: &Parameters) -> CourierResult<()> {
        let body = if self.pretty {
            serde_json::to_vec_pretty(parameters)
        } else {
            serde_json::to_vec(parameters)
        }
        .map_err(|e| CourierError::ParameterEncoding(e.to_string()))?;
        set_json_body(request, body);
        Ok(())
    }
}

pub(crate) fn set_json_body(request: &mut HttpRequest, body: Vec<u8>) {
    if request.header("Content-Type").is_none() {
        request.set_header("Content-Type", JSON_CONTENT_TYPE);
    }
    request.body = Some(body.into());
}

fn escape(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn append_query(url: &str, query: &str) -> CourierResult<String> {
    let mut parsed = Url::parse(url).map_err(|_| CourierError::RequestMapping(url.to_string()))?;
    let combined = match parsed.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
        _ => query.to_string(),
    };
    parsed.set_query(Some(&combined));
    Ok(parsed.to_string())
}
