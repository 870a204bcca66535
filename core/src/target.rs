//! Declarative description of API endpoints.
//!
//! # Design
//! A `TargetType` is usually implemented by an enum with one variant per API
//! call. The trait is object safe so heterogeneous targets can share a
//! provider through `MultiTarget`, and so plugins can observe any target as
//! `&dyn TargetType`.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use crate::http::Method;
use crate::plugins::AuthorizationType;
use crate::task::Task;

/// Header fields attached to a target or endpoint.
pub type Headers = BTreeMap<String, String>;

/// Everything a `Provider` needs to know about one API endpoint.
pub trait TargetType: fmt::Debug + Send + Sync {
    /// Base URL, e.g. `https://api.github.com`.
    fn base_url(&self) -> String;

    /// Path appended to `base_url`. An empty path leaves the base URL as-is.
    fn path(&self) -> String;

    fn method(&self) -> Method;

    fn task(&self) -> Task;

    /// Canned body used when the provider stubs this target.
    fn sample_data(&self) -> Bytes {
        Bytes::new()
    }

    fn headers(&self) -> Option<Headers> {
        None
    }

    fn validation_type(&self) -> ValidationType {
        ValidationType::None
    }

    /// Authorization scheme applied by `AccessTokenPlugin`. `None` leaves the
    /// request untouched.
    fn authorization_type(&self) -> Option<AuthorizationType> {
        None
    }
}

/// Join a target's base URL and path with a single slash.
pub fn target_url(target: &(impl TargetType + ?Sized)) -> String {
    let base = target.base_url();
    let path = target.path();
    if path.is_empty() {
        return base;
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Which status codes count as success for a target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValidationType {
    /// No validation; every status code is accepted.
    #[default]
    None,
    /// 2xx.
    SuccessCodes,
    /// 2xx and 3xx.
    SuccessAndRedirectionCodes,
    CustomCodes(Vec<u16>),
}

impl ValidationType {
    /// Accepted status codes. Empty means every code is accepted.
    pub fn status_codes(&self) -> Vec<u16> {
        match self {
            ValidationType::None => Vec::new(),
            ValidationType::SuccessCodes => (200..300).collect(),
            ValidationType::SuccessAndRedirectionCodes => (200..400).collect(),
            ValidationType::CustomCodes(codes) => codes.clone(),
        }
    }

    pub fn accepts(&self, status: u16) -> bool {
        match self {
            ValidationType::None => true,
            ValidationType::SuccessCodes => (200..300).contains(&status),
            ValidationType::SuccessAndRedirectionCodes => (200..400).contains(&status),
            ValidationType::CustomCodes(codes) => codes.is_empty() || codes.contains(&status),
        }
    }
}

/// A target wrapping any other target, so one provider can serve several
/// target types.
#[derive(Debug)]
pub struct MultiTarget(Box<dyn TargetType>);

impl MultiTarget {
    pub fn new(target: impl TargetType + 'static) -> Self {
        Self(Box::new(target))
    }

    /// The embedded target.
    pub fn target(&self) -> &dyn TargetType {
        self.0.as_ref()
    }
}

impl TargetType for MultiTarget {
    fn base_url(&self) -> String {
        self.0.base_url()
    }

    fn path(&self) -> String {
        self.0.path()
    }

    fn method(&self) -> Method {
        self.0.method()
    }

    fn task(&self) -> Task {
        self.0.task()
    }

    fn sample_data(&self) -> Bytes {
        self.0.sample_data()
    }

    fn headers(&self) -> Option<Headers> {
        self.0.headers()
    }

    fn validation_type(&self) -> ValidationType {
        self.0.validation_type()
    }

    fn authorization_type(&self) -> Option<AuthorizationType> {
        self.0.authorization_type()
    }
}
