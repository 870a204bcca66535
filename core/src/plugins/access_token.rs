//! Bearer/Basic/custom `Authorization` headers from a token closure.
//!
//! Only targets whose `authorization_type()` is `Some` are touched; the
//! closure is asked for a token on every request.

use std::fmt;

use crate::http::HttpRequest;
use crate::plugins::Plugin;
use crate::target::TargetType;

/// Scheme placed in front of the token in the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationType {
    Basic,
    Bearer,
    Custom(String),
}

impl AuthorizationType {
    pub fn value(&self) -> &str {
        match self {
            AuthorizationType::Basic => "Basic",
            AuthorizationType::Bearer => "Bearer",
            AuthorizationType::Custom(value) => value,
        }
    }
}

type TokenClosure = Box<dyn Fn(&AuthorizationType) -> String + Send + Sync>;

/// Adds `Authorization: <scheme> <token>` to requests whose target asks for
/// it through `TargetType::authorization_type`.
pub struct AccessTokenPlugin {
    token_closure: TokenClosure,
}

impl AccessTokenPlugin {
    pub fn new(token_closure: impl Fn(&AuthorizationType) -> String + Send + Sync + 'static) -> Self {
        Self {
            token_closure: Box::new(token_closure),
        }
    }
}

impl fmt::Debug for AccessTokenPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenPlugin").finish_non_exhaustive()
    }
}

impl Plugin for AccessTokenPlugin {
    fn prepare(&self, mut request: HttpRequest, target: &dyn TargetType) -> HttpRequest {
        let Some(authorization_type) = target.authorization_type() else {
            return request;
        };
        let token = (self.token_closure)(&authorization_type);
        request.set_header("Authorization", format!("{} {token}", authorization_type.value()));
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::test_support::GitHub;

    fn request() -> HttpRequest {
        HttpRequest::new(Method::Get, "http://api.example.com/protected")
    }

    #[test]
    fn bearer_header_is_added_for_authorizable_targets() {
        let plugin = AccessTokenPlugin::new(|_| "eyeAm.AJsoN.weBTOKen".to_string());
        let prepared = plugin.prepare(request(), &GitHub::Protected);
        assert_eq!(prepared.header("Authorization"), Some("Bearer eyeAm.AJsoN.weBTOKen"));
    }

    #[test]
    fn targets_without_authorization_are_untouched() {
        let plugin = AccessTokenPlugin::new(|_| "token".to_string());
        let prepared = plugin.prepare(request(), &GitHub::Zen);
        assert!(prepared.header("Authorization").is_none());
    }

    #[test]
    fn custom_scheme_value() {
        assert_eq!(AuthorizationType::Custom("CustomAuth".into()).value(), "CustomAuth");
        assert_eq!(AuthorizationType::Basic.value(), "Basic");
    }

    #[test]
    fn token_closure_receives_the_scheme() {
        let plugin = AccessTokenPlugin::new(|kind| format!("token-for-{}", kind.value()));
        let prepared = plugin.prepare(request(), &GitHub::Protected);
        assert_eq!(prepared.header("Authorization"), Some("Bearer token-for-Bearer"));
    }
}
