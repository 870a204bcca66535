//! HTTP Basic authorization from per-target credentials.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::http::HttpRequest;
use crate::plugins::Plugin;
use crate::target::TargetType;

/// User name and password for HTTP Basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user: String,
    pub password: String,
}

impl Credential {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn basic_authorization(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.user, self.password));
        format!("Basic {encoded}")
    }
}

type CredentialClosure = Box<dyn Fn(&dyn TargetType) -> Option<Credential> + Send + Sync>;

/// Provides each request with optional credentials.
pub struct CredentialsPlugin {
    credentials_closure: CredentialClosure,
}

impl CredentialsPlugin {
    pub fn new(
        credentials_closure: impl Fn(&dyn TargetType) -> Option<Credential> + Send + Sync + 'static,
    ) -> Self {
        Self {
            credentials_closure: Box::new(credentials_closure),
        }
    }
}

impl Plugin for CredentialsPlugin {
    fn prepare(&self, mut request: HttpRequest, target: &dyn TargetType) -> HttpRequest {
        if let Some(credential) = (self.credentials_closure)(target) {
            request.set_header("Authorization", credential.basic_authorization());
        }
        request
    }
}
