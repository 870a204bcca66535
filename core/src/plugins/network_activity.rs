//! Callbacks for when a request starts and when its result arrives.

use crate::error::CourierResult;
use crate::http::HttpRequest;
use crate::plugins::Plugin;
use crate::response::Response;
use crate::target::TargetType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkActivityChange {
    Began,
    Ended,
}

type NetworkActivityClosure = Box<dyn Fn(NetworkActivityChange, &dyn TargetType) + Send + Sync>;

/// Reports when a request starts and when its result arrives, cancellations
/// included.
pub struct NetworkActivityPlugin {
    closure: NetworkActivityClosure,
}

impl NetworkActivityPlugin {
    pub fn new(closure: impl Fn(NetworkActivityChange, &dyn TargetType) + Send + Sync + 'static) -> Self {
        Self {
            closure: Box::new(closure),
        }
    }
}

impl Plugin for NetworkActivityPlugin {
    fn will_send(&self, _request: &HttpRequest, target: &dyn TargetType) {
        (self.closure)(NetworkActivityChange::Began, target);
    }

    fn did_receive(&self, _result: &CourierResult<Response>, target: &dyn TargetType) {
        (self.closure)(NetworkActivityChange::Ended, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CourierError;
    use crate::http::Method;
    use crate::test_support::GitHub;
    use std::sync::{Arc, Mutex};

    #[test]
    fn reports_began_then_ended() {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        let plugin = NetworkActivityPlugin::new(move |change, _| sink.lock().unwrap().push(change));

        let req = HttpRequest::new(Method::Get, "http://api.example.com/zen");
        plugin.will_send(&req, &GitHub::Zen);
        plugin.did_receive(&Err(CourierError::cancelled()), &GitHub::Zen);

        assert_eq!(
            *changes.lock().unwrap(),
            vec![NetworkActivityChange::Began, NetworkActivityChange::Ended]
        );
    }
}
