//! Request/response logging.
//!
//! Entries have the shape `<logger id>: [<date>] <identifier>: <message>`.
//! By default they are emitted as `tracing` events under the
//! `courier::network` target; tests and applications can route them
//! elsewhere through `LoggerConfiguration::output`.

use std::fmt;
use std::sync::Arc;

use chrono::Local;

use crate::error::{CourierError, CourierResult};
use crate::http::HttpRequest;
use crate::plugins::Plugin;
use crate::response::Response;
use crate::target::TargetType;

pub type OutputClosure = Arc<dyn Fn(&dyn TargetType, &[String]) + Send + Sync>;
pub type DataFormatter = Arc<dyn Fn(&[u8]) -> String + Send + Sync>;

/// What to log about outgoing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLogOptions {
    pub method: bool,
    pub body: bool,
    pub headers: bool,
    /// Log the request as a single cURL command instead of separate entries.
    pub format_as_curl: bool,
}

impl RequestLogOptions {
    pub const DEFAULT: Self = Self {
        method: true,
        body: false,
        headers: true,
        format_as_curl: false,
    };

    pub const VERBOSE: Self = Self {
        body: true,
        ..Self::DEFAULT
    };
}

impl Default for RequestLogOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What to log about responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseLogOptions {
    pub body: bool,
}

impl ResponseLogOptions {
    pub const VERBOSE: Self = Self { body: true };
}

#[derive(Clone)]
pub struct LoggerConfiguration {
    pub logger_id: String,
    /// `chrono` format string for the entry timestamp.
    pub date_format: String,
    pub output: OutputClosure,
    pub request_data_formatter: DataFormatter,
    pub response_data_formatter: DataFormatter,
    pub request_logging_options: RequestLogOptions,
    pub success_response_logging_options: ResponseLogOptions,
    pub error_response_logging_options: ResponseLogOptions,
}

impl LoggerConfiguration {
    pub fn verbose() -> Self {
        Self {
            request_logging_options: RequestLogOptions::VERBOSE,
            success_response_logging_options: ResponseLogOptions::VERBOSE,
            error_response_logging_options: ResponseLogOptions::VERBOSE,
            ..Self::default()
        }
    }

    pub fn with_output(mut self, output: impl Fn(&dyn TargetType, &[String]) + Send + Sync + 'static) -> Self {
        self.output = Arc::new(output);
        self
    }
}

impl Default for LoggerConfiguration {
    fn default() -> Self {
        Self {
            logger_id: "Courier_Logger".to_string(),
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            output: Arc::new(default_output),
            request_data_formatter: Arc::new(default_data_formatter),
            response_data_formatter: Arc::new(default_data_formatter),
            request_logging_options: RequestLogOptions::DEFAULT,
            success_response_logging_options: ResponseLogOptions::default(),
            error_response_logging_options: ResponseLogOptions::default(),
        }
    }
}

impl fmt::Debug for LoggerConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfiguration")
            .field("logger_id", &self.logger_id)
            .field("request_logging_options", &self.request_logging_options)
            .field("success_response_logging_options", &self.success_response_logging_options)
            .field("error_response_logging_options", &self.error_response_logging_options)
            .finish_non_exhaustive()
    }
}

fn default_output(_target: &dyn TargetType, items: &[String]) {
    for item in items {
        tracing::info!(target: "courier::network", "{item}");
    }
}

fn default_data_formatter(data: &[u8]) -> String {
    String::from_utf8(data.to_vec()).unwrap_or_else(|_| "## Cannot map data to String ##".to_string())
}

/// Logs network activity: outgoing requests and incoming responses.
#[derive(Debug, Clone, Default)]
pub struct NetworkLoggerPlugin {
    pub configuration: LoggerConfiguration,
}

impl NetworkLoggerPlugin {
    pub fn new(configuration: LoggerConfiguration) -> Self {
        Self { configuration }
    }

    fn entry(&self, identifier: &str, message: &str) -> String {
        let date = Local::now().format(&self.configuration.date_format);
        format!("{}: [{date}] {identifier}: {message}", self.configuration.logger_id)
    }

    fn log_request(&self, request: &HttpRequest) -> Vec<String> {
        let options = self.configuration.request_logging_options;
        let mut output = vec![self.entry("Request", &request.url)];
        if options.headers {
            let headers = request
                .headers
                .iter()
                .map(|(k, v)| format!("\"{k}\": \"{v}\""))
                .collect::<Vec<_>>()
                .join(", ");
            output.push(self.entry("Request Headers", &format!("[{headers}]")));
        }
        if options.body {
            if let Some(body) = &request.body {
                output.push(self.entry("Request Body", &(self.configuration.request_data_formatter)(body)));
            }
        }
        if options.method {
            output.push(self.entry("HTTP Request Method", request.method.as_str()));
        }
        output
    }

    fn log_response(&self, response: &Response, target: &dyn TargetType, is_from_error: bool) -> Vec<String> {
        if response.headers.is_none() {
            return vec![self.entry("Response", &format!("Received empty network response for {target:?}."))];
        }
        let mut output = vec![self.entry("Response", &response.to_string())];
        let options = if is_from_error {
            self.configuration.error_response_logging_options
        } else {
            self.configuration.success_response_logging_options
        };
        if options.body {
            output.push(self.entry("Body", &(self.configuration.response_data_formatter)(&response.data)));
        }
        output
    }

    fn log_error(&self, error: &CourierError, target: &dyn TargetType) -> Vec<String> {
        // Validation failures still carry a response worth logging.
        if let Some(response) = error.response() {
            return self.log_response(response, target, true);
        }
        vec![self.entry("Error", &format!("Error calling {target:?} : {error}"))]
    }
}

impl Plugin for NetworkLoggerPlugin {
    fn will_send(&self, request: &HttpRequest, target: &dyn TargetType) {
        let items = if self.configuration.request_logging_options.format_as_curl {
            vec![self.entry("Request", &request.curl_description())]
        } else {
            self.log_request(request)
        };
        (self.configuration.output)(target, &items);
    }

    fn did_receive(&self, result: &CourierResult<Response>, target: &dyn TargetType) {
        let items = match result {
            Ok(response) => self.log_response(response, target, false),
            Err(error) => self.log_error(error, target),
        };
        (self.configuration.output)(target, &items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnderlyingError;
    use crate::http::Method;
    use crate::test_support::GitHub;
    use std::sync::Mutex;

    fn capturing(configuration: LoggerConfiguration) -> (NetworkLoggerPlugin, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let plugin = NetworkLoggerPlugin::new(
            configuration.with_output(move |_, items| sink.lock().unwrap().extend_from_slice(items)),
        );
        (plugin, lines)
    }

    fn request() -> HttpRequest {
        let mut req = HttpRequest::new(Method::Post, "http://api.example.com/zen");
        req.set_header("Content-Type", "application/json");
        req.body = Some(bytes::Bytes::from_static(b"cool body"));
        req
    }

    fn network_response(status: u16, body: &'static str) -> Response {
        let mut response = Response::new(status, body);
        response.headers = Some(Vec::new());
        response
    }

    #[test]
    fn default_request_logging_has_url_headers_and_method() {
        let (plugin, lines) = capturing(LoggerConfiguration::default());
        plugin.will_send(&request(), &GitHub::Zen);
        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Courier_Logger: ["));
        assert!(lines[0].ends_with("Request: http://api.example.com/zen"));
        assert!(lines[1].contains("Request Headers: [\"Content-Type\": \"application/json\"]"));
        assert!(lines[2].ends_with("HTTP Request Method: POST"));
        assert!(!lines.iter().any(|l| l.contains("cool body")));
    }

    #[test]
    fn verbose_request_logging_includes_body() {
        let (plugin, lines) = capturing(LoggerConfiguration::verbose());
        plugin.will_send(&request(), &GitHub::Zen);
        assert!(lines.lock().unwrap().iter().any(|l| l.ends_with("Request Body: cool body")));
    }

    #[test]
    fn curl_logging_is_a_single_entry() {
        let mut configuration = LoggerConfiguration::default();
        configuration.request_logging_options.format_as_curl = true;
        let (plugin, lines) = capturing(configuration);
        plugin.will_send(&request(), &GitHub::Zen);
        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("$ curl -v"));
    }

    #[test]
    fn response_body_only_when_configured() {
        let (plugin, lines) = capturing(LoggerConfiguration::default());
        plugin.did_receive(&Ok(network_response(200, "cool body")), &GitHub::Zen);
        {
            let lines = lines.lock().unwrap();
            assert_eq!(lines.len(), 1);
            assert!(lines[0].ends_with("Response: Status Code: 200, Data Length: 9"));
        }

        let (plugin, lines) = capturing(LoggerConfiguration::verbose());
        plugin.did_receive(&Ok(network_response(200, "cool body")), &GitHub::Zen);
        assert!(lines.lock().unwrap().iter().any(|l| l.ends_with("Body: cool body")));
    }

    #[test]
    fn stubbed_response_is_reported_as_empty_network_response() {
        let (plugin, lines) = capturing(LoggerConfiguration::default());
        plugin.did_receive(&Ok(Response::new(200, "stub")), &GitHub::Zen);
        assert!(lines.lock().unwrap()[0].contains("Received empty network response for Zen."));
    }

    #[test]
    fn errors_with_response_log_the_response() {
        let mut configuration = LoggerConfiguration::default();
        configuration.error_response_logging_options = ResponseLogOptions::VERBOSE;
        let (plugin, lines) = capturing(configuration);
        plugin.did_receive(
            &Err(CourierError::StatusCode(network_response(500, "boom"))),
            &GitHub::Zen,
        );
        let lines = lines.lock().unwrap();
        assert!(lines[0].ends_with("Response: Status Code: 500, Data Length: 4"));
        assert!(lines[1].ends_with("Body: boom"));
    }

    #[test]
    fn errors_without_response_log_the_error() {
        let (plugin, lines) = capturing(LoggerConfiguration::default());
        plugin.did_receive(
            &Err(CourierError::underlying(UnderlyingError::Transport("timed out".into()))),
            &GitHub::Zen,
        );
        assert!(lines.lock().unwrap()[0].ends_with("Error: Error calling Zen : transport error: timed out"));
    }

    #[test]
    fn undecodable_data_uses_placeholder() {
        assert_eq!(default_data_formatter(&[0xff]), "## Cannot map data to String ##");
    }
}
