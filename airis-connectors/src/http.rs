//! HTTP Sink for the AIRIS Datastore
//!
//! ## Overview
//!
//! Posts each payload as one JSON row to a PostgREST-style endpoint
//! (`<base_url>/rest/v1/sensor_data` by default). Any 2xx answer is success;
//! everything else, including timeouts, is a [`TransportError`].
//!
//! ## Design Decisions
//!
//! The client is `ureq`: blocking, small, no async runtime of its own. Each
//! request runs on a Tokio blocking worker and the await is bounded by the
//! configured timeout, so a hung socket can never stall the scheduler or
//! shutdown.
//!
//! No retries happen here. The transmission pipeline decides what a failure
//! means.
//!
//! ## Authentication
//!
//! Supabase-style backends want the same key twice, as an `apikey` header
//! and as a bearer token; [`AuthMethod::ServiceKey`] sets both.
//!
//! ## Example Usage
//!
//! ```rust
//! use airis_connectors::http::{HttpConfig, HttpSink};
//!
//! let config = HttpConfig::new("https://project.supabase.co")
//!     .service_key("anon-key")
//!     .timeout_secs(10);
//!
//! let sink = HttpSink::new(config)?;
//! assert_eq!(sink.url(), "https://project.supabase.co/rest/v1/sensor_data");
//! # Ok::<(), airis_connectors::TransportError>(())
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use airis_core::constants::time::REQUEST_TIMEOUT_S;

use crate::{TelemetryPayload, TelemetrySink, TransportError};

/// Default row-insert endpoint
pub const DEFAULT_ENDPOINT: &str = "/rest/v1/sensor_data";

/// HTTP configuration
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Path appended to the base URL
    pub endpoint: String,
    /// Request timeout
    pub timeout: Duration,
    /// Authentication method
    pub auth: AuthMethod,
    /// Extra headers
    pub headers: BTreeMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

/// Authentication methods
#[derive(Clone)]
pub enum AuthMethod {
    /// No authentication
    None,
    /// Bearer token
    Bearer(String),
    /// API key in a named header
    ApiKey {
        /// Header name
        header: String,
        /// Key
        value: String,
    },
    /// Same key as `apikey` header and bearer token
    ServiceKey(String),
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secrets
        match self {
            AuthMethod::None => f.write_str("None"),
            AuthMethod::Bearer(_) => f.write_str("Bearer(***)"),
            AuthMethod::ApiKey { header, .. } => write!(f, "ApiKey {{ header: {:?} }}", header),
            AuthMethod::ServiceKey(_) => f.write_str("ServiceKey(***)"),
        }
    }
}

impl HttpConfig {
    /// Create new configuration with base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Prefer".to_string(), "return=minimal".to_string());

        Self {
            base_url: base_url.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_S),
            auth: AuthMethod::None,
            headers,
            user_agent: format!("AIRIS/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set bearer token authentication
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMethod::Bearer(token.into());
        self
    }

    /// Set API key authentication
    pub fn api_key(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth = AuthMethod::ApiKey {
            header: header.into(),
            value: value.into(),
        };
        self
    }

    /// Send the key both as `apikey` header and as bearer token
    pub fn service_key(mut self, key: impl Into<String>) -> Self {
        self.auth = AuthMethod::ServiceKey(key.into());
        self
    }

    /// Set request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Post to a different path
    pub fn endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoint = path.into();
        self
    }

    /// Add custom header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// HTTP sink using lightweight ureq client
pub struct HttpSink {
    config: HttpConfig,
    url: String,
    agent: ureq::Agent,
}

impl HttpSink {
    /// Create new HTTP sink
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        // Validate base URL
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(TransportError::Config(
                "Base URL must start with http:// or https://".into(),
            ));
        }
        if config.timeout.is_zero() {
            return Err(TransportError::Config("Timeout must be positive".into()));
        }

        let url = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.endpoint.trim_start_matches('/')
        );

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self { config, url, agent })
    }

    /// Full request URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build request with authentication and headers
    fn build_request(&self) -> ureq::Request {
        let mut request = self.agent.post(&self.url);

        match &self.config.auth {
            AuthMethod::None => {}
            AuthMethod::Bearer(token) => {
                request = request.set("Authorization", &format!("Bearer {}", token));
            }
            AuthMethod::ApiKey { header, value } => {
                request = request.set(header, value);
            }
            AuthMethod::ServiceKey(key) => {
                request = request
                    .set("apikey", key)
                    .set("Authorization", &format!("Bearer {}", key));
            }
        }

        for (name, value) in &self.config.headers {
            request = request.set(name, value);
        }

        request.set("Content-Type", "application/json")
    }
}

/// Map a ureq result to the transport taxonomy
fn check_response(result: Result<ureq::Response, ureq::Error>) -> Result<(), TransportError> {
    match result {
        Ok(resp) if (200..300).contains(&resp.status()) => Ok(()),
        Ok(resp) => Err(TransportError::Status {
            status: resp.status(),
            message: resp.status_text().to_string(),
        }),
        Err(ureq::Error::Status(status, resp)) => Err(TransportError::Status {
            status,
            message: resp.into_string().unwrap_or_default(),
        }),
        Err(ureq::Error::Transport(err)) => Err(TransportError::Request(err.to_string())),
    }
}

#[async_trait::async_trait]
impl TelemetrySink for HttpSink {
    async fn send(&self, payload: &TelemetryPayload) -> Result<(), TransportError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| TransportError::Serialization(e.to_string()))?;

        let request = self.build_request();
        let task = tokio::task::spawn_blocking(move || check_response(request.send_string(&body)));

        match tokio::time::timeout(self.config.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(TransportError::Request(format!("request task failed: {}", join))),
            Err(_) => Err(TransportError::Timeout(self.config.timeout)),
        }
    }

    fn name(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn payload() -> TelemetryPayload {
        let record = airis_core::record::RecordBuilder::new()
            .finish(airis_core::record::device_id("esp32-test").unwrap(), 1_700_000_000_000);
        TelemetryPayload::from_record(&record, None)
    }

    /// One-shot server answering with `status_line`, returning the raw request
    fn serve_once(status_line: &'static str) -> (String, std::thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!("{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status_line);
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    #[test]
    fn test_config_builder() {
        let config = HttpConfig::new("https://api.example.com")
            .service_key("test-key")
            .timeout_secs(5)
            .endpoint("/rest/v1/readings")
            .header("X-Custom", "value");

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.headers.get("Prefer").map(String::as_str), Some("return=minimal"));
        assert!(config.headers.contains_key("X-Custom"));
        assert!(!format!("{:?}", config).contains("test-key"));

        match config.auth {
            AuthMethod::ServiceKey(key) => assert_eq!(key, "test-key"),
            _ => panic!("Wrong auth method"),
        }
    }

    #[test]
    fn test_url_validation() {
        assert!(HttpSink::new(HttpConfig::new("not-a-url")).is_err());
        assert!(HttpSink::new(HttpConfig::new("https://valid.url").timeout_secs(0)).is_err());

        let sink = HttpSink::new(HttpConfig::new("https://valid.url/")).unwrap();
        assert_eq!(sink.url(), "https://valid.url/rest/v1/sensor_data");
    }

    #[tokio::test]
    async fn created_is_success_with_expected_headers() {
        let (base, server) = serve_once("HTTP/1.1 201 Created");
        let sink = HttpSink::new(HttpConfig::new(base).service_key("k3y")).unwrap();

        sink.send(&payload()).await.unwrap();

        let request = server.join().unwrap().to_ascii_lowercase();
        assert!(request.starts_with("post /rest/v1/sensor_data"));
        assert!(request.contains("apikey: k3y"));
        assert!(request.contains("authorization: bearer k3y"));
        assert!(request.contains("prefer: return=minimal"));
        assert!(request.contains("content-type: application/json"));
        assert!(request.contains("\"device_id\":\"esp32-test\""));
    }

    #[tokio::test]
    async fn server_error_is_transport_error() {
        let (base, server) = serve_once("HTTP/1.1 503 Service Unavailable");
        let sink = HttpSink::new(HttpConfig::new(base)).unwrap();

        let err = sink.send(&payload()).await.unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 503, .. }));
        server.join().unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let sink = HttpSink::new(HttpConfig::new(base)).unwrap();
        assert!(matches!(sink.send(&payload()).await, Err(TransportError::Request(_))));
    }
}
