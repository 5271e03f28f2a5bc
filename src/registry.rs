//! Schema Registry Clients
//!
//! The pipeline only needs two lookups from a registry: the latest schema of a
//! subject, and one exact version of it. [`HttpRegistryClient`] speaks the
//! Confluent-compatible REST API; [`MemoryRegistry`] keeps everything in process
//! for offline runs and tests.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

const REGISTRY_MEDIA_TYPE: &str = "application/vnd.schemaregistry.v1+json";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Registry lookup failures
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("subject {subject:?} has no version {version}")]
    NotFound { subject: String, version: String },

    /// Non-success answer other than 404, with the response body as sent
    #[error("registry answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid registry endpoint {endpoint:?}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Read access to a schema registry
pub trait RegistryClient {
    /// Raw schema text of the currently published version of `subject`
    fn fetch_latest(&self, subject: &str) -> Result<String, RegistryError>;

    /// Raw schema text of `subject` at exactly `version`
    fn fetch_version(&self, subject: &str, version: NonZeroU32) -> Result<String, RegistryError>;
}

/// Body of `GET /subjects/{subject}/versions/{version}`
#[derive(Debug, Deserialize)]
struct SubjectVersion {
    schema: String,
}

/// Blocking client for a Confluent-compatible registry
pub struct HttpRegistryClient {
    base: Url,
    http: Client,
}

impl HttpRegistryClient {
    /// Create a client for the registry rooted at `endpoint`
    pub fn new(endpoint: &str) -> Result<Self, RegistryError> {
        let base = Url::parse(endpoint).map_err(|e| RegistryError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(RegistryError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                message: "not a base URL".to_string(),
            });
        }

        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self { base, http })
    }

    fn version_url(&self, subject: &str, version: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["subjects", subject, "versions", version]);
        }
        url
    }

    fn get(&self, subject: &str, version: &str) -> Result<String, RegistryError> {
        let url = self.version_url(subject, version);
        tracing::debug!(%url, "registry lookup");

        let response = self.http.get(url).header(ACCEPT, REGISTRY_MEDIA_TYPE).send()?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound {
                subject: subject.to_string(),
                version: version.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text()?;
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: SubjectVersion = response.json()?;
        Ok(body.schema)
    }
}

impl RegistryClient for HttpRegistryClient {
    fn fetch_latest(&self, subject: &str) -> Result<String, RegistryError> {
        self.get(subject, "latest")
    }

    fn fetch_version(&self, subject: &str, version: NonZeroU32) -> Result<String, RegistryError> {
        self.get(subject, &version.to_string())
    }
}

/// In-process registry. Versions are numbered from 1 in publication order.
#[derive(Default)]
pub struct MemoryRegistry {
    subjects: Mutex<HashMap<String, Vec<String>>>,
    calls: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new version of `subject`, returning its version number
    pub fn publish(&self, subject: &str, schema: &str) -> u32 {
        let mut subjects = self.subjects.lock().unwrap_or_else(|e| e.into_inner());
        let versions = subjects.entry(subject.to_string()).or_default();
        versions.push(schema.to_string());
        versions.len() as u32
    }

    /// Number of lookups served so far, successful or not
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, subject: &str, version: Option<NonZeroU32>) -> Result<String, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let subjects = self.subjects.lock().unwrap_or_else(|e| e.into_inner());
        let found = subjects.get(subject).and_then(|versions| match version {
            None => versions.last(),
            Some(v) => versions.get(v.get() as usize - 1),
        });

        found.cloned().ok_or_else(|| RegistryError::NotFound {
            subject: subject.to_string(),
            version: version.map_or_else(|| "latest".to_string(), |v| v.to_string()),
        })
    }
}

impl RegistryClient for MemoryRegistry {
    fn fetch_latest(&self, subject: &str) -> Result<String, RegistryError> {
        self.lookup(subject, None)
    }

    fn fetch_version(&self, subject: &str, version: NonZeroU32) -> Result<String, RegistryError> {
        self.lookup(subject, Some(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_memory_registry_versions() {
        let registry = MemoryRegistry::new();
        assert_eq!(registry.publish("users-value", "\"string\""), 1);
        assert_eq!(registry.publish("users-value", "\"int\""), 2);

        assert_eq!(registry.fetch_latest("users-value").unwrap(), "\"int\"");
        let first = NonZeroU32::new(1).unwrap();
        assert_eq!(registry.fetch_version("users-value", first).unwrap(), "\"string\"");

        let third = NonZeroU32::new(3).unwrap();
        assert!(matches!(
            registry.fetch_version("users-value", third),
            Err(RegistryError::NotFound { .. })
        ));
        assert_eq!(registry.calls(), 3);
    }

    #[test]
    fn test_version_url_escapes_subject() {
        let client = HttpRegistryClient::new("http://localhost:8081/").unwrap();
        let url = client.version_url("team/orders-value", "latest");
        assert_eq!(
            url.as_str(),
            "http://localhost:8081/subjects/team%2Forders-value/versions/latest"
        );
    }

    #[test]
    fn test_version_url_keeps_base_path() {
        let client = HttpRegistryClient::new("https://registry.internal/api").unwrap();
        let url = client.version_url("orders-value", "3");
        assert_eq!(
            url.as_str(),
            "https://registry.internal/api/subjects/orders-value/versions/3"
        );
    }

    /// Mock registry on its own runtime; the blocking client must be called
    /// from outside that runtime
    fn mock_registry(status: u16, body: serde_json::Value, route: &str) -> (tokio::runtime::Runtime, MockServer) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path(route))
                .and(header("accept", REGISTRY_MEDIA_TYPE))
                .respond_with(ResponseTemplate::new(status).set_body_json(body))
                .mount(&server)
                .await;
            server
        });
        (runtime, server)
    }

    #[test]
    fn test_http_fetch_latest_extracts_schema() {
        let schema = r#"{"type":"record","name":"Order","fields":[]}"#;
        let (_runtime, server) = mock_registry(
            200,
            serde_json::json!({"subject": "orders-value", "version": 4, "id": 17, "schema": schema}),
            "/subjects/orders-value/versions/latest",
        );

        let client = HttpRegistryClient::new(&server.uri()).unwrap();
        assert_eq!(client.fetch_latest("orders-value").unwrap(), schema);
    }

    #[test]
    fn test_http_fetch_version_not_found() {
        let (_runtime, server) = mock_registry(
            404,
            serde_json::json!({"error_code": 40402, "message": "Version not found."}),
            "/subjects/orders-value/versions/7",
        );

        let client = HttpRegistryClient::new(&server.uri()).unwrap();
        match client.fetch_version("orders-value", NonZeroU32::new(7).unwrap()) {
            Err(RegistryError::NotFound { subject, version }) => {
                assert_eq!(subject, "orders-value");
                assert_eq!(version, "7");
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_http_server_error_keeps_status_and_body() {
        let (_runtime, server) = mock_registry(
            500,
            serde_json::json!({"error_code": 50001, "message": "Error in the backend data store"}),
            "/subjects/orders-value/versions/latest",
        );

        let client = HttpRegistryClient::new(&server.uri()).unwrap();
        match client.fetch_latest("orders-value") {
            Err(RegistryError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("backend data store"));
            }
            other => panic!("expected Status, got {:?}", other),
        }
    }

    #[test]
    fn test_http_body_without_schema_is_transport_error() {
        let (_runtime, server) = mock_registry(
            200,
            serde_json::json!({"subject": "orders-value", "version": 1}),
            "/subjects/orders-value/versions/latest",
        );

        let client = HttpRegistryClient::new(&server.uri()).unwrap();
        assert!(matches!(client.fetch_latest("orders-value"), Err(RegistryError::Http(_))));
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            HttpRegistryClient::new("not a url"),
            Err(RegistryError::InvalidEndpoint { .. })
        ));
    }
}
