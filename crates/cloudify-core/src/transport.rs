//! Request model and HTTP transport.
//!
//! Resource clients describe each call as an [`ApiRequest`] and hand it to a
//! [`Transport`]. The transport owns URL building, body encoding and status
//! validation; resource clients only see decoded JSON or an [`Error`].

use crate::client::ClientConfig;
use crate::config::ManagerClientConfig;
use crate::error::{Error, Result};
use crate::query::QueryParams;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("cloudify-core/", env!("CARGO_PKG_VERSION"));

/// Body of an [`ApiRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// JSON document.
    Json(Value),
    /// `multipart/form-data` made of file parts.
    Multipart(Vec<FilePart>),
}

/// One file-like part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name.
    pub name: String,
    /// File name reported in the part's content disposition.
    pub file_name: String,
    /// MIME type of the part.
    pub content_type: String,
    /// Raw content.
    pub data: Bytes,
}

impl FilePart {
    /// Create a part.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

/// A single call against the manager REST API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the manager base URL, e.g. `/deployment-updates`.
    pub path: String,
    /// Query parameters in insertion order.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
    /// The only status code treated as success.
    pub expected_status: StatusCode,
}

impl ApiRequest {
    /// Create a request expecting `200 OK` with no query and no body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            expected_status: StatusCode::OK,
        }
    }

    /// Shorthand for a `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a `POST` request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach query parameters.
    #[must_use]
    pub fn with_query(mut self, params: QueryParams) -> Self {
        self.query = params.into_pairs();
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Attach a multipart body. An empty part list leaves the body empty.
    #[must_use]
    pub fn with_parts(mut self, parts: Vec<FilePart>) -> Self {
        self.body = if parts.is_empty() {
            RequestBody::Empty
        } else {
            RequestBody::Multipart(parts)
        };
        self
    }

    /// Override the expected status code.
    #[must_use]
    pub const fn expect_status(mut self, status: StatusCode) -> Self {
        self.expected_status = status;
        self
    }

    /// First query value recorded for `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Multipart part named `name`, if the body is multipart.
    #[must_use]
    pub fn part(&self, name: &str) -> Option<&FilePart> {
        match &self.body {
            RequestBody::Multipart(parts) => parts.iter().find(|p| p.name == name),
            _ => None,
        }
    }

    /// JSON body, if any.
    #[must_use]
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Issues [`ApiRequest`]s against a manager.
///
/// Implementations must fail with an [`Error`] when the response status differs
/// from [`ApiRequest::expected_status`]; a `404` maps to [`Error::NotFound`].
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the decoded JSON response body.
    ///
    /// An empty response body decodes to [`Value::Null`].
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

/// Builder for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    config: ManagerClientConfig,
    http_config: ClientConfig,
    user_agent: String,
}

impl HttpTransportBuilder {
    /// Create a builder from a manager configuration.
    #[must_use]
    pub fn new(config: ManagerClientConfig) -> Self {
        Self {
            config,
            http_config: ClientConfig::new(),
            user_agent: USER_AGENT.to_string(),
        }
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, http_config: ClientConfig) -> Self {
        self.http_config = http_config;
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the URL, CA certificate or HTTP client
    /// settings are unusable.
    pub fn build(self) -> Result<HttpTransport> {
        let base_url = self.config.parse_manager_url()?;

        let http_config = self.http_config;

        let mut builder = ClientBuilder::new()
            .user_agent(self.user_agent)
            .timeout(self.config.timeout())
            .connect_timeout(http_config.connect_timeout)
            .pool_idle_timeout(http_config.pool_idle_timeout)
            .pool_max_idle_per_host(http_config.pool_max_idle_per_host)
            .gzip(http_config.enable_compression);

        if !self.config.tls_verify {
            warn!("TLS verification disabled for manager client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_cert) = &self.config.tls_ca_cert {
            debug!("loading manager CA certificate from {}", ca_cert.display());
            let bytes = std::fs::read(ca_cert).map_err(|err| {
                Error::ConfigError(format!(
                    "Failed to read manager CA certificate {}: {err}",
                    ca_cert.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&bytes).map_err(|err| {
                Error::ConfigError(format!("Invalid manager CA certificate: {err}"))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|err| Error::ConfigError(format!("Failed to build HTTP client: {err}")))?;

        Ok(HttpTransport { http, base_url })
    }
}

/// reqwest-backed [`Transport`]. Performs no retries.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Construct a transport with default settings for the given manager URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if the URL is invalid.
    pub fn new(manager_url: impl Into<String>) -> Result<Self> {
        HttpTransportBuilder::new(ManagerClientConfig::new(manager_url)?).build()
    }

    /// Start a builder from a manager configuration.
    #[must_use]
    pub fn builder(config: ManagerClientConfig) -> HttpTransportBuilder {
        HttpTransportBuilder::new(config)
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid path `{path}`: {err}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let url = self.build_url(&request.path)?;
        debug!(
            method = %request.method,
            path = %request.path,
            query = ?request.query,
            "Sending manager request"
        );

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        let response = builder.send().await?;
        let status = response.status();

        if status != request.expected_status {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            debug!(%status, expected = %request.expected_status, "Manager rejected request");
            return Err(map_status_to_error(status, request.expected_status, body));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|err| {
            Error::ParseError(format!(
                "Failed to parse response for `{}`: {err}",
                request.path
            ))
        })
    }
}

fn build_form(parts: Vec<FilePart>) -> Result<Form> {
    parts.into_iter().try_fold(Form::new(), |form, part| {
        let len = part.data.len() as u64;
        let body = Part::stream_with_length(part.data, len)
            .file_name(part.file_name)
            .mime_str(&part.content_type)
            .map_err(|err| {
                Error::InvalidRequest(format!(
                    "Invalid content type `{}`: {err}",
                    part.content_type
                ))
            })?;
        Ok(form.part(part.name, body))
    })
}

fn map_status_to_error(status: StatusCode, expected: StatusCode, body: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(body),
        _ => Error::UnexpectedStatus {
            status: status.as_u16(),
            expected: expected.as_u16(),
            body,
        },
    }
}
