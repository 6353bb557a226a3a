//! HTTP transport seam.
//!
//! The engine talks to the external API through [`ProbeTransport`] so
//! tests can substitute an in-process transport; [`HttpTransport`] is
//! the reqwest-backed production implementation.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use capscope_core::{CapError, Credential};
use capscope_providers::{AuthScheme, ProbeMethod};

/// One outbound request, fully resolved: URL, method, auth headers, body.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: ProbeMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// The response surface the engine needs: status always, parsed JSON
/// only for data lookups (identity, enumeration). A body that is not
/// JSON is absent evidence, never an error.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub json: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
}

#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport with a per-request timeout.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, CapError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ProbeTransport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let method = match request.method {
            ProbeMethod::Get => reqwest::Method::GET,
            ProbeMethod::Head => reqwest::Method::HEAD,
            ProbeMethod::Post => reqwest::Method::POST,
            ProbeMethod::Put => reqwest::Method::PUT,
            ProbeMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, request.url)
            .header("Accept", "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.header("Content-Type", "application/json").body(body);
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connect(err.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let json = response.json::<serde_json::Value>().await.ok();
        Ok(TransportResponse { status, json })
    }
}

/// Resolve a table path against the provider base URL and attach the
/// credential per the provider's auth scheme.
///
/// Paths are appended to the base (which may itself carry a path
/// prefix, e.g. `/api/v4`); the resulting host must not change, so a
/// malformed table entry cannot redirect probes elsewhere.
pub fn build_request(
    base_url: &Url,
    path: &str,
    method: ProbeMethod,
    body: Option<String>,
    auth: &AuthScheme,
    credential: &Credential,
) -> Result<TransportRequest, CapError> {
    if !path.starts_with('/') {
        return Err(CapError::InvalidEndpoint(format!(
            "probe path must be absolute: {path}"
        )));
    }

    let joined = format!("{}{}", base_url.as_str().trim_end_matches('/'), path);
    let url = Url::parse(&joined)
        .map_err(|err| CapError::InvalidEndpoint(format!("{joined}: {err}")))?;
    if url.host_str() != base_url.host_str() {
        return Err(CapError::InvalidEndpoint(format!(
            "probe path escapes provider host: {path}"
        )));
    }

    let mut headers = Vec::new();
    match auth {
        AuthScheme::Bearer => {
            headers.push((
                "Authorization".to_string(),
                format!("Bearer {}", credential.expose()),
            ));
        }
        AuthScheme::Header { name } => {
            headers.push((name.clone(), credential.expose().to_string()));
        }
        AuthScheme::HeaderWithBearer { name } => {
            headers.push((name.clone(), credential.expose().to_string()));
            headers.push((
                "Authorization".to_string(),
                format!("Bearer {}", credential.expose()),
            ));
        }
    }

    // Methods with a body always send a minimal placeholder so the
    // remote validation layer runs before authorization is checked.
    let body = body.or_else(|| method.has_body().then(|| "{}".to_string()));

    Ok(TransportRequest {
        method,
        url,
        headers,
        body,
    })
}
