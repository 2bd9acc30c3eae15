use std::time::Duration;

use integrahub_domain::constants::PROVIDER_HTTP_TIMEOUT;
use integrahub_domain::{AuditRecord, HubError};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use serde::Serialize;
use tracing::debug;

use crate::errors::InfraError;

/// HTTP client with built-in retry and timeout support.
///
/// Only idempotent methods are retried; a POST is sent exactly once so a
/// vendor never sees the same document twice from one call.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

/// A completed request/response pair with its audit trail.
#[derive(Debug, Clone)]
pub struct HttpExchange {
    pub status: u16,
    pub body: String,
    pub audit: AuditRecord,
}

impl HttpExchange {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, HubError> {
        serde_json::from_str(&self.body)
            .map_err(|e| HubError::Network(format!("invalid response body: {e}")))
    }
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn new() -> Result<Self, HubError> {
        Self::builder().build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder with retry semantics.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, HubError> {
        let probe = builder
            .try_clone()
            .ok_or_else(|| HubError::Internal("request body cannot be cloned".into()))?
            .build()
            .map_err(|err| HubError::from(InfraError::from(err)))?;
        let attempts = if is_idempotent(probe.method()) { self.max_attempts.max(1) } else { 1 };

        for attempt in 0..attempts {
            let request = builder
                .try_clone()
                .ok_or_else(|| HubError::Internal("request body cannot be cloned".into()))?
                .build()
                .map_err(|err| HubError::from(InfraError::from(err)))?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt = attempt + 1, %method, %url, "sending HTTP request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, %method, %url, %status, "received HTTP response");

                    if status.is_server_error() && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, %method, %url, error = %err, "HTTP request failed");

                    if attempt + 1 < attempts && should_retry_error(&err) {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Err(InfraError::from(err).into());
                }
            }
        }

        Err(HubError::Internal("http client exhausted retries without producing a result".into()))
    }

    /// Send `payload` as JSON and capture the exchange for auditing.
    ///
    /// Any HTTP status is returned as an exchange; only transport failures
    /// are errors.
    pub async fn exchange<B: Serialize + ?Sized>(
        &self,
        builder: RequestBuilder,
        payload: Option<&B>,
    ) -> Result<HttpExchange, HubError> {
        let request_payload = match payload {
            Some(body) => serde_json::to_string(body)?,
            None => String::new(),
        };
        let builder = if payload.is_some() {
            builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(request_payload.clone())
        } else {
            builder
        };
        self.capture(builder, request_payload).await
    }

    /// Send a prepared request, recording `request_payload` as its audited body.
    pub async fn capture(
        &self,
        builder: RequestBuilder,
        request_payload: String,
    ) -> Result<HttpExchange, HubError> {
        let response = self.send(builder).await?;
        let request_url = response.url().to_string();
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| HubError::from(InfraError::from(err)))?;

        Ok(HttpExchange {
            status,
            body: body.clone(),
            audit: AuditRecord {
                request_url,
                request_payload,
                response_status: status,
                response_body: body,
            },
        })
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        self.base_backoff.saturating_mul(1u32 << shift)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("max_attempts", &self.max_attempts)
            .field("base_backoff", &self.base_backoff)
            .finish()
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: PROVIDER_HTTP_TIMEOUT,
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            user_agent: Some(concat!("integrahub/", env!("CARGO_PKG_VERSION")).to_string()),
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient, HubError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| HubError::from(InfraError::from(err)))?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_request() || err.is_connect()
}
