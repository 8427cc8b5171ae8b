use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
const DEFAULT_MAX_ATTEMPTS: usize = 5;
const RETRY_BASE_MS: u64 = 400;
const RETRY_MAX_MS: u64 = 5_000;

pub type TransportResult<T> = Result<T, TransportError>;

/// Raw HTTP access to the API. Implementations own authentication, base URL,
/// retries and error-envelope handling; callers see response bytes only.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn make_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> TransportResult<Vec<u8>>;

    async fn make_request_with_headers(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
        headers: HeaderMap,
    ) -> TransportResult<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: Option<i64>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    errors: Option<Vec<ApiMessage>>,
    messages: Option<Vec<ApiMessage>>,
}

/// `reqwest`-backed transport with bearer auth and retry on 429/5xx.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    max_attempts: usize,
}

impl HttpTransport {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_BASE_URL, api_token)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
        headers: HeaderMap,
    ) -> TransportResult<Vec<u8>> {
        let url = self.url(path);
        debug!(%method, path, bytes = body.len(), "sending request");

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&self.api_token)
                .headers(headers.clone())
                .body(body.clone())
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if is_retryable_status(status) && attempt < self.max_attempts {
                        let delay = retry_delay_ms(attempt);
                        warn!(
                            %method, path, %status, attempt, max = self.max_attempts, delay_ms = delay,
                            "retryable status, retrying"
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        continue;
                    }
                    return read_response(response).await;
                }
                Err(error) => {
                    if is_retryable_transport_error(&error) && attempt < self.max_attempts {
                        let delay = retry_delay_ms(attempt);
                        warn!(
                            %method, path, %error, attempt, max = self.max_attempts, delay_ms = delay,
                            "transport error, retrying"
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        continue;
                    }
                    return Err(error.into());
                }
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn make_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> TransportResult<Vec<u8>> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = match body {
            Some(value) => value.to_string().into_bytes(),
            None => Vec::new(),
        };
        self.send_with_retry(method, path, body, headers).await
    }

    async fn make_request_with_headers(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
        headers: HeaderMap,
    ) -> TransportResult<Vec<u8>> {
        self.send_with_retry(method, path, body, headers).await
    }
}

async fn read_response(response: reqwest::Response) -> TransportResult<Vec<u8>> {
    let status = response.status();
    let body = response.bytes().await?.to_vec();

    if !status.is_success() {
        let message = match serde_json::from_slice::<ErrorEnvelope>(&body) {
            Ok(envelope) => {
                summarize_messages(envelope.errors.as_deref(), envelope.messages.as_deref())
            }
            Err(_) => String::from_utf8_lossy(&body).into_owned(),
        };
        return Err(TransportError::Api { status, message });
    }

    Ok(body)
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

fn retry_delay_ms(attempt: usize) -> u64 {
    let exp = 2u64.saturating_pow((attempt.saturating_sub(1)) as u32);
    RETRY_BASE_MS.saturating_mul(exp).min(RETRY_MAX_MS)
}

fn summarize_messages(errors: Option<&[ApiMessage]>, messages: Option<&[ApiMessage]>) -> String {
    let parts: Vec<String> = errors
        .unwrap_or_default()
        .iter()
        .chain(messages.unwrap_or_default())
        .map(|msg| match msg.code {
            Some(code) => format!("{} ({})", msg.message, code),
            None => msg.message.clone(),
        })
        .collect();

    if parts.is_empty() {
        "Unknown API error".to_string()
    } else {
        parts.join("; ")
    }
}
