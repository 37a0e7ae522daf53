//! # Provider HTTP
//!
//! Outbound HTTP for gateway strategies. [`HttpTransport`] is the seam
//! (production uses [`ReqwestTransport`]); [`make_http_request`] classifies the
//! result into success, HTTP error, or transport failure.

use crate::error::{PaymentError, PaymentResult};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

/// Timeout applied to every provider call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let method = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(method)
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// `application/json` (the default for provider calls)
    Json(Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// Flatten into query pairs for GET requests
    fn into_query_pairs(self) -> Vec<(String, String)> {
        match self {
            RequestBody::Empty => Vec::new(),
            RequestBody::Form(pairs) => pairs,
            RequestBody::Json(Value::Object(map)) => map
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect(),
            RequestBody::Json(_) => Vec::new(),
        }
    }
}

/// A fully built outbound request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

/// Status and raw body of a completed exchange
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Sends requests to payment providers.
///
/// Implementations return `Err` only for transport-level failures (DNS,
/// connect, TLS, timeout); any HTTP status is an `Ok` response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> PaymentResult<RawResponse>;
}

/// `reqwest` transport with rustls, certificate verification and a 30s timeout
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("FearlessCommerce/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> PaymentResult<RawResponse> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(pairs) => builder.form(&pairs),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        Ok(RawResponse { status, body })
    }
}

/// Classified result of a provider call
#[derive(Debug, Clone, PartialEq)]
pub enum HttpOutcome {
    /// 2xx response; body parsed as JSON, or the raw text as a JSON string
    Success { status: u16, body: Value },
    /// Non-2xx response
    Failure { status: u16, body: Value },
    /// No HTTP response at all
    Transport(String),
}

impl HttpOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, HttpOutcome::Success { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            HttpOutcome::Success { status, .. } | HttpOutcome::Failure { status, .. } => {
                Some(*status)
            }
            HttpOutcome::Transport(_) => None,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            HttpOutcome::Success { body, .. } | HttpOutcome::Failure { body, .. } => Some(body),
            HttpOutcome::Transport(_) => None,
        }
    }

    /// Success body, or the error carried by a failure.
    ///
    /// `describe_failure` turns a non-2xx body into the provider's message.
    pub fn into_success(
        self,
        provider: &str,
        describe_failure: impl FnOnce(&Value) -> Option<String>,
    ) -> PaymentResult<Value> {
        match self {
            HttpOutcome::Success { body, .. } => Ok(body),
            HttpOutcome::Failure { body, .. } => Err(PaymentError::ProviderError {
                provider: provider.to_string(),
                message: describe_failure(&body).unwrap_or_else(|| "Unknown error".to_string()),
            }),
            HttpOutcome::Transport(message) => Err(PaymentError::NetworkError(message)),
        }
    }
}

/// Send one request and classify the result.
///
/// GET requests carry `body` as a query string. Status codes in `[200, 300)`
/// count as success.
pub async fn make_http_request(
    transport: &dyn HttpTransport,
    method: HttpMethod,
    url: &str,
    body: RequestBody,
    headers: Vec<(String, String)>,
) -> HttpOutcome {
    let (url, body) = if method == HttpMethod::Get {
        let mut parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => return HttpOutcome::Transport(format!("Invalid URL {}: {}", url, e)),
        };
        let pairs = body.into_query_pairs();
        if !pairs.is_empty() {
            parsed.query_pairs_mut().extend_pairs(pairs);
        }
        (parsed.to_string(), RequestBody::Empty)
    } else {
        (url.to_string(), body)
    };

    let request = HttpRequest {
        method,
        url,
        headers,
        body,
    };

    match transport.send(request).await {
        Ok(response) => classify(response),
        Err(PaymentError::NetworkError(message)) => HttpOutcome::Transport(message),
        Err(other) => HttpOutcome::Transport(other.to_string()),
    }
}

fn classify(response: RawResponse) -> HttpOutcome {
    let body = serde_json::from_str::<Value>(&response.body)
        .unwrap_or_else(|_| Value::String(response.body));

    if (200..300).contains(&response.status) {
        HttpOutcome::Success {
            status: response.status,
            body,
        }
    } else {
        HttpOutcome::Failure {
            status: response.status,
            body,
        }
    }
}
