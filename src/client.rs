//! Client-side access to paid resources.
//!
//! This is the thin shim a tool host uses to fetch a protected resource: it
//! forwards a payment token in the `X-PAYMENT` header, reads the body and
//! decodes the settlement receipt the server attaches on success.

use crate::errors::Result;
use crate::types::SettlementReceipt;
use crate::utils::{decode_receipt_header, PAYMENT_HEADER, PAYMENT_RESPONSE_HEADER};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use url::Url;

/// Configuration for requests to a payment-gated resource server.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the resource server (e.g. `https://example.com`)
    pub base_url: String,

    /// Token forwarded in the `X-PAYMENT` header
    pub payment_token: String,

    /// HTTP client to use for requests
    pub http_client: Client,
}

impl ClientConfig {
    /// Creates a new client configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use shieldpay::client::ClientConfig;
    ///
    /// let config = ClientConfig::new("https://example.com", "test");
    /// assert_eq!(config.resource_url("/weather").unwrap().as_str(), "https://example.com/weather");
    /// ```
    pub fn new(base_url: impl Into<String>, payment_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            payment_token: payment_token.into(),
            http_client: Client::new(),
        }
    }

    /// Sets a custom HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Full URL of `path` on the resource server.
    pub fn resource_url(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            path
        ))?)
    }
}

/// Outcome of a request to a paid resource.
#[derive(Debug, Clone)]
pub struct PaidResponse {
    /// HTTP status returned by the server
    pub status: StatusCode,

    /// Response body; non-JSON bodies are kept as a JSON string
    pub body: Value,

    /// Settlement receipt, present when the server settled the payment
    pub receipt: Option<SettlementReceipt>,
}

/// Requests `path` from the resource server, forwarding the payment token.
///
/// Non-success statuses are returned as a [`PaidResponse`], not an error: a
/// `402` body tells the caller the price and payee.
pub async fn request_with_payment(
    config: &ClientConfig,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> Result<PaidResponse> {
    let url = config.resource_url(path)?;
    let mut request = config
        .http_client
        .request(method, url)
        .header(PAYMENT_HEADER, config.payment_token.as_str());
    if let Some(body) = &body {
        request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();

    let receipt = match response.headers().get(PAYMENT_RESPONSE_HEADER) {
        Some(value) => match value.to_str().map(decode_receipt_header) {
            Ok(Ok(receipt)) => Some(receipt),
            _ => {
                tracing::warn!("Ignoring malformed settlement receipt");
                None
            }
        },
        None => None,
    };

    let text = response.text().await?;
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

    Ok(PaidResponse {
        status,
        body,
        receipt,
    })
}

/// Convenience wrapper for GET requests.
pub async fn get(config: &ClientConfig, path: &str) -> Result<PaidResponse> {
    request_with_payment(config, Method::GET, path, None).await
}

/// Convenience wrapper for POST requests with a JSON body.
pub async fn post(config: &ClientConfig, path: &str, body: Value) -> Result<PaidResponse> {
    request_with_payment(config, Method::POST, path, Some(body)).await
}

/// Fetches `path` and renders the outcome as the text shown to a tool caller.
///
/// Success renders as `Response: <pretty JSON>`; transport failures render as
/// `Error: <reason>` followed by the requested URL.
pub async fn fetch_tool_output(config: &ClientConfig, path: &str) -> String {
    match get(config, path).await {
        Ok(response) => {
            let pretty = serde_json::to_string_pretty(&response.body)
                .unwrap_or_else(|_| response.body.to_string());
            format!("Response: {pretty}")
        }
        Err(e) => format!(
            "Error: {e}\nURL: {}{}",
            config.base_url.trim_end_matches('/'),
            path
        ),
    }
}
