//! The settlement collaborator consumed by the payment gate.
//!
//! Settlement moves the configured price from the caller to the payee on the
//! underlying ledger and yields a transaction identifier. Building, signing and
//! broadcasting the transfer is the job of whatever implements [`Settler`]; the
//! gate only awaits it.
//!
//! [`FacilitatorSettler`] delegates that work to a remote facilitator service
//! (see [`crate::facilitator`]) over HTTP.

use crate::errors::{Result, ShieldPayError};
use crate::types::{SettleRequest, SettleResponse};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use url::Url;

/// Identifier of a submitted settlement transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    /// Wraps a ledger transaction identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TxId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<TxId> for String {
    fn from(id: TxId) -> Self {
        id.0
    }
}

/// Transfers `amount` to `pay_to` and returns the transaction identifier.
///
/// The gate calls this at most once per request and never retries. Any fault
/// must come back as an `Err` whose `Display` is a human-readable reason; it
/// ends up in the `402` body as `Settlement failed: <reason>`.
///
/// Settlement may take a long time (ledger proving and broadcast happen inside
/// it). Implementations that need a bound should enforce it themselves.
#[async_trait]
pub trait Settler: Send + Sync {
    /// Settles a payment of `amount` smallest currency units to `pay_to`.
    async fn settle(&self, pay_to: &str, amount: u64) -> Result<TxId>;
}

#[async_trait]
impl<T: Settler + ?Sized> Settler for Arc<T> {
    async fn settle(&self, pay_to: &str, amount: u64) -> Result<TxId> {
        (**self).settle(pay_to, amount).await
    }
}

/// A [`Settler`] that asks a remote facilitator to settle on its behalf.
///
/// Sends `POST {base_url}/settle` with a [`SettleRequest`] and expects a
/// [`SettleResponse`].
#[derive(Clone, Debug)]
pub struct FacilitatorSettler {
    base_url: Url,
    settle_url: Url,
    network: String,
    client: Client,
    timeout: Option<Duration>,
}

impl FacilitatorSettler {
    /// Creates a settler for the facilitator at `base_url`, settling on `network`.
    ///
    /// # Examples
    ///
    /// ```
    /// use shieldpay::settlement::FacilitatorSettler;
    ///
    /// let settler = FacilitatorSettler::try_new("http://localhost:3000", "ALEO").unwrap();
    /// assert_eq!(settler.settle_url().as_str(), "http://localhost:3000/settle");
    /// ```
    pub fn try_new(base_url: &str, network: impl Into<String>) -> Result<Self> {
        // Normalize to a single trailing slash so `join` keeps any base path.
        let mut normalized = base_url.trim_end_matches('/').to_string();
        normalized.push('/');
        let base_url = Url::parse(&normalized)?;
        let settle_url = base_url.join("settle")?;
        Ok(Self {
            base_url,
            settle_url,
            network: network.into(),
            client: Client::new(),
            timeout: None,
        })
    }

    /// Sets a per-request timeout for settlement calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets a custom HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Base URL of the facilitator.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL of the facilitator's settle endpoint.
    pub fn settle_url(&self) -> &Url {
        &self.settle_url
    }

    /// Network label sent with every settlement.
    pub fn network(&self) -> &str {
        &self.network
    }
}

#[async_trait]
impl Settler for FacilitatorSettler {
    #[instrument(name = "shieldpay.facilitator.settle", skip(self), fields(network = %self.network))]
    async fn settle(&self, pay_to: &str, amount: u64) -> Result<TxId> {
        let request = SettleRequest {
            pay_to: pay_to.to_string(),
            amount,
            network: self.network.clone(),
        };

        let mut http_request = self.client.post(self.settle_url.clone()).json(&request);
        if let Some(timeout) = self.timeout {
            http_request = http_request.timeout(timeout);
        }
        let http_response = http_request.send().await?;

        if http_response.status() != StatusCode::OK {
            let status = http_response.status().as_u16();
            let body = http_response.text().await?;
            tracing::error!(status, %body, "Facilitator rejected settlement");
            return Err(ShieldPayError::FacilitatorStatus { status, body });
        }

        let settlement: SettleResponse = http_response.json().await?;
        match settlement {
            SettleResponse {
                success: true,
                transaction: Some(transaction),
                ..
            } => Ok(TxId::new(transaction)),
            SettleResponse { error_reason, .. } => Err(ShieldPayError::SettlementError(
                error_reason.unwrap_or_else(|| "facilitator reported failure".to_string()),
            )),
        }
    }
}
