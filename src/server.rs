//! The payment gate: tower middleware that releases a priced route's response
//! only once the caller has paid for it.
//!
//! Per request the gate
//!
//! 1. looks up `<METHOD> <path>` in the [`PricingTable`] and answers `404` when
//!    the route is not priced,
//! 2. answers `402` with the price and payee when the `X-PAYMENT` header is
//!    missing,
//! 3. otherwise runs the inner handler and holds its response in a
//!    [`BufferedResponse`],
//! 4. passes error responses (status `>= 400`) through untouched and unbilled,
//! 5. settles successful responses through the configured [`Settler`], then
//!    releases the held response with an `X-PAYMENT-RESPONSE` receipt, or drops
//!    it and answers `402` when settlement fails.
//!
//! Exactly one response leaves the gate per request on every branch.
//!
//! # Proof of payment
//!
//! The `X-PAYMENT` header is only checked for presence. Its contents are not
//! verified or bound to the settled amount, so any non-empty value is enough to
//! make the server settle. Deployments that need authenticated payments must
//! validate the proof before this layer (for instance with a signed challenge)
//! or in the [`Settler`] itself.
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::{routing::get, Json, Router};
//! use serde_json::json;
//! use shieldpay::routes::{RouteConfig, RoutesConfig};
//! use shieldpay::server::payment_middleware;
//! use shieldpay::settlement::FacilitatorSettler;
//!
//! # fn build() -> shieldpay::Result<Router> {
//! let routes = RoutesConfig::new().with_route("GET /weather", RouteConfig::new(100000, "ALEO")?)?;
//! let settler = FacilitatorSettler::try_new("http://localhost:3000", "ALEO")?;
//!
//! let app = Router::new()
//!     .route("/weather", get(|| async { Json(json!({"report": {"weather": "sunny"}})) }))
//!     .layer(payment_middleware("aleo1payee", routes, settler));
//! # Ok(app)
//! # }
//! ```

use crate::errors::{Result, ShieldPayError};
use crate::routes::{PricingTable, RoutesConfig};
use crate::settlement::Settler;
use crate::types::{ErrorBody, PaymentRequiredBody, SettlementReceipt};
use crate::utils::{encode_receipt_header, PAYMENT_HEADER};
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::{HeaderName, HeaderValue, StatusCode};
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{instrument, Instrument};

const PAYMENT_RESPONSE_HEADER: HeaderName = HeaderName::from_static("x-payment-response");

/// Reasons the gate answers on its own instead of releasing the handler's response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaygateError {
    /// No price is registered for the request's method and path.
    #[error("Route not configured for payments")]
    RouteNotConfigured,

    /// The route is priced but the request carries no proof of payment.
    #[error("X-PAYMENT header is required")]
    PaymentRequired {
        /// Price of the route
        amount: u64,
        /// Payee address
        recipient: String,
    },

    /// The settlement collaborator failed; the handler's response was withheld.
    #[error("Settlement failed: {0}")]
    Settlement(String),
}

impl IntoResponse for PaygateError {
    fn into_response(self) -> Response {
        let error = self.to_string();
        match self {
            PaygateError::RouteNotConfigured => {
                (StatusCode::NOT_FOUND, Json(ErrorBody { error })).into_response()
            }
            PaygateError::PaymentRequired { amount, recipient } => (
                StatusCode::PAYMENT_REQUIRED,
                Json(PaymentRequiredBody {
                    error,
                    amount,
                    recipient,
                }),
            )
                .into_response(),
            PaygateError::Settlement(_) => {
                (StatusCode::PAYMENT_REQUIRED, Json(ErrorBody { error })).into_response()
            }
        }
    }
}

/// A handler response held back until the gate decides what to do with it.
///
/// Nothing is written to the client while the response is buffered. It is
/// either released exactly once with [`BufferedResponse::release`] or dropped,
/// in which case the body is never sent.
#[derive(Debug)]
pub struct BufferedResponse {
    response: Response,
}

impl BufferedResponse {
    /// Takes hold of a response produced by the inner handler.
    pub fn capture(response: Response) -> Self {
        Self { response }
    }

    /// Status code set by the handler.
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Whether the handler signalled a client or server error (`status >= 400`).
    pub fn is_error(&self) -> bool {
        self.status().as_u16() >= 400
    }

    /// Adds the `X-PAYMENT-RESPONSE` header carrying `receipt`.
    pub fn attach_receipt(&mut self, receipt: &SettlementReceipt) -> Result<()> {
        let encoded = encode_receipt_header(receipt)?;
        let value = HeaderValue::from_str(&encoded)
            .map_err(|e| ShieldPayError::InvalidReceipt(e.to_string()))?;
        self.response
            .headers_mut()
            .insert(PAYMENT_RESPONSE_HEADER, value);
        Ok(())
    }

    /// Hands the held response over for transmission.
    pub fn release(self) -> Response {
        self.response
    }
}

/// Shared, immutable state of the gate: payee, prices and settlement collaborator.
#[derive(Clone)]
pub struct Paygate {
    pay_to: Arc<str>,
    table: PricingTable,
    settler: Arc<dyn Settler>,
}

impl fmt::Debug for Paygate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paygate")
            .field("pay_to", &self.pay_to)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl Paygate {
    /// Creates a gate paying `pay_to` for the routes in `table`.
    pub fn new(pay_to: impl Into<String>, table: PricingTable, settler: Arc<dyn Settler>) -> Self {
        Self {
            pay_to: Arc::from(pay_to.into()),
            table,
            settler,
        }
    }

    /// Payee address.
    pub fn pay_to(&self) -> &str {
        &self.pay_to
    }

    /// The route prices consulted on every request.
    pub fn pricing_table(&self) -> &PricingTable {
        &self.table
    }

    /// Runs one request through the gate. Never fails: every outcome is a response.
    #[instrument(
        name = "shieldpay.gate",
        skip_all,
        fields(method = %req.method(), path = %req.uri().path())
    )]
    pub async fn handle_request<S>(&self, inner: S, req: Request) -> Response
    where
        S: Service<Request, Response = Response, Error = Infallible>,
        S::Future: Send,
    {
        match self.handle_request_fallible(inner, req).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    /// Runs one request through the gate, returning the gate's own answers as errors.
    pub async fn handle_request_fallible<S>(
        &self,
        inner: S,
        req: Request,
    ) -> std::result::Result<Response, PaygateError>
    where
        S: Service<Request, Response = Response, Error = Infallible>,
        S::Future: Send,
    {
        let route = self
            .table
            .lookup(req.method(), req.uri().path())
            .cloned()
            .ok_or_else(|| {
                tracing::debug!("Route not priced");
                PaygateError::RouteNotConfigured
            })?;
        let amount = route.price.get();

        // An empty header counts as no proof at all.
        let has_proof = req
            .headers()
            .get(PAYMENT_HEADER)
            .is_some_and(|value| !value.is_empty());
        if !has_proof {
            tracing::debug!(amount, "Payment proof missing");
            return Err(PaygateError::PaymentRequired {
                amount,
                recipient: self.pay_to.to_string(),
            });
        }

        let mut buffered = BufferedResponse::capture(call_inner(inner, req).await);

        if buffered.is_error() {
            tracing::debug!(status = %buffered.status(), "Handler failed, skipping settlement");
            return Ok(buffered.release());
        }

        // Dropping `buffered` on failure discards the unpaid body.
        let tx_id = self
            .settler
            .settle(&self.pay_to, amount)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, amount, "Settlement failed");
                PaygateError::Settlement(err.to_string())
            })?;

        tracing::info!(transaction = %tx_id, amount, network = %route.network, "Payment settled");
        let receipt = SettlementReceipt::settled(tx_id, route.network);
        if let Err(err) = buffered.attach_receipt(&receipt) {
            // Funds have moved, so the body is owed even without a receipt.
            tracing::error!(error = %err, "Unable to attach settlement receipt");
        }
        Ok(buffered.release())
    }
}

async fn call_inner<S>(mut inner: S, req: Request) -> Response
where
    S: Service<Request, Response = Response, Error = Infallible>,
    S::Future: Send,
{
    match inner.call(req).instrument(tracing::info_span!("inner")).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

/// Tower layer that puts the payment gate in front of a service.
///
/// Build it with [`payment_middleware`] once per application.
#[derive(Clone, Debug)]
pub struct PaymentMiddleware {
    gate: Paygate,
}

impl PaymentMiddleware {
    /// Creates the layer from a payee, route prices and a settlement collaborator.
    pub fn new<T>(pay_to: impl Into<String>, routes: RoutesConfig, settler: T) -> Self
    where
        T: Settler + 'static,
    {
        Self {
            gate: Paygate::new(pay_to, routes.into(), Arc::new(settler)),
        }
    }

    /// The gate shared by every service this layer produces.
    pub fn gate(&self) -> &Paygate {
        &self.gate
    }
}

/// Wraps downstream handlers so that priced routes require payment.
///
/// `pay_to` receives every settlement; `routes` is snapshotted and never
/// changes afterwards.
pub fn payment_middleware<T>(
    pay_to: impl Into<String>,
    routes: RoutesConfig,
    settler: T,
) -> PaymentMiddleware
where
    T: Settler + 'static,
{
    PaymentMiddleware::new(pay_to, routes, settler)
}

impl<S> Layer<S> for PaymentMiddleware {
    type Service = PaymentGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PaymentGateService {
            gate: self.gate.clone(),
            inner,
        }
    }
}

/// Service produced by [`PaymentMiddleware`].
#[derive(Clone, Debug)]
pub struct PaymentGateService<S> {
    gate: Paygate,
    inner: S,
}

impl<S> Service<Request> for PaymentGateService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // Keep the instance that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let gate = self.gate.clone();
        Box::pin(async move { Ok(gate.handle_request(inner, req).await) })
    }
}
