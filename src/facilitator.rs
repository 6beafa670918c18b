//! Settlement facilitator service.
//!
//! A facilitator settles payments on behalf of resource servers that do not
//! hold ledger credentials themselves. It exposes `POST /settle` and
//! `GET /supported`; resource servers reach it through
//! [`crate::settlement::FacilitatorSettler`]. The ledger work is done by the
//! [`Settler`] the host process plugs in.

use crate::settlement::Settler;
use crate::types::{SettleRequest, SettleResponse, SupportedResponse};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::fmt;
use std::sync::Arc;

/// Configuration for a facilitator service.
#[derive(Clone, Debug)]
pub struct FacilitatorConfig {
    /// Network labels this facilitator settles on
    pub networks: Vec<String>,
}

impl FacilitatorConfig {
    /// Creates a configuration supporting a single network.
    ///
    /// # Examples
    ///
    /// ```
    /// use shieldpay::facilitator::FacilitatorConfig;
    ///
    /// let config = FacilitatorConfig::new("ALEO");
    /// assert!(config.is_supported("ALEO"));
    /// assert!(!config.is_supported("base"));
    /// ```
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            networks: vec![network.into()],
        }
    }

    /// Adds a supported network.
    pub fn add_supported(&mut self, network: impl Into<String>) {
        let network = network.into();
        if !self.is_supported(&network) {
            self.networks.push(network);
        }
    }

    /// Checks if a network is supported.
    pub fn is_supported(&self, network: &str) -> bool {
        self.networks.iter().any(|n| n == network)
    }
}

/// Handles the `/settle` endpoint.
///
/// Unsupported networks and zero amounts are refused without touching the
/// ledger. Failures are reported in the response body, never as an `Err`.
pub async fn handle_settle(
    request: SettleRequest,
    config: &FacilitatorConfig,
    settler: &dyn Settler,
) -> SettleResponse {
    if !config.is_supported(&request.network) {
        return SettleResponse::failed(
            request.network.clone(),
            format!("Unsupported network: {}", request.network),
        );
    }

    if request.amount == 0 {
        return SettleResponse::failed(request.network, "Invalid amount: must be positive");
    }

    match settler.settle(&request.pay_to, request.amount).await {
        Ok(tx_id) => {
            tracing::info!(
                transaction = %tx_id,
                amount = request.amount,
                pay_to = %request.pay_to,
                "Settlement submitted"
            );
            SettleResponse::settled(tx_id, request.network)
        }
        Err(e) => {
            tracing::warn!(error = %e, amount = request.amount, "Settlement failed");
            SettleResponse::failed(request.network, e.to_string())
        }
    }
}

/// Handles the `/supported` endpoint.
pub fn handle_supported(config: &FacilitatorConfig) -> SupportedResponse {
    SupportedResponse {
        networks: config.networks.clone(),
    }
}

/// State shared by the facilitator's HTTP handlers.
#[derive(Clone)]
pub struct FacilitatorState {
    config: FacilitatorConfig,
    settler: Arc<dyn Settler>,
}

impl FacilitatorState {
    /// Creates the state from a configuration and the ledger-facing settler.
    pub fn new<T: Settler + 'static>(config: FacilitatorConfig, settler: T) -> Self {
        Self {
            config,
            settler: Arc::new(settler),
        }
    }
}

impl fmt::Debug for FacilitatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacilitatorState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn settle_handler(
    State(state): State<Arc<FacilitatorState>>,
    Json(request): Json<SettleRequest>,
) -> impl IntoResponse {
    Json(handle_settle(request, &state.config, state.settler.as_ref()).await)
}

async fn supported_handler(State(state): State<Arc<FacilitatorState>>) -> impl IntoResponse {
    Json(handle_supported(&state.config))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "shieldpay-facilitator",
    }))
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "service": "ShieldPay Facilitator",
        "endpoints": {
            "/settle": "POST - Settle a payment on the ledger",
            "/supported": "GET - List supported networks",
            "/health": "GET - Health check"
        },
    }))
}

/// Builds the facilitator's axum router.
pub fn router(state: FacilitatorState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/settle", post(settle_handler))
        .route("/supported", get(supported_handler))
        .route("/health", get(health_handler))
        .with_state(Arc::new(state))
}
