//! # shieldpay
//!
//! Per-request micropayments for HTTP resources.
//!
//! A resource server puts the [`server::PaymentMiddleware`] in front of its
//! handlers. Callers to a priced route must send an `X-PAYMENT` header; the
//! handler's response is held back until the route's price has been settled to
//! the payee, and is then released with an `X-PAYMENT-RESPONSE` header carrying
//! a base64-encoded JSON receipt:
//!
//! ```text
//! {"success":true,"transaction":"<tx id>","network":"ALEO"}
//! ```
//!
//! ## Responses produced by the gate
//!
//! | Situation | Status | Body |
//! |---|---|---|
//! | route not priced | 404 | `{"error":"Route not configured for payments"}` |
//! | `X-PAYMENT` missing | 402 | `{"error":"X-PAYMENT header is required","amount":..,"recipient":..}` |
//! | handler status >= 400 | handler's | handler's, never billed |
//! | settlement succeeded | handler's | handler's, plus receipt header |
//! | settlement failed | 402 | `{"error":"Settlement failed: <reason>"}` |
//!
//! ## Security
//!
//! The `X-PAYMENT` header is treated as a presence flag only. Its contents are
//! neither verified nor bound to the settled amount. See the [`server`] module
//! docs before exposing a gate to untrusted callers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{routing::get, Json, Router};
//! use serde_json::json;
//! use shieldpay::routes::{RouteConfig, RoutesConfig};
//! use shieldpay::server::payment_middleware;
//! use shieldpay::settlement::FacilitatorSettler;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let routes = RoutesConfig::new().with_route("GET /weather", RouteConfig::new(100000, "ALEO")?)?;
//! let settler = FacilitatorSettler::try_new("http://localhost:3000", "ALEO")?;
//!
//! let app = Router::new()
//!     .route("/weather", get(|| async { Json(json!({"report": {"weather": "sunny", "temperature": 70}})) }))
//!     .layer(payment_middleware("aleo1payee", routes, settler));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:4022").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod errors;
pub mod facilitator;
pub mod routes;
pub mod server;
pub mod settlement;
pub mod telemetry;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use errors::{Result, ShieldPayError};
pub use routes::{PricingTable, RouteConfig, RouteKey, RoutesConfig};
pub use server::{payment_middleware, BufferedResponse, PaygateError, PaymentMiddleware};
pub use settlement::{FacilitatorSettler, Settler, TxId};
pub use types::{SettleRequest, SettleResponse, SettlementReceipt, SupportedResponse};
