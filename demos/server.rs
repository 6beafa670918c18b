//! Weather resource server behind the payment gate.
//!
//! Run with:
//! ```bash
//! ADDRESS=aleo1... cargo run --example server
//! ```
//!
//! Environment variables:
//! - ADDRESS: payee address (required)
//! - PORT: listen port (default: 4022)
//! - FACILITATOR_URL: facilitator base URL (default: http://localhost:3000)
//! - NETWORK: network label (default: ALEO)
//! - REQUEST_TIMEOUT_SECS: transport timeout (default: 600)
//! - ROUTES_FILE: optional JSON file of route prices

use axum::{routing::get, Json, Router};
use serde_json::json;
use shieldpay::config::{load_dotenv, ServerConfig};
use shieldpay::server::payment_middleware;
use shieldpay::settlement::FacilitatorSettler;
use shieldpay::telemetry::init_tracing;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

async fn weather_handler() -> Json<serde_json::Value> {
    Json(json!({
        "report": {
            "weather": "sunny",
            "temperature": 70
        }
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    let config = ServerConfig::from_env()?;
    let routes = config.routes_or(config.weather_routes()?)?;
    let settler = FacilitatorSettler::try_new(&config.facilitator_url, config.network.as_str())?
        .with_timeout(config.request_timeout);

    tracing::info!(
        pay_to = %config.pay_to,
        facilitator = %config.facilitator_url,
        routes = routes.len(),
        "Configured payment gate"
    );

    let app = Router::new()
        .route("/weather", get(weather_handler))
        .layer(payment_middleware(config.pay_to.as_str(), routes, settler))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Resource server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
