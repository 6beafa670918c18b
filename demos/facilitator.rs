//! Facilitator service for local development.
//!
//! Settlement here is simulated: every supported request is answered with a
//! synthetic transaction id. Replace `LoggingSettler` with a real ledger
//! client before moving funds.
//!
//! Run with:
//! ```bash
//! cargo run --example facilitator
//! ```
//!
//! Environment variables:
//! - PORT: listen port (default: 3000)
//! - NETWORKS: comma-separated supported networks (default: ALEO)

use async_trait::async_trait;
use shieldpay::config::{load_dotenv, FacilitatorSettings};
use shieldpay::facilitator::{router, FacilitatorConfig, FacilitatorState};
use shieldpay::settlement::{Settler, TxId};
use shieldpay::telemetry::init_tracing;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tower_http::trace::TraceLayer;

#[derive(Default)]
struct LoggingSettler {
    sequence: AtomicU64,
}

#[async_trait]
impl Settler for LoggingSettler {
    async fn settle(&self, pay_to: &str, amount: u64) -> shieldpay::Result<TxId> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let tx = TxId::new(format!("at1dev{millis:x}{seq:04x}"));
        tracing::info!(%pay_to, amount, %tx, "Simulated settlement");
        Ok(tx)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    let settings = FacilitatorSettings::from_env()?;
    let mut networks = settings.networks.iter();
    let mut config = FacilitatorConfig::new(networks.next().map(String::as_str).unwrap_or("ALEO"));
    for network in networks {
        config.add_supported(network.as_str());
    }

    let app = router(FacilitatorState::new(config, LoggingSettler::default()))
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(networks = ?settings.networks, "Facilitator listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
