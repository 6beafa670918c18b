//! Fetches a paid resource and prints what a tool caller would see.
//!
//! Run with:
//! ```bash
//! RESOURCE_SERVER_URL=http://localhost:4022 ENDPOINT_PATH=/weather cargo run --example client
//! ```
//!
//! Environment variables:
//! - RESOURCE_SERVER_URL: resource server base URL (required)
//! - ENDPOINT_PATH: path of the resource (required)
//! - PAYMENT_TOKEN: value sent in X-PAYMENT (default: test)

use shieldpay::client::{fetch_tool_output, ClientConfig};
use shieldpay::config::{load_dotenv, ClientSettings};
use shieldpay::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    let settings = ClientSettings::from_env()?;
    let config = ClientConfig::new(settings.resource_server_url, settings.payment_token);

    println!("{}", fetch_tool_output(&config, &settings.endpoint_path).await);
    Ok(())
}
