//! Environment-sourced configuration.
//!
//! Each process reads its environment once at startup (after loading `.env`
//! with `dotenvy`) into one of the immutable structs below and passes it on
//! explicitly. Library code never reads the environment itself.

use crate::errors::{Result, ShieldPayError};
use crate::routes::{RouteConfig, RoutesConfig};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default port of the resource server.
pub const DEFAULT_SERVER_PORT: u16 = 4022;

/// Default port of the facilitator.
pub const DEFAULT_FACILITATOR_PORT: u16 = 3000;

/// Default network label.
pub const DEFAULT_NETWORK: &str = "ALEO";

/// Default transport timeout. Ledger proving and broadcast can take minutes.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Loads `.env` into the process environment, ignoring a missing file.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "Failed to load .env file");
        }
    }
}

/// Configuration of a payment-gated resource server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Payee address (`ADDRESS`)
    pub pay_to: String,

    /// Listen port (`PORT`)
    pub port: u16,

    /// Facilitator base URL (`FACILITATOR_URL`)
    pub facilitator_url: String,

    /// Network label for settlements (`NETWORK`)
    pub network: String,

    /// Transport timeout (`REQUEST_TIMEOUT_SECS`)
    pub request_timeout: Duration,

    /// Optional JSON file with route prices (`ROUTES_FILE`)
    pub routes_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pay_to = lookup("ADDRESS")
            .filter(|v| !v.is_empty())
            .ok_or(ShieldPayError::MissingEnv("ADDRESS"))?;
        let port = parse_or(&lookup, "PORT", DEFAULT_SERVER_PORT)?;
        let request_timeout = lookup("REQUEST_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                    ShieldPayError::ConfigError(format!("REQUEST_TIMEOUT_SECS: {e}"))
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Ok(Self {
            pay_to,
            port,
            facilitator_url: lookup("FACILITATOR_URL")
                .unwrap_or_else(|| format!("http://localhost:{DEFAULT_FACILITATOR_PORT}")),
            network: lookup("NETWORK").unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
            request_timeout,
            routes_file: lookup("ROUTES_FILE").map(PathBuf::from),
        })
    }

    /// Route prices: from `routes_file` when set, otherwise `default_routes`.
    pub fn routes_or(&self, default_routes: RoutesConfig) -> Result<RoutesConfig> {
        match &self.routes_file {
            Some(path) => RoutesConfig::from_json(&std::fs::read_to_string(path)?),
            None => Ok(default_routes),
        }
    }

    /// The single-route default: `GET /weather` for 100000 units on this network.
    pub fn weather_routes(&self) -> Result<RoutesConfig> {
        RoutesConfig::new().with_route("GET /weather", RouteConfig::new(100000, &self.network)?)
    }
}

/// Configuration of a facilitator service.
#[derive(Debug, Clone)]
pub struct FacilitatorSettings {
    /// Listen port (`PORT`)
    pub port: u16,

    /// Supported network labels (`NETWORKS`, comma separated)
    pub networks: Vec<String>,
}

impl FacilitatorSettings {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = parse_or(&lookup, "PORT", DEFAULT_FACILITATOR_PORT)?;
        let networks: Vec<String> = lookup("NETWORKS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_else(|| vec![DEFAULT_NETWORK.to_string()]);
        if networks.is_empty() {
            return Err(ShieldPayError::ConfigError(
                "NETWORKS must list at least one network".to_string(),
            ));
        }
        Ok(Self { port, networks })
    }
}

/// Configuration of the paid-resource client shim.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Resource server base URL (`RESOURCE_SERVER_URL`)
    pub resource_server_url: String,

    /// Path of the resource to fetch (`ENDPOINT_PATH`)
    pub endpoint_path: String,

    /// Token forwarded in `X-PAYMENT` (`PAYMENT_TOKEN`)
    pub payment_token: String,
}

impl ClientSettings {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            resource_server_url: lookup("RESOURCE_SERVER_URL")
                .ok_or(ShieldPayError::MissingEnv("RESOURCE_SERVER_URL"))?,
            endpoint_path: lookup("ENDPOINT_PATH")
                .ok_or(ShieldPayError::MissingEnv("ENDPOINT_PATH"))?,
            payment_token: lookup("PAYMENT_TOKEN").unwrap_or_else(|| "test".to_string()),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .parse()
            .map_err(|e| ShieldPayError::ConfigError(format!("{key}: {e}"))),
        None => Ok(default),
    }
}
