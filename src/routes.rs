//! Route pricing: which `<METHOD> <path>` pairs are paid for, and how much.
//!
//! Matching is exact. A route must be registered verbatim; there is no prefix,
//! wildcard or parameter matching, and query strings never take part in the key.

use crate::errors::{Result, ShieldPayError};
use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use std::sync::Arc;

/// Lookup key of a priced route: an HTTP method and a path.
///
/// Renders and parses as `"<METHOD> <path>"`, e.g. `"GET /weather"`.
///
/// # Examples
///
/// ```
/// use shieldpay::routes::RouteKey;
///
/// let key: RouteKey = "GET /weather".parse().unwrap();
/// assert_eq!(key.to_string(), "GET /weather");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    method: Method,
    path: String,
}

impl RouteKey {
    /// Creates a key from a method and a path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    /// The HTTP method of this route.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path of this route.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl FromStr for RouteKey {
    type Err = ShieldPayError;

    fn from_str(s: &str) -> Result<Self> {
        let (method, path) = s
            .split_once(' ')
            .ok_or_else(|| ShieldPayError::InvalidRouteKey(s.to_string()))?;
        if !path.starts_with('/') {
            return Err(ShieldPayError::InvalidRouteKey(s.to_string()));
        }
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| ShieldPayError::InvalidRouteKey(s.to_string()))?;
        Ok(Self::new(method, path))
    }
}

/// Price and network label of a single paid route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Price in the smallest currency unit (e.g. Aleo microcredits)
    pub price: NonZeroU64,

    /// Network label reported in settlement receipts
    pub network: String,
}

impl RouteConfig {
    /// Creates a route configuration, rejecting a zero price.
    ///
    /// # Examples
    ///
    /// ```
    /// use shieldpay::routes::RouteConfig;
    ///
    /// let config = RouteConfig::new(100000, "ALEO").unwrap();
    /// assert_eq!(config.price.get(), 100000);
    /// assert!(RouteConfig::new(0, "ALEO").is_err());
    /// ```
    pub fn new(price: u64, network: impl Into<String>) -> Result<Self> {
        let price = NonZeroU64::new(price)
            .ok_or_else(|| ShieldPayError::InvalidAmount("route price must be positive".to_string()))?;
        Ok(Self {
            price,
            network: network.into(),
        })
    }
}

/// Mutable set of route prices, used to assemble a [`PricingTable`].
///
/// Registering the same key twice keeps the later configuration. Deserializes
/// from a JSON object keyed by `"<METHOD> <path>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "HashMap<String, RouteConfig>")]
pub struct RoutesConfig {
    routes: HashMap<RouteKey, RouteConfig>,
}

impl RoutesConfig {
    /// Creates an empty set of routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route, overwriting any previous entry for the same key.
    pub fn insert(&mut self, key: RouteKey, config: RouteConfig) {
        self.routes.insert(key, config);
    }

    /// Builder-style registration from a `"<METHOD> <path>"` string.
    pub fn with_route(mut self, key: &str, config: RouteConfig) -> Result<Self> {
        self.insert(key.parse()?, config);
        Ok(self)
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Parses routes from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl TryFrom<HashMap<String, RouteConfig>> for RoutesConfig {
    type Error = ShieldPayError;

    fn try_from(raw: HashMap<String, RouteConfig>) -> Result<Self> {
        let mut routes = RoutesConfig::new();
        for (key, config) in raw {
            routes.insert(key.parse()?, config);
        }
        Ok(routes)
    }
}

/// Immutable snapshot of route prices consulted by the payment gate.
///
/// Cheap to clone; all clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    routes: Arc<HashMap<RouteKey, RouteConfig>>,
}

impl PricingTable {
    /// Looks up the price of `method path`. Exact match only.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<&RouteConfig> {
        self.routes.get(&RouteKey::new(method.clone(), path))
    }

    /// Number of priced routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table prices nothing.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl From<RoutesConfig> for PricingTable {
    fn from(config: RoutesConfig) -> Self {
        Self {
            routes: Arc::new(config.routes),
        }
    }
}
