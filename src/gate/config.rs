//! Payment gate configuration
//!
//! A [`PaymentConfig`] is built once at startup and shared (behind an `Arc`)
//! by every request evaluation. Card payment is disabled unless explicitly
//! enabled.

use crate::types::{FacilitatorConfig, Network};
use crate::{Result, X402Error};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Full configuration of accepted payment methods
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// x402 (crypto) payment configuration
    pub crypto_payment: CryptoPaymentConfig,
    /// Card payment configuration
    pub card_payment: CardPaymentConfig,
    /// Honor `X-Forwarded-Proto` when building advertised URLs; enable only
    /// behind a trusted reverse proxy
    pub trust_forwarded_proto: bool,
}

impl PaymentConfig {
    /// Create a config accepting crypto payments only
    pub fn new(crypto_payment: CryptoPaymentConfig) -> Self {
        Self {
            crypto_payment,
            card_payment: CardPaymentConfig::default(),
            trust_forwarded_proto: false,
        }
    }

    /// Set the card payment configuration
    pub fn with_card_payment(mut self, card_payment: CardPaymentConfig) -> Self {
        self.card_payment = card_payment;
        self
    }

    /// Trust the `X-Forwarded-Proto` header set by a reverse proxy
    pub fn with_trust_forwarded_proto(mut self, trust: bool) -> Self {
        self.trust_forwarded_proto = trust;
        self
    }

    /// Load the configuration from process environment variables
    ///
    /// See [`PaymentConfig::from_lookup`] for the recognized variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through a variable lookup function
    ///
    /// | Variable | Meaning | Default |
    /// |---|---|---|
    /// | `X402_PAY_TO` | receiving wallet address | required |
    /// | `X402_NETWORK` | `base` or `base-sepolia` | `base-sepolia` |
    /// | `X402_FACILITATOR_URL` | facilitator base URL | `https://x402.org/facilitator` |
    /// | `X402_RESOURCE_ROOT_URL` | public root URL of this service | none |
    /// | `X402_ROUTES` | JSON route rules, e.g. `{"POST /mcp": {"price": "$0.01"}}` | none |
    /// | `STRIPE_ENABLED` | `true`/`1`/`yes` enables card payment | `false` |
    /// | `STRIPE_PRICE_CENTS` | card price in minor units | required when enabled |
    /// | `X402_TRUST_PROXY` | `true`/`1`/`yes` honors `X-Forwarded-Proto` | `false` |
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pay_to = lookup("X402_PAY_TO")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| X402Error::config("X402_PAY_TO must be set"))?;

        let network = match lookup("X402_NETWORK") {
            Some(name) => Network::from_name(&name)?,
            None => Network::Testnet,
        };

        let facilitator = lookup("X402_FACILITATOR_URL")
            .map(FacilitatorConfig::new)
            .unwrap_or_default();

        let mut resource_server = ResourceServerConfig::new(pay_to)
            .with_network(network)
            .with_facilitator_config(facilitator);
        if let Some(root) = lookup("X402_RESOURCE_ROOT_URL") {
            resource_server = resource_server.with_resource_root_url(root);
        }

        let routes = match lookup("X402_ROUTES") {
            Some(json) => RouteRules::from_json(&json)?,
            None => RouteRules::default(),
        };
        if routes.is_empty() {
            tracing::warn!("No x402 route rules configured; crypto payments will not be enforced");
        }

        let flag = |name: &str| {
            lookup(name)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(false)
        };
        let enabled = flag("STRIPE_ENABLED");

        let card_payment = if enabled {
            let price = lookup("STRIPE_PRICE_CENTS")
                .ok_or_else(|| {
                    X402Error::config("STRIPE_PRICE_CENTS must be set when card payment is enabled")
                })?
                .trim()
                .parse::<u64>()
                .map_err(|e| X402Error::config(format!("Invalid STRIPE_PRICE_CENTS: {}", e)))?;
            CardPaymentConfig::enabled(price)
        } else {
            CardPaymentConfig::default()
        };

        Ok(Self::new(CryptoPaymentConfig::new(routes, resource_server))
            .with_card_payment(card_payment)
            .with_trust_forwarded_proto(flag("X402_TRUST_PROXY")))
    }
}

/// x402 payment configuration: which routes cost what, and who gets paid
#[derive(Debug, Clone)]
pub struct CryptoPaymentConfig {
    /// Route-to-price rules
    pub routes: RouteRules,
    /// Identity of the resource server receiving payments
    pub resource_server: ResourceServerConfig,
}

impl CryptoPaymentConfig {
    pub fn new(routes: RouteRules, resource_server: ResourceServerConfig) -> Self {
        Self {
            routes,
            resource_server,
        }
    }
}

/// Identity of the resource server: receiving wallet, network and facilitator
#[derive(Debug, Clone)]
pub struct ResourceServerConfig {
    /// Recipient wallet address (lower-cased to avoid EIP-55 checksum mismatches)
    pub pay_to: String,
    /// Network payments are accepted on
    pub network: Network,
    /// Facilitator used to verify and settle payments
    pub facilitator: FacilitatorConfig,
    /// Public root URL used to build resource URLs
    pub resource_root_url: Option<String>,
}

impl ResourceServerConfig {
    pub fn new(pay_to: impl Into<String>) -> Self {
        Self {
            pay_to: pay_to.into().trim().to_lowercase(),
            network: Network::default(),
            facilitator: FacilitatorConfig::default(),
            resource_root_url: None,
        }
    }

    /// Set the network
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Set the facilitator configuration
    pub fn with_facilitator_config(mut self, facilitator: FacilitatorConfig) -> Self {
        self.facilitator = facilitator;
        self
    }

    /// Set the resource root URL
    pub fn with_resource_root_url(mut self, url: impl Into<String>) -> Self {
        self.resource_root_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }
}

/// Card payment configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardPaymentConfig {
    /// Whether card payment is accepted
    pub enabled: bool,
    /// Expected charge in minor currency units (cents)
    pub price_minor_units: u64,
}

impl CardPaymentConfig {
    /// Card payment enabled at the given price in minor units
    pub fn enabled(price_minor_units: u64) -> Self {
        Self {
            enabled: true,
            price_minor_units,
        }
    }
}

/// Request matcher of a route rule: `"POST /mcp"`, `"/mcp"` or `"/api/*"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    /// HTTP method, or any method when `None`
    pub method: Option<String>,
    /// Path, without the trailing `/*` for wildcard patterns
    pub path: String,
    /// Whether the pattern matches every sub-path of `path`
    pub wildcard: bool,
}

impl FromStr for RoutePattern {
    type Err = X402Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (method, path) = match s.split_once(char::is_whitespace) {
            Some((method, path)) => (Some(method.trim().to_ascii_uppercase()), path.trim()),
            None => (None, s),
        };

        if !path.starts_with('/') {
            return Err(X402Error::config(format!(
                "Invalid route pattern '{}': path must start with '/'",
                s
            )));
        }

        let (path, wildcard) = match path.strip_suffix("/*") {
            Some(prefix) => (prefix, true),
            None => (path, false),
        };

        Ok(Self {
            method,
            path: path.trim_end_matches('/').to_string(),
            wildcard,
        })
    }
}

impl RoutePattern {
    /// Whether a request with this method and path matches
    pub fn matches(&self, method: &str, path: &str) -> bool {
        if let Some(expected) = &self.method {
            if !expected.eq_ignore_ascii_case(method) {
                return false;
            }
        }

        let path = path.trim_end_matches('/');
        if self.wildcard {
            path == self.path || path.starts_with(&format!("{}/", self.path))
        } else {
            path == self.path
        }
    }

    /// Ordering key: exact paths, then longer prefixes, then method-specific patterns
    fn specificity(&self) -> (bool, usize, bool) {
        (!self.wildcard, self.path.len(), self.method.is_some())
    }
}

/// Price and metadata for a set of routes
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRule {
    pub pattern: RoutePattern,
    /// Price in USD
    pub price: Decimal,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub max_timeout_seconds: u32,
}

impl RouteRule {
    /// Create a rule from a pattern string and a USD price
    pub fn new(pattern: &str, price: Decimal) -> Result<Self> {
        if price <= Decimal::ZERO {
            return Err(X402Error::config(format!(
                "Route '{}' must have a positive price",
                pattern
            )));
        }
        usdc_atomic_amount(price).map_err(|_| {
            X402Error::config(format!(
                "Route '{}' price {} is finer than one USDC micro-unit",
                pattern, price
            ))
        })?;

        Ok(Self {
            pattern: pattern.parse()?,
            price,
            description: None,
            mime_type: None,
            max_timeout_seconds: 60,
        })
    }

    /// Set the payment description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the MIME type
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the maximum timeout
    pub fn with_max_timeout_seconds(mut self, max_timeout_seconds: u32) -> Self {
        self.max_timeout_seconds = max_timeout_seconds;
        self
    }
}

/// Route-to-price rules for crypto payment
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, RouteRuleEntry>")]
pub struct RouteRules(Vec<RouteRule>);

impl RouteRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule
    pub fn with_rule(mut self, rule: RouteRule) -> Self {
        self.0.push(rule);
        self
    }

    /// Parse rules from the JSON map form `{"POST /mcp": {"price": "$0.01"}}`
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| X402Error::config(format!("Invalid route rules: {}", e)))
    }

    /// Find the most specific rule matching a request
    pub fn find(&self, method: &str, path: &str) -> Option<&RouteRule> {
        self.0
            .iter()
            .filter(|rule| rule.pattern.matches(method, path))
            .max_by_key(|rule| rule.pattern.specificity())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteRule> {
        self.0.iter()
    }
}

/// Wire form of a single route rule
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRuleEntry {
    price: PriceValue,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    max_timeout_seconds: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceValue {
    Text(String),
    Amount(Decimal),
}

impl TryFrom<BTreeMap<String, RouteRuleEntry>> for RouteRules {
    type Error = X402Error;

    fn try_from(entries: BTreeMap<String, RouteRuleEntry>) -> Result<Self> {
        let mut rules = RouteRules::new();
        for (pattern, entry) in entries {
            let price = match entry.price {
                PriceValue::Text(text) => parse_price(&text)?,
                PriceValue::Amount(amount) => amount,
            };

            let mut rule = RouteRule::new(&pattern, price)?;
            rule.description = entry.description;
            rule.mime_type = entry.mime_type;
            if let Some(timeout) = entry.max_timeout_seconds {
                rule.max_timeout_seconds = timeout;
            }
            rules = rules.with_rule(rule);
        }
        Ok(rules)
    }
}

/// Convert a USD price to USDC atomic units (6 decimals)
///
/// Fails when the price is not positive or has more than six decimal places,
/// so a priced route can never advertise an amount of zero.
pub fn usdc_atomic_amount(price: Decimal) -> Result<Decimal> {
    let amount = (price * Decimal::from(1_000_000u64)).normalize();
    if amount <= Decimal::ZERO || !amount.fract().is_zero() {
        return Err(X402Error::config(format!(
            "Price {} cannot be expressed in USDC atomic units",
            price
        )));
    }
    Ok(amount)
}

/// Parse a USD price such as `"$0.01"` or `"0.01"`
pub fn parse_price(text: &str) -> Result<Decimal> {
    let trimmed = text.trim();
    let amount = trimmed.strip_prefix('$').unwrap_or(trimmed);
    Decimal::from_str(amount.trim())
        .map_err(|e| X402Error::config(format!("Invalid price '{}': {}", text, e)))
}
