// Application configuration loaded from environment variables

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CURRENCY: &str = "BDT";
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_COUPON_RESERVATION_MINUTES: i64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Settings the checkout needs to price an order
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub default_shipping_cost: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            default_shipping_cost: Decimal::ZERO,
            currency: DEFAULT_CURRENCY.to_string(),
            exchange_rate: Decimal::ONE,
        }
    }
}

/// Hosted (redirect-based) payment gateway credentials
#[derive(Debug, Clone)]
pub struct HostedGatewayConfig {
    pub init_url: String,
    /// Endpoint that vouches for success callbacks
    pub validation_url: String,
    pub store_id: String,
    pub store_password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub public_base_url: String,
    pub checkout: CheckoutSettings,
    pub gateway_timeout: Duration,
    pub coupon_reservation_ttl: chrono::Duration,
    /// None when HOSTED_GATEWAY_INIT_URL is unset; only offline gateways are registered then
    pub hosted_gateway: Option<HostedGatewayConfig>,
}

impl AppConfig {
    /// Build the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = optional("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or("PORT", DEFAULT_PORT)?;

        let hosted_gateway = match optional("HOSTED_GATEWAY_INIT_URL") {
            Some(init_url) => Some(HostedGatewayConfig {
                init_url,
                validation_url: required("HOSTED_GATEWAY_VALIDATION_URL")?,
                store_id: required("HOSTED_GATEWAY_STORE_ID")?,
                store_password: required("HOSTED_GATEWAY_STORE_PASSWORD")?,
            }),
            None => None,
        };

        let reservation_minutes =
            parse_or("COUPON_RESERVATION_MINUTES", DEFAULT_COUPON_RESERVATION_MINUTES)?;
        if reservation_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "COUPON_RESERVATION_MINUTES",
                value: reservation_minutes.to_string(),
            });
        }

        let checkout = CheckoutSettings {
            default_shipping_cost: parse_or("DEFAULT_SHIPPING_COST", Decimal::ZERO)?,
            currency: optional("CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            exchange_rate: parse_or("EXCHANGE_RATE", Decimal::ONE)?,
        };
        if checkout.default_shipping_cost < Decimal::ZERO {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_SHIPPING_COST",
                value: checkout.default_shipping_cost.to_string(),
            });
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            public_base_url: optional("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            host,
            port,
            jwt_secret: required("JWT_SECRET")?,
            checkout,
            gateway_timeout: Duration::from_secs(parse_or(
                "GATEWAY_TIMEOUT_SECS",
                DEFAULT_GATEWAY_TIMEOUT_SECS,
            )?),
            coupon_reservation_ttl: chrono::Duration::minutes(reservation_minutes),
            hosted_gateway,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_uses_default_when_unset() {
        let value: u16 = parse_or("STOREFRONT_TEST_UNSET_KEY", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_missing_error_message() {
        let err = ConfigError::Missing("DATABASE_URL");
        assert_eq!(err.to_string(), "DATABASE_URL must be set in environment");
    }

    #[test]
    fn test_default_checkout_settings() {
        let settings = CheckoutSettings::default();
        assert_eq!(settings.default_shipping_cost, Decimal::ZERO);
        assert_eq!(settings.exchange_rate, Decimal::ONE);
        assert_eq!(settings.currency, "BDT");
    }
}
