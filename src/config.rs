use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::billing::CompanyInfo;
use crate::domain::pricing::PricingPolicy;
use crate::domain::value_objects::Money;

const DEFAULT_PORT: u16 = 8083;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEV_JWT_SECRET: &str = "development-only-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required in {1}")]
    Missing(&'static str, Environment),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub nats_url: Option<String>,
    pub nats_subject_prefix: String,
    pub pricing: PricingPolicy,
    pub company: CompanyInfo,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &self.database_url.as_ref().map(|_| "[redacted]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("jwt_secret", &"[redacted]")
            .field("nats_url", &self.nats_url)
            .field("nats_subject_prefix", &self.nats_subject_prefix)
            .field("pricing", &self.pricing)
            .field("company", &self.company.name)
            .finish()
    }
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let env = match get("APP_ENV").as_deref() {
            None | Some("development") | Some("dev") => Environment::Development,
            Some("test") => Environment::Test,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => return Err(ConfigError::Invalid { key: "APP_ENV", value: other.to_string() }),
        };

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse(&get, "PORT", DEFAULT_PORT)?;
        let bind_addr = format!("{host}:{port}").parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid { key: "HOST", value: host.clone() })?;

        let database_url = get("DATABASE_URL");
        if database_url.is_none() && env == Environment::Production {
            return Err(ConfigError::Missing("DATABASE_URL", env));
        }

        let jwt_secret = match (get("JWT_SECRET"), env) {
            (Some(secret), _) => secret,
            (None, Environment::Development) => DEV_JWT_SECRET.to_string(),
            (None, env) => return Err(ConfigError::Missing("JWT_SECRET", env)),
        };

        let defaults = PricingPolicy::default();
        let pricing = PricingPolicy {
            free_shipping_threshold: Money::new(parse(&get, "SHOP_FREE_SHIPPING_THRESHOLD", defaults.free_shipping_threshold.amount())?),
            flat_shipping_fee: Money::new(parse(&get, "SHOP_FLAT_SHIPPING_FEE", defaults.flat_shipping_fee.amount())?),
            tax_rate: parse::<Decimal>(&get, "SHOP_TAX_RATE", defaults.tax_rate)?,
        };

        Ok(Self {
            env,
            bind_addr,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            database_url,
            db_max_connections: parse(&get, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            jwt_secret,
            nats_url: get("NATS_URL"),
            nats_subject_prefix: get("NATS_SUBJECT_PREFIX").unwrap_or_else(|| "shop".to_string()),
            pricing,
            company: CompanyInfo {
                name: get("COMPANY_NAME").unwrap_or_else(|| "Shopfront".to_string()),
                address: get("COMPANY_ADDRESS").unwrap_or_default(),
                email: get("COMPANY_EMAIL").unwrap_or_default(),
                phone: get("COMPANY_PHONE").unwrap_or_default(),
            },
        })
    }
}

fn parse<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
