//! Centralized configuration (environment variables + defaults).
//!
//! `.env` is honoured through `dotenv`. Every variable except the mnemonic
//! has a default; malformed values are reported as [`Error::Config`].

use crate::crypto::identity::{IdentityConfig, DEFAULT_DERIVATION_PATH};
use crate::domain::exchange::{DEFAULT_BOOTSTRAP_DEPOSIT, DEFAULT_DEPOSIT_TTL};
use crate::domain::model::PaymentEnvironment;
use crate::domain::publish::{DEFAULT_PUBLISH_ENDPOINT, DEFAULT_PUBLISH_QUOTA};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

pub const MNEMONIC: &str = "PKV_MNEMONIC";
pub const MNEMONIC_FILE: &str = "PKV_MNEMONIC_FILE";
pub const PAYMENT_ENVIRONMENT: &str = "PKV_PAYMENT_ENVIRONMENT";
pub const LEDGER_RPC_URL: &str = "PKV_LEDGER_RPC_URL";
pub const DERIVATION_PATH: &str = "PKV_DERIVATION_PATH";
pub const ARGON2_SALT: &str = "PKV_ARGON2_SALT";
pub const HKDF_SALT: &str = "PKV_HKDF_SALT";
pub const BOOTSTRAP_DEPOSIT: &str = "PKV_BOOTSTRAP_DEPOSIT";
pub const DEPOSIT_TTL_SECS: &str = "PKV_DEPOSIT_TTL_SECS";
pub const PUBLISH_ENDPOINT: &str = "PKV_PUBLISH_ENDPOINT";
pub const PUBLISH_QUOTA: &str = "PKV_PUBLISH_QUOTA";
pub const ROUTING_URL: &str = "PKV_ROUTING_URL";
pub const REQUEST_TIMEOUT_SECS: &str = "PKV_REQUEST_TIMEOUT_SECS";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a [`crate::Broker`] needs besides its collaborators.
#[derive(Clone)]
pub struct BrokerConfig {
    pub mnemonic: Zeroizing<String>,
    pub environment: PaymentEnvironment,
    pub ledger_rpc_url: String,
    pub identity: IdentityConfig,
    pub bootstrap_deposit: u64,
    pub deposit_ttl: Duration,
    pub publish_endpoint: String,
    pub publish_quota: u128,
    /// Delegated routing base URL. Without one the broker needs an injected router.
    pub routing_url: Option<String>,
    pub request_timeout: Duration,
}

impl BrokerConfig {
    /// Defaults everywhere, for callers that wire configuration themselves.
    pub fn with_mnemonic(mnemonic: impl Into<String>) -> Self {
        let environment = PaymentEnvironment::default();
        Self {
            mnemonic: Zeroizing::new(mnemonic.into()),
            environment,
            ledger_rpc_url: environment.default_rpc_url().to_string(),
            identity: IdentityConfig::default(),
            bootstrap_deposit: DEFAULT_BOOTSTRAP_DEPOSIT,
            deposit_ttl: DEFAULT_DEPOSIT_TTL,
            publish_endpoint: DEFAULT_PUBLISH_ENDPOINT.to_string(),
            publish_quota: DEFAULT_PUBLISH_QUOTA,
            routing_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Reads the process environment after loading `.env`, if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mnemonic = match (get(MNEMONIC), get(MNEMONIC_FILE)) {
            (Some(phrase), _) => phrase,
            (None, Some(path)) => {
                let expanded = shellexpand::tilde(&path).to_string();
                std::fs::read_to_string(&expanded)
                    .map_err(|e| Error::Config(format!("cannot read {MNEMONIC_FILE} {expanded}: {e}")))?
            }
            (None, None) => {
                return Err(Error::Config(format!(
                    "{MNEMONIC} or {MNEMONIC_FILE} must be set"
                )))
            }
        };

        let mut config = Self::with_mnemonic(mnemonic);

        if let Some(raw) = get(PAYMENT_ENVIRONMENT) {
            config.environment = PaymentEnvironment::from_str(&raw)
                .map_err(|e| Error::Config(format!("{PAYMENT_ENVIRONMENT}: {e}")))?;
        }
        config.ledger_rpc_url = get(LEDGER_RPC_URL)
            .unwrap_or_else(|| config.environment.default_rpc_url().to_string());

        config.identity.derivation_path =
            get(DERIVATION_PATH).unwrap_or_else(|| DEFAULT_DERIVATION_PATH.to_string());
        if let Some(raw) = get(ARGON2_SALT) {
            config.identity.argon2_salt = parse_salt(ARGON2_SALT, &raw)?;
        }
        if let Some(raw) = get(HKDF_SALT) {
            config.identity.hkdf_salt = parse_salt(HKDF_SALT, &raw)?;
        }

        if let Some(raw) = get(BOOTSTRAP_DEPOSIT) {
            config.bootstrap_deposit = parse_number(BOOTSTRAP_DEPOSIT, &raw)?;
        }
        if let Some(raw) = get(DEPOSIT_TTL_SECS) {
            config.deposit_ttl = Duration::from_secs(parse_number(DEPOSIT_TTL_SECS, &raw)?);
        }
        if let Some(raw) = get(PUBLISH_ENDPOINT) {
            config.publish_endpoint = raw;
        }
        if let Some(raw) = get(PUBLISH_QUOTA) {
            config.publish_quota = parse_number(PUBLISH_QUOTA, &raw)?;
        }
        config.routing_url = get(ROUTING_URL);
        if let Some(raw) = get(REQUEST_TIMEOUT_SECS) {
            let secs: u64 = parse_number(REQUEST_TIMEOUT_SECS, &raw)?;
            config.request_timeout = Duration::from_secs(secs.max(1));
        }

        Ok(config)
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("mnemonic", &"<redacted>")
            .field("environment", &self.environment)
            .field("ledger_rpc_url", &self.ledger_rpc_url)
            .field("identity", &self.identity)
            .field("bootstrap_deposit", &self.bootstrap_deposit)
            .field("deposit_ttl", &self.deposit_ttl)
            .field("publish_endpoint", &self.publish_endpoint)
            .field("publish_quota", &self.publish_quota)
            .field("routing_url", &self.routing_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn parse_salt(key: &str, raw: &str) -> Result<Vec<u8>> {
    let salt = hex::decode(raw.trim_start_matches("0x"))
        .map_err(|e| Error::Config(format!("{key} must be hex: {e}")))?;
    // argon2 rejects salts shorter than 8 bytes
    if salt.len() < 8 {
        return Err(Error::Config(format!("{key} must be at least 8 bytes")));
    }
    Ok(salt)
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    raw.replace('_', "")
        .parse::<T>()
        .map_err(|e| Error::Config(format!("{key} must be a valid number: {e}")))
}
