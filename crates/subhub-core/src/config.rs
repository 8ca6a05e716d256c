use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::DEFAULT_TOKEN_DECIMALS;
use crate::model::{Address, AddressError};

const DEFAULT_CHAIN_ID: u64 = 11_155_111;
const DEFAULT_TOKEN_SYMBOL: &str = "SUB";
const DEFAULT_PLAN_SCAN_FROM_BLOCK: u64 = 0;
const DEFAULT_PLAN_SCAN_WINDOW: u64 = 50_000;
const DEFAULT_STORAGE_PREFIX: &str = "subhub";

pub const ENV_CHAIN_ID: &str = "SUBHUB_CHAIN_ID";
pub const ENV_TOKEN_ADDRESS: &str = "SUBHUB_TOKEN_ADDRESS";
pub const ENV_LEDGER_ADDRESS: &str = "SUBHUB_LEDGER_ADDRESS";
pub const ENV_TOKEN_SYMBOL: &str = "SUBHUB_TOKEN_SYMBOL";
pub const ENV_TOKEN_DECIMALS: &str = "SUBHUB_TOKEN_DECIMALS";
pub const ENV_PLAN_SCAN_FROM_BLOCK: &str = "SUBHUB_PLAN_SCAN_FROM_BLOCK";
pub const ENV_PLAN_SCAN_WINDOW: &str = "SUBHUB_PLAN_SCAN_WINDOW";
pub const ENV_STORAGE_PREFIX: &str = "SUBHUB_STORAGE_PREFIX";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {source}")]
    InvalidAddress {
        field: &'static str,
        #[source]
        source: AddressError,
    },
    #[error("invalid {field}: expected an unsigned integer, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{0} must be set to a deployed contract address")]
    MissingAddress(&'static str),
    #[error("token decimals must be at most 36")]
    InvalidDecimals,
    #[error("plan scan window must be greater than zero")]
    InvalidScanWindow,
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubHubConfig {
    pub chain_id: u64,
    pub token_address: Address,
    pub ledger_address: Address,
    pub token_symbol: String,
    pub token_decimals: u8,
    /// First block scanned for plan-created events (the ledger deployment block).
    pub plan_scan_from_block: u64,
    /// Block span per event query; public RPCs cap log ranges.
    pub plan_scan_window: u64,
    pub storage_prefix: String,
}

impl Default for SubHubConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            token_address: Address::zero(),
            ledger_address: Address::zero(),
            token_symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            token_decimals: DEFAULT_TOKEN_DECIMALS,
            plan_scan_from_block: DEFAULT_PLAN_SCAN_FROM_BLOCK,
            plan_scan_window: DEFAULT_PLAN_SCAN_WINDOW,
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
        }
    }
}

impl SubHubConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let chain_id = env_u64(ENV_CHAIN_ID)?.unwrap_or(defaults.chain_id);
        let token_address =
            env_address(ENV_TOKEN_ADDRESS, "token address")?.unwrap_or(defaults.token_address);
        let ledger_address =
            env_address(ENV_LEDGER_ADDRESS, "ledger address")?.unwrap_or(defaults.ledger_address);
        let token_symbol = env_non_empty(ENV_TOKEN_SYMBOL).unwrap_or(defaults.token_symbol);
        let token_decimals = match env_u64(ENV_TOKEN_DECIMALS)? {
            Some(value) => u8::try_from(value).map_err(|_| ConfigError::InvalidDecimals)?,
            None => defaults.token_decimals,
        };
        let plan_scan_from_block =
            env_u64(ENV_PLAN_SCAN_FROM_BLOCK)?.unwrap_or(defaults.plan_scan_from_block);
        let plan_scan_window = env_u64(ENV_PLAN_SCAN_WINDOW)?.unwrap_or(defaults.plan_scan_window);
        let storage_prefix = env_non_empty(ENV_STORAGE_PREFIX).unwrap_or(defaults.storage_prefix);

        let config = Self {
            chain_id,
            token_address,
            ledger_address,
            token_symbol,
            token_decimals,
            plan_scan_from_block,
            plan_scan_window,
            storage_prefix,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses the JSON block the page embeds for the browser build.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_address.is_zero() {
            return Err(ConfigError::MissingAddress(ENV_TOKEN_ADDRESS));
        }
        if self.ledger_address.is_zero() {
            return Err(ConfigError::MissingAddress(ENV_LEDGER_ADDRESS));
        }
        if self.token_decimals > 36 {
            return Err(ConfigError::InvalidDecimals);
        }
        if self.plan_scan_window == 0 {
            return Err(ConfigError::InvalidScanWindow);
        }
        Ok(())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u64(key: &'static str) -> Result<Option<u64>, ConfigError> {
    env_non_empty(key)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber { field: key, value })
        })
        .transpose()
}

fn env_address(key: &str, field: &'static str) -> Result<Option<Address>, ConfigError> {
    env_non_empty(key)
        .map(|value| {
            Address::parse(&value).map_err(|source| ConfigError::InvalidAddress { field, source })
        })
        .transpose()
}
