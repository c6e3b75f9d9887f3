//! # Engine Configuration
//!
//! Protocol parameters for one shard's engine. Loaded from defaults, JSON, or
//! `SHARD_*` environment variables, and validated before use.

use crate::domain::value_objects::{Address, ShardId, Value, U256};
use crate::errors::ConfigError;
use crate::ports::outbound::ConfigAccessor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;

/// Default gas budget cap per message.
pub const DEFAULT_MAX_GAS_PER_MESSAGE: u64 = 30_000_000;

/// Default gas cap for external message authentication.
pub const DEFAULT_EXTERNAL_VERIFICATION_GAS: u64 = 100_000;

/// Default cap on same-shard messages delivered within one block.
pub const DEFAULT_MAX_SAME_BLOCK_MESSAGES: usize = 10_000;

/// Default gas price when a block does not carry one.
pub const DEFAULT_GAS_PRICE_SCALE: u64 = 10;

/// Default currency minter.
#[must_use]
pub fn default_minter() -> Address {
    Address::from_shard(ShardId(1), [0xff; 18])
}

/// Configuration of one shard's execution engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Shard this engine executes.
    pub shard_id: ShardId,
    /// Total number of shards, main shard included.
    pub shard_count: u16,
    /// The coordinating shard.
    pub main_shard: ShardId,
    /// Upper bound of gas bought by one message.
    pub max_gas_per_message: u64,
    /// Gas available to external message authentication.
    pub external_verification_gas: u64,
    /// Deliver same-shard messages within the block that produced them.
    pub same_block_delivery: bool,
    /// Cap on same-shard messages delivered within one block.
    pub max_same_block_messages: usize,
    /// The only account allowed to mint currency.
    #[serde(with = "hex_address")]
    pub minter: Address,
    /// Reject outbound messages to the main shard.
    pub forbid_main_shard_messages: bool,
    /// Gas price used where a block leaves a shard's price at zero.
    pub gas_price_scale: Value,
    /// Validator accounts per shard.
    pub validators: BTreeMap<ShardId, Vec<Address>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shard_id: ShardId(1),
            shard_count: 4,
            main_shard: ShardId::MAIN,
            max_gas_per_message: DEFAULT_MAX_GAS_PER_MESSAGE,
            external_verification_gas: DEFAULT_EXTERNAL_VERIFICATION_GAS,
            same_block_delivery: true,
            max_same_block_messages: DEFAULT_MAX_SAME_BLOCK_MESSAGES,
            minter: default_minter(),
            forbid_main_shard_messages: true,
            gas_price_scale: U256::from(DEFAULT_GAS_PRICE_SCALE),
            validators: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Default configuration for `shard`.
    #[must_use]
    pub fn for_shard(shard: ShardId) -> Self {
        Self {
            shard_id: shard,
            ..Self::default()
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SHARD_ID` (default: 1)
    /// - `SHARD_COUNT` (default: 4)
    /// - `SHARD_MAIN_SHARD` (default: 0)
    /// - `SHARD_MAX_GAS_PER_MESSAGE` (default: 30000000)
    /// - `SHARD_EXTERNAL_VERIFICATION_GAS` (default: 100000)
    /// - `SHARD_SAME_BLOCK_DELIVERY` (default: true)
    /// - `SHARD_MAX_SAME_BLOCK_MESSAGES` (default: 10000)
    /// - `SHARD_MINTER`: hex address
    /// - `SHARD_FORBID_MAIN_SHARD_MESSAGES` (default: true)
    /// - `SHARD_GAS_PRICE_SCALE` (default: 10)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable cannot be parsed or the result
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            shard_id: ShardId(env_parse("SHARD_ID", defaults.shard_id.0)?),
            shard_count: env_parse("SHARD_COUNT", defaults.shard_count)?,
            main_shard: ShardId(env_parse("SHARD_MAIN_SHARD", defaults.main_shard.0)?),
            max_gas_per_message: env_parse(
                "SHARD_MAX_GAS_PER_MESSAGE",
                defaults.max_gas_per_message,
            )?,
            external_verification_gas: env_parse(
                "SHARD_EXTERNAL_VERIFICATION_GAS",
                defaults.external_verification_gas,
            )?,
            same_block_delivery: env_flag("SHARD_SAME_BLOCK_DELIVERY", defaults.same_block_delivery),
            max_same_block_messages: env_parse(
                "SHARD_MAX_SAME_BLOCK_MESSAGES",
                defaults.max_same_block_messages,
            )?,
            minter: match env::var("SHARD_MINTER") {
                Ok(raw) => parse_address(&raw).ok_or(ConfigError::Env {
                    name: "SHARD_MINTER",
                    value: raw,
                })?,
                Err(_) => defaults.minter,
            },
            forbid_main_shard_messages: env_flag(
                "SHARD_FORBID_MAIN_SHARD_MESSAGES",
                defaults.forbid_main_shard_messages,
            ),
            gas_price_scale: U256::from(env_parse(
                "SHARD_GAS_PRICE_SCALE",
                defaults.gas_price_scale.low_u64(),
            )?),
            validators: defaults.validators,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or a validation error.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_count == 0 {
            return Err(invalid("shard_count", "must be at least 1"));
        }
        if self.shard_id.0 >= self.shard_count {
            return Err(invalid(
                "shard_id",
                format!("{} outside 0..{}", self.shard_id.0, self.shard_count),
            ));
        }
        if self.main_shard.0 >= self.shard_count {
            return Err(invalid(
                "main_shard",
                format!("{} outside 0..{}", self.main_shard.0, self.shard_count),
            ));
        }
        if self.max_gas_per_message == 0 {
            return Err(invalid("max_gas_per_message", "must be positive"));
        }
        if self.external_verification_gas > self.max_gas_per_message {
            return Err(invalid(
                "external_verification_gas",
                "exceeds max_gas_per_message",
            ));
        }
        if self.same_block_delivery && self.max_same_block_messages == 0 {
            return Err(invalid(
                "max_same_block_messages",
                "must be positive when same_block_delivery is on",
            ));
        }
        if self.gas_price_scale.is_zero() {
            return Err(invalid("gas_price_scale", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn env_parse<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Env { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(default)
}

/// Parses a `0x`-prefixed (or bare) 40-digit hex address.
#[must_use]
pub fn parse_address(raw: &str) -> Option<Address> {
    let digits = raw.trim().trim_start_matches("0x");
    let bytes = hex::decode(digits).ok()?;
    Address::from_slice(&bytes)
}

mod hex_address {
    use super::parse_address;
    use crate::domain::value_objects::Address;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(address.as_bytes())))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_address(&raw).ok_or_else(|| D::Error::custom(format!("invalid address: {raw}")))
    }
}

// =============================================================================
// CONFIG ACCESSOR
// =============================================================================

/// [`ConfigAccessor`] backed by a fixed [`EngineConfig`].
#[derive(Clone, Debug)]
pub struct StaticConfig {
    config: EngineConfig,
}

impl StaticConfig {
    /// Wraps a validated configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The wrapped configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl ConfigAccessor for StaticConfig {
    fn main_shard(&self) -> ShardId {
        self.config.main_shard
    }

    fn shard_count(&self) -> u16 {
        self.config.shard_count
    }

    fn minter(&self) -> Address {
        self.config.minter
    }

    fn gas_price_scale(&self) -> Value {
        self.config.gas_price_scale
    }

    fn forbids_main_shard_messages(&self) -> bool {
        self.config.forbid_main_shard_messages
    }

    fn validators(&self, shard: ShardId) -> Vec<Address> {
        self.config.validators.get(&shard).cloned().unwrap_or_default()
    }
}
