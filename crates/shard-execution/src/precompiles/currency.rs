//! # Currency Precompiles
//!
//! Multi-currency balances and block pricing queries.
//!
//! | Address | Name | Arguments | Gas |
//! |---------|------|-----------|-----|
//! | `0xd0` | mint | `(address currency, uint256 amount)` | 1000 |
//! | `0xd1` | balance | `(address owner, address currency)` | 100 |
//! | `0xd2` | send tokens | `(address to, (address,uint256)[] tokens)` | 1000 |
//! | `0xd3` | message tokens | none | 100 |
//! | `0xd4` | gas price | `(uint256 shard)` | 100 |

use super::{PrecompileEnv, PrecompiledContract};
use crate::abi::{self, AbiDecoder, Token};
use crate::domain::services::bool_word;
use crate::domain::value_objects::{Bytes, CurrencyId, ShardId, U256};
use crate::errors::PrecompileError;
use tracing::{debug, warn};

const MINT_GAS: u64 = 1_000;
const SEND_TOKENS_GAS: u64 = 1_000;
const QUERY_GAS: u64 = 100;

fn zero_word() -> Bytes {
    Bytes::from_slice(&[0u8; 32])
}

// =============================================================================
// 0xd0 MINT
// =============================================================================

/// Credits newly issued currency to the caller. Only the minter may call it;
/// anyone else gets a zero result and no state change.
pub struct MintCurrency;

impl PrecompiledContract for MintCurrency {
    fn name(&self) -> &'static str {
        "mint_currency"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        MINT_GAS
    }

    fn run(&self, env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let decoder = AbiDecoder::new(input);
        let (currency, amount) = match decoder.address(0).and_then(|c| Ok((c, decoder.uint(1)?))) {
            Ok(args) => args,
            Err(err) => {
                warn!(precompile = self.name(), error = %err, "malformed arguments");
                return Ok(zero_word());
            }
        };
        if env.caller != env.config.minter() {
            debug!(caller = ?env.caller, "mint from non-minter ignored");
            return Ok(zero_word());
        }

        let currency = CurrencyId(currency);
        let held = env.state.currency(env.caller, currency)?;
        if held.checked_add(amount).is_none() {
            return Err(PrecompileError::InvalidInput("mint overflows balance".into()));
        }
        env.state.add_currency(env.caller, currency, amount)?;
        Ok(Bytes::from_slice(&bool_word(true)))
    }
}

// =============================================================================
// 0xd1 BALANCE
// =============================================================================

/// Currency balance of any local account.
pub struct CurrencyBalanceOf;

impl PrecompiledContract for CurrencyBalanceOf {
    fn name(&self) -> &'static str {
        "currency_balance"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        QUERY_GAS
    }

    fn run(&self, env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let decoder = AbiDecoder::new(input);
        let (owner, currency) = match decoder.address(0).and_then(|o| Ok((o, decoder.address(1)?))) {
            Ok(args) => args,
            Err(err) => {
                warn!(precompile = self.name(), error = %err, "malformed arguments");
                return Ok(zero_word());
            }
        };
        let balance = env.state.currency(owner, CurrencyId(currency))?;
        Ok(Bytes::from(abi::encode_uint(balance)))
    }
}

// =============================================================================
// 0xd2 SEND TOKENS
// =============================================================================

/// Synchronous currency transfer to an account on the same shard.
pub struct SendTokens;

impl PrecompiledContract for SendTokens {
    fn name(&self) -> &'static str {
        "send_tokens"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        SEND_TOKENS_GAS
    }

    fn run(&self, env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let decoder = AbiDecoder::new(input);
        let to = decoder
            .address(0)
            .map_err(|e| PrecompileError::InvalidInput(e.to_string()))?;
        let tokens = decoder
            .currency_list(1)
            .map_err(|e| PrecompileError::InvalidInput(e.to_string()))?;
        if to.shard_id() != env.block.shard_id {
            return Err(PrecompileError::CrossShardMessage(to));
        }

        for token in &tokens {
            if !env.state.sub_currency(env.caller, token.currency, token.balance)? {
                return Err(PrecompileError::InsufficientCurrency {
                    currency: token.currency.0,
                    required: token.balance,
                });
            }
            env.state.add_currency(to, token.currency, token.balance)?;
        }
        Ok(Bytes::from_slice(&bool_word(true)))
    }
}

// =============================================================================
// 0xd3 MESSAGE TOKENS
// =============================================================================

/// Currencies attached to the executing message.
pub struct MessageTokens;

impl PrecompiledContract for MessageTokens {
    fn name(&self) -> &'static str {
        "message_tokens"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        QUERY_GAS
    }

    fn run(&self, env: &mut PrecompileEnv<'_>, _input: &[u8]) -> Result<Bytes, PrecompileError> {
        Ok(Bytes::from(abi::encode(&[Token::CurrencyList(
            env.message.currencies.clone(),
        )])))
    }
}

// =============================================================================
// 0xd4 GAS PRICE
// =============================================================================

/// Gas price of a shard as seen by the current block.
pub struct GasPrice;

impl PrecompiledContract for GasPrice {
    fn name(&self) -> &'static str {
        "gas_price"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        QUERY_GAS
    }

    fn run(&self, env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let shard = match AbiDecoder::new(input).uint(0) {
            Ok(shard) if shard <= U256::from(u16::MAX) => ShardId(shard.low_u32() as u16),
            Ok(shard) => {
                warn!(precompile = self.name(), %shard, "shard out of range");
                return Ok(zero_word());
            }
            Err(err) => {
                warn!(precompile = self.name(), error = %err, "malformed arguments");
                return Ok(zero_word());
            }
        };
        let price = env.block.gas_price_or(shard, env.config.gas_price_scale());
        Ok(Bytes::from(abi::encode_uint(price)))
    }
}
