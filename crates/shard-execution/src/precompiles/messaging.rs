//! # Messaging Precompiles
//!
//! Outbound message construction and message-level queries:
//!
//! | Address | Name | Gas | Malformed arguments |
//! |---------|------|-----|---------------------|
//! | `0xfc` | send raw message | 10000 | revert |
//! | `0xfd` | async call | 10000 + 8/byte | warn, zero result |
//! | `0xd5` | send request | 10000 + 8/byte | warn, zero result |
//! | `0xfe` | verify signature | 5000 | warn, zero result |
//! | `0xff` | is internal | 10 | n/a |
//!
//! Queued calls are debited from the caller immediately: the attached value
//! and currencies always, the fee credit only for raw messages. Async call
//! credits are settled from the budget when the enclosing message finishes.

use super::{PrecompileEnv, PrecompiledContract};
use crate::abi::AbiDecoder;
use crate::codec;
use crate::domain::entities::{AsyncContext, ForwardKind, OutMessage};
use crate::domain::message::{Message, MessageFlags};
use crate::domain::services::bool_word;
use crate::domain::value_objects::{Address, Bytes, CurrencyBalance, Value, U256};
use crate::errors::{AbiError, PrecompileError};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use tracing::{debug, warn};

/// Base cost of queuing an outbound message.
const SEND_MESSAGE_GAS: u64 = 10_000;
/// Cost per byte of async call arguments.
const ASYNC_CALL_BYTE_GAS: u64 = 8;
/// Cost of signature verification.
const VERIFY_SIGNATURE_GAS: u64 = 5_000;
/// Cost of the is-internal query.
const IS_INTERNAL_GAS: u64 = 10;

// =============================================================================
// SHARED: QUEUE AN OUTBOUND CALL
// =============================================================================

/// Decoded arguments of an outbound call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OutboundCall {
    pub is_deploy: bool,
    pub forward_kind: ForwardKind,
    pub dst: Address,
    pub refund_to: Address,
    pub bounce_to: Address,
    pub fee_credit: Value,
    pub tokens: Vec<CurrencyBalance>,
    pub data: Bytes,
    /// Fee credit is paid from the caller's balance at call time.
    pub prepaid: bool,
}

impl OutboundCall {
    /// `(bool, uint8, address, address, address, uint256, (address,uint256)[], bytes)`
    fn decode(decoder: &AbiDecoder<'_>) -> Result<Self, AbiError> {
        Ok(Self {
            is_deploy: decoder.bool(0)?,
            forward_kind: ForwardKind::from_u8(decoder.uint8(1)?)
                .ok_or(AbiError::OutOfRange("forwardKind"))?,
            dst: decoder.address(2)?,
            refund_to: decoder.address(3)?,
            bounce_to: decoder.address(4)?,
            fee_credit: decoder.uint(5)?,
            tokens: decoder.currency_list(6)?,
            data: decoder.bytes(7)?,
            prepaid: false,
        })
    }
}

/// Debits the caller and queues the call. Returns the queued message.
pub(crate) fn queue_call(
    env: &mut PrecompileEnv<'_>,
    call: OutboundCall,
    value: Value,
    request_context: Option<Bytes>,
) -> Result<Message, PrecompileError> {
    let dst_shard = call.dst.shard_id();
    if env.config.forbids_main_shard_messages() && dst_shard == env.config.main_shard() {
        return Err(PrecompileError::MessageToMainShard);
    }
    if !env.config.is_valid_shard(dst_shard) {
        return Err(PrecompileError::InvalidInput(format!(
            "unknown destination {dst_shard}"
        )));
    }

    let caller = env.caller;
    let prepaid = if call.prepaid { call.fee_credit } else { Value::zero() };
    let debit = value
        .checked_add(prepaid)
        .ok_or_else(|| PrecompileError::InvalidInput("value overflow".into()))?;
    if !env.state.sub_balance(caller, debit)? {
        return Err(PrecompileError::InsufficientBalance {
            required: debit,
            available: env.state.balance(caller)?,
        });
    }
    for token in &call.tokens {
        if !env.state.sub_currency(caller, token.currency, token.balance)? {
            return Err(PrecompileError::InsufficientCurrency {
                currency: token.currency.0,
                required: token.balance,
            });
        }
    }

    let seqno = env.state.seqno(caller)?;
    let next_seqno = env.state.increment_seqno(caller)?;

    let mut flags = MessageFlags::INTERNAL;
    if call.is_deploy {
        flags = flags | MessageFlags::DEPLOY;
    }
    let mut message = Message::internal(caller, call.dst)
        .with_flags(flags)
        .with_value(value)
        .with_fee_credit(prepaid)
        .with_currencies(call.tokens)
        .with_seqno(seqno)
        .with_refund_to(call.refund_to)
        .with_bounce_to(call.bounce_to)
        .with_data(call.data);

    if let Some(context) = request_context {
        message = message
            .with_flags(MessageFlags::REQUEST)
            .with_request_id(next_seqno);
        env.state.insert_async_context(
            caller,
            AsyncContext {
                request_id: next_seqno,
                context,
            },
        )?;
    }

    let requested = match call.forward_kind {
        ForwardKind::Remaining => Value::zero(),
        _ => call.fee_credit,
    };
    debug!(
        from = ?caller,
        to = ?call.dst,
        kind = ?call.forward_kind,
        %requested,
        "queued outbound message"
    );
    let queued = if call.prepaid {
        OutMessage::prepaid(message.clone())
    } else {
        OutMessage::new(message.clone(), call.forward_kind, requested)
    };
    env.state.queue_out_message(queued);
    Ok(message)
}

fn zero_word() -> Bytes {
    Bytes::from_slice(&[0u8; 32])
}

fn true_word() -> Bytes {
    Bytes::from_slice(&bool_word(true))
}

fn async_call_gas(input: &[u8]) -> u64 {
    SEND_MESSAGE_GAS.saturating_add(ASYNC_CALL_BYTE_GAS.saturating_mul(input.len() as u64))
}

// =============================================================================
// 0xfc SEND RAW MESSAGE
// =============================================================================

/// Queues a wire-encoded message. Fee credit is paid from the caller.
pub struct SendRawMessage;

impl PrecompiledContract for SendRawMessage {
    fn name(&self) -> &'static str {
        "send_raw_message"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        SEND_MESSAGE_GAS
    }

    fn run(&self, env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let raw: Message = codec::decode(input)
            .map_err(|e| PrecompileError::InvalidInput(format!("raw message: {e}")))?;
        let call = OutboundCall {
            is_deploy: raw.is_deploy(),
            forward_kind: ForwardKind::None,
            dst: raw.to,
            refund_to: raw.refund_to,
            bounce_to: raw.bounce_to,
            fee_credit: raw.fee_credit,
            tokens: raw.currencies,
            data: raw.data,
            prepaid: true,
        };
        queue_call(env, call, raw.value, None)?;
        Ok(true_word())
    }
}

// =============================================================================
// 0xfd ASYNC CALL
// =============================================================================

/// Queues an async call funded according to its forward kind.
pub struct AsyncCall;

impl PrecompiledContract for AsyncCall {
    fn name(&self) -> &'static str {
        "async_call"
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        async_call_gas(input)
    }

    fn accepts_value(&self) -> bool {
        true
    }

    fn run(&self, env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let call = match OutboundCall::decode(&AbiDecoder::new(input)) {
            Ok(call) => call,
            Err(err) => {
                warn!(precompile = self.name(), error = %err, "malformed arguments");
                return Ok(zero_word());
            }
        };
        let value = env.value;
        queue_call(env, call, value, None)?;
        Ok(true_word())
    }
}

// =============================================================================
// 0xd5 SEND REQUEST
// =============================================================================

/// Async call that expects a response and records a continuation.
///
/// Arguments are those of [`AsyncCall`] followed by `bytes context`.
pub struct SendRequest;

impl PrecompiledContract for SendRequest {
    fn name(&self) -> &'static str {
        "send_request"
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        async_call_gas(input)
    }

    fn accepts_value(&self) -> bool {
        true
    }

    fn run(&self, env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let decoder = AbiDecoder::new(input);
        let decoded = OutboundCall::decode(&decoder).and_then(|call| Ok((call, decoder.bytes(8)?)));
        let (call, context) = match decoded {
            Ok(parts) => parts,
            Err(err) => {
                warn!(precompile = self.name(), error = %err, "malformed arguments");
                return Ok(zero_word());
            }
        };
        let value = env.value;
        let message = queue_call(env, call, value, Some(context))?;
        Ok(Bytes::from(crate::abi::encode_uint(U256::from(message.request_id))))
    }
}

// =============================================================================
// 0xfe VERIFY SIGNATURE
// =============================================================================

/// secp256k1 signature check over a 32-byte hash.
///
/// Arguments: `(bytes pubkey, uint256 hash, bytes signature)`.
pub struct VerifySignature;

impl PrecompiledContract for VerifySignature {
    fn name(&self) -> &'static str {
        "verify_signature"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        VERIFY_SIGNATURE_GAS
    }

    fn run(&self, _env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let (pubkey, hash, signature) = match signature_args(&AbiDecoder::new(input)) {
            Ok(args) => args,
            Err(err) => {
                warn!(precompile = self.name(), error = %err, "malformed arguments");
                return Ok(zero_word());
            }
        };

        let mut digest = [0u8; 32];
        hash.to_big_endian(&mut digest);
        Ok(Bytes::from_slice(&bool_word(verify(
            pubkey.as_slice(),
            &digest,
            signature.as_slice(),
        ))))
    }
}

/// `(bytes pubkey, uint256 hash, bytes signature)`
fn signature_args(decoder: &AbiDecoder<'_>) -> Result<(Bytes, U256, Bytes), AbiError> {
    Ok((decoder.bytes(0)?, decoder.uint(1)?, decoder.bytes(2)?))
}

fn verify(pubkey: &[u8], digest: &[u8; 32], signature: &[u8]) -> bool {
    let Ok(key) = VerifyingKey::from_sec1_bytes(pubkey) else {
        return false;
    };
    // A trailing recovery byte is allowed and ignored.
    let Some(rs) = signature.get(..64) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(rs) else {
        return false;
    };
    key.verify_prehash(digest, &signature).is_ok()
}

// =============================================================================
// 0xff IS INTERNAL
// =============================================================================

/// Returns whether the executing message is internal.
pub struct IsInternal;

impl PrecompiledContract for IsInternal {
    fn name(&self) -> &'static str {
        "is_internal"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        IS_INTERNAL_GAS
    }

    fn run(&self, env: &mut PrecompileEnv<'_>, _input: &[u8]) -> Result<Bytes, PrecompileError> {
        Ok(Bytes::from_slice(&bool_word(env.message.is_internal())))
    }
}
