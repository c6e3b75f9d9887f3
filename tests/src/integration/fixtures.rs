//! # Test Fixtures
//!
//! Native contracts and ledger helpers shared by the scenarios.
//!
//! Contracts are registered by code blob:
//!
//! | Code | Behaviour |
//! |------|-----------|
//! | `wallet` | Authorises externals carrying [`AUTH`]; runs a [`Plan`] from its input |
//! | `forwarder` | Runs a [`Plan`] from its input |
//! | `reverter` | Always reverts after [`REVERT_GAS`] |
//! | `sink` | Accepts everything for [`SINK_GAS`] |
//! | `minter` | Mints `(address dst, uint amount)` of its own currency and sends it to `dst` |

use shard_execution::abi::{self, AbiDecoder, Token};
use shard_execution::domain::services::bool_word;
use shard_execution::errors::InterpreterError;
use shard_execution::precompiles::{ids, PrecompileCall};
use shard_execution::prelude::*;
use std::sync::Arc;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Local gas price.
pub const PRICE: u64 = 10;

/// Fee credit that buys 100k gas at [`PRICE`].
pub const BUDGET: u64 = 1_000_000;

/// Gas a plan-running contract charges on top of its precompile calls.
pub const BASE_GAS: u64 = 2_000;

/// Gas charged by `reverter`.
pub const REVERT_GAS: u64 = 3_000;

/// Gas charged by `sink`.
pub const SINK_GAS: u64 = 500;

/// Authentication data accepted by `wallet`.
pub const AUTH: &[u8] = b"sig";

/// Gas handed to each precompile call.
const STEP_GAS: u64 = 40_000;

pub const WALLET: &[u8] = b"wallet";
pub const FORWARDER: &[u8] = b"forwarder";
pub const REVERTER: &[u8] = b"reverter";
pub const SINK: &[u8] = b"sink";
pub const MINTER: &[u8] = b"minter";

// =============================================================================
// ADDRESSES AND BLOCKS
// =============================================================================

pub fn addr(shard: u16, byte: u8) -> Address {
    Address::from_shard(ShardId(shard), [byte; 18])
}

/// Block on shard 1 at [`PRICE`].
pub fn block() -> BlockContext {
    BlockContext::new(ShardId(1), 1, U256::from(PRICE))
}

pub fn budget() -> U256 {
    U256::from(BUDGET)
}

// =============================================================================
// PLANS
// =============================================================================

/// One async call a plan-running contract makes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub kind: ForwardKind,
    pub dst: Address,
    /// Percentage for `Percentage`, fee credit otherwise.
    pub amount: u64,
    /// Value attached to the call.
    pub value: u64,
}

impl Step {
    const LEN: usize = 1 + 20 + 8 + 8;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.kind as u8);
        out.extend_from_slice(self.dst.as_bytes());
        out.extend_from_slice(&self.amount.to_be_bytes());
        out.extend_from_slice(&self.value.to_be_bytes());
    }

    fn decode(chunk: &[u8]) -> Option<Self> {
        if chunk.len() != Self::LEN {
            return None;
        }
        let kind = ForwardKind::from_u8(chunk[0])?;
        let dst = Address::from_slice(&chunk[1..21])?;
        let amount = u64::from_be_bytes(chunk[21..29].try_into().ok()?);
        let value = u64::from_be_bytes(chunk[29..37].try_into().ok()?);
        Some(Self {
            kind,
            dst,
            amount,
            value,
        })
    }

    /// `asyncCall` arguments for this step.
    fn call_input(&self) -> Vec<u8> {
        abi::encode(&[
            Token::Bool(false),
            Token::Uint(U256::from(self.kind as u8)),
            Token::Address(self.dst),
            Token::Address(Address::ZERO),
            Token::Address(Address::ZERO),
            Token::Uint(U256::from(self.amount)),
            Token::CurrencyList(Vec::new()),
            Token::Bytes(Vec::new()),
        ])
    }
}

/// Sequence of async calls, carried as message data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call(mut self, kind: ForwardKind, dst: Address, amount: u64, value: u64) -> Self {
        self.steps.push(Step {
            kind,
            dst,
            amount,
            value,
        });
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.steps.len() * Step::LEN);
        for step in &self.steps {
            step.encode_into(&mut out);
        }
        out
    }

    /// Steps in `input`; trailing garbage is ignored.
    pub fn decode(input: &[u8]) -> Self {
        Self {
            steps: input.chunks(Step::LEN).filter_map(Step::decode).collect(),
        }
    }
}

// =============================================================================
// CONTRACTS
// =============================================================================

fn run_plan(frame: &CallFrame<'_>, state: &mut dyn StateDb) -> Result<InterpreterOutcome, InterpreterError> {
    let mut gas = BASE_GAS;
    for step in Plan::decode(frame.input).steps {
        let result = state.call_precompile(PrecompileCall {
            address: Address::precompile(ids::ASYNC_CALL),
            caller: frame.address,
            input: step.call_input().into(),
            value: U256::from(step.value),
            gas: Gas(STEP_GAS),
        })?;
        gas += result.gas_used.0;
        if !result.is_success() {
            return Ok(InterpreterOutcome::revert(Vec::new(), Gas(gas.min(frame.gas_limit.0))));
        }
    }
    if gas > frame.gas_limit.0 {
        return Ok(InterpreterOutcome::out_of_gas(frame.gas_limit));
    }
    Ok(InterpreterOutcome::success(Vec::new(), Gas(gas)))
}

fn precompile(
    state: &mut dyn StateDb,
    id: u8,
    caller: Address,
    input: Vec<u8>,
) -> Result<bool, InterpreterError> {
    let result = state.call_precompile(PrecompileCall {
        address: Address::precompile(id),
        caller,
        input: input.into(),
        value: U256::zero(),
        gas: Gas(STEP_GAS),
    })?;
    Ok(result.is_success())
}

fn mint_and_send(frame: &CallFrame<'_>, state: &mut dyn StateDb) -> Result<InterpreterOutcome, InterpreterError> {
    let args = AbiDecoder::new(frame.input);
    let (Ok(dst), Ok(amount)) = (args.address(0), args.uint(1)) else {
        return Ok(InterpreterOutcome::revert(Vec::new(), Gas(BASE_GAS)));
    };
    let currency = CurrencyId(frame.address);
    let minted = precompile(
        state,
        ids::MINT_CURRENCY,
        frame.address,
        abi::encode(&[Token::Address(frame.address), Token::Uint(amount)]),
    )?;
    let sent = minted
        && precompile(
            state,
            ids::SEND_TOKENS,
            frame.address,
            abi::encode(&[
                Token::Address(dst),
                Token::CurrencyList(vec![CurrencyBalance::new(currency, amount)]),
            ]),
        )?;
    if sent {
        Ok(InterpreterOutcome::success(Vec::new(), Gas(BASE_GAS)))
    } else {
        Ok(InterpreterOutcome::revert(Vec::new(), Gas(BASE_GAS)))
    }
}

/// Interpreter with every fixture contract registered.
pub fn interpreter() -> NativeInterpreter {
    let mut interpreter = NativeInterpreter::new();
    interpreter.register_fn(WALLET, |frame, state| {
        if frame.kind == CallKind::VerifyExternal {
            let accept = frame.input.get(32..) == Some(AUTH);
            return Ok(InterpreterOutcome::success(bool_word(accept).to_vec(), Gas(500)));
        }
        run_plan(frame, state)
    });
    interpreter.register_fn(FORWARDER, |frame, state| match frame.kind {
        CallKind::Response => Ok(InterpreterOutcome::success(Vec::new(), Gas(BASE_GAS))),
        _ => run_plan(frame, state),
    });
    interpreter.register_fn(REVERTER, |_, _| {
        Ok(InterpreterOutcome::revert(Vec::new(), Gas(REVERT_GAS)))
    });
    interpreter.register_fn(SINK, |_, _| Ok(InterpreterOutcome::success(Vec::new(), Gas(SINK_GAS))));
    interpreter.register_fn(MINTER, mint_and_send);
    interpreter
}

pub fn engine_with(config: EngineConfig) -> ExecutionEngine {
    ExecutionEngine::new(config, Arc::new(interpreter())).expect("fixture config is valid")
}

/// Block executor for shard 1 with the default configuration.
pub fn executor() -> BlockExecutor {
    BlockExecutor::new(engine_with(EngineConfig::default()))
}

/// `minter` arguments.
pub fn mint_input(dst: Address, amount: u64) -> Vec<u8> {
    abi::encode(&[Token::Address(dst), Token::Uint(U256::from(amount))])
}

// =============================================================================
// LEDGER
// =============================================================================

/// Committed state of shard 1.
pub struct Ledger {
    store: Arc<InMemoryAccountStore>,
}

impl Ledger {
    pub fn new(accounts: &[Account]) -> Self {
        let store = InMemoryAccountStore::new();
        for account in accounts {
            store.insert_account(account.clone());
        }
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> Arc<dyn AccountStore> {
        self.store.clone()
    }

    pub fn account(&self, address: Address) -> Option<Account> {
        self.store.accounts().into_iter().find(|a| a.address == address)
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.account(address).map(|a| a.balance).unwrap_or_default()
    }

    /// Sum of native balances on the shard.
    pub fn total(&self) -> U256 {
        self.store
            .accounts()
            .iter()
            .fold(U256::zero(), |acc, a| acc + a.balance)
    }

    pub fn execute(&self, executor: &BlockExecutor, inbound: Vec<Message>) -> BlockOutput {
        executor
            .execute_block(self.store(), &block(), inbound)
            .expect("block executes")
    }
}

pub fn contract(address: Address, code: &[u8], balance: u64) -> Account {
    Account::with_balance(address, U256::from(balance)).with_code(code.to_vec())
}

// =============================================================================
// ACCOUNTING
// =============================================================================

/// Value plus fee credit carried by `msg`.
pub fn carried(msg: &Message) -> U256 {
    msg.value + msg.fee_credit
}

fn sum(values: impl Iterator<Item = U256>) -> U256 {
    values.fold(U256::zero(), |acc, v| acc + v)
}

/// Gas charged over every receipt of the block, nested ones included.
pub fn fees(output: &BlockOutput) -> U256 {
    sum(output.receipts.iter().flat_map(Receipt::iter_tree).map(Receipt::fee))
}

/// Checks that native value entering the shard equals value leaving it:
/// `before + inbound = after + outbound + fees`.
pub fn assert_conserved(before: U256, inbound: &[Message], output: &BlockOutput, after: U256) {
    let received = sum(inbound.iter().filter(|m| m.is_internal()).map(carried));
    let sent = sum(output.out_messages.iter().map(carried));
    let charged = fees(output);
    assert_eq!(
        before + received,
        after + sent + charged,
        "before {before} + received {received} != after {after} + sent {sent} + fees {charged}"
    );
}

/// Checks the fee arithmetic of one settled internal message that sent no
/// request: the budget is exactly spent on gas, forwarding and refund.
pub fn assert_budget_spent(msg: &Message, receipt: &Receipt) {
    assert_eq!(
        receipt.fee() + receipt.value_forwarded + receipt.refund_value,
        msg.fee_credit,
        "fee {} + forwarded {} + refund {} != budget {}",
        receipt.fee(),
        receipt.value_forwarded,
        receipt.refund_value,
        msg.fee_credit
    );
}
