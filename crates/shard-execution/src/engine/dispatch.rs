//! Kind dispatch and body execution of one message.

use super::context::ExecutionState;
use super::receipt_builder::{revert_reason, ReceiptBuilder};
use super::ExecutionEngine;
use crate::abi::{self, AbiDecoder, Token};
use crate::domain::entities::BlockContext;
use crate::domain::invariants::check_message;
use crate::domain::message::{DeployPayload, Message, MessageKind};
use crate::domain::receipt::{ExecutionStatus, Receipt};
use crate::domain::value_objects::{Address, Bytes, Gas, Hash, Value};
use crate::errors::EngineError;
use crate::ports::outbound::{CallFrame, CallKind, ExitStatus, InterpreterOutcome};
use crate::state::{BlockState, SnapshotId};
use tracing::{debug, error, warn};

/// Result of running a message body.
#[derive(Clone, Debug)]
pub(super) struct BodyOutcome {
    pub status: ExecutionStatus,
    pub gas_used: Gas,
    pub output: Bytes,
    pub error: String,
    pub contract_address: Option<Address>,
    /// Taken before the body touched state. `None` if it never ran.
    pub snapshot: Option<SnapshotId>,
}

impl BodyOutcome {
    fn success(gas_used: Gas, output: Bytes) -> Self {
        Self {
            status: ExecutionStatus::Success,
            gas_used,
            output,
            error: String::new(),
            contract_address: None,
            snapshot: None,
        }
    }

    fn failure(status: ExecutionStatus, error: impl Into<String>, gas_used: Gas) -> Self {
        Self {
            status,
            gas_used,
            output: Bytes::new(),
            error: error.into(),
            contract_address: None,
            snapshot: None,
        }
    }
}

/// Processing of one message.
pub(super) struct MessageRun<'e> {
    pub engine: &'e ExecutionEngine,
    pub state: &'e mut BlockState,
    pub block: &'e BlockContext,
    pub msg: &'e Message,
    pub hash: Hash,
    pub price: Value,
    pub receipt: ReceiptBuilder,
}

impl<'e> MessageRun<'e> {
    pub fn new(
        engine: &'e ExecutionEngine,
        state: &'e mut BlockState,
        block: &'e BlockContext,
        msg: &'e Message,
    ) -> Self {
        let hash = msg.hash();
        let price = block.gas_price_or(block.shard_id, engine.accessor.gas_price_scale());
        Self {
            engine,
            state,
            block,
            msg,
            hash,
            price,
            receipt: ReceiptBuilder::new(hash, price),
        }
    }

    fn reject(mut self, status: ExecutionStatus, error: impl Into<String>) -> Receipt {
        self.receipt.fail(status, error);
        self.receipt.build()
    }

    // =========================================================================
    // REFUND / BOUNCE
    // =========================================================================

    /// Credits a returned value. Never executes code and is never bounced.
    pub fn value_return(mut self) -> Result<Receipt, EngineError> {
        let msg = self.msg;
        if let Err(violation) = check_message(msg, self.block.shard_id) {
            error!(msg_hash = ?self.hash, %violation, "undeliverable value return");
            return Ok(self.reject(ExecutionStatus::InvalidMessage, violation.to_string()));
        }
        if self.state.is_processed(&self.hash) {
            return Ok(self.reject(ExecutionStatus::AlreadyProcessed, "already processed"));
        }
        self.state.mark_processed(self.hash);

        let Some(amount) = msg.value.checked_add(msg.fee_credit) else {
            error!(msg_hash = ?self.hash, "value return overflows");
            return Ok(self.reject(ExecutionStatus::InvalidMessage, "value overflow"));
        };
        self.state.add_balance(msg.to, amount)?;
        for token in &msg.currencies {
            self.state.add_currency(msg.to, token.currency, token.balance)?;
        }
        debug!(to = ?msg.to, %amount, kind = ?msg.kind(), "value returned");
        Ok(self.receipt.build())
    }

    // =========================================================================
    // INTERNAL / RESPONSE
    // =========================================================================

    /// Runs a pre-funded internal message.
    pub fn internal(mut self) -> Result<Receipt, EngineError> {
        if self.state.is_processed(&self.hash) {
            return Ok(self.reject(ExecutionStatus::AlreadyProcessed, "already processed"));
        }
        self.state.mark_processed(self.hash);

        let budget = self.msg.fee_credit;
        if let Err(violation) = check_message(self.msg, self.block.shard_id) {
            warn!(msg_hash = ?self.hash, %violation, "invalid internal message");
            let body = BodyOutcome::failure(ExecutionStatus::InvalidMessage, violation.to_string(), Gas::ZERO);
            return self.settle(body, budget);
        }

        let gas_limit = self.gas_limit(budget);
        let body = self.execute_body(self.msg.from, gas_limit)?;
        self.settle(body, budget)
    }

    // =========================================================================
    // EXTERNAL
    // =========================================================================

    /// Authenticates, debits the payer and runs an external message.
    pub fn external(mut self) -> Result<Receipt, EngineError> {
        let msg = self.msg;
        let shard = self.block.shard_id;
        if let Err(violation) = check_message(msg, shard) {
            warn!(msg_hash = ?self.hash, %violation, "rejected external message");
            return Ok(self.reject(ExecutionStatus::InvalidMessage, violation.to_string()));
        }

        let payer = msg.payer();
        if payer.shard_id() != shard {
            return Ok(self.reject(ExecutionStatus::InvalidMessage, format!("payer {payer:?} is not on {shard}")));
        }
        // Deploys carry no authorisation, so only the new address can pay.
        if msg.is_deploy() && payer != msg.to {
            warn!(msg_hash = ?self.hash, ?payer, "external deploy paid by another account");
            return Ok(self.reject(ExecutionStatus::InvalidMessage, "external deploy must be paid by the deployed address"));
        }
        let Some(account) = self.state.account(payer)? else {
            return Ok(self.reject(ExecutionStatus::TemporaryError, "account not yet funded"));
        };
        if msg.seqno < account.ext_seqno {
            warn!(msg_hash = ?self.hash, seqno = msg.seqno, expected = account.ext_seqno, "replayed external message");
            return Ok(self.reject(
                ExecutionStatus::InvalidMessage,
                format!("seqno {} already used, expected {}", msg.seqno, account.ext_seqno),
            ));
        }
        if msg.seqno > account.ext_seqno {
            return Ok(self.reject(
                ExecutionStatus::TemporaryError,
                format!("seqno {} ahead of {}", msg.seqno, account.ext_seqno),
            ));
        }
        if !msg.is_deploy() {
            if let Some(reason) = self.authenticate(payer, &account.code)? {
                warn!(msg_hash = ?self.hash, %reason, "external message not authorised");
                return Ok(self.reject(ExecutionStatus::InvalidMessage, reason));
            }
        }

        let Some(total) = msg.value.checked_add(msg.fee_credit) else {
            return Ok(self.reject(ExecutionStatus::InvalidMessage, "value overflow"));
        };
        let snapshot = self.state.snapshot();
        let mut funded = self.state.sub_balance(payer, total)?;
        for token in &msg.currencies {
            funded = funded && self.state.sub_currency(payer, token.currency, token.balance)?;
        }
        if !funded {
            self.state.revert_to_snapshot(snapshot)?;
            let available = self.state.balance(payer)?;
            return Ok(self.reject(
                ExecutionStatus::InsufficientBalance,
                format!("insufficient funds: required {total}, available {available}"),
            ));
        }
        self.state.increment_ext_seqno(payer)?;

        let gas_limit = self.gas_limit(msg.fee_credit);
        let body = self.execute_body(payer, gas_limit)?;
        self.settle(body, msg.fee_credit)
    }

    /// Runs the payer's verification code. Returns a rejection reason.
    fn authenticate(&mut self, payer: Address, code: &Bytes) -> Result<Option<String>, EngineError> {
        if code.is_empty() {
            return Ok(Some("payer has no code to authorise external messages".into()));
        }
        let mut input = self.hash.as_bytes().to_vec();
        input.extend_from_slice(self.msg.auth_data.as_slice());

        let snapshot = self.state.snapshot();
        let frame = CallFrame {
            kind: CallKind::VerifyExternal,
            caller: payer,
            address: payer,
            code: code.as_slice(),
            input: &input,
            value: Value::zero(),
            gas_limit: Gas(self.engine.config.external_verification_gas),
            is_internal: false,
            request_id: 0,
        };
        let (outcome, _) = self.run_interpreter(frame)?;
        self.state.revert_to_snapshot(snapshot)?;

        if !outcome.is_success() {
            return Ok(Some(format!("verification failed: {:?}", outcome.status)));
        }
        if outcome.output.as_slice().iter().all(|b| *b == 0) {
            return Ok(Some("signature rejected".into()));
        }
        Ok(None)
    }

    // =========================================================================
    // BODY
    // =========================================================================

    fn gas_limit(&self, budget: Value) -> Gas {
        Gas::from_value(budget, self.price, Gas(self.engine.config.max_gas_per_message))
    }

    /// Credits the destination and runs its code inside a snapshot. The
    /// snapshot is reverted when the body fails.
    fn execute_body(&mut self, caller: Address, gas_limit: Gas) -> Result<BodyOutcome, EngineError> {
        let msg = self.msg;
        let snapshot = self.state.snapshot();

        self.state.add_balance(msg.to, msg.value)?;
        for token in &msg.currencies {
            self.state.add_currency(msg.to, token.currency, token.balance)?;
        }

        let mut body = if msg.is_deploy() {
            self.deploy(caller, gas_limit)?
        } else if msg.kind() == MessageKind::Response {
            self.response(caller, gas_limit)?
        } else {
            self.call(caller, gas_limit)?
        };

        if !body.status.is_success() {
            self.state.revert_to_snapshot(snapshot)?;
        }
        body.snapshot = Some(snapshot);
        Ok(body)
    }

    fn deploy(&mut self, caller: Address, gas_limit: Gas) -> Result<BodyOutcome, EngineError> {
        let msg = self.msg;
        let Some(payload) = DeployPayload::parse(msg.data.as_slice()) else {
            return Ok(BodyOutcome::failure(ExecutionStatus::InvalidMessage, "malformed deploy payload", Gas::ZERO));
        };
        if !self.state.code(msg.to)?.is_empty() {
            return Ok(BodyOutcome::failure(
                ExecutionStatus::ContractAlreadyExists,
                format!("contract already deployed at {:?}", msg.to),
                Gas::ZERO,
            ));
        }
        self.state.set_code(msg.to, payload.code.clone())?;

        let frame = CallFrame {
            kind: CallKind::Deploy,
            caller,
            address: msg.to,
            code: payload.code.as_slice(),
            input: &[],
            value: msg.value,
            gas_limit,
            is_internal: msg.is_internal(),
            request_id: 0,
        };
        let mut body = self.interpret(frame)?;
        if body.status.is_success() {
            body.contract_address = Some(msg.to);
        }
        Ok(body)
    }

    fn call(&mut self, caller: Address, gas_limit: Gas) -> Result<BodyOutcome, EngineError> {
        let msg = self.msg;
        let code = self.state.code(msg.to)?;
        if code.is_empty() {
            return Ok(BodyOutcome::success(Gas::ZERO, Bytes::new()));
        }
        if gas_limit == Gas::ZERO {
            return Ok(BodyOutcome::failure(ExecutionStatus::OutOfGas, "no gas purchased", Gas::ZERO));
        }
        let frame = CallFrame {
            kind: CallKind::Call,
            caller,
            address: msg.to,
            code: code.as_slice(),
            input: msg.data.as_slice(),
            value: msg.value,
            gas_limit,
            is_internal: msg.is_internal(),
            request_id: 0,
        };
        self.interpret(frame)
    }

    /// Resumes the requester with `(bool success, bytes output, bytes context)`.
    fn response(&mut self, caller: Address, gas_limit: Gas) -> Result<BodyOutcome, EngineError> {
        let msg = self.msg;
        let Some(context) = self.state.take_async_context(msg.to, msg.request_id)? else {
            return Ok(BodyOutcome::failure(
                ExecutionStatus::InvalidMessage,
                format!("no pending request {}", msg.request_id),
                Gas::ZERO,
            ));
        };
        let decoder = AbiDecoder::new(msg.data.as_slice());
        let (Ok(success), Ok(output)) = (decoder.bool(0), decoder.bytes(1)) else {
            return Ok(BodyOutcome::failure(ExecutionStatus::InvalidMessage, "malformed response payload", Gas::ZERO));
        };

        let code = self.state.code(msg.to)?;
        if code.is_empty() {
            return Ok(BodyOutcome::success(Gas::ZERO, Bytes::new()));
        }
        if gas_limit == Gas::ZERO {
            return Ok(BodyOutcome::failure(ExecutionStatus::OutOfGas, "no gas purchased", Gas::ZERO));
        }
        let input = abi::encode(&[
            Token::Bool(success),
            Token::Bytes(output.into_vec()),
            Token::Bytes(context.context.into_vec()),
        ]);
        let frame = CallFrame {
            kind: CallKind::Response,
            caller,
            address: msg.to,
            code: code.as_slice(),
            input: &input,
            value: msg.value,
            gas_limit,
            is_internal: true,
            request_id: msg.request_id,
        };
        self.interpret(frame)
    }

    fn run_interpreter(
        &mut self,
        frame: CallFrame<'_>,
    ) -> Result<(InterpreterOutcome, ExecutionStatus), EngineError> {
        let mut exec = ExecutionState::new(
            &mut *self.state,
            self.block,
            &self.engine.precompiles,
            &*self.engine.accessor,
            &*self.engine.block_hashes,
            self.msg,
            frame.address,
        );
        let outcome = self.engine.interpreter.execute(frame, &mut exec)?;
        Ok((outcome, exec.failure_status()))
    }

    fn interpret(&mut self, frame: CallFrame<'_>) -> Result<BodyOutcome, EngineError> {
        let gas_limit = frame.gas_limit;
        let (outcome, failure) = self.run_interpreter(frame)?;
        let gas_used = outcome.gas_used.min(gas_limit);
        let mut body = match outcome.status {
            ExitStatus::Success => return Ok(BodyOutcome::success(gas_used, outcome.output)),
            ExitStatus::Revert => BodyOutcome::failure(failure, revert_reason(outcome.output.as_slice()), gas_used),
            ExitStatus::OutOfGas => BodyOutcome::failure(ExecutionStatus::OutOfGas, "out of gas", gas_used),
            ExitStatus::Failed(reason) => BodyOutcome::failure(failure, reason, gas_used),
        };
        body.output = outcome.output;
        Ok(body)
    }
}
