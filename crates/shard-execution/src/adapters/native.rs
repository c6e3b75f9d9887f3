//! # Native Interpreter
//!
//! [`Interpreter`] that runs contracts written in Rust. Contract code is an
//! opaque byte string; the interpreter dispatches on its keccak hash to the
//! registered [`NativeContract`]. Code with no registration halts with
//! [`ExitStatus::Failed`] and consumes the whole gas limit, like an invalid
//! opcode would.

use crate::domain::services::keccak256;
use crate::domain::value_objects::{Bytes, Hash};
use crate::errors::InterpreterError;
use crate::ports::outbound::{CallFrame, ExitStatus, Interpreter, InterpreterOutcome, StateDb};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A contract implemented in Rust.
pub trait NativeContract: Send + Sync {
    /// Runs one invocation.
    ///
    /// # Errors
    ///
    /// Only for invariant violations; contract failures are reported through
    /// the outcome's status.
    fn execute(
        &self,
        frame: &CallFrame<'_>,
        state: &mut dyn StateDb,
    ) -> Result<InterpreterOutcome, InterpreterError>;
}

struct FnContract<F>(F);

impl<F> NativeContract for FnContract<F>
where
    F: Fn(&CallFrame<'_>, &mut dyn StateDb) -> Result<InterpreterOutcome, InterpreterError>
        + Send
        + Sync,
{
    fn execute(
        &self,
        frame: &CallFrame<'_>,
        state: &mut dyn StateDb,
    ) -> Result<InterpreterOutcome, InterpreterError> {
        (self.0)(frame, state)
    }
}

/// Code-hash keyed registry of native contracts.
#[derive(Default)]
pub struct NativeInterpreter {
    contracts: HashMap<Hash, Arc<dyn NativeContract>>,
}

impl NativeInterpreter {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `contract` as the implementation of `code`. Returns the code hash.
    pub fn register(&mut self, code: &[u8], contract: impl NativeContract + 'static) -> Hash {
        let hash = keccak256(code);
        self.contracts.insert(hash, Arc::new(contract));
        hash
    }

    /// Registers a closure as the implementation of `code`.
    pub fn register_fn<F>(&mut self, code: &[u8], f: F) -> Hash
    where
        F: Fn(&CallFrame<'_>, &mut dyn StateDb) -> Result<InterpreterOutcome, InterpreterError>
            + Send
            + Sync
            + 'static,
    {
        self.register(code, FnContract(f))
    }

    /// Returns true if `code` has an implementation.
    #[must_use]
    pub fn knows(&self, code: &[u8]) -> bool {
        self.contracts.contains_key(&keccak256(code))
    }
}

impl Interpreter for NativeInterpreter {
    fn execute(
        &self,
        frame: CallFrame<'_>,
        state: &mut dyn StateDb,
    ) -> Result<InterpreterOutcome, InterpreterError> {
        let code_hash = keccak256(frame.code);
        let Some(contract) = self.contracts.get(&code_hash) else {
            trace!(address = ?frame.address, ?code_hash, "no native implementation");
            return Ok(InterpreterOutcome {
                status: ExitStatus::Failed("unknown code".into()),
                output: Bytes::new(),
                gas_used: frame.gas_limit,
            });
        };
        let mut outcome = contract.execute(&frame, state)?;
        if outcome.gas_used > frame.gas_limit {
            outcome = InterpreterOutcome::out_of_gas(frame.gas_limit);
        }
        Ok(outcome)
    }
}

impl fmt::Debug for NativeInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeInterpreter")
            .field("contracts", &self.contracts.len())
            .finish()
    }
}
