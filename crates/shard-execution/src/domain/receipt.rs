//! # Receipts
//!
//! The per-message execution record handed back to the collator, persisted,
//! and replayed by the proof tracer. Receipts nest: messages delivered inside
//! the same block on the same shard appear under `out_receipts`.

use crate::domain::entities::Log;
use crate::domain::message::Message;
use crate::domain::value_objects::{Address, Bytes, Gas, Hash, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final status of one processed message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Executed successfully.
    Success,
    /// Contract reverted. Gas consumed, value bounced.
    ExecutionReverted,
    /// Ran out of gas.
    OutOfGas,
    /// Pre-check failed, nothing executed.
    InsufficientBalance,
    /// A precompile failed and the contract propagated the failure.
    PrecompileReverted,
    /// Malformed or unauthenticated message, permanently rejected.
    InvalidMessage,
    /// Outbound message to the main shard.
    MessageToMainShardForbidden,
    /// Synchronous operation across shards.
    CrossShardMessageForbidden,
    /// Fee budget could not cover the queued calls.
    ForwardingFailed,
    /// Deploy target already has code.
    ContractAlreadyExists,
    /// Internal message already applied in this block.
    AlreadyProcessed,
    /// Not applicable yet; retry as-is.
    TemporaryError,
}

impl ExecutionStatus {
    /// Returns true for [`ExecutionStatus::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Human-readable status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::ExecutionReverted => "ExecutionReverted",
            Self::OutOfGas => "OutOfGas",
            Self::InsufficientBalance => "InsufficientBalance",
            Self::PrecompileReverted => "PrecompileReverted",
            Self::InvalidMessage => "InvalidMessage",
            Self::MessageToMainShardForbidden => "MessageToMainShardForbidden",
            Self::CrossShardMessageForbidden => "CrossShardMessageForbidden",
            Self::ForwardingFailed => "ForwardingFailed",
            Self::ContractAlreadyExists => "ContractAlreadyExists",
            Self::AlreadyProcessed => "AlreadyProcessed",
            Self::TemporaryError => "TemporaryError",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution record of one message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hash of the processed message.
    pub msg_hash: Hash,
    /// True iff `status` is `Success`.
    pub success: bool,
    /// Final status.
    pub status: ExecutionStatus,
    /// Gas charged to the message.
    pub gas_used: Gas,
    /// Price the gas was charged at.
    pub gas_price: Value,
    /// Logs of a successful execution.
    pub logs: Vec<Log>,
    /// Messages spawned by this message (calls, bounces, refunds, responses).
    pub out_messages: Vec<Message>,
    /// Receipts of spawned messages executed in the same block.
    pub out_receipts: Vec<Receipt>,
    /// Fee credit handed to budget-funded outbound calls.
    pub value_forwarded: Value,
    /// Value returned to the bounce address.
    pub bounce_value: Value,
    /// Fee credit returned to the refund address.
    pub refund_value: Value,
    /// True if value was bounced.
    pub bounced: bool,
    /// True if fee credit was refunded.
    pub refunded: bool,
    /// Failure details, empty on success.
    pub error_message: String,
    /// True if the sender may retry unchanged.
    pub temporary: bool,
    /// Address of a deployed contract.
    pub contract_address: Option<Address>,
    /// Return data of the execution.
    pub output: Bytes,
}

impl Receipt {
    /// Gas cost in value.
    #[must_use]
    pub fn fee(&self) -> Value {
        self.gas_used.to_value(self.gas_price)
    }

    /// Depth-first iterator over this receipt and its nested receipts.
    pub fn iter_tree(&self) -> impl Iterator<Item = &Receipt> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.out_receipts.iter().rev());
            Some(next)
        })
    }
}
