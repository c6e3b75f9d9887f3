//! # Receipt Builder
//!
//! Accumulates the outcome of one message while it is processed and freezes
//! it into a [`Receipt`].

use crate::abi::AbiDecoder;
use crate::domain::entities::Log;
use crate::domain::message::Message;
use crate::domain::receipt::{ExecutionStatus, Receipt};
use crate::domain::value_objects::{Address, Bytes, Gas, Hash, Value};

/// Selector of `Error(string)` revert data.
const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Mutable receipt under construction.
#[derive(Clone, Debug)]
pub struct ReceiptBuilder {
    receipt: Receipt,
}

impl ReceiptBuilder {
    /// Starts a successful, empty receipt for `msg_hash`.
    #[must_use]
    pub fn new(msg_hash: Hash, gas_price: Value) -> Self {
        Self {
            receipt: Receipt {
                msg_hash,
                success: true,
                status: ExecutionStatus::Success,
                gas_used: Gas::ZERO,
                gas_price,
                logs: Vec::new(),
                out_messages: Vec::new(),
                out_receipts: Vec::new(),
                value_forwarded: Value::zero(),
                bounce_value: Value::zero(),
                refund_value: Value::zero(),
                bounced: false,
                refunded: false,
                error_message: String::new(),
                temporary: false,
                contract_address: None,
                output: Bytes::new(),
            },
        }
    }

    /// Records a failure. Success is derived from the status.
    pub fn fail(&mut self, status: ExecutionStatus, error: impl Into<String>) -> &mut Self {
        self.receipt.status = status;
        self.receipt.success = status.is_success();
        self.receipt.error_message = error.into();
        self.receipt.temporary = status == ExecutionStatus::TemporaryError;
        self
    }

    /// Gas charged to the message.
    pub fn gas_used(&mut self, gas: Gas) -> &mut Self {
        self.receipt.gas_used = gas;
        self
    }

    /// Return data of the execution.
    pub fn output(&mut self, output: Bytes) -> &mut Self {
        self.receipt.output = output;
        self
    }

    /// Logs of a successful execution.
    pub fn logs(&mut self, logs: Vec<Log>) -> &mut Self {
        self.receipt.logs = logs;
        self
    }

    /// Address of a deployed contract.
    pub fn contract_address(&mut self, address: Address) -> &mut Self {
        self.receipt.contract_address = Some(address);
        self
    }

    /// Appends an outbound message.
    pub fn out_message(&mut self, message: Message) -> &mut Self {
        self.receipt.out_messages.push(message);
        self
    }

    /// Fee credit handed to budget-funded calls.
    pub fn forwarded(&mut self, value: Value) -> &mut Self {
        self.receipt.value_forwarded = value;
        self
    }

    /// Value returned to the bounce address.
    pub fn bounce(&mut self, value: Value) -> &mut Self {
        self.receipt.bounce_value = value;
        self.receipt.bounced = true;
        self
    }

    /// Fee credit returned to the refund address.
    pub fn refund(&mut self, value: Value) -> &mut Self {
        self.receipt.refund_value = value;
        self.receipt.refunded = true;
        self
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> ExecutionStatus {
        self.receipt.status
    }

    /// Freezes the receipt.
    #[must_use]
    pub fn build(self) -> Receipt {
        self.receipt
    }
}

/// Human-readable reason from revert data.
///
/// `Error(string)` payloads are decoded; anything else is shown as hex.
#[must_use]
pub fn revert_reason(output: &[u8]) -> String {
    if output.is_empty() {
        return "execution reverted".to_string();
    }
    if let Some(args) = output.strip_prefix(&ERROR_SELECTOR) {
        if let Ok(reason) = AbiDecoder::new(args).bytes(0) {
            if let Ok(text) = String::from_utf8(reason.into_vec()) {
                return format!("execution reverted: {text}");
            }
        }
    }
    format!("execution reverted: 0x{}", hex::encode(output))
}
