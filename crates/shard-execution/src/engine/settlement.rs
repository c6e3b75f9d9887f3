//! Fee settlement after the body ran: gas charge, forwarding, bounce,
//! refund and response.

use super::dispatch::{BodyOutcome, MessageRun};
use crate::abi::{self, Token};
use crate::domain::forwarding::{self, ForwardRequest};
use crate::domain::message::{Message, MessageFlags};
use crate::domain::receipt::{ExecutionStatus, Receipt};
use crate::domain::value_objects::{Address, Value};
use crate::errors::EngineError;
use tracing::{debug, warn};

impl MessageRun<'_> {
    /// Charges gas against `budget`, then distributes what is left.
    pub(super) fn settle(mut self, mut body: BodyOutcome, budget: Value) -> Result<Receipt, EngineError> {
        let fee = body.gas_used.to_value(self.price).min(budget);
        let mut leftover = budget - fee;

        if body.status.is_success() {
            let requests: Vec<ForwardRequest> = self
                .state
                .outbox()
                .iter()
                .filter(|out| out.is_budget_funded())
                .map(|out| ForwardRequest::new(out.forward_kind, out.requested))
                .collect();
            match forwarding::resolve(leftover, &requests) {
                Ok(plan) => {
                    let (logs, outbox) = self.state.take_scratch();
                    let mut credits = plan.credits.into_iter();
                    for mut out in outbox {
                        if out.is_budget_funded() {
                            if let Some(credit) = credits.next() {
                                out.message.fee_credit = credit;
                            }
                        }
                        self.receipt.out_message(out.message);
                    }
                    self.receipt.forwarded(plan.forwarded).logs(logs);
                    leftover = plan.leftover;
                }
                Err(err) => {
                    warn!(msg_hash = ?self.hash, %err, "forwarding failed");
                    if let Some(snapshot) = body.snapshot {
                        self.state.revert_to_snapshot(snapshot)?;
                    }
                    body.status = ExecutionStatus::ForwardingFailed;
                    body.error = err.to_string();
                    body.contract_address = None;
                }
            }
        }
        // Anything a failed body queued was dropped with its snapshot.
        if !body.status.is_success() {
            self.state.take_scratch();
            self.receipt.fail(body.status, std::mem::take(&mut body.error));
            self.bounce()?;
        }

        if let Some(address) = body.contract_address {
            self.receipt.contract_address(address);
        }
        self.receipt.gas_used(body.gas_used).output(body.output.clone());

        if self.msg.is_internal() && self.msg.is_request() {
            self.respond(&body, leftover);
        } else if !leftover.is_zero() {
            self.refund(leftover)?;
        }
        debug!(msg_hash = ?self.hash, %fee, %leftover, status = %self.receipt.status(), "message settled");
        Ok(self.receipt.build())
    }

    /// Returns attached value and currencies to the bounce address.
    fn bounce(&mut self) -> Result<(), EngineError> {
        let msg = self.msg;
        if msg.value.is_zero() && msg.currencies.is_empty() {
            return Ok(());
        }
        let target = msg.bounce_address().or(msg.payer());
        if self.credits_directly(target) {
            self.state.add_balance(target, msg.value)?;
            for token in &msg.currencies {
                self.state.add_currency(target, token.currency, token.balance)?;
            }
        } else {
            let bounce = Message::internal(msg.to, target)
                .with_flags(MessageFlags::BOUNCE)
                .with_value(msg.value)
                .with_currencies(msg.currencies.clone())
                .with_data(self.hash.as_bytes().to_vec());
            self.receipt.out_message(bounce);
        }
        self.receipt.bounce(msg.value);
        Ok(())
    }

    /// Returns unused fee credit to the refund address.
    fn refund(&mut self, amount: Value) -> Result<(), EngineError> {
        let msg = self.msg;
        let target = msg.refund_address().or(msg.payer());
        if self.credits_directly(target) {
            self.state.add_balance(target, amount)?;
        } else {
            let refund = Message::internal(msg.to, target)
                .with_flags(MessageFlags::REFUND)
                .with_value(amount)
                .with_data(self.hash.as_bytes().to_vec());
            self.receipt.out_message(refund);
        }
        self.receipt.refund(amount);
        Ok(())
    }

    /// Answers a request with `(bool success, bytes output)`. The unused
    /// budget travels with the response.
    fn respond(&mut self, body: &BodyOutcome, leftover: Value) {
        let msg = self.msg;
        let payload = abi::encode(&[
            Token::Bool(body.status.is_success()),
            Token::Bytes(body.output.as_slice().to_vec()),
        ]);
        let response = Message::internal(msg.to, msg.from)
            .with_flags(MessageFlags::RESPONSE)
            .with_request_id(msg.request_id)
            .with_fee_credit(leftover)
            .with_refund_to(msg.refund_address())
            .with_data(payload);
        self.receipt.out_message(response);
    }

    /// Value owed to the payer of an external message is credited in place.
    fn credits_directly(&self, target: Address) -> bool {
        self.msg.is_external() && target.shard_id() == self.block.shard_id
    }
}
