//! # Forwarding Scenarios
//!
//! How the budget left after a contract's own gas is split between the
//! async calls it queued, observed through whole blocks.
//!
//! ## Flows Tested
//!
//! 1. **Percentage + Remaining**: 70% to one callee, the rest to another
//! 2. **Percentage overflow**: 60% + 50% fails the message, sender pays gas only
//! 3. **Value reservation**: fixed credit first, even split of the rest
//! 4. **Explicit credit**: `None` credit is reserved from the budget like `Value`
//! 5. **Zero credit**: a call forwarded nothing fails at the callee

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use shard_execution::prelude::*;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const WALLET_FUNDS: u64 = 1_000_000_000;

    fn wallet() -> Address {
        addr(1, 0x01)
    }

    fn forwarder() -> Address {
        addr(1, 0x0a)
    }

    fn ledger() -> Ledger {
        Ledger::new(&[
            contract(wallet(), WALLET, WALLET_FUNDS),
            contract(forwarder(), FORWARDER, 0),
        ])
    }

    fn signed(to: Address, plan: &Plan) -> Message {
        Message::external(to)
            .with_from(wallet())
            .with_auth_data(AUTH.to_vec())
            .with_data(plan.encode())
    }

    fn sent_to<'o>(output: &'o BlockOutput, to: Address) -> &'o Message {
        output
            .out_messages
            .iter()
            .find(|m| m.to == to)
            .unwrap_or_else(|| panic!("no message to {to:?}"))
    }

    // =============================================================================
    // PERCENTAGE AND REMAINING
    // =============================================================================

    #[test]
    fn test_percentage_then_remaining_split() {
        let ledger = ledger();
        let b = addr(2, 0x0b);
        let c = addr(2, 0x0c);
        let fee_credit = U256::from(100_000 * PRICE);
        let plan = Plan::new()
            .call(ForwardKind::Percentage, b, 70, 0)
            .call(ForwardKind::Remaining, c, 0, 0);
        let msg = signed(forwarder(), &plan)
            .with_value(U256::from(2_000_000))
            .with_fee_credit(fee_credit);

        let before = ledger.total();
        let output = ledger.execute(&executor(), vec![msg.clone()]);
        let receipt = &output.receipts[0];
        assert!(receipt.success, "{}", receipt.error_message);

        let remaining = fee_credit - receipt.fee();
        let to_b = sent_to(&output, b).fee_credit;
        let to_c = sent_to(&output, c).fee_credit;
        assert_eq!(to_b, remaining * U256::from(70) / U256::from(100));
        assert_eq!(to_c, remaining - to_b);
        assert_eq!(receipt.value_forwarded, to_b + to_c);
        assert!(!receipt.refunded);
        assert_eq!(output.out_messages.len(), 2);

        assert_eq!(ledger.balance(forwarder()), U256::from(2_000_000));
        assert_eq!(
            ledger.balance(wallet()),
            U256::from(WALLET_FUNDS) - U256::from(2_000_000) - fee_credit
        );
        assert_conserved(before, &[msg], &output, ledger.total());
    }

    #[test]
    fn test_percentage_overflow_charges_only_gas() {
        let ledger = ledger();
        let plan = Plan::new()
            .call(ForwardKind::Percentage, addr(2, 0x0b), 60, 0)
            .call(ForwardKind::Percentage, addr(2, 0x0c), 50, 0);
        let msg = signed(forwarder(), &plan).with_fee_credit(budget());

        let output = ledger.execute(&executor(), vec![msg]);
        let receipt = &output.receipts[0];
        assert!(!receipt.success);
        assert_eq!(receipt.status, ExecutionStatus::ForwardingFailed);
        assert!(receipt.out_messages.is_empty());
        assert!(output.out_messages.is_empty());
        assert!(receipt.refunded);
        assert_eq!(receipt.refund_value, budget() - receipt.fee());

        // The external payer is refunded in place and loses only gas.
        assert_eq!(ledger.balance(wallet()), U256::from(WALLET_FUNDS) - receipt.fee());
        // The queued calls were reverted with the body.
        assert_eq!(ledger.account(forwarder()).map(|a| a.seqno), Some(0));
    }

    #[test]
    fn test_percentage_overflow_on_internal_refunds_by_message() {
        let ledger = ledger();
        let sender = addr(2, 0x99);
        let plan = Plan::new()
            .call(ForwardKind::Percentage, addr(2, 0x0b), 60, 0)
            .call(ForwardKind::Percentage, addr(2, 0x0c), 50, 0);
        let msg = Message::internal(sender, forwarder())
            .with_fee_credit(budget())
            .with_data(plan.encode());

        let output = ledger.execute(&executor(), vec![msg.clone()]);
        let receipt = &output.receipts[0];
        assert_eq!(receipt.status, ExecutionStatus::ForwardingFailed);
        assert_eq!(output.out_messages.len(), 1);
        let refund = &output.out_messages[0];
        assert!(refund.flags.contains(MessageFlags::REFUND));
        assert_eq!(refund.to, sender);
        assert_eq!(refund.value, budget() - receipt.fee());
        assert_budget_spent(&msg, receipt);
    }

    // =============================================================================
    // FIXED CREDITS
    // =============================================================================

    #[test]
    fn test_value_reserved_before_even_split() {
        let ledger = ledger();
        let (b, c, d) = (addr(2, 0x0b), addr(2, 0x0c), addr(3, 0x0d));
        let plan = Plan::new()
            .call(ForwardKind::Remaining, c, 0, 0)
            .call(ForwardKind::Value, b, 100_000, 0)
            .call(ForwardKind::Remaining, d, 0, 0);
        let msg = Message::internal(addr(2, 0x99), forwarder())
            .with_fee_credit(budget())
            .with_data(plan.encode());

        let output = ledger.execute(&executor(), vec![msg.clone()]);
        let receipt = &output.receipts[0];
        assert!(receipt.success, "{}", receipt.error_message);

        let split = budget() - receipt.fee() - U256::from(100_000);
        let share = split / U256::from(2);
        assert_eq!(sent_to(&output, b).fee_credit, U256::from(100_000));
        assert_eq!(sent_to(&output, c).fee_credit, share);
        assert_eq!(sent_to(&output, d).fee_credit, share);
        assert_eq!(receipt.refund_value, split % U256::from(2));
        assert_budget_spent(&msg, receipt);
    }

    #[test]
    fn test_value_reservation_beyond_budget_fails() {
        let ledger = ledger();
        let plan = Plan::new().call(ForwardKind::Value, addr(2, 0x0b), BUDGET, 0);
        let msg = Message::internal(addr(2, 0x99), forwarder())
            .with_value(U256::from(7))
            .with_fee_credit(budget())
            .with_data(plan.encode());

        let output = ledger.execute(&executor(), vec![msg.clone()]);
        let receipt = &output.receipts[0];
        assert_eq!(receipt.status, ExecutionStatus::ForwardingFailed);
        assert!(receipt.bounced);
        assert_eq!(receipt.bounce_value, U256::from(7));
        assert_eq!(ledger.balance(forwarder()), U256::zero());
        assert_budget_spent(&msg, receipt);
    }

    #[test]
    fn test_explicit_credit_reserved_from_budget() {
        let ledger = Ledger::new(&[contract(forwarder(), FORWARDER, 50_000)]);
        let (b, c) = (addr(2, 0x0b), addr(2, 0x0c));
        let plan = Plan::new()
            .call(ForwardKind::None, b, 30_000, 0)
            .call(ForwardKind::Remaining, c, 0, 0);
        let msg = Message::internal(addr(2, 0x99), forwarder())
            .with_fee_credit(budget())
            .with_data(plan.encode());

        let output = ledger.execute(&executor(), vec![msg.clone()]);
        let receipt = &output.receipts[0];
        assert!(receipt.success, "{}", receipt.error_message);
        assert_eq!(sent_to(&output, b).fee_credit, U256::from(30_000));
        assert_eq!(
            sent_to(&output, c).fee_credit,
            budget() - receipt.fee() - U256::from(30_000)
        );
        assert_eq!(receipt.value_forwarded, budget() - receipt.fee());
        // The caller's own balance pays nothing.
        assert_eq!(ledger.balance(forwarder()), U256::from(50_000));
        assert_budget_spent(&msg, receipt);
    }

    #[test]
    fn test_explicit_credit_beyond_budget_fails() {
        let ledger = Ledger::new(&[contract(forwarder(), FORWARDER, 5 * BUDGET)]);
        let plan = Plan::new().call(ForwardKind::None, addr(2, 0x0b), BUDGET, 0);
        let msg = Message::internal(addr(2, 0x99), forwarder())
            .with_value(U256::from(7))
            .with_fee_credit(budget())
            .with_data(plan.encode());

        let output = ledger.execute(&executor(), vec![msg.clone()]);
        let receipt = &output.receipts[0];
        assert_eq!(receipt.status, ExecutionStatus::ForwardingFailed);
        assert_eq!(receipt.bounce_value, U256::from(7));
        assert!(output.out_messages.iter().all(|m| m.to != addr(2, 0x0b)));
        assert_eq!(ledger.balance(forwarder()), U256::from(5 * BUDGET));
        assert_budget_spent(&msg, receipt);
    }

    // =============================================================================
    // ZERO CREDIT
    // =============================================================================

    #[test]
    fn test_zero_credit_call_fails_at_callee() {
        let sink = addr(1, 0x30);
        let ledger = Ledger::new(&[contract(forwarder(), FORWARDER, 0), contract(sink, SINK, 0)]);
        let plan = Plan::new().call(ForwardKind::Value, sink, 0, 50);
        let msg = Message::internal(addr(2, 0x99), forwarder())
            .with_value(U256::from(50))
            .with_fee_credit(budget())
            .with_data(plan.encode());

        let before = ledger.total();
        let output = ledger.execute(&executor(), vec![msg.clone()]);
        let top = &output.receipts[0];
        // The caller succeeds; the callee runs out of gas with nothing bought.
        assert!(top.success, "{}", top.error_message);
        let callee = &top.out_receipts[0];
        assert_eq!(callee.status, ExecutionStatus::OutOfGas);
        assert_eq!(callee.gas_used, Gas(0));
        assert_eq!(callee.bounce_value, U256::from(50));

        assert_eq!(ledger.balance(sink), U256::zero());
        assert_eq!(ledger.balance(forwarder()), U256::from(50));
        assert_conserved(before, &[msg], &output, ledger.total());
    }
}
