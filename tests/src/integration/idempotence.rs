//! # Idempotence
//!
//! A message hash executes at most once per block, and an external sequence
//! number is consumed at most once ever.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use shard_execution::prelude::*;

    fn forwarder() -> Address {
        addr(1, 0x0a)
    }

    fn wallet() -> Address {
        addr(1, 0x01)
    }

    #[test]
    fn test_duplicate_internal_has_no_effect() {
        let ledger = Ledger::new(&[contract(forwarder(), FORWARDER, 0)]);
        let plan = Plan::new().call(ForwardKind::Remaining, addr(2, 0x0b), 0, 10);
        let msg = Message::internal(addr(2, 0x99), forwarder())
            .with_value(U256::from(100))
            .with_fee_credit(budget())
            .with_data(plan.encode());

        let output = ledger.execute(&executor(), vec![msg.clone(), msg.clone()]);
        assert!(output.receipts[0].success, "{}", output.receipts[0].error_message);
        let duplicate = &output.receipts[1];
        assert_eq!(duplicate.status, ExecutionStatus::AlreadyProcessed);
        assert_eq!(duplicate.gas_used, Gas(0));
        assert!(duplicate.out_messages.is_empty());

        // Only the first copy's call left the shard.
        assert_eq!(output.out_messages.len(), 1);
        assert_eq!(ledger.balance(forwarder()), U256::from(90));
        assert_eq!(ledger.account(forwarder()).map(|a| a.seqno), Some(1));
    }

    #[test]
    fn test_duplicate_refund_credits_once() {
        let target = addr(1, 0x44);
        let ledger = Ledger::new(&[Account::new(target)]);
        let refund = Message::internal(addr(2, 0x99), target)
            .with_flags(MessageFlags::REFUND)
            .with_value(U256::from(250));

        let output = ledger.execute(&executor(), vec![refund.clone(), refund]);
        assert!(output.receipts[0].success);
        assert_eq!(output.receipts[1].status, ExecutionStatus::AlreadyProcessed);
        assert_eq!(ledger.balance(target), U256::from(250));
    }

    #[test]
    fn test_external_seqno_consumed_once() {
        let ledger = Ledger::new(&[contract(wallet(), WALLET, 10_000_000)]);
        let msg = Message::external(wallet())
            .with_auth_data(AUTH.to_vec())
            .with_fee_credit(budget());

        let first = ledger.execute(&executor(), vec![msg.clone()]);
        assert!(first.receipts[0].success, "{}", first.receipts[0].error_message);
        let after_first = ledger.balance(wallet());

        // Same seqno in a later block is a permanent rejection.
        let replay = ledger.execute(&executor(), vec![msg.clone()]);
        let receipt = &replay.receipts[0];
        assert_eq!(receipt.status, ExecutionStatus::InvalidMessage);
        assert!(!receipt.temporary);
        assert_eq!(ledger.balance(wallet()), after_first);

        // A seqno from the future may be retried.
        let ahead = ledger.execute(&executor(), vec![msg.with_seqno(5)]);
        assert_eq!(ahead.receipts[0].status, ExecutionStatus::TemporaryError);
        assert!(ahead.receipts[0].temporary);
        assert_eq!(ledger.account(wallet()).map(|a| a.ext_seqno), Some(1));
    }

    #[test]
    fn test_bad_auth_leaves_seqno_unused() {
        let ledger = Ledger::new(&[contract(wallet(), WALLET, 10_000_000)]);
        let forged = Message::external(wallet())
            .with_auth_data(b"forged".to_vec())
            .with_fee_credit(budget());

        let output = ledger.execute(&executor(), vec![forged.clone()]);
        assert_eq!(output.receipts[0].status, ExecutionStatus::InvalidMessage);
        assert_eq!(ledger.balance(wallet()), U256::from(10_000_000));

        let genuine = forged.with_auth_data(AUTH.to_vec());
        let output = ledger.execute(&executor(), vec![genuine]);
        assert!(output.receipts[0].success, "{}", output.receipts[0].error_message);
        assert_eq!(ledger.account(wallet()).map(|a| a.ext_seqno), Some(1));
    }

    // =============================================================================
    // EXTERNAL DEPLOYS
    // =============================================================================

    fn deploy_payload() -> DeployPayload {
        DeployPayload::new(SINK.to_vec(), Hash::new([0x5e; 32]))
    }

    #[test]
    fn test_external_deploy_cannot_charge_another_account() {
        let victim = wallet();
        let ledger = Ledger::new(&[contract(victim, WALLET, 5_000_000)]);
        let payload = deploy_payload();
        let derived = payload.address(ShardId(1));
        let msg = Message::external(derived)
            .with_flags(MessageFlags::DEPLOY)
            .with_from(victim)
            .with_value(U256::from(4_000_000))
            .with_fee_credit(U256::from(100_000))
            .with_data(payload.encode());

        let output = ledger.execute(&executor(), vec![msg]);
        let receipt = &output.receipts[0];
        assert_eq!(receipt.status, ExecutionStatus::InvalidMessage);
        assert!(!receipt.temporary);
        assert_eq!(ledger.balance(victim), U256::from(5_000_000));
        assert_eq!(ledger.account(victim).map(|a| a.ext_seqno), Some(0));
        assert!(ledger.account(derived).is_none());
        assert!(output.out_messages.is_empty());
    }

    #[test]
    fn test_external_deploy_paid_by_new_address() {
        let payload = deploy_payload();
        let derived = payload.address(ShardId(1));
        let ledger = Ledger::new(&[Account::with_balance(derived, U256::from(2_000_000))]);
        let msg = Message::external(derived)
            .with_flags(MessageFlags::DEPLOY)
            .with_fee_credit(budget())
            .with_data(payload.encode());

        let output = ledger.execute(&executor(), vec![msg.clone()]);
        let receipt = &output.receipts[0];
        assert!(receipt.success, "{}", receipt.error_message);
        assert_eq!(receipt.contract_address, Some(derived));

        let account = ledger.account(derived).unwrap_or_default();
        assert_eq!(account.code.as_slice(), SINK);
        assert_eq!(account.ext_seqno, 1);
        // Unused credit returns in place.
        assert_eq!(account.balance, U256::from(2_000_000) - receipt.fee());

        // The same deploy cannot be replayed.
        let replay = ledger.execute(&executor(), vec![msg]);
        assert_eq!(replay.receipts[0].status, ExecutionStatus::InvalidMessage);
    }
}
