//! # Shard Boundary
//!
//! Synchronous effects stay on the executing shard; anything else must be
//! a message, and messages to the main shard are refused unless allowed.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use shard_execution::prelude::*;

    fn forwarder() -> Address {
        addr(1, 0x0a)
    }

    fn minter() -> Address {
        addr(1, 0x0d)
    }

    fn minting_executor() -> BlockExecutor {
        BlockExecutor::new(engine_with(EngineConfig {
            minter: minter(),
            ..EngineConfig::default()
        }))
    }

    fn call(to: Address, data: Vec<u8>) -> Message {
        Message::internal(addr(2, 0x99), to)
            .with_value(U256::from(64))
            .with_fee_credit(budget())
            .with_data(data)
    }

    // =============================================================================
    // MAIN SHARD
    // =============================================================================

    #[test]
    fn test_call_to_main_shard_is_refused() {
        let ledger = Ledger::new(&[contract(forwarder(), FORWARDER, 0)]);
        let plan = Plan::new().call(ForwardKind::Remaining, addr(0, 0x01), 0, 0);
        let msg = call(forwarder(), plan.encode());

        let before = ledger.total();
        let output = ledger.execute(&executor(), vec![msg.clone()]);
        let receipt = &output.receipts[0];
        assert_eq!(receipt.status, ExecutionStatus::MessageToMainShardForbidden);
        assert!(output.out_messages.iter().all(|m| m.to.shard_id() != ShardId::MAIN));
        assert_eq!(receipt.bounce_value, U256::from(64));
        assert_conserved(before, &[msg], &output, ledger.total());
    }

    #[test]
    fn test_main_shard_allowed_when_configured() {
        let ledger = Ledger::new(&[contract(forwarder(), FORWARDER, 0)]);
        let executor = BlockExecutor::new(engine_with(EngineConfig {
            forbid_main_shard_messages: false,
            ..EngineConfig::default()
        }));
        let main = addr(0, 0x01);
        let plan = Plan::new().call(ForwardKind::Remaining, main, 0, 0);

        let output = ledger.execute(&executor, vec![call(forwarder(), plan.encode())]);
        assert!(output.receipts[0].success, "{}", output.receipts[0].error_message);
        assert!(output.out_messages.iter().any(|m| m.to == main));
    }

    #[test]
    fn test_unknown_shard_reverts() {
        let ledger = Ledger::new(&[contract(forwarder(), FORWARDER, 0)]);
        // Shards run 0..shard_count.
        let plan = Plan::new().call(ForwardKind::Remaining, addr(9, 0x01), 0, 0);

        let output = ledger.execute(&executor(), vec![call(forwarder(), plan.encode())]);
        assert_eq!(output.receipts[0].status, ExecutionStatus::PrecompileReverted);
    }

    // =============================================================================
    // SYNCHRONOUS TOKEN TRANSFERS
    // =============================================================================

    #[test]
    fn test_tokens_move_synchronously_on_shard() {
        let holder = addr(1, 0x44);
        let ledger = Ledger::new(&[contract(minter(), MINTER, 0)]);

        let output = ledger.execute(&minting_executor(), vec![call(minter(), mint_input(holder, 500))]);
        assert!(output.receipts[0].success, "{}", output.receipts[0].error_message);
        let currency = CurrencyId(minter());
        assert_eq!(ledger.account(holder).map(|a| a.currency(currency)), Some(U256::from(500)));
        assert_eq!(ledger.account(minter()).map(|a| a.currency(currency)), Some(U256::zero()));
    }

    #[test]
    fn test_tokens_to_other_shard_are_refused() {
        let ledger = Ledger::new(&[contract(minter(), MINTER, 0)]);

        let output = ledger.execute(
            &minting_executor(),
            vec![call(minter(), mint_input(addr(2, 0x44), 500))],
        );
        let receipt = &output.receipts[0];
        assert_eq!(receipt.status, ExecutionStatus::CrossShardMessageForbidden);
        // The mint was reverted with the body.
        let minted = ledger
            .account(minter())
            .map(|a| a.currency(CurrencyId(minter())))
            .unwrap_or_default();
        assert_eq!(minted, U256::zero());
    }

    #[test]
    fn test_mint_by_non_minter_issues_nothing() {
        let ledger = Ledger::new(&[contract(minter(), MINTER, 0)]);

        // Default config names a different minter; the send then finds no tokens.
        let output = ledger.execute(&executor(), vec![call(minter(), mint_input(addr(1, 0x44), 500))]);
        assert_eq!(output.receipts[0].status, ExecutionStatus::PrecompileReverted);
        assert!(ledger.account(addr(1, 0x44)).is_none());
    }

    // =============================================================================
    // MISROUTED MESSAGES
    // =============================================================================

    #[test]
    fn test_message_for_other_shard_is_returned() {
        let ledger = Ledger::new(&[]);
        let sender = addr(2, 0x99);
        let msg = Message::internal(sender, addr(3, 0x01))
            .with_value(U256::from(9))
            .with_fee_credit(U256::from(1_000));

        let before = ledger.total();
        let output = ledger.execute(&executor(), vec![msg.clone()]);
        let receipt = &output.receipts[0];
        assert_eq!(receipt.status, ExecutionStatus::InvalidMessage);
        assert_eq!(receipt.gas_used, Gas(0));
        assert!(output.out_messages.iter().all(|m| m.to == sender));
        assert!(ledger.account(addr(3, 0x01)).is_none());
        assert_conserved(before, &[msg], &output, ledger.total());
    }
}
