//! # Value Conservation
//!
//! Across a block, native value is only moved, charged as gas, or carried
//! out by a message:
//!
//! ```text
//! balances_before + inbound = balances_after + outbound + fees
//! ```
//!
//! Checked on hand-picked flows and on randomly generated blocks.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use shard_execution::prelude::*;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const WALLET_FUNDS: u64 = 1_000_000_000;

    fn wallet() -> Address {
        addr(1, 0x01)
    }

    /// Local contracts the generator sends to.
    fn locals() -> Vec<(Address, &'static [u8])> {
        vec![
            (addr(1, 0x10), FORWARDER),
            (addr(1, 0x11), FORWARDER),
            (addr(1, 0x12), FORWARDER),
            (addr(1, 0x20), REVERTER),
            (addr(1, 0x30), SINK),
            (addr(1, 0x40), b"".as_slice()),
        ]
    }

    fn world(rng: &mut StdRng) -> Ledger {
        let mut accounts = vec![contract(wallet(), WALLET, WALLET_FUNDS)];
        for (address, code) in locals() {
            accounts.push(contract(address, code, rng.gen_range(0..200_000)));
        }
        Ledger::new(&accounts)
    }

    fn destination(rng: &mut StdRng) -> Address {
        match rng.gen_range(0..10) {
            0 => addr(0, 0x01),
            1..=4 => addr(rng.gen_range(2..4), rng.gen_range(0x80..0x88)),
            _ => {
                let locals = locals();
                locals[rng.gen_range(0..locals.len())].0
            }
        }
    }

    fn random_plan(rng: &mut StdRng) -> Plan {
        let mut plan = Plan::new();
        for _ in 0..rng.gen_range(0..4) {
            let kind = ForwardKind::from_u8(rng.gen_range(0..4)).unwrap_or(ForwardKind::Remaining);
            let amount = match kind {
                ForwardKind::Percentage => rng.gen_range(0..=80),
                ForwardKind::Remaining => 0,
                ForwardKind::Value | ForwardKind::None => rng.gen_range(0..BUDGET / 2),
            };
            plan = plan.call(kind, destination(rng), amount, rng.gen_range(0..1_000));
        }
        plan
    }

    fn random_inbound(rng: &mut StdRng) -> Vec<Message> {
        let locals = locals();
        let mut ext_seqno = 0;
        let mut inbound = Vec::new();
        for seqno in 0..rng.gen_range(1..8) {
            let (to, _) = locals[rng.gen_range(0..locals.len())];
            let data = random_plan(rng).encode();
            let value = U256::from(rng.gen_range(0..100_000u64));
            let fee_credit = U256::from(rng.gen_range(0..2 * BUDGET));
            let msg = if rng.gen_bool(0.3) {
                ext_seqno += 1;
                Message::external(to)
                    .with_from(wallet())
                    .with_seqno(ext_seqno - 1)
                    .with_auth_data(AUTH.to_vec())
            } else {
                Message::internal(addr(2, 0x99), to).with_seqno(seqno)
            };
            inbound.push(msg.with_value(value).with_fee_credit(fee_credit).with_data(data));
        }
        inbound
    }

    // =============================================================================
    // FIXED FLOWS
    // =============================================================================

    #[test]
    fn test_chain_of_same_shard_calls_conserves() {
        let (a, b, c) = (addr(1, 0x10), addr(1, 0x11), addr(1, 0x30));
        let ledger = Ledger::new(&[
            contract(wallet(), WALLET, WALLET_FUNDS),
            contract(a, FORWARDER, 0),
            contract(b, FORWARDER, 0),
            contract(c, SINK, 0),
        ]);
        // wallet -> a -> (b, remote); b has no plan and refunds a.
        let plan = Plan::new()
            .call(ForwardKind::Percentage, b, 50, 300)
            .call(ForwardKind::Remaining, addr(2, 0x80), 0, 200);
        let msg = Message::external(a)
            .with_from(wallet())
            .with_auth_data(AUTH.to_vec())
            .with_value(U256::from(1_000))
            .with_fee_credit(budget())
            .with_data(plan.encode());

        let before = ledger.total();
        let output = ledger.execute(&executor(), vec![msg.clone()]);
        assert!(output.receipts[0].success, "{}", output.receipts[0].error_message);
        assert!(!output.receipts[0].out_receipts.is_empty());
        assert_eq!(ledger.balance(b), U256::from(300));
        // a keeps 500 of its value plus b's in-block refund.
        assert!(ledger.balance(a) > U256::from(500));
        assert_conserved(before, &[msg], &output, ledger.total());
    }

    #[test]
    fn test_failed_block_mix_conserves() {
        let ledger = Ledger::new(&[
            contract(wallet(), WALLET, WALLET_FUNDS),
            contract(addr(1, 0x20), REVERTER, 0),
        ]);
        let inbound = vec![
            Message::internal(addr(2, 0x99), addr(1, 0x20))
                .with_value(U256::from(10))
                .with_fee_credit(budget()),
            Message::external(addr(1, 0x20))
                .with_from(wallet())
                .with_auth_data(AUTH.to_vec())
                .with_value(U256::from(20))
                .with_fee_credit(budget()),
            // Unfunded payer: rejected without effect.
            Message::external(addr(1, 0x20))
                .with_from(addr(1, 0x77))
                .with_fee_credit(budget()),
        ];

        let before = ledger.total();
        let output = ledger.execute(&executor(), inbound.clone());
        assert_eq!(output.receipts[2].status, ExecutionStatus::TemporaryError);
        assert_conserved(before, &inbound, &output, ledger.total());
    }

    // =============================================================================
    // RANDOMISED BLOCKS
    // =============================================================================

    #[test]
    fn test_random_blocks_conserve_value() {
        for seed in 0..48u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ledger = world(&mut rng);
            let inbound = random_inbound(&mut rng);

            let before = ledger.total();
            let output = ledger.execute(&executor(), inbound.clone());
            assert_eq!(output.receipts.len(), inbound.len(), "seed {seed}");
            assert_conserved(before, &inbound, &output, ledger.total());

            for (msg, receipt) in inbound.iter().zip(&output.receipts) {
                if msg.is_internal() {
                    assert_budget_spent(msg, receipt);
                }
                if !receipt.success {
                    assert!(receipt.value_forwarded.is_zero(), "seed {seed}");
                    assert!(
                        receipt
                            .out_messages
                            .iter()
                            .all(|m| m.flags.intersects(MessageFlags::BOUNCE | MessageFlags::REFUND)),
                        "seed {seed}: failed message emitted a call"
                    );
                }
            }
        }
    }

    #[test]
    fn test_random_blocks_are_deterministic() {
        for seed in [3u64, 17, 29] {
            let mut first_rng = StdRng::seed_from_u64(seed);
            let first = world(&mut first_rng);
            let inbound = random_inbound(&mut first_rng);
            let mut second_rng = StdRng::seed_from_u64(seed);
            let second = world(&mut second_rng);

            let a = first.execute(&executor(), inbound.clone());
            let b = second.execute(&executor(), inbound);
            assert_eq!(a, b, "seed {seed}");
        }
    }
}
