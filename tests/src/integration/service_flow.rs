//! # Service Flow
//!
//! Drives the async facade the way a block producer would: consecutive
//! blocks, messages carried from one block's output into the next, and
//! simulations against committed state.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use shard_execution::prelude::*;
    use shard_telemetry::{init_logging, TelemetryConfig};
    use std::sync::Arc;
    use uuid::Uuid;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn forwarder() -> Address {
        addr(1, 0x0a)
    }

    fn service(ledger: &Ledger, config: EngineConfig) -> ShardExecutionService {
        ShardExecutionService::new(
            BlockExecutor::new(engine_with(config)),
            ledger.store(),
            ServiceConfig::default(),
        )
    }

    fn block_at(number: u64) -> BlockContext {
        BlockContext::new(ShardId(1), number, U256::from(PRICE))
    }

    fn init_test_logging() {
        let config = TelemetryConfig {
            log_level: "shard_execution=debug".to_string(),
            console_output: false,
            ..TelemetryConfig::for_shard(1)
        };
        // Another test may have installed the subscriber already.
        let _ = init_logging(&config);
    }

    // =============================================================================
    // BLOCK SEQUENCES
    // =============================================================================

    #[tokio::test]
    async fn test_deferred_messages_run_in_next_block() {
        init_test_logging();
        let _span = shard_telemetry::shard_span!(1u16).entered();
        let sink = addr(1, 0x30);
        let ledger = Ledger::new(&[
            contract(forwarder(), FORWARDER, 0),
            contract(sink, SINK, 0),
        ]);
        let service = service(
            &ledger,
            EngineConfig {
                same_block_delivery: false,
                ..EngineConfig::default()
            },
        );

        let plan = Plan::new().call(ForwardKind::Remaining, sink, 0, 40);
        let first = service
            .execute_block(
                block_at(1),
                vec![Message::internal(addr(2, 0x99), forwarder())
                    .with_value(U256::from(100))
                    .with_fee_credit(budget())
                    .with_data(plan.encode())],
            )
            .await
            .unwrap();
        assert_eq!(first.processed_count(), 1);
        let deferred: Vec<Message> = first
            .out_messages
            .iter()
            .filter(|m| m.destination_shard() == ShardId(1))
            .cloned()
            .collect();
        assert_eq!(deferred.len(), 1);
        assert_eq!(ledger.balance(sink), U256::zero());

        let second = service.execute_block(block_at(2), deferred).await.unwrap();
        assert!(second.receipts[0].success, "{}", second.receipts[0].error_message);
        assert_eq!(ledger.balance(sink), U256::from(40));

        let stats = service.stats().await;
        assert_eq!(stats.blocks_executed, 2);
        assert_eq!(stats.messages_processed, 2);
        assert_eq!(stats.failed_messages, 0);
    }

    #[tokio::test]
    async fn test_request_is_answered_with_budget() {
        let remote = addr(2, 0x50);
        let ledger = Ledger::new(&[contract(forwarder(), FORWARDER, 0)]);
        let service = service(&ledger, EngineConfig::default());

        // A request arriving from another shard is answered with a response
        // that carries the unused budget back.
        let request = Message::internal(remote, forwarder())
            .with_flags(MessageFlags::REQUEST)
            .with_request_id(9)
            .with_fee_credit(budget());
        let output = service.execute_block(block_at(1), vec![request]).await.unwrap();
        let receipt = &output.receipts[0];
        assert!(receipt.success, "{}", receipt.error_message);
        assert!(!receipt.refunded);

        let response = output
            .out_messages
            .iter()
            .find(|m| m.flags.contains(MessageFlags::RESPONSE))
            .unwrap();
        assert_eq!(response.to, remote);
        assert_eq!(response.request_id, 9);
        assert_eq!(response.fee_credit, budget() - receipt.fee());
    }

    // =============================================================================
    // SIMULATION AND QUERIES
    // =============================================================================

    #[tokio::test]
    async fn test_simulation_matches_execution_without_committing() {
        let ledger = Ledger::new(&[contract(forwarder(), FORWARDER, 0)]);
        let service = service(&ledger, EngineConfig::default());
        let root = service.state_root().await.unwrap();

        let plan = Plan::new().call(ForwardKind::Percentage, addr(2, 0x0b), 25, 5);
        let msg = Message::internal(addr(2, 0x99), forwarder())
            .with_value(U256::from(50))
            .with_fee_credit(budget())
            .with_data(plan.encode());

        let simulated = service.simulate_message(block_at(1), msg.clone()).await.unwrap();
        assert_eq!(service.state_root().await.unwrap(), root);
        assert_eq!(ledger.balance(forwarder()), U256::zero());

        let executed = service.execute_block(block_at(1), vec![msg]).await.unwrap();
        assert_eq!(executed.receipts[0], simulated);
        assert_ne!(service.state_root().await.unwrap(), root);

        let account = service.account(forwarder()).await.unwrap().unwrap();
        assert_eq!(account.balance, U256::from(45));
        assert_eq!(account.seqno, 1);
    }

    #[tokio::test]
    async fn test_admission_errors_reach_caller() {
        let ledger = Ledger::new(&[]);
        let service = ShardExecutionService::new(
            BlockExecutor::new(engine_with(EngineConfig::default())),
            ledger.store(),
            ServiceConfig {
                max_inbound_messages: 2,
            },
        );
        let msg = Message::internal(addr(2, 0x99), addr(1, 0x01)).with_value(U256::one());

        let err = service
            .handle_execute_block(Uuid::new_v4(), block_at(1), vec![msg.clone(); 3])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TooManyMessages { count: 3, max: 2 }));

        let other = BlockContext::new(ShardId(2), 1, U256::one());
        let err = service.execute_block(other, vec![msg]).await.unwrap_err();
        assert!(matches!(err, ServiceError::WrongShard { expected: 1, actual: 2 }));
        assert_eq!(service.stats().await.rejected_requests, 2);
    }

    #[tokio::test]
    async fn test_service_shared_across_tasks() {
        let ledger = Ledger::new(&[]);
        let service = Arc::new(service(&ledger, EngineConfig::default()));
        let target = addr(1, 0x01);

        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let msg = Message::internal(addr(2, 0x99), target)
                        .with_seqno(i)
                        .with_value(U256::from(10));
                    service.execute_block(block_at(i + 1), vec![msg]).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(ledger.balance(target), U256::from(80));
        assert_eq!(service.stats().await.blocks_executed, 8);
    }
}
