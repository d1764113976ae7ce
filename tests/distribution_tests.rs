mod common;

use alloy::{primitives::U256, sol_types::SolCall};
use common::*;
use token_splitter::{
    distribution::orchestrator::custodial::{distributeAllCall, distributeCall},
    errors::{ScanError, SplitterError, TransactionError},
    types::{Confirmation, DiscoveredTokenSet, DistributionOutcome},
};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn amounts(result: &token_splitter::types::SplitBreakdown) -> Vec<U256> {
    result.allocations.iter().map(|a| a.amount).collect()
}

#[tokio::test]
async fn test_distribute_one_confirms_and_reports_split() {
    let usdc = token_address(1);
    let chain = MockChain::default().with_token(usdc, MockToken::erc20("USDC", 6, 1_000_000), 1);

    // stale balance; the live snapshot must win
    let token = token_info(usdc, "USDC", 6, 7);
    let result = distributor(false).distribute_one(&chain, &token).await;

    assert_eq!(result.outcome, DistributionOutcome::Success);
    assert!(result.tx_hash.is_some());
    assert_eq!(result.token.raw_balance, U256::from(1_000_000u64));
    assert_eq!(
        amounts(&result.expected_breakdown),
        vec![
            U256::from(500_000u64),
            U256::from(300_000u64),
            U256::from(200_000u64)
        ]
    );
    assert_eq!(result.expected_breakdown.remainder, U256::ZERO);
    assert_eq!(
        result.explorer_url("https://basescan.org/tx/"),
        result.tx_hash.map(|h| format!("https://basescan.org/tx/{h}"))
    );

    let submissions = chain.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].to, CUSTODIAL);
    let call = distributeCall::abi_decode(&submissions[0].input).unwrap();
    assert_eq!(call.token, usdc);
}

#[tokio::test]
async fn test_reverted_receipt_is_a_failure_without_breakdown() {
    let token = token_address(1);
    let chain = MockChain::default()
        .with_token(token, MockToken::erc20("T", 18, 100), 1)
        .with_receipt(
            token,
            Confirmation::Reverted {
                block_number: Some(1_000),
            },
        );

    let result = distributor(false)
        .distribute_one(&chain, &token_info(token, "T", 18, 100))
        .await;

    assert_eq!(
        result.outcome,
        DistributionOutcome::Failed(TransactionError::Reverted {
            reason: "receipt status 0 in block 1000".to_string()
        })
    );
    assert!(result.tx_hash.is_some());
    assert!(result.expected_breakdown.allocations.is_empty());
}

#[tokio::test]
async fn test_missing_receipt_times_out() {
    let token = token_address(1);
    let chain = MockChain::default()
        .with_token(token, MockToken::erc20("T", 18, 100), 1)
        .with_receipt(token, Confirmation::TimedOut);

    let result = distributor(false)
        .distribute_one(&chain, &token_info(token, "T", 18, 100))
        .await;

    assert_eq!(result.outcome, DistributionOutcome::TimedOut);
    assert!(result.tx_hash.is_some());
    assert!(!result.is_success());
}

#[tokio::test]
async fn test_rejected_submission_has_no_hash() {
    let token = token_address(1);
    let chain = MockChain::default()
        .with_token(token, MockToken::erc20("T", 18, 100), 1)
        .fail_submission(token, reverted());

    let result = distributor(false)
        .distribute_one(&chain, &token_info(token, "T", 18, 100))
        .await;

    assert_eq!(result.tx_hash, None);
    assert!(matches!(
        result.outcome,
        DistributionOutcome::Failed(TransactionError::Reverted { .. })
    ));
    assert!(chain.submissions().is_empty());
}

#[tokio::test]
async fn test_batch_keeps_order_and_survives_failures() {
    let (a, b, c) = (token_address(1), token_address(2), token_address(3));
    let chain = MockChain::default()
        .with_token(a, MockToken::erc20("A", 18, 10), 1)
        .with_token(b, MockToken::erc20("B", 18, 20), 2)
        .with_token(c, MockToken::erc20("C", 18, 30), 3)
        .fail_submission(b, reverted());
    let tokens: DiscoveredTokenSet = [
        token_info(a, "A", 18, 10),
        token_info(b, "B", 18, 20),
        token_info(c, "C", 18, 30),
    ]
    .into_iter()
    .collect();

    let report = assert_ok!(
        distributor(true)
            .distribute_all(&chain, &tokens, &CancellationToken::new())
            .await
    );

    let order: Vec<_> = report.results.iter().map(|r| r.token.address).collect();
    assert_eq!(order, vec![a, b, c]);
    assert!(report.results[0].is_success());
    assert!(!report.results[1].is_success());
    assert!(report.results[2].is_success());
    assert_eq!((report.succeeded(), report.failed()), (2, 1));

    let submitted: Vec<_> = chain
        .submissions()
        .iter()
        .map(|s| s.tokens.clone())
        .collect();
    assert_eq!(submitted, vec![vec![a], vec![c]]);

    // distributed balances are gone; the failed token is still held
    let refreshed = report.refreshed.unwrap();
    assert_eq!(refreshed.addresses(), vec![b]);
}

#[tokio::test]
async fn test_lost_connection_halts_batch_with_partial_results() {
    let (a, b, c) = (token_address(1), token_address(2), token_address(3));
    let chain = MockChain::default()
        .with_token(a, MockToken::erc20("A", 18, 10), 1)
        .with_token(b, MockToken::erc20("B", 18, 20), 2)
        .with_token(c, MockToken::erc20("C", 18, 30), 3)
        .drop_connection_after(1);
    let tokens: DiscoveredTokenSet = [
        token_info(a, "A", 18, 10),
        token_info(b, "B", 18, 20),
        token_info(c, "C", 18, 30),
    ]
    .into_iter()
    .collect();

    let err = assert_err!(
        distributor(false)
            .distribute_all(&chain, &tokens, &CancellationToken::new())
            .await
    );

    assert!(err.is_connection_lost());
    match err {
        SplitterError::BatchHalted { completed, .. } => {
            assert_eq!(completed.len(), 2);
            assert!(completed[0].is_success());
            assert!(completed[1].outcome.is_connection_lost());
        }
        other => panic!("expected halted batch, got {other}"),
    }
    assert_eq!(chain.submissions().len(), 1);
}

#[tokio::test]
async fn test_lost_connection_during_refresh_halts_batch() {
    let (a, b) = (token_address(1), token_address(2));
    let chain = MockChain::default()
        .with_token(a, MockToken::erc20("A", 18, 10), 1)
        .with_token(b, MockToken::erc20("B", 18, 20), 2)
        .drop_connection_after(1);
    let tokens: DiscoveredTokenSet = [token_info(a, "A", 18, 10), token_info(b, "B", 18, 20)]
        .into_iter()
        .collect();

    let err = assert_err!(
        distributor(true)
            .distribute_all(&chain, &tokens, &CancellationToken::new())
            .await
    );

    match err {
        SplitterError::BatchHalted { completed, source } => {
            assert_eq!(completed.len(), 1);
            assert!(completed[0].is_success());
            assert!(source.is_connection_lost());
        }
        other => panic!("expected halted batch, got {other}"),
    }
}

#[tokio::test]
async fn test_cancelled_batch_submits_nothing() {
    let (a, b, c) = (token_address(1), token_address(2), token_address(3));
    let chain = MockChain::default()
        .with_token(a, MockToken::erc20("A", 18, 10), 1)
        .with_token(b, MockToken::erc20("B", 18, 20), 2)
        .with_token(c, MockToken::erc20("C", 18, 30), 3);
    let tokens: DiscoveredTokenSet = [
        token_info(a, "A", 18, 10),
        token_info(b, "B", 18, 20),
        token_info(c, "C", 18, 30),
    ]
    .into_iter()
    .collect();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = assert_err!(distributor(true).distribute_all(&chain, &tokens, &cancel).await);

    assert!(!err.is_connection_lost());
    match err {
        SplitterError::BatchHalted { completed, source } => {
            assert!(completed.is_empty());
            assert!(matches!(*source, SplitterError::Scan(ScanError::Cancelled)));
        }
        other => panic!("expected halted batch, got {other}"),
    }
    assert!(chain.submissions().is_empty());
}

#[tokio::test]
async fn test_lost_receipt_tracking_halts_batch() {
    let (a, b) = (token_address(1), token_address(2));
    let chain = MockChain::default()
        .with_token(a, MockToken::erc20("A", 18, 10), 1)
        .with_token(b, MockToken::erc20("B", 18, 20), 2)
        .with_receipt_error(a, transport_down());
    let tokens: DiscoveredTokenSet = [token_info(a, "A", 18, 10), token_info(b, "B", 18, 20)]
        .into_iter()
        .collect();

    let err = assert_err!(
        distributor(false)
            .distribute_all(&chain, &tokens, &CancellationToken::new())
            .await
    );

    assert!(err.is_connection_lost());
    match err {
        SplitterError::BatchHalted { completed, .. } => {
            assert_eq!(completed.len(), 1);
            // the transaction went out, so its hash is kept for checking
            assert!(completed[0].tx_hash.is_some());
            assert!(matches!(
                completed[0].outcome,
                DistributionOutcome::Failed(TransactionError::ConnectionLost(_))
            ));
        }
        other => panic!("expected halted batch, got {other}"),
    }
    assert_eq!(chain.submissions().len(), 1);
}

#[tokio::test]
async fn test_contract_batch_snapshots_every_token() {
    let (a, b) = (token_address(1), token_address(2));
    let chain = MockChain::default()
        .with_token(a, MockToken::erc20("A", 6, 1_000_000), 1)
        .with_token(b, MockToken::erc20("B", 0, 7), 2);
    let tokens: DiscoveredTokenSet = [token_info(a, "A", 6, 1), token_info(b, "B", 0, 1)]
        .into_iter()
        .collect();

    let result = distributor(false)
        .distribute_contract_batch(&chain, &tokens)
        .await;

    assert!(result.outcome.is_success());
    assert_eq!(result.tokens.len(), 2);
    let (first, first_split) = &result.tokens[0];
    assert_eq!(first.address, a);
    assert_eq!(first_split.allocations[0].amount, U256::from(500_000u64));
    let (_, second_split) = &result.tokens[1];
    assert_eq!(
        amounts(second_split),
        vec![U256::from(3u64), U256::from(2u64), U256::from(1u64)]
    );
    assert_eq!(second_split.remainder, U256::from(1u64));

    let submissions = chain.submissions();
    assert_eq!(submissions.len(), 1);
    assert!(distributeAllCall::abi_decode(&submissions[0].input).is_ok());
}

#[tokio::test]
async fn test_reverted_contract_batch_has_no_breakdowns() {
    let a = token_address(1);
    let chain = MockChain::default()
        .with_token(a, MockToken::erc20("A", 6, 1_000_000), 1)
        .with_contract_receipt(Confirmation::Reverted { block_number: None });
    let tokens: DiscoveredTokenSet = [token_info(a, "A", 6, 1_000_000)].into_iter().collect();

    let result = distributor(false)
        .distribute_contract_batch(&chain, &tokens)
        .await;

    assert_eq!(
        result.outcome,
        DistributionOutcome::Failed(TransactionError::Reverted {
            reason: "receipt status 0".to_string()
        })
    );
    assert!(result.tokens[0].1.allocations.is_empty());
}
