use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::mpsc;

use super::{AccountTracker, CaseLog, ScenarioContext};
use crate::accounts;
use crate::executor::TransferOutcome;
use crate::models::TestCase;
use crate::network::TransferRequest;

/// One sender reuses a single nonce for every receiver; exactly one transfer
/// may land
pub(super) async fn run(
    ctx: &ScenarioContext,
    tracker: &mut AccountTracker,
    case: &mut TestCase,
) -> Result<()> {
    let log = CaseLog::new(case);
    let params = case.parameters.clone();
    let receiver_count = case.receiver_count();

    let funding = ctx
        .funding
        .funding_amount(params.from_shard_id, params.amount, receiver_count)
        .await;

    let sender = ctx
        .funding
        .generate_and_fund_account(
            &case.account_name("Sender"),
            params.from_shard_id,
            params.from_shard_id,
            funding,
        )
        .await?;
    tracker.track(sender.clone(), params.from_shard_id);
    log.log(format!("Generated and funded sender {} with {} token(s)", sender, funding));

    let receivers =
        accounts::generate_many(&ctx.network, receiver_count, &case.account_name("Receiver")).await;
    for receiver in &receivers {
        tracker.track(receiver.clone(), params.to_shard_id);
    }

    let nonce = match params.fixed_nonce() {
        Some(nonce) => nonce,
        None => ctx
            .network
            .current_nonce(&sender.address, params.from_shard_id)
            .await
            .with_context(|| format!("Failed to fetch nonce of {sender}"))?,
    };
    log.log(format!(
        "Sending to {} receiver(s) with the shared nonce {}",
        receivers.len(),
        nonce
    ));

    let (tx, mut rx) = mpsc::channel::<(TransferRequest, TransferOutcome)>(receiver_count as usize);
    let mut handles = Vec::new();

    for receiver in receivers {
        let request = TransferRequest::new(
            &sender.address,
            params.from_shard_id,
            &receiver.address,
            params.to_shard_id,
            params.amount,
        )
        .with_nonce(Some(nonce))
        .with_gas_price(params.gas_price)
        .with_data(params.payload())
        .with_confirmation_wait(params.confirmation_wait_time);

        let retry = ctx.retry.clone();
        let tx = tx.clone();

        handles.push(tokio::spawn(async move {
            let outcome = retry.attempt(&request, 1).await;
            let _ = tx.send((request, outcome)).await;
        }));
    }

    join_all(handles).await;
    drop(tx);

    let mut outcomes = 0u32;
    let mut successes = 0u32;
    while let Some((request, outcome)) = rx.recv().await {
        outcomes += 1;
        if outcome.success {
            successes += 1;
        }
        case.transactions.push(outcome.to_transaction(&request));
    }

    log.log(format!(
        "{} of {} transfer(s) with nonce {} succeeded",
        successes, outcomes, nonce
    ));

    case.result = outcomes == receiver_count && successes == 1;
    Ok(())
}
