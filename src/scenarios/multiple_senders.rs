use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::mpsc;

use super::{AccountTracker, CaseLog, ScenarioContext};
use crate::executor::TransferOutcome;
use crate::models::TestCase;
use crate::network::TransferRequest;

/// Many funded senders pay one receiver concurrently
pub(super) async fn run(
    ctx: &ScenarioContext,
    tracker: &mut AccountTracker,
    case: &mut TestCase,
) -> Result<()> {
    let log = CaseLog::new(case);
    let params = case.parameters.clone();
    let sender_count = case.sender_count();

    let senders = ctx
        .funding
        .generate_and_fund_accounts(
            sender_count,
            &case.account_name("Sender"),
            params.from_shard_id,
            params.from_shard_id,
            params.amount.saturating_add(ctx.gas_cost),
        )
        .await?;
    for sender in &senders {
        tracker.track(sender.clone(), params.from_shard_id);
    }
    log.log(format!(
        "Generated and funded {}/{} sender(s)",
        senders.len(),
        sender_count
    ));

    let receiver_name = case.account_name("Receiver");
    let receiver = ctx
        .network
        .generate_account(&receiver_name)
        .await
        .with_context(|| format!("Failed to generate account {receiver_name}"))?;
    tracker.track(receiver.clone(), params.to_shard_id);

    let starting = ctx
        .network
        .shard_balance(&receiver.address, params.to_shard_id)
        .await
        .with_context(|| format!("Failed to read balance of {receiver}"))?;

    let (tx, mut rx) = mpsc::channel::<(TransferRequest, TransferOutcome)>(sender_count as usize);
    let mut handles = Vec::new();

    for sender in senders {
        let request = TransferRequest::new(
            &sender.address,
            params.from_shard_id,
            &receiver.address,
            params.to_shard_id,
            params.amount,
        )
        .with_gas_price(params.gas_price)
        .with_data(params.payload())
        .with_confirmation_wait(params.confirmation_wait_time);

        let retry = ctx.retry.clone();
        let attempts = ctx.attempts;
        let tx = tx.clone();

        handles.push(tokio::spawn(async move {
            let outcome = retry.attempt(&request, attempts).await;
            let _ = tx.send((request, outcome)).await;
        }));
    }

    join_all(handles).await;
    drop(tx);

    let mut successes = 0u32;
    while let Some((request, outcome)) = rx.recv().await {
        if outcome.success {
            successes += 1;
        }
        case.transactions.push(outcome.to_transaction(&request));
    }

    let ending = ctx
        .network
        .shard_balance(&receiver.address, params.to_shard_id)
        .await
        .with_context(|| format!("Failed to read balance of {receiver}"))?;

    let expected = params.amount.times(sender_count as u64);
    let received = ending.saturating_sub(starting);
    log.log(format!(
        "{}/{} transfer(s) succeeded, receiver got {} of {} token(s)",
        successes, sender_count, received, expected
    ));

    case.result = successes == sender_count && received == expected;
    Ok(())
}
