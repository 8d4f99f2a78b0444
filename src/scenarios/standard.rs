use anyhow::{Context, Result};

use super::{AccountTracker, CaseLog, ScenarioContext};
use crate::models::TestCase;
use crate::network::TransferRequest;

/// One funded sender, one fresh receiver, one transfer
pub(super) async fn run(
    ctx: &ScenarioContext,
    tracker: &mut AccountTracker,
    case: &mut TestCase,
) -> Result<()> {
    let log = CaseLog::new(case);
    let params = case.parameters.clone();

    let funding = ctx
        .funding
        .funding_amount(params.from_shard_id, params.amount, case.receiver_count())
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

    let receiver_name = case.account_name("Receiver");
    let receiver = ctx
        .network
        .generate_account(&receiver_name)
        .await
        .with_context(|| format!("Failed to generate account {receiver_name}"))?;
    tracker.track(receiver.clone(), params.to_shard_id);
    log.log(format!("Generated receiver {}", receiver));

    let request = TransferRequest::new(
        &sender.address,
        params.from_shard_id,
        &receiver.address,
        params.to_shard_id,
        params.amount,
    )
    .with_nonce(params.fixed_nonce())
    .with_gas_price(params.gas_price)
    .with_data(params.payload())
    .with_confirmation_wait(params.confirmation_wait_time);

    log.log(format!("Sending {}", request));
    let outcome = ctx.retry.attempt(&request, ctx.attempts).await;
    log.log(format!(
        "Transaction hash: {} - successful: {}",
        outcome.transaction_hash(),
        outcome.success
    ));

    case.transactions.push(outcome.to_transaction(&request));
    case.result = outcome.success;
    Ok(())
}
