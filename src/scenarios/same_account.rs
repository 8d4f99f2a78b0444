use anyhow::{Context, Result};

use super::{AccountTracker, CaseLog, ScenarioContext};
use crate::models::{Amount, TestCase};
use crate::network::TransferRequest;

/// Self-transfer from the funding account; only the fee may be lost
pub(super) async fn run(
    ctx: &ScenarioContext,
    _tracker: &mut AccountTracker,
    case: &mut TestCase,
) -> Result<()> {
    let log = CaseLog::new(case);
    let params = case.parameters.clone();
    let address = ctx.funding.address().to_string();

    let starting = balance(ctx, &address, params.from_shard_id, params.to_shard_id).await?;
    log.log(format!("Starting balance of {}: {}", address, starting));

    let request = TransferRequest::new(
        &address,
        params.from_shard_id,
        &address,
        params.to_shard_id,
        params.amount,
    )
    .with_nonce(params.fixed_nonce())
    .with_gas_price(params.gas_price)
    .with_data(params.payload())
    .with_confirmation_wait(params.confirmation_wait_time);

    log.log(format!("Sending {}", request));
    let outcome = ctx.retry.attempt(&request, ctx.attempts).await;

    let ending = balance(ctx, &address, params.from_shard_id, params.to_shard_id).await?;
    log.log(format!("Ending balance of {}: {}", address, ending));

    case.transactions.push(outcome.to_transaction(&request));
    case.result = outcome.success && ending.saturating_add(ctx.gas_cost) >= starting;
    Ok(())
}

async fn balance(ctx: &ScenarioContext, address: &str, from_shard: u32, to_shard: u32) -> Result<Amount> {
    let mut total = ctx
        .network
        .shard_balance(address, from_shard)
        .await
        .with_context(|| format!("Failed to read balance of {address} on shard {from_shard}"))?;

    if to_shard != from_shard {
        let other = ctx
            .network
            .shard_balance(address, to_shard)
            .await
            .with_context(|| format!("Failed to read balance of {address} on shard {to_shard}"))?;
        total = total.saturating_add(other);
    }

    Ok(total)
}
