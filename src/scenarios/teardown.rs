use futures::future::join_all;
use tracing::{debug, warn};

use super::ScenarioContext;
use crate::models::{Account, Amount, TestCase};
use crate::network::TransferRequest;

/// Return leftover funds of a test account and remove it
#[derive(Clone, Debug)]
pub struct Teardown {
    pub account_name: String,
    pub from_address: String,
    pub from_shard: u32,
    pub to_address: String,
    pub to_shard: u32,
    pub amount: Amount,
    pub gas_price: u64,
    pub confirmation_wait: u64,
}

/// Send `amount - gas` back in a single attempt, then remove the account
///
/// Never fails: transfer and keystore errors are logged.
pub async fn teardown(ctx: &ScenarioContext, item: &Teardown) {
    match item.amount.checked_sub(ctx.gas_cost) {
        Some(amount) if !amount.is_zero() => {
            let request = TransferRequest::new(
                &item.from_address,
                item.from_shard,
                &item.to_address,
                item.to_shard,
                amount,
            )
            .with_gas_price(item.gas_price)
            .with_confirmation_wait(item.confirmation_wait);

            if !ctx.retry.attempt_transfer(&request, 1).await {
                warn!(
                    "Failed to return {} token(s) from {}",
                    amount, item.account_name
                );
            }
        }
        _ => debug!(
            "Nothing to return from {} after fees",
            item.account_name
        ),
    }

    if let Err(e) = ctx.network.remove_account(&item.account_name).await {
        warn!("Failed to remove account {}: {}", item.account_name, e);
    }
}

/// Tear down every account created by `case`, concurrently
pub(super) async fn teardown_accounts(
    ctx: &ScenarioContext,
    case: &TestCase,
    accounts: Vec<(Account, u32)>,
) {
    let funding_address = ctx.funding.address().to_string();
    let fallback = case.parameters.amount;
    let gas_price = case.parameters.gas_price;
    let confirmation_wait = case.parameters.confirmation_wait_time;

    let handles: Vec<_> = accounts
        .into_iter()
        .map(|(account, shard)| {
            let ctx = ctx.clone();
            let to_address = funding_address.clone();

            tokio::spawn(async move {
                let amount = match ctx.network.shard_balance(&account.address, shard).await {
                    Ok(balance) => balance,
                    Err(e) => {
                        debug!("Balance of {} unavailable ({}), using case amount", account, e);
                        fallback
                    }
                };

                let item = Teardown {
                    account_name: account.name,
                    from_address: account.address,
                    from_shard: shard,
                    to_address,
                    to_shard: shard,
                    amount,
                    gas_price,
                    confirmation_wait,
                };
                teardown(&ctx, &item).await;
            })
        })
        .collect();

    join_all(handles).await;
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::network::mock::MockNetwork;
    use std::sync::Arc;

    fn item(name: &str, address: &str, amount: Amount) -> Teardown {
        Teardown {
            account_name: name.to_string(),
            from_address: address.to_string(),
            from_shard: 0,
            to_address: FUNDER.to_string(),
            to_shard: 0,
            amount,
            gas_price: 1,
            confirmation_wait: 0,
        }
    }

    #[tokio::test]
    async fn test_teardown_returns_funds_and_removes() {
        let gas = Amount::from_atto(100);
        let mock = Arc::new(MockNetwork::new(1, gas).with_account("tmp", "one1tmp"));
        mock.set_balance("one1tmp", 0, Amount::from_tokens(3));
        let ctx = context(mock.clone(), gas, Amount::ZERO).await;

        teardown(&ctx, &item("tmp", "one1tmp", Amount::from_tokens(3))).await;

        assert!(!mock.has_account("tmp"));
        assert_eq!(
            mock.balance(FUNDER, 0),
            Amount::from_tokens(3).saturating_sub(gas)
        );
        assert_eq!(mock.balance("one1tmp", 0), Amount::ZERO);
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let mock = Arc::new(MockNetwork::new(1, Amount::ZERO).with_account("tmp", "one1tmp"));
        let ctx = context(mock.clone(), Amount::ZERO, Amount::ZERO).await;

        let item = item("tmp", "one1tmp", Amount::ZERO);
        teardown(&ctx, &item).await;
        teardown(&ctx, &item).await;

        assert!(!mock.has_account("tmp"));
        assert_eq!(mock.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_teardown_skips_transfer_below_fee() {
        let gas = Amount::from_atto(100);
        let mock = Arc::new(MockNetwork::new(1, gas).with_account("tmp", "one1tmp"));
        let ctx = context(mock.clone(), gas, Amount::ZERO).await;

        teardown(&ctx, &item("tmp", "one1tmp", Amount::from_atto(100))).await;

        assert_eq!(mock.submit_calls(), 0);
        assert!(!mock.has_account("tmp"));
    }

    #[tokio::test]
    async fn test_teardown_swallows_transfer_errors() {
        let mock = Arc::new(
            MockNetwork::new(1, Amount::ZERO)
                .with_account("tmp", "one1tmp")
                .always_failing(),
        );
        let ctx = context(mock.clone(), Amount::ZERO, Amount::ZERO).await;

        teardown(&ctx, &item("tmp", "one1tmp", Amount::from_tokens(1))).await;

        assert_eq!(mock.submit_calls(), 1);
        assert!(!mock.has_account("tmp"));
    }
}
