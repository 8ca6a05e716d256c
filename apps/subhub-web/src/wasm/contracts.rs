use super::*;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use subhub_core::{
    Address, OnChainPlan, OnChainSubscription, PendingTx, PlanCreatedEvent, ProviderErrorPayload,
    SubscriptionLedger, TokenAmount, TokenContract,
};

// Contract calls go through a small ethers module; every function resolves to a
// string (JSON for structs, decimal for integers) and rejects with a JSON
// `{ code, message, reason }` payload.
#[wasm_bindgen(module = "/js/subhub_contracts.js")]
extern "C" {
    #[wasm_bindgen(catch, js_name = tokenBalanceOf)]
    async fn token_balance_of(token: &str, owner: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = tokenAllowance)]
    async fn token_allowance(token: &str, owner: &str, spender: &str)
    -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = tokenApprove)]
    async fn token_approve(token: &str, spender: &str, amount: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = waitForTransaction)]
    async fn wait_for_transaction(hash: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = ledgerCreatePlan)]
    async fn ledger_create_plan(ledger: &str, price: &str, duration: &str)
    -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = ledgerSubscribe)]
    async fn ledger_subscribe(ledger: &str, creator: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = ledgerRenew)]
    async fn ledger_renew(ledger: &str, creator: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = ledgerPlan)]
    async fn ledger_plan(ledger: &str, creator: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = ledgerSubscription)]
    async fn ledger_subscription(ledger: &str, user: &str, creator: &str)
    -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = ledgerTimeRemaining)]
    async fn ledger_time_remaining(ledger: &str, user: &str, creator: &str)
    -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = latestBlockNumber)]
    async fn latest_block_number() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = ledgerPlanCreatedEvents)]
    async fn ledger_plan_created_events(ledger: &str, from: &str, to: &str)
    -> Result<JsValue, JsValue>;
}

pub(super) struct JsContracts {
    token: String,
    ledger: String,
}

impl JsContracts {
    pub(super) fn new(config: &SubHubConfig) -> Self {
        Self {
            token: config.token_address.to_string(),
            ledger: config.ledger_address.to_string(),
        }
    }
}

fn contract_error(error: JsValue) -> ChainError {
    let Some(raw) = error.as_string() else {
        return ChainError::Transport("contract call failed".to_string());
    };
    match serde_json::from_str::<ProviderErrorPayload>(&raw) {
        Ok(payload) => payload.into(),
        Err(_) => ChainError::Transport(raw),
    }
}

fn text(value: JsValue, what: &str) -> Result<String, ChainError> {
    value
        .as_string()
        .ok_or_else(|| ChainError::Decode(format!("{what} did not return a string")))
}

fn decode<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, ChainError> {
    let raw = text(value, what)?;
    serde_json::from_str(&raw).map_err(|error| ChainError::Decode(format!("{what}: {error}")))
}

fn amount(value: JsValue, what: &str) -> Result<TokenAmount, ChainError> {
    let raw = text(value, what)?;
    TokenAmount::parse_base_units(&raw)
        .map_err(|error| ChainError::Decode(format!("{what}: {error}")))
}

fn integer(value: JsValue, what: &str) -> Result<u64, ChainError> {
    let raw = text(value, what)?;
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ChainError::Decode(format!("{what}: expected an integer, got {raw:?}")))
}

fn pending(value: JsValue, what: &str) -> Result<PendingTx, ChainError> {
    Ok(PendingTx {
        hash: text(value, what)?,
    })
}

async fn confirm(tx: &PendingTx) -> Result<(), ChainError> {
    wait_for_transaction(&tx.hash)
        .await
        .map_err(contract_error)?;
    Ok(())
}

#[async_trait(?Send)]
impl TokenContract for JsContracts {
    async fn balance_of(&self, owner: &Address) -> Result<TokenAmount, ChainError> {
        let value = token_balance_of(&self.token, owner.as_str())
            .await
            .map_err(contract_error)?;
        amount(value, "balanceOf")
    }

    async fn allowance(
        &self,
        owner: &Address,
        spender: &Address,
    ) -> Result<TokenAmount, ChainError> {
        let value = token_allowance(&self.token, owner.as_str(), spender.as_str())
            .await
            .map_err(contract_error)?;
        amount(value, "allowance")
    }

    async fn approve(
        &self,
        spender: &Address,
        amount: TokenAmount,
    ) -> Result<PendingTx, ChainError> {
        let value = token_approve(&self.token, spender.as_str(), &amount.base_units().to_string())
            .await
            .map_err(contract_error)?;
        pending(value, "approve")
    }

    async fn wait_for_confirmation(&self, tx: &PendingTx) -> Result<(), ChainError> {
        confirm(tx).await
    }
}

#[async_trait(?Send)]
impl SubscriptionLedger for JsContracts {
    async fn create_plan(
        &self,
        price: TokenAmount,
        duration_seconds: u64,
    ) -> Result<PendingTx, ChainError> {
        let value = ledger_create_plan(
            &self.ledger,
            &price.base_units().to_string(),
            &duration_seconds.to_string(),
        )
        .await
        .map_err(contract_error)?;
        pending(value, "createPlan")
    }

    async fn subscribe(&self, creator: &Address) -> Result<PendingTx, ChainError> {
        let value = ledger_subscribe(&self.ledger, creator.as_str())
            .await
            .map_err(contract_error)?;
        pending(value, "subscribe")
    }

    async fn renew(&self, creator: &Address) -> Result<PendingTx, ChainError> {
        let value = ledger_renew(&self.ledger, creator.as_str())
            .await
            .map_err(contract_error)?;
        pending(value, "renew")
    }

    async fn wait_for_confirmation(&self, tx: &PendingTx) -> Result<(), ChainError> {
        confirm(tx).await
    }

    async fn plan(&self, creator: &Address) -> Result<OnChainPlan, ChainError> {
        let value = ledger_plan(&self.ledger, creator.as_str())
            .await
            .map_err(contract_error)?;
        decode(value, "plans")
    }

    async fn subscription(
        &self,
        user: &Address,
        creator: &Address,
    ) -> Result<OnChainSubscription, ChainError> {
        let value = ledger_subscription(&self.ledger, user.as_str(), creator.as_str())
            .await
            .map_err(contract_error)?;
        decode(value, "subscriptions")
    }

    async fn time_remaining(&self, user: &Address, creator: &Address) -> Result<u64, ChainError> {
        let value = ledger_time_remaining(&self.ledger, user.as_str(), creator.as_str())
            .await
            .map_err(contract_error)?;
        integer(value, "timeRemaining")
    }

    async fn latest_block(&self) -> Result<u64, ChainError> {
        let value = latest_block_number().await.map_err(contract_error)?;
        integer(value, "blockNumber")
    }

    async fn plan_created_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<PlanCreatedEvent>, ChainError> {
        let value = ledger_plan_created_events(
            &self.ledger,
            &from_block.to_string(),
            &to_block.to_string(),
        )
        .await
        .map_err(contract_error)?;
        decode(value, "PlanCreated")
    }
}
