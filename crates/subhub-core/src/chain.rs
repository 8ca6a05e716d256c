//! Capabilities the front-end needs from the wallet and the two contracts.
//!
//! Everything here is implemented outside this crate: by the browser wallet and a
//! contract-call library in the web shell, and by [`crate::mock::MockChain`] in
//! tests. Calls run on a single cooperative thread, so the traits are `?Send`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::amount::TokenAmount;
use crate::model::Address;

/// EIP-1193 "user rejected request".
pub const PROVIDER_CODE_USER_REJECTED: i64 = 4001;
/// MetaMask's "request already pending" (`-32002`).
pub const PROVIDER_CODE_REQUEST_PENDING: i64 = -32002;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("MetaMask not detected. Please install MetaMask.")]
    WalletUnavailable,
    #[error("User rejected the request.")]
    UserRejected,
    #[error("A wallet request is already pending. Open your wallet to continue.")]
    PendingRequest,
    #[error("{}", revert_message(.reason))]
    Reverted { reason: Option<String> },
    #[error("network error: {0}")]
    Transport(String),
    #[error("unexpected response from chain: {0}")]
    Decode(String),
}

fn revert_message(reason: &Option<String>) -> String {
    match reason.as_deref().map(str::trim) {
        Some(reason) if !reason.is_empty() => format!("Transaction failed: {reason}"),
        _ => "Transaction failed.".to_string(),
    }
}

/// Error shape normalized from a provider or contract library exception.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderErrorPayload {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<ProviderErrorPayload> for ChainError {
    fn from(payload: ProviderErrorPayload) -> Self {
        let numeric_code = payload.code.as_ref().and_then(serde_json::Value::as_i64);
        let text_code = payload.code.as_ref().and_then(serde_json::Value::as_str);

        if numeric_code == Some(PROVIDER_CODE_USER_REJECTED) || text_code == Some("ACTION_REJECTED")
        {
            return Self::UserRejected;
        }
        if numeric_code == Some(PROVIDER_CODE_REQUEST_PENDING) {
            return Self::PendingRequest;
        }
        if text_code == Some("CALL_EXCEPTION") || payload.reason.is_some() {
            return Self::Reverted {
                reason: payload.reason,
            };
        }
        if text_code == Some("NETWORK_ERROR") || text_code == Some("TIMEOUT") {
            return Self::Transport(payload.message.unwrap_or_default());
        }
        Self::Reverted {
            reason: payload.message,
        }
    }
}

/// Classifies a bare EIP-1193 `{ code, message }` error from `window.ethereum`.
#[must_use]
pub fn classify_provider_error(code: Option<i64>, message: Option<String>) -> ChainError {
    match code {
        Some(PROVIDER_CODE_USER_REJECTED) => ChainError::UserRejected,
        Some(PROVIDER_CODE_REQUEST_PENDING) => ChainError::PendingRequest,
        _ => ChainError::Transport(message.unwrap_or_else(|| "wallet request failed".to_string())),
    }
}

/// Parses a JSON-RPC hex quantity such as the `eth_chainId` result (`0xaa36a7`).
pub fn parse_hex_quantity(raw: &str) -> Result<u64, ChainError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .filter(|digits| !digits.is_empty())
        .ok_or_else(|| ChainError::Decode(format!("expected a hex quantity, got {trimmed:?}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|_| ChainError::Decode(format!("expected a hex quantity, got {trimmed:?}")))
}

/// Handle for a submitted state-changing request awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainPlan {
    pub price: TokenAmount,
    pub duration: u64,
    pub active: bool,
    pub subscriber_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainSubscription {
    pub start: u64,
    pub expiry: u64,
    pub ever_subscribed: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCreatedEvent {
    pub creator: Address,
    pub price: TokenAmount,
    pub duration: u64,
    pub block_number: u64,
}

#[async_trait(?Send)]
pub trait WalletProvider {
    fn is_available(&self) -> bool;
    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError>;
    async fn chain_id(&self) -> Result<u64, ChainError>;
}

#[async_trait(?Send)]
pub trait TokenContract {
    async fn balance_of(&self, owner: &Address) -> Result<TokenAmount, ChainError>;
    async fn allowance(
        &self,
        owner: &Address,
        spender: &Address,
    ) -> Result<TokenAmount, ChainError>;
    async fn approve(&self, spender: &Address, amount: TokenAmount)
    -> Result<PendingTx, ChainError>;
    async fn wait_for_confirmation(&self, tx: &PendingTx) -> Result<(), ChainError>;
}

#[async_trait(?Send)]
pub trait SubscriptionLedger {
    async fn create_plan(
        &self,
        price: TokenAmount,
        duration_seconds: u64,
    ) -> Result<PendingTx, ChainError>;
    async fn subscribe(&self, creator: &Address) -> Result<PendingTx, ChainError>;
    async fn renew(&self, creator: &Address) -> Result<PendingTx, ChainError>;
    async fn wait_for_confirmation(&self, tx: &PendingTx) -> Result<(), ChainError>;
    async fn plan(&self, creator: &Address) -> Result<OnChainPlan, ChainError>;
    async fn subscription(
        &self,
        user: &Address,
        creator: &Address,
    ) -> Result<OnChainSubscription, ChainError>;
    async fn time_remaining(&self, user: &Address, creator: &Address) -> Result<u64, ChainError>;
    async fn latest_block(&self) -> Result<u64, ChainError>;
    async fn plan_created_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<PlanCreatedEvent>, ChainError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ChainError, ProviderErrorPayload, classify_provider_error, parse_hex_quantity};

    fn payload(value: serde_json::Value) -> Result<ProviderErrorPayload, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn provider_codes_map_to_taxonomy() -> Result<(), serde_json::Error> {
        assert_eq!(
            ChainError::from(payload(json!({"code": 4001, "message": "denied"}))?),
            ChainError::UserRejected
        );
        assert_eq!(
            ChainError::from(payload(json!({"code": "ACTION_REJECTED"}))?),
            ChainError::UserRejected
        );
        assert_eq!(
            ChainError::from(payload(json!({"code": -32002}))?),
            ChainError::PendingRequest
        );
        assert_eq!(
            ChainError::from(payload(json!({"code": "NETWORK_ERROR", "message": "offline"}))?),
            ChainError::Transport("offline".to_string())
        );
        Ok(())
    }

    #[test]
    fn bare_wallet_codes_are_classified() {
        assert_eq!(
            classify_provider_error(Some(4001), None),
            ChainError::UserRejected
        );
        assert_eq!(
            classify_provider_error(Some(-32002), None),
            ChainError::PendingRequest
        );
        assert_eq!(
            classify_provider_error(Some(-32603), Some("internal".to_string())),
            ChainError::Transport("internal".to_string())
        );
    }

    #[test]
    fn hex_quantities_parse() {
        assert_eq!(parse_hex_quantity("0xaa36a7"), Ok(11_155_111));
        assert_eq!(parse_hex_quantity("0x1"), Ok(1));
        assert!(matches!(parse_hex_quantity("0x"), Err(ChainError::Decode(_))));
        assert!(matches!(parse_hex_quantity("11155111"), Err(ChainError::Decode(_))));
    }

    #[test]
    fn revert_reason_is_surfaced_when_present() -> Result<(), serde_json::Error> {
        let error = ChainError::from(payload(
            json!({"code": "CALL_EXCEPTION", "reason": "Plan already active"}),
        )?);
        assert_eq!(error.to_string(), "Transaction failed: Plan already active");

        let generic = ChainError::from(payload(json!({"code": "CALL_EXCEPTION"}))?);
        assert_eq!(generic.to_string(), "Transaction failed.");
        Ok(())
    }
}
