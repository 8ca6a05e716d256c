use crate::chain::ChainError;
use crate::forms::FormError;
use crate::model::{ActionKind, Address};
use crate::storage::StorageError;

/// Failure of a user-triggered operation. Always ends up as a notification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("Insufficient balance: you have {balance} but this plan costs {price}.")]
    InsufficientBalance { balance: String, price: String },
    #[error("Connect your wallet first.")]
    NotConnected,
    #[error("The wallet did not return any accounts.")]
    NoAccounts,
    #[error("No active plan found for {0}.")]
    PlanNotFound(Address),
    #[error("{0}")]
    Form(#[from] FormError),
    #[error("Could not save to this device: {0}")]
    Storage(#[from] StorageError),
    #[error("A {} request is still running.", .0.as_str())]
    Busy(ActionKind),
}

impl ActionError {
    /// User rejections are expected outcomes, not failures worth a warning log.
    #[must_use]
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::Chain(ChainError::UserRejected))
    }
}
