//! Core of the SubHub front-end: state store, chain capabilities, the chain data
//! synchronizer and the controller that routes user actions through them.

pub mod amount;
pub mod chain;
pub mod config;
pub mod controller;
pub mod error;
pub mod forms;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod storage;
pub mod store;
pub mod sync;
pub mod videos;

pub use amount::{AmountError, DEFAULT_TOKEN_DECIMALS, TokenAmount};
pub use chain::{
    ChainError, OnChainPlan, OnChainSubscription, PendingTx, PlanCreatedEvent,
    ProviderErrorPayload, SubscriptionLedger, TokenContract, WalletProvider,
    classify_provider_error, parse_hex_quantity,
};
pub use config::{ConfigError, SubHubConfig};
pub use controller::{Controller, Outcome, WalletEvent};
pub use error::ActionError;
pub use forms::{CreatePlanForm, FormError, PublishVideoForm};
pub use model::{
    ActionKind, Address, AddressError, ModalId, Notification, NotificationLevel, Page, Plan,
    PlanProfile, SECONDS_PER_DAY, Session, Subscription, Video,
};
pub use storage::{LocalStore, MemoryStore, PlanProfiles, StorageError, VideoLibrary};
pub use store::{AppAction, AppState, MAX_NOTIFICATIONS, VideoAccess, apply_action, video_access};
pub use sync::ChainSynchronizer;
pub use videos::{embed_url, extract_video_id, thumbnail_url};
