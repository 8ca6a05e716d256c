//! Application state and the reducer every mutation goes through.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::amount::TokenAmount;
use crate::model::{
    ActionKind, Address, ModalId, Notification, NotificationLevel, Page, Plan, Session,
    Subscription, Video,
};

pub const MAX_NOTIFICATIONS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppState {
    pub session: Option<Session>,
    pub plans: Vec<Plan>,
    pub subscriptions: Vec<Subscription>,
    pub videos: Vec<Video>,
    pub page: Page,
    pub modal: Option<ModalId>,
    pub notifications: Vec<Notification>,
    pub in_flight: BTreeSet<ActionKind>,
    pub wallet_detected: bool,
    next_notification_id: u64,
}

impl AppState {
    #[must_use]
    pub fn account(&self) -> Option<&Address> {
        self.session.as_ref().map(|session| &session.account)
    }

    #[must_use]
    pub fn plan_for(&self, creator: &Address) -> Option<&Plan> {
        self.plans.iter().find(|plan| &plan.creator == creator)
    }

    #[must_use]
    pub fn subscription_for(&self, creator: &Address) -> Option<&Subscription> {
        self.subscriptions
            .iter()
            .find(|subscription| &subscription.creator == creator)
    }

    #[must_use]
    pub fn is_in_flight(&self, kind: ActionKind) -> bool {
        self.in_flight.contains(&kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoAccess {
    /// The connected account published it.
    Owned,
    Unlocked,
    Locked,
}

/// Access is granted only by an active subscription whose plan is in the current
/// plan list; a subscription pointing at a missing plan counts as locked.
#[must_use]
pub fn video_access(state: &AppState, video: &Video) -> VideoAccess {
    if state.account() == Some(&video.creator) {
        return VideoAccess::Owned;
    }
    let Some(plan) = state.plan_for(&video.plan) else {
        return VideoAccess::Locked;
    };
    match state.subscription_for(&plan.creator) {
        Some(subscription) if subscription.active => VideoAccess::Unlocked,
        _ => VideoAccess::Locked,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    WalletDetected { available: bool },
    SessionConnected { session: Session },
    SessionCleared,
    BalanceUpdated { balance: TokenAmount },
    PlansLoaded { plans: Vec<Plan> },
    SubscriptionsLoaded { subscriptions: Vec<Subscription> },
    VideosLoaded { videos: Vec<Video> },
    Navigate { page: Page },
    OpenModal { modal: ModalId },
    CloseModal,
    Notify { level: NotificationLevel, message: String },
    DismissNotification { id: u64 },
    ActionStarted { kind: ActionKind },
    ActionFinished { kind: ActionKind },
}

/// Applies `action`, returning whether the state changed.
pub fn apply_action(state: &mut AppState, action: AppAction) -> bool {
    match action {
        AppAction::WalletDetected { available } => {
            let changed = state.wallet_detected != available;
            state.wallet_detected = available;
            changed
        }
        AppAction::SessionConnected { session } => {
            let account_changed = state.account() != Some(&session.account);
            if account_changed {
                state.subscriptions.clear();
            }
            state.session = Some(session);
            true
        }
        AppAction::SessionCleared => {
            let changed = state.session.is_some() || !state.subscriptions.is_empty();
            state.session = None;
            state.subscriptions.clear();
            changed
        }
        AppAction::BalanceUpdated { balance } => match state.session.as_mut() {
            Some(session) if session.balance != balance => {
                session.balance = balance;
                true
            }
            _ => false,
        },
        AppAction::PlansLoaded { plans } => {
            state.plans = plans;
            true
        }
        AppAction::SubscriptionsLoaded { subscriptions } => {
            state.subscriptions = subscriptions;
            true
        }
        AppAction::VideosLoaded { videos } => {
            state.videos = videos;
            true
        }
        AppAction::Navigate { page } => {
            if state.page == page {
                return false;
            }
            state.page = page;
            true
        }
        AppAction::OpenModal { modal } => {
            let changed = state.modal != Some(modal);
            state.modal = Some(modal);
            changed
        }
        AppAction::CloseModal => state.modal.take().is_some(),
        AppAction::Notify { level, message } => {
            state.next_notification_id += 1;
            state.notifications.push(Notification {
                id: state.next_notification_id,
                level,
                message,
            });
            let overflow = state.notifications.len().saturating_sub(MAX_NOTIFICATIONS);
            state.notifications.drain(..overflow);
            true
        }
        AppAction::DismissNotification { id } => {
            let before = state.notifications.len();
            state.notifications.retain(|notification| notification.id != id);
            before != state.notifications.len()
        }
        AppAction::ActionStarted { kind } => state.in_flight.insert(kind),
        AppAction::ActionFinished { kind } => state.in_flight.remove(&kind),
    }
}
