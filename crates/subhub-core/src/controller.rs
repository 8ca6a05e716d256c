//! Routes user actions through the synchronizer into the store and tells the view
//! layer when to re-render.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::error::ActionError;
use crate::forms::{CreatePlanForm, PublishVideoForm};
use crate::model::{
    ActionKind, Address, ModalId, NotificationLevel, Page, Plan, PlanProfile, Video,
};
use crate::storage::{LocalStore, PlanProfiles, VideoLibrary};
use crate::store::{AppAction, AppState, apply_action};
use crate::sync::ChainSynchronizer;

type Observer = Box<dyn Fn(&AppState)>;

/// What a handler did. Failures have already been turned into notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
    /// Another invocation of the same action is still in flight.
    Busy(ActionKind),
    /// The host should reload the page.
    ReloadRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged,
    ChainChanged,
}

/// Clears the in-flight flag when the action ends, however it ends.
struct InFlight<'a> {
    controller: &'a Controller,
    kind: ActionKind,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.controller
            .dispatch(AppAction::ActionFinished { kind: self.kind });
    }
}

pub struct Controller {
    state: RefCell<AppState>,
    sync: ChainSynchronizer,
    store: Rc<dyn LocalStore>,
    videos: VideoLibrary,
    profiles: PlanProfiles,
    observers: RefCell<Vec<Observer>>,
}

impl Controller {
    #[must_use]
    pub fn new(sync: ChainSynchronizer, store: Rc<dyn LocalStore>) -> Self {
        let prefix = sync.config().storage_prefix.clone();
        Self {
            state: RefCell::new(AppState::default()),
            sync,
            store,
            videos: VideoLibrary::new(&prefix),
            profiles: PlanProfiles::new(&prefix),
            observers: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe_view(&self, observer: Observer) {
        self.observers.borrow_mut().push(observer);
    }

    #[must_use]
    pub fn snapshot(&self) -> AppState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn synchronizer(&self) -> &ChainSynchronizer {
        &self.sync
    }

    fn dispatch(&self, action: AppAction) -> bool {
        apply_action(&mut self.state.borrow_mut(), action)
    }

    fn notify_observers(&self) {
        let snapshot = self.snapshot();
        for observer in self.observers.borrow().iter() {
            observer(&snapshot);
        }
    }

    fn notify(&self, level: NotificationLevel, message: String) {
        self.dispatch(AppAction::Notify { level, message });
    }

    fn account(&self) -> Result<Address, ActionError> {
        self.state
            .borrow()
            .account()
            .cloned()
            .ok_or(ActionError::NotConnected)
    }

    fn begin(&self, kind: ActionKind) -> Option<InFlight<'_>> {
        if !self.dispatch(AppAction::ActionStarted { kind }) {
            return None;
        }
        self.notify_observers();
        Some(InFlight {
            controller: self,
            kind,
        })
    }

    async fn guarded(
        &self,
        kind: ActionKind,
        work: impl Future<Output = Result<String, ActionError>>,
    ) -> Outcome {
        let Some(guard) = self.begin(kind) else {
            debug!(action = kind.as_str(), "ignoring overlapping request");
            return Outcome::Busy(kind);
        };
        let result = work.await;
        drop(guard);

        let outcome = match result {
            Ok(message) => {
                info!(action = kind.as_str(), "action completed");
                self.notify(NotificationLevel::Success, message);
                Outcome::Completed
            }
            Err(error) => {
                if error.is_user_rejection() {
                    info!(action = kind.as_str(), "request rejected in wallet");
                } else {
                    warn!(action = kind.as_str(), %error, "action failed");
                }
                self.notify(NotificationLevel::Error, error.to_string());
                Outcome::Failed
            }
        };
        self.notify_observers();
        outcome
    }

    /// Loads locally stored videos and, when a wallet is present, the plan list.
    pub async fn boot(&self) -> Outcome {
        let videos = self.videos.load(self.store.as_ref());
        debug!(videos = videos.len(), "loaded stored videos");
        self.dispatch(AppAction::VideosLoaded { videos });
        let wallet = self.sync.wallet_available();
        self.dispatch(AppAction::WalletDetected { available: wallet });

        if !wallet {
            info!("no browser wallet detected");
            self.notify_observers();
            return Outcome::Completed;
        }

        let Some(guard) = self.begin(ActionKind::Refresh) else {
            debug!("plan load already in flight");
            self.notify_observers();
            return Outcome::Busy(ActionKind::Refresh);
        };
        let profiles = self.profiles.load(self.store.as_ref());
        let loaded = self.sync.load_plans(&profiles).await;
        drop(guard);

        let outcome = match loaded {
            Ok(plans) => {
                self.dispatch(AppAction::PlansLoaded { plans });
                Outcome::Completed
            }
            Err(error) => {
                warn!(%error, "initial plan load failed");
                self.notify(NotificationLevel::Error, error.to_string());
                Outcome::Failed
            }
        };
        self.notify_observers();
        outcome
    }

    pub async fn connect_wallet(&self) -> Outcome {
        self.guarded(ActionKind::Connect, async {
            let session = self.sync.connect().await?;
            let account = session.account.clone();
            self.dispatch(AppAction::SessionConnected { session });
            self.reload_chain_data(&account).await?;
            Ok(format!("Connected {}", account.short()))
        })
        .await
    }

    pub async fn refresh(&self) -> Outcome {
        self.guarded(ActionKind::Refresh, async {
            let account = self.account()?;
            self.reload_balance(&account).await?;
            self.reload_chain_data(&account).await?;
            Ok("Refreshed from chain.".to_string())
        })
        .await
    }

    pub fn navigate(&self, page: Page) {
        if self.dispatch(AppAction::Navigate { page }) {
            debug!(page = page.as_str(), "navigated");
            self.notify_observers();
        }
    }

    /// Dialogs that submit transactions need a connected wallet.
    pub fn open_modal(&self, modal: ModalId) {
        let connected = self.state.borrow().session.is_some();
        if !connected {
            self.notify(NotificationLevel::Error, ActionError::NotConnected.to_string());
        } else {
            self.dispatch(AppAction::OpenModal { modal });
        }
        self.notify_observers();
    }

    pub fn close_modal(&self) {
        if self.dispatch(AppAction::CloseModal) {
            self.notify_observers();
        }
    }

    pub fn dismiss_notification(&self, id: u64) {
        if self.dispatch(AppAction::DismissNotification { id }) {
            self.notify_observers();
        }
    }

    pub async fn submit_create_plan(&self, form: CreatePlanForm) -> Outcome {
        self.guarded(ActionKind::CreatePlan, async {
            let account = self.account()?;
            let valid = form.validate(self.sync.config().token_decimals)?;
            self.sync
                .create_plan(valid.price, valid.duration_days)
                .await?;

            let profile = PlanProfile {
                name: valid.name.clone(),
                description: valid.description,
            };
            if let Err(error) = self.profiles.upsert(self.store.as_ref(), &account, profile) {
                warn!(%error, "plan created but its profile could not be stored");
            }
            self.dispatch(AppAction::CloseModal);
            self.reload_chain_data(&account).await?;
            Ok(format!("Plan \"{}\" created.", valid.name))
        })
        .await
    }

    pub async fn submit_publish_video(&self, form: PublishVideoForm) -> Outcome {
        self.guarded(ActionKind::PublishVideo, async {
            let account = self.account()?;
            let valid = form.validate(&self.state.borrow().plans, &account)?;
            // Other sessions may have published since this one loaded.
            let mut videos = self.videos.load(self.store.as_ref());
            let video = Video {
                id: uuid::Uuid::new_v4().to_string(),
                title: valid.title,
                video_ref: valid.video_ref,
                plan: valid.plan,
                creator: account,
                published_at: chrono::Utc::now().timestamp(),
            };
            info!(video = %video.id, plan = %video.plan, "video published");
            let title = video.title.clone();
            videos.push(video);
            self.videos.save(self.store.as_ref(), &videos)?;
            self.dispatch(AppAction::VideosLoaded { videos });
            self.dispatch(AppAction::CloseModal);
            Ok(format!("Published \"{title}\"."))
        })
        .await
    }

    pub async fn subscribe(&self, creator: &Address) -> Outcome {
        self.guarded(ActionKind::Subscribe, async {
            let (account, plan) = self.payment_target(creator)?;
            self.sync.subscribe(&account, &plan).await?;
            self.reload_balance(&account).await?;
            self.reload_chain_data(&account).await?;
            Ok(format!("Subscribed to {}.", plan.display_name()))
        })
        .await
    }

    pub async fn renew(&self, creator: &Address) -> Outcome {
        self.guarded(ActionKind::Renew, async {
            let (account, plan) = self.payment_target(creator)?;
            self.sync.renew(&account, &plan).await?;
            self.reload_balance(&account).await?;
            self.reload_chain_data(&account).await?;
            Ok(format!("Renewed {}.", plan.display_name()))
        })
        .await
    }

    /// Account or network switches invalidate everything held in memory.
    pub fn on_wallet_event(&self, event: WalletEvent) -> Outcome {
        info!(?event, "wallet changed; reload required");
        Outcome::ReloadRequired
    }

    fn payment_target(&self, creator: &Address) -> Result<(Address, Plan), ActionError> {
        let account = self.account()?;
        let plan = self
            .state
            .borrow()
            .plan_for(creator)
            .cloned()
            .ok_or_else(|| ActionError::PlanNotFound(creator.clone()))?;
        Ok((account, plan))
    }

    async fn reload_balance(&self, account: &Address) -> Result<(), ActionError> {
        let balance = self.sync.refresh_balance(account).await?;
        self.dispatch(AppAction::BalanceUpdated { balance });
        Ok(())
    }

    /// Plans first, then the subscriptions derived from them.
    async fn reload_chain_data(&self, account: &Address) -> Result<(), ActionError> {
        let profiles = self.profiles.load(self.store.as_ref());
        let plans = self.sync.load_plans(&profiles).await?;
        let subscriptions = self.sync.load_subscriptions(account, &plans).await;
        self.dispatch(AppAction::PlansLoaded { plans });
        self.dispatch(AppAction::SubscriptionsLoaded { subscriptions });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::{Controller, Outcome, WalletEvent};
    use crate::amount::TokenAmount;
    use crate::config::SubHubConfig;
    use crate::forms::{CreatePlanForm, PublishVideoForm};
    use crate::mock::{MockChain, MockRequest};
    use crate::model::{ActionKind, Address, ModalId, NotificationLevel, Page};
    use crate::storage::{LocalStore, MemoryStore, VideoLibrary};
    use crate::store::{VideoAccess, video_access};
    use crate::sync::ChainSynchronizer;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    const DAY: u64 = 86_400;

    fn address(digit: char) -> Result<Address, Box<dyn std::error::Error>> {
        Ok(Address::parse(&format!("0x{}", digit.to_string().repeat(40)))?)
    }

    fn units(raw: &str) -> Result<TokenAmount, Box<dyn std::error::Error>> {
        Ok(TokenAmount::parse_units(raw, 18)?)
    }

    fn ledger() -> Result<Address, Box<dyn std::error::Error>> {
        address('f')
    }

    fn controller(
        chain: &Rc<MockChain>,
        store: &Rc<MemoryStore>,
    ) -> Result<Controller, Box<dyn std::error::Error>> {
        let config = SubHubConfig {
            token_address: address('e')?,
            ledger_address: ledger()?,
            ..SubHubConfig::default()
        };
        let sync = ChainSynchronizer::new(chain.clone(), chain.clone(), chain.clone(), config);
        Ok(Controller::new(sync, store.clone()))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn rejected_connect_leaves_session_empty_with_one_notice() -> TestResult {
        let chain = Rc::new(MockChain::new(ledger()?).with_accounts(vec![address('c')?]));
        chain.reject_next_connect();
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;

        assert_eq!(controller.connect_wallet().await, Outcome::Failed);
        let state = controller.snapshot();
        assert!(state.session.is_none());
        assert_eq!(state.notifications.len(), 1);
        assert_eq!(state.notifications[0].level, NotificationLevel::Error);
        assert!(state.notifications[0].message.contains("rejected"));
        assert!(state.in_flight.is_empty());
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn connect_without_wallet_asks_to_install() -> TestResult {
        let chain = Rc::new(MockChain::new(ledger()?).without_wallet());
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;

        assert_eq!(controller.boot().await, Outcome::Completed);
        assert!(!controller.snapshot().wallet_detected);
        assert_eq!(controller.connect_wallet().await, Outcome::Failed);
        let state = controller.snapshot();
        assert_eq!(
            state.notifications[0].message,
            "MetaMask not detected. Please install MetaMask."
        );
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn subscribe_raises_allowance_then_reloads_subscriptions() -> TestResult {
        let viewer = address('c')?;
        let creator = address('a')?;
        let chain = Rc::new(MockChain::new(ledger()?).with_accounts(vec![viewer.clone()]));
        chain.set_balance(&viewer, units("50.00")?);
        chain.add_plan(&creator, units("12.50")?, 30 * DAY + 1);
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;

        assert_eq!(controller.connect_wallet().await, Outcome::Completed);
        chain.clear_requests();
        assert_eq!(controller.subscribe(&creator).await, Outcome::Completed);

        let requests = chain.requests();
        let approve = requests
            .iter()
            .position(|request| matches!(request, MockRequest::Approve { .. }))
            .ok_or("approve was not requested")?;
        let subscribe = requests
            .iter()
            .position(|request| request == &MockRequest::Subscribe(creator.clone()))
            .ok_or("subscribe was not requested")?;
        assert!(approve < subscribe);
        let MockRequest::Approve { amount, .. } = &requests[approve] else {
            return Err("expected an approve request".into());
        };
        assert!(*amount >= units("12.50")?);
        assert!(
            requests
                .iter()
                .skip(subscribe)
                .any(|request| matches!(request, MockRequest::Subscription { .. }))
        );

        let state = controller.snapshot();
        let subscription = state
            .subscription_for(&creator)
            .ok_or("subscription missing")?;
        assert!(subscription.active);
        assert_eq!(subscription.days_remaining, 31);
        assert_eq!(
            state.session.as_ref().map(|session| session.balance),
            Some(units("37.50")?)
        );
        assert_eq!(
            state.notifications.last().map(|n| n.level),
            Some(NotificationLevel::Success)
        );
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn insufficient_balance_issues_no_allowance_or_subscribe() -> TestResult {
        let viewer = address('c')?;
        let creator = address('a')?;
        let chain = Rc::new(MockChain::new(ledger()?).with_accounts(vec![viewer.clone()]));
        chain.set_balance(&viewer, units("10.00")?);
        chain.add_plan(&creator, units("12.50")?, 30 * DAY);
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;

        controller.connect_wallet().await;
        chain.clear_requests();
        assert_eq!(controller.subscribe(&creator).await, Outcome::Failed);

        assert!(!chain.requests().iter().any(|request| matches!(
            request,
            MockRequest::Allowance { .. } | MockRequest::Approve { .. } | MockRequest::Subscribe(_)
        )));
        let state = controller.snapshot();
        let message = state
            .notifications
            .last()
            .map(|n| n.message.clone())
            .unwrap_or_default();
        assert!(message.starts_with("Insufficient balance"), "{message}");
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn overlapping_subscribe_is_rejected_as_busy() -> TestResult {
        let viewer = address('c')?;
        let creator = address('a')?;
        let chain = Rc::new(MockChain::new(ledger()?).with_accounts(vec![viewer.clone()]));
        chain.set_balance(&viewer, units("50")?);
        chain.add_plan(&creator, units("12.50")?, 30 * DAY);
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;
        controller.connect_wallet().await;

        let seen_in_flight = Rc::new(Cell::new(false));
        let observed = seen_in_flight.clone();
        controller.subscribe_view(Box::new(move |state| {
            if state.is_in_flight(ActionKind::Subscribe) {
                observed.set(true);
            }
        }));

        let (first, second) =
            futures::join!(controller.subscribe(&creator), controller.subscribe(&creator));
        assert_eq!(first, Outcome::Completed);
        assert_eq!(second, Outcome::Busy(ActionKind::Subscribe));
        assert!(seen_in_flight.get());

        let submissions = chain
            .requests()
            .into_iter()
            .filter(|request| matches!(request, MockRequest::Subscribe(_)))
            .count();
        assert_eq!(submissions, 1);
        assert!(!controller.snapshot().is_in_flight(ActionKind::Subscribe));
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn renew_extends_an_expired_subscription() -> TestResult {
        let viewer = address('c')?;
        let creator = address('a')?;
        let chain = Rc::new(MockChain::new(ledger()?).with_accounts(vec![viewer.clone()]));
        chain.set_balance(&viewer, units("50")?);
        chain.add_plan(&creator, units("5")?, 7 * DAY);
        chain.grant_subscription(&viewer, &creator);
        chain.advance_time(8 * DAY);
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;
        controller.connect_wallet().await;

        let before = controller.snapshot();
        assert_eq!(before.subscription_for(&creator).map(|s| s.active), Some(false));

        assert_eq!(controller.renew(&creator).await, Outcome::Completed);
        let after = controller.snapshot();
        let subscription = after.subscription_for(&creator).ok_or("subscription missing")?;
        assert!(subscription.active);
        assert_eq!(subscription.days_remaining, 7);
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn create_plan_stores_profile_and_lists_the_plan() -> TestResult {
        let creator = address('a')?;
        let chain = Rc::new(MockChain::new(ledger()?).with_accounts(vec![creator.clone()]));
        let store = Rc::new(MemoryStore::new());
        let controller = controller(&chain, &store)?;
        controller.connect_wallet().await;
        controller.open_modal(ModalId::CreatePlan);
        assert_eq!(controller.snapshot().modal, Some(ModalId::CreatePlan));

        let outcome = controller
            .submit_create_plan(CreatePlanForm {
                name: "Backstage".to_string(),
                description: "Weekly cuts".to_string(),
                price: "12.50".to_string(),
                duration_days: "30".to_string(),
            })
            .await;
        assert_eq!(outcome, Outcome::Completed);

        let state = controller.snapshot();
        assert_eq!(state.modal, None);
        let plan = state.plan_for(&creator).ok_or("plan missing")?;
        assert_eq!(plan.name, "Backstage");
        assert_eq!(plan.price, units("12.50")?);
        assert_eq!(plan.duration_seconds, 30 * DAY);
        assert!(store.raw("subhub.plan_profiles.v1").is_some());
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn invalid_plan_form_never_reaches_the_ledger() -> TestResult {
        let creator = address('a')?;
        let chain = Rc::new(MockChain::new(ledger()?).with_accounts(vec![creator]));
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;
        controller.connect_wallet().await;
        chain.clear_requests();

        let outcome = controller
            .submit_create_plan(CreatePlanForm {
                name: "Tier".to_string(),
                description: String::new(),
                price: "0".to_string(),
                duration_days: "30".to_string(),
            })
            .await;
        assert_eq!(outcome, Outcome::Failed);
        assert!(chain.requests().is_empty());
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn publish_video_persists_and_gates_by_subscription() -> TestResult {
        let creator = address('a')?;
        let viewer = address('c')?;
        let chain = Rc::new(MockChain::new(ledger()?).with_accounts(vec![creator.clone()]));
        chain.add_plan(&creator, units("1")?, 30 * DAY);
        let store = Rc::new(MemoryStore::new());
        let controller = controller(&chain, &store)?;
        controller.connect_wallet().await;

        let missing_tier = controller
            .submit_publish_video(PublishVideoForm {
                title: "Episode 1".to_string(),
                url: "https://youtu.be/abc12345678".to_string(),
                plan: String::new(),
            })
            .await;
        assert_eq!(missing_tier, Outcome::Failed);
        assert!(store.raw("subhub.videos.v1").is_none());

        let outcome = controller
            .submit_publish_video(PublishVideoForm {
                title: "Episode 1".to_string(),
                url: "https://youtu.be/abc12345678".to_string(),
                plan: creator.to_string(),
            })
            .await;
        assert_eq!(outcome, Outcome::Completed);
        let stored = VideoLibrary::new("subhub").load(store.as_ref());
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].video_ref, "abc12345678");

        let state = controller.snapshot();
        assert_eq!(video_access(&state, &state.videos[0]), VideoAccess::Owned);

        // A fresh session for someone without a subscription sees it locked.
        chain.set_accounts(vec![viewer]);
        let other = self::controller(&chain, &store)?;
        other.boot().await;
        other.connect_wallet().await;
        let state = other.snapshot();
        assert_eq!(state.videos.len(), 1);
        assert_eq!(video_access(&state, &state.videos[0]), VideoAccess::Locked);
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn publishing_from_a_stale_session_keeps_other_videos() -> TestResult {
        let alice = address('a')?;
        let bob = address('b')?;
        let chain = Rc::new(MockChain::new(ledger()?));
        chain.add_plan(&alice, units("1")?, 30 * DAY);
        chain.add_plan(&bob, units("2")?, 7 * DAY);
        let store = Rc::new(MemoryStore::new());

        // Neither session boots, so neither has read the stored list.
        for (creator, title) in [(&alice, "First"), (&bob, "Second")] {
            chain.set_accounts(vec![creator.clone()]);
            let session = controller(&chain, &store)?;
            assert_eq!(session.connect_wallet().await, Outcome::Completed);
            let outcome = session
                .submit_publish_video(PublishVideoForm {
                    title: title.to_string(),
                    url: "https://youtu.be/abc12345678".to_string(),
                    plan: creator.to_string(),
                })
                .await;
            assert_eq!(outcome, Outcome::Completed);
            let stored = VideoLibrary::new("subhub").load(store.as_ref());
            assert_eq!(session.snapshot().videos, stored);
        }

        let stored = VideoLibrary::new("subhub").load(store.as_ref());
        let titles: Vec<&str> = stored.iter().map(|video| video.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second"]);
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn refresh_picks_up_balance_and_subscription_changes() -> TestResult {
        let viewer = address('c')?;
        let creator = address('a')?;
        let chain = Rc::new(MockChain::new(ledger()?).with_accounts(vec![viewer.clone()]));
        chain.set_balance(&viewer, units("50")?);
        chain.add_plan(&creator, units("5")?, 7 * DAY);
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;
        assert_eq!(controller.connect_wallet().await, Outcome::Completed);
        assert!(controller.snapshot().subscriptions.is_empty());

        chain.set_balance(&viewer, units("20")?);
        chain.grant_subscription(&viewer, &creator);
        let (first, second) = futures::join!(controller.refresh(), controller.refresh());
        assert_eq!(first, Outcome::Completed);
        assert_eq!(second, Outcome::Busy(ActionKind::Refresh));

        let state = controller.snapshot();
        assert_eq!(
            state.session.as_ref().map(|session| session.balance),
            Some(units("20")?)
        );
        let subscription = state.subscription_for(&creator).ok_or("subscription missing")?;
        assert!(subscription.active);
        assert_eq!(subscription.days_remaining, 7);
        assert!(!state.is_in_flight(ActionKind::Refresh));
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn refresh_without_a_session_fails() -> TestResult {
        let chain = Rc::new(MockChain::new(ledger()?));
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;
        assert_eq!(controller.refresh().await, Outcome::Failed);
        assert_eq!(controller.snapshot().notifications[0].message, "Connect your wallet first.");
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn boot_plan_load_blocks_a_concurrent_refresh() -> TestResult {
        let creator = address('a')?;
        let chain = Rc::new(MockChain::new(ledger()?));
        chain.add_plan(&creator, units("1")?, DAY);
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;

        let seen_in_flight = Rc::new(Cell::new(false));
        let observed = seen_in_flight.clone();
        controller.subscribe_view(Box::new(move |state| {
            if state.is_in_flight(ActionKind::Refresh) {
                observed.set(true);
            }
        }));

        let (booted, refreshed) = futures::join!(controller.boot(), controller.refresh());
        assert_eq!(booted, Outcome::Completed);
        assert_eq!(refreshed, Outcome::Busy(ActionKind::Refresh));
        assert!(seen_in_flight.get());
        let state = controller.snapshot();
        assert_eq!(state.plans.len(), 1);
        assert!(state.in_flight.is_empty());
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn connecting_on_another_network_keeps_its_chain_id() -> TestResult {
        let chain = Rc::new(MockChain::new(ledger()?).with_accounts(vec![address('c')?]));
        chain.set_chain_id(1);
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;

        assert_eq!(controller.connect_wallet().await, Outcome::Completed);
        let state = controller.snapshot();
        let chain_id = state.session.as_ref().and_then(|session| session.chain_id);
        assert_eq!(chain_id, Some(1));
        assert_ne!(chain_id, Some(controller.synchronizer().config().chain_id));
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn boot_survives_corrupt_video_slot() -> TestResult {
        let chain = Rc::new(MockChain::new(ledger()?));
        let store = Rc::new(MemoryStore::new());
        store.set("subhub.videos.v1", "[{\"broken\":")?;
        let controller = controller(&chain, &store)?;

        assert_eq!(controller.boot().await, Outcome::Completed);
        let state = controller.snapshot();
        assert!(state.videos.is_empty());
        assert!(state.wallet_detected);
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn navigation_notifies_observers_only_on_change() -> TestResult {
        let chain = Rc::new(MockChain::new(ledger()?));
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;
        let renders = Rc::new(Cell::new(0_u32));
        let counter = renders.clone();
        controller.subscribe_view(Box::new(move |_| counter.set(counter.get() + 1)));

        controller.navigate(Page::Creators);
        controller.navigate(Page::Creators);
        assert_eq!(renders.get(), 1);
        assert_eq!(controller.snapshot().page, Page::Creators);
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn modals_require_a_session_and_wallet_changes_force_reload() -> TestResult {
        let chain = Rc::new(MockChain::new(ledger()?));
        let controller = controller(&chain, &Rc::new(MemoryStore::new()))?;

        controller.open_modal(ModalId::PublishVideo);
        let state = controller.snapshot();
        assert_eq!(state.modal, None);
        assert_eq!(state.notifications.len(), 1);

        controller.dismiss_notification(state.notifications[0].id);
        assert!(controller.snapshot().notifications.is_empty());
        assert_eq!(
            controller.on_wallet_event(WalletEvent::AccountsChanged),
            Outcome::ReloadRequired
        );
        Ok(())
    }
}
