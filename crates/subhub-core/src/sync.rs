//! Chain data synchronizer: reads plans, subscriptions and balances through the
//! chain capabilities and runs the multi-step payment protocol.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::amount::TokenAmount;
use crate::chain::{ChainError, SubscriptionLedger, TokenContract, WalletProvider};
use crate::config::SubHubConfig;
use crate::error::ActionError;
use crate::forms::FormError;
use crate::model::{Address, Plan, PlanProfile, SECONDS_PER_DAY, Session, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payment {
    Subscribe,
    Renew,
}

impl Payment {
    fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Renew => "renew",
        }
    }
}

pub struct ChainSynchronizer {
    wallet: Rc<dyn WalletProvider>,
    token: Rc<dyn TokenContract>,
    ledger: Rc<dyn SubscriptionLedger>,
    config: SubHubConfig,
}

impl ChainSynchronizer {
    #[must_use]
    pub fn new(
        wallet: Rc<dyn WalletProvider>,
        token: Rc<dyn TokenContract>,
        ledger: Rc<dyn SubscriptionLedger>,
        config: SubHubConfig,
    ) -> Self {
        Self {
            wallet,
            token,
            ledger,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SubHubConfig {
        &self.config
    }

    #[must_use]
    pub fn wallet_available(&self) -> bool {
        self.wallet.is_available()
    }

    /// Requests account access once. A failed balance read keeps the session with a
    /// zero balance; the next refresh corrects it.
    pub async fn connect(&self) -> Result<Session, ActionError> {
        if !self.wallet.is_available() {
            return Err(ChainError::WalletUnavailable.into());
        }
        let accounts = self.wallet.request_accounts().await?;
        let account = accounts.into_iter().next().ok_or(ActionError::NoAccounts)?;

        let chain_id = match self.wallet.chain_id().await {
            Ok(chain_id) => {
                if chain_id != self.config.chain_id {
                    warn!(
                        chain_id,
                        expected = self.config.chain_id,
                        "wallet is connected to an unexpected network"
                    );
                }
                Some(chain_id)
            }
            Err(error) => {
                warn!(%error, "failed to read wallet chain id");
                None
            }
        };
        let balance = match self.token.balance_of(&account).await {
            Ok(balance) => balance,
            Err(error) => {
                warn!(account = %account, %error, "failed to read token balance after connect");
                TokenAmount::ZERO
            }
        };

        info!(account = %account, ?chain_id, "wallet connected");
        Ok(Session {
            account,
            balance,
            chain_id,
        })
    }

    pub async fn refresh_balance(&self, account: &Address) -> Result<TokenAmount, ActionError> {
        Ok(self.token.balance_of(account).await?)
    }

    /// Discovers creators from plan-created events, then keeps each creator's plan
    /// only while it is active. Per-creator read failures are skipped.
    pub async fn load_plans(
        &self,
        profiles: &BTreeMap<Address, PlanProfile>,
    ) -> Result<Vec<Plan>, ActionError> {
        let creators = self.discover_creators().await?;
        let mut plans = Vec::with_capacity(creators.len());
        for creator in creators {
            let on_chain = match self.ledger.plan(&creator).await {
                Ok(on_chain) => on_chain,
                Err(error) => {
                    warn!(creator = %creator, %error, "skipping plan that failed to load");
                    continue;
                }
            };
            if !on_chain.active {
                debug!(creator = %creator, "skipping inactive plan");
                continue;
            }
            let profile = profiles.get(&creator).cloned().unwrap_or_default();
            plans.push(Plan {
                creator,
                name: profile.name,
                description: profile.description,
                price: on_chain.price,
                duration_seconds: on_chain.duration,
                active: true,
                subscriber_count: on_chain.subscriber_count,
            });
        }
        info!(plans = plans.len(), "plans loaded");
        Ok(plans)
    }

    async fn discover_creators(&self) -> Result<Vec<Address>, ActionError> {
        let latest = self.ledger.latest_block().await?;
        let window = self.config.plan_scan_window.max(1);
        let mut from_block = self.config.plan_scan_from_block;
        let mut seen = BTreeSet::new();
        let mut creators = Vec::new();

        while from_block <= latest {
            let to_block = from_block.saturating_add(window - 1).min(latest);
            let events = self
                .ledger
                .plan_created_events(from_block, to_block)
                .await?;
            debug!(from_block, to_block, events = events.len(), "scanned plan events");
            for event in events {
                if seen.insert(event.creator.clone()) {
                    creators.push(event.creator);
                }
            }
            let Some(next) = to_block.checked_add(1) else {
                break;
            };
            from_block = next;
        }
        Ok(creators)
    }

    /// One sequential read per plan. Creators the account never subscribed to are
    /// left out; expired subscriptions stay in with `active == false`.
    pub async fn load_subscriptions(&self, account: &Address, plans: &[Plan]) -> Vec<Subscription> {
        let mut subscriptions = Vec::new();
        for plan in plans {
            let record = match self.ledger.subscription(account, &plan.creator).await {
                Ok(record) => record,
                Err(error) => {
                    warn!(creator = %plan.creator, %error, "skipping subscription that failed to load");
                    continue;
                }
            };
            if !record.ever_subscribed {
                continue;
            }
            let seconds_remaining = if record.active {
                match self.ledger.time_remaining(account, &plan.creator).await {
                    Ok(seconds) => seconds,
                    Err(error) => {
                        warn!(creator = %plan.creator, %error, "failed to read time remaining");
                        0
                    }
                }
            } else {
                0
            };
            subscriptions.push(Subscription {
                creator: plan.creator.clone(),
                started_at: record.start,
                expires_at: record.expiry,
                seconds_remaining,
                days_remaining: seconds_remaining.div_ceil(SECONDS_PER_DAY),
                active: record.active,
            });
        }
        info!(account = %account, subscriptions = subscriptions.len(), "subscriptions loaded");
        subscriptions
    }

    pub async fn create_plan(&self, price: TokenAmount, duration_days: u64) -> Result<(), ActionError> {
        let duration_seconds = duration_days
            .checked_mul(SECONDS_PER_DAY)
            .ok_or(FormError::InvalidDuration)?;
        let tx = self.ledger.create_plan(price, duration_seconds).await?;
        info!(tx = %tx.hash, duration_seconds, "plan creation submitted");
        self.ledger.wait_for_confirmation(&tx).await?;
        info!(tx = %tx.hash, "plan creation confirmed");
        Ok(())
    }

    pub async fn subscribe(&self, account: &Address, plan: &Plan) -> Result<(), ActionError> {
        self.pay(account, plan, Payment::Subscribe).await
    }

    pub async fn renew(&self, account: &Address, plan: &Plan) -> Result<(), ActionError> {
        self.pay(account, plan, Payment::Renew).await
    }

    /// Balance check, allowance top-up when short, then the ledger call. A failure
    /// at any step stops the rest; completed steps are not undone.
    async fn pay(&self, account: &Address, plan: &Plan, payment: Payment) -> Result<(), ActionError> {
        let decimals = self.config.token_decimals;
        let balance = self.token.balance_of(account).await?;
        if balance < plan.price {
            return Err(ActionError::InsufficientBalance {
                balance: format!("{} {}", balance.display(decimals), self.config.token_symbol),
                price: format!("{} {}", plan.price.display(decimals), self.config.token_symbol),
            });
        }

        let spender = &self.config.ledger_address;
        let allowance = self.token.allowance(account, spender).await?;
        if allowance < plan.price {
            let tx = self.token.approve(spender, plan.price).await?;
            info!(tx = %tx.hash, creator = %plan.creator, "allowance approval submitted");
            self.token.wait_for_confirmation(&tx).await?;
        } else {
            debug!(creator = %plan.creator, "allowance already covers price");
        }

        let tx = match payment {
            Payment::Subscribe => self.ledger.subscribe(&plan.creator).await?,
            Payment::Renew => self.ledger.renew(&plan.creator).await?,
        };
        info!(tx = %tx.hash, creator = %plan.creator, payment = payment.as_str(), "payment submitted");
        self.ledger.wait_for_confirmation(&tx).await?;
        info!(tx = %tx.hash, creator = %plan.creator, payment = payment.as_str(), "payment confirmed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use super::ChainSynchronizer;
    use crate::amount::TokenAmount;
    use crate::chain::ChainError;
    use crate::config::SubHubConfig;
    use crate::error::ActionError;
    use crate::mock::{MockCall, MockChain, MockRequest};
    use crate::model::{Address, PlanProfile};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    const DAY: u64 = 86_400;

    fn address(digit: char) -> Result<Address, Box<dyn std::error::Error>> {
        Ok(Address::parse(&format!("0x{}", digit.to_string().repeat(40)))?)
    }

    fn units(raw: &str) -> Result<TokenAmount, Box<dyn std::error::Error>> {
        Ok(TokenAmount::parse_units(raw, 18)?)
    }

    fn config() -> Result<SubHubConfig, Box<dyn std::error::Error>> {
        Ok(SubHubConfig {
            token_address: address('e')?,
            ledger_address: address('f')?,
            plan_scan_window: 3,
            ..SubHubConfig::default()
        })
    }

    fn synchronizer(chain: &Rc<MockChain>) -> Result<ChainSynchronizer, Box<dyn std::error::Error>> {
        Ok(ChainSynchronizer::new(
            chain.clone(),
            chain.clone(),
            chain.clone(),
            config()?,
        ))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn load_plans_dedupes_creators_and_drops_inactive() -> TestResult {
        let chain = Rc::new(MockChain::new(address('f')?));
        let alice = address('a')?;
        let bob = address('b')?;
        chain.add_plan(&alice, units("5")?, 30 * DAY);
        chain.add_plan(&bob, units("7")?, 30 * DAY);
        chain.add_plan(&alice, units("6")?, 30 * DAY);
        chain.deactivate_plan(&bob);

        let mut profiles = BTreeMap::new();
        profiles.insert(
            alice.clone(),
            PlanProfile {
                name: "Alice Gold".to_string(),
                description: String::new(),
            },
        );

        let plans = synchronizer(&chain)?.load_plans(&profiles).await?;
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].creator, alice);
        assert_eq!(plans[0].price, units("6")?);
        assert_eq!(plans[0].name, "Alice Gold");
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn load_plans_scans_in_windows_and_skips_failed_reads() -> TestResult {
        let chain = Rc::new(MockChain::new(address('f')?));
        for digit in ['1', '2', '3', '4', '5'] {
            chain.add_plan(&address(digit)?, units("1")?, DAY);
        }
        let failing = address('3')?;
        chain.fail_plan_read(&failing);

        let plans = synchronizer(&chain)?.load_plans(&BTreeMap::new()).await?;
        assert_eq!(plans.len(), 4);
        assert!(plans.iter().all(|plan| plan.creator != failing));

        let scans: Vec<(u64, u64)> = chain
            .requests()
            .into_iter()
            .filter_map(|request| match request {
                MockRequest::PlanCreatedEvents { from, to } => Some((from, to)),
                _ => None,
            })
            .collect();
        assert_eq!(scans, vec![(0, 2), (3, 5)]);
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failed_event_scan_fails_the_load() -> TestResult {
        let chain = Rc::new(MockChain::new(address('f')?));
        chain.add_plan(&address('a')?, units("1")?, DAY);
        chain.fail_next(MockCall::PlanCreatedEvents, ChainError::Transport("rpc down".to_string()));

        let result = synchronizer(&chain)?.load_plans(&BTreeMap::new()).await;
        assert_eq!(
            result,
            Err(ActionError::Chain(ChainError::Transport("rpc down".to_string())))
        );
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn subscriptions_round_remaining_days_up() -> TestResult {
        let chain = Rc::new(MockChain::new(address('f')?));
        let viewer = address('c')?;
        let creator = address('a')?;
        let other = address('b')?;
        chain.add_plan(&creator, units("1")?, 10 * DAY + 1);
        chain.add_plan(&other, units("1")?, DAY);
        chain.grant_subscription(&viewer, &creator);

        let sync = synchronizer(&chain)?;
        let plans = sync.load_plans(&BTreeMap::new()).await?;
        let subscriptions = sync.load_subscriptions(&viewer, &plans).await;
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].creator, creator);
        assert_eq!(subscriptions[0].days_remaining, 11);
        assert!(subscriptions[0].active);

        chain.advance_time(11 * DAY);
        let expired = sync.load_subscriptions(&viewer, &plans).await;
        assert_eq!(expired.len(), 1);
        assert!(!expired[0].active);
        assert_eq!(expired[0].days_remaining, 0);
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn insufficient_balance_stops_before_any_allowance_request() -> TestResult {
        let viewer = address('c')?;
        let creator = address('a')?;
        let chain = Rc::new(MockChain::new(address('f')?).with_accounts(vec![viewer.clone()]));
        chain.set_balance(&viewer, units("10.00")?);
        chain.add_plan(&creator, units("12.50")?, 30 * DAY);

        let sync = synchronizer(&chain)?;
        let plans = sync.load_plans(&BTreeMap::new()).await?;
        chain.clear_requests();

        let result = sync.subscribe(&viewer, &plans[0]).await;
        let Err(error) = result else {
            return Err("subscribe should fail".into());
        };
        assert!(matches!(error, ActionError::InsufficientBalance { .. }));
        assert_eq!(
            error.to_string(),
            "Insufficient balance: you have 10.00 SUB but this plan costs 12.50 SUB."
        );
        assert_eq!(chain.requests(), vec![MockRequest::BalanceOf(viewer)]);
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn subscribe_with_sufficient_allowance_skips_approve() -> TestResult {
        let viewer = address('c')?;
        let creator = address('a')?;
        let chain = Rc::new(MockChain::new(address('f')?).with_accounts(vec![viewer.clone()]));
        chain.set_balance(&viewer, units("50")?);
        chain.set_allowance(&viewer, units("100")?);
        chain.add_plan(&creator, units("12.50")?, 30 * DAY);

        let sync = synchronizer(&chain)?;
        let plans = sync.load_plans(&BTreeMap::new()).await?;
        chain.clear_requests();
        sync.subscribe(&viewer, &plans[0]).await?;

        let requests = chain.requests();
        assert!(!requests.iter().any(|request| matches!(request, MockRequest::Approve { .. })));
        assert!(requests.contains(&MockRequest::Subscribe(creator)));
        assert_eq!(chain.balance(&viewer), units("37.50")?);
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reverted_subscribe_keeps_raised_allowance() -> TestResult {
        let viewer = address('c')?;
        let creator = address('a')?;
        let chain = Rc::new(MockChain::new(address('f')?).with_accounts(vec![viewer.clone()]));
        chain.set_balance(&viewer, units("50")?);
        chain.add_plan(&creator, units("12.50")?, 30 * DAY);
        chain.fail_next(
            MockCall::Subscribe,
            ChainError::Reverted {
                reason: Some("Plan paused".to_string()),
            },
        );

        let sync = synchronizer(&chain)?;
        let plans = sync.load_plans(&BTreeMap::new()).await?;
        let result = sync.subscribe(&viewer, &plans[0]).await;
        let Err(error) = result else {
            return Err("subscribe should fail".into());
        };
        assert_eq!(error.to_string(), "Transaction failed: Plan paused");
        assert_eq!(chain.allowance_of(&viewer), units("12.50")?);
        assert_eq!(chain.balance(&viewer), units("50")?);
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn connect_requires_a_wallet() -> TestResult {
        let chain = Rc::new(MockChain::new(address('f')?).without_wallet());
        let result = synchronizer(&chain)?.connect().await;
        assert_eq!(result, Err(ActionError::Chain(ChainError::WalletUnavailable)));
        assert!(chain.requests().is_empty());
        Ok(())
    }
}
