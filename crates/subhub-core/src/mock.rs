//! In-memory wallet, token and subscription ledger.
//!
//! Backs the unit tests and the native demo. Every capability call is recorded so
//! tests can assert exactly which requests a flow issued. Transactions take effect
//! on submission. Confirmation waits and the latest-block read yield to the
//! executor once so overlapping handler invocations interleave the way they do
//! in the browser.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::task::Poll;

use async_trait::async_trait;

use crate::amount::TokenAmount;
use crate::chain::{
    ChainError, OnChainPlan, OnChainSubscription, PendingTx, PlanCreatedEvent,
    SubscriptionLedger, TokenContract, WalletProvider,
};
use crate::model::Address;

const MOCK_CHAIN_ID: u64 = 11_155_111;
const MOCK_GENESIS_TIME: u64 = 1_700_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRequest {
    RequestAccounts,
    ChainId,
    BalanceOf(Address),
    Allowance { owner: Address, spender: Address },
    Approve { spender: Address, amount: TokenAmount },
    TokenConfirmation(String),
    CreatePlan { price: TokenAmount, duration: u64 },
    Subscribe(Address),
    Renew(Address),
    LedgerConfirmation(String),
    Plan(Address),
    Subscription { user: Address, creator: Address },
    TimeRemaining { user: Address, creator: Address },
    LatestBlock,
    PlanCreatedEvents { from: u64, to: u64 },
}

/// Calls that can be made to fail once with [`MockChain::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MockCall {
    RequestAccounts,
    BalanceOf,
    Allowance,
    Approve,
    CreatePlan,
    Subscribe,
    Renew,
    LatestBlock,
    PlanCreatedEvents,
}

#[derive(Debug)]
struct MockState {
    wallet_available: bool,
    accounts: Vec<Address>,
    chain_id: u64,
    ledger_address: Address,
    now: u64,
    block: u64,
    next_tx: u64,
    balances: BTreeMap<Address, TokenAmount>,
    allowances: BTreeMap<(Address, Address), TokenAmount>,
    plans: BTreeMap<Address, OnChainPlan>,
    subscriptions: BTreeMap<(Address, Address), OnChainSubscription>,
    events: Vec<PlanCreatedEvent>,
    failures: BTreeMap<MockCall, ChainError>,
    failing_plan_reads: BTreeSet<Address>,
    requests: Vec<MockRequest>,
}

impl MockState {
    fn record(&mut self, request: MockRequest) {
        self.requests.push(request);
    }

    fn take_failure(&mut self, call: MockCall) -> Result<(), ChainError> {
        match self.failures.remove(&call) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn sender(&self) -> Result<Address, ChainError> {
        self.accounts
            .first()
            .cloned()
            .ok_or_else(|| revert("no connected account"))
    }

    fn balance(&self, owner: &Address) -> TokenAmount {
        self.balances.get(owner).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: &Address) -> TokenAmount {
        self.allowances
            .get(&(owner.clone(), self.ledger_address.clone()))
            .copied()
            .unwrap_or_default()
    }

    fn mine(&mut self) -> PendingTx {
        self.block += 1;
        self.next_tx += 1;
        PendingTx {
            hash: format!("0x{:064x}", self.next_tx),
        }
    }

    /// Ledger-side `transferFrom(payer, creator, price)`.
    fn collect(&mut self, payer: &Address, creator: &Address, price: TokenAmount) -> Result<(), ChainError> {
        let allowance = self.allowance(payer);
        let remaining_allowance = allowance
            .checked_sub(price)
            .ok_or_else(|| revert("ERC20: insufficient allowance"))?;
        let remaining_balance = self
            .balance(payer)
            .checked_sub(price)
            .ok_or_else(|| revert("ERC20: transfer amount exceeds balance"))?;
        let creator_balance = self
            .balance(creator)
            .checked_add(price)
            .ok_or_else(|| revert("ERC20: balance overflow"))?;

        self.allowances.insert(
            (payer.clone(), self.ledger_address.clone()),
            remaining_allowance,
        );
        self.balances.insert(payer.clone(), remaining_balance);
        self.balances.insert(creator.clone(), creator_balance);
        Ok(())
    }

    fn active_plan(&self, creator: &Address) -> Result<OnChainPlan, ChainError> {
        self.plans
            .get(creator)
            .filter(|plan| plan.active)
            .cloned()
            .ok_or_else(|| revert("Plan not active"))
    }

    fn subscription_view(&self, user: &Address, creator: &Address) -> OnChainSubscription {
        match self.subscriptions.get(&(user.clone(), creator.clone())) {
            Some(record) => OnChainSubscription {
                active: record.expiry > self.now,
                ..record.clone()
            },
            None => OnChainSubscription {
                start: 0,
                expiry: 0,
                ever_subscribed: false,
                active: false,
            },
        }
    }
}

fn revert(reason: &str) -> ChainError {
    ChainError::Reverted {
        reason: Some(reason.to_string()),
    }
}

/// Returns `Pending` once before completing.
async fn yield_now() {
    let mut yielded = false;
    futures::future::poll_fn(|cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
    .await;
}

#[derive(Debug)]
pub struct MockChain {
    state: RefCell<MockState>,
}

impl MockChain {
    /// `ledger_address` is the spender the ledger pulls payments through.
    #[must_use]
    pub fn new(ledger_address: Address) -> Self {
        Self {
            state: RefCell::new(MockState {
                wallet_available: true,
                accounts: Vec::new(),
                chain_id: MOCK_CHAIN_ID,
                ledger_address,
                now: MOCK_GENESIS_TIME,
                block: 0,
                next_tx: 0,
                balances: BTreeMap::new(),
                allowances: BTreeMap::new(),
                plans: BTreeMap::new(),
                subscriptions: BTreeMap::new(),
                events: Vec::new(),
                failures: BTreeMap::new(),
                failing_plan_reads: BTreeSet::new(),
                requests: Vec::new(),
            }),
        }
    }

    #[must_use]
    pub fn with_accounts(self, accounts: Vec<Address>) -> Self {
        self.state.borrow_mut().accounts = accounts;
        self
    }

    #[must_use]
    pub fn without_wallet(self) -> Self {
        self.state.borrow_mut().wallet_available = false;
        self
    }

    /// Switches the account the wallet exposes (and signs with).
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.borrow_mut().accounts = accounts;
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.state.borrow_mut().chain_id = chain_id;
    }

    pub fn set_balance(&self, owner: &Address, amount: TokenAmount) {
        self.state.borrow_mut().balances.insert(owner.clone(), amount);
    }

    /// Sets `owner`'s allowance towards the ledger.
    pub fn set_allowance(&self, owner: &Address, amount: TokenAmount) {
        let mut state = self.state.borrow_mut();
        let spender = state.ledger_address.clone();
        state.allowances.insert((owner.clone(), spender), amount);
    }

    /// Creates or replaces `creator`'s plan and emits a plan-created event.
    pub fn add_plan(&self, creator: &Address, price: TokenAmount, duration_seconds: u64) {
        let mut state = self.state.borrow_mut();
        insert_plan(&mut state, creator, price, duration_seconds);
    }

    pub fn deactivate_plan(&self, creator: &Address) {
        if let Some(plan) = self.state.borrow_mut().plans.get_mut(creator) {
            plan.active = false;
        }
    }

    /// Records a paid-up subscription starting now without moving tokens.
    pub fn grant_subscription(&self, user: &Address, creator: &Address) {
        let mut state = self.state.borrow_mut();
        let duration = state
            .plans
            .get(creator)
            .map_or(0, |plan| plan.duration);
        let now = state.now;
        state.subscriptions.insert(
            (user.clone(), creator.clone()),
            OnChainSubscription {
                start: now,
                expiry: now.saturating_add(duration),
                ever_subscribed: true,
                active: true,
            },
        );
    }

    pub fn fail_next(&self, call: MockCall, error: ChainError) {
        self.state.borrow_mut().failures.insert(call, error);
    }

    pub fn reject_next_connect(&self) {
        self.fail_next(MockCall::RequestAccounts, ChainError::UserRejected);
    }

    pub fn fail_plan_read(&self, creator: &Address) {
        self.state
            .borrow_mut()
            .failing_plan_reads
            .insert(creator.clone());
    }

    pub fn advance_time(&self, seconds: u64) {
        let mut state = self.state.borrow_mut();
        state.now = state.now.saturating_add(seconds);
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.state.borrow().now
    }

    #[must_use]
    pub fn balance(&self, owner: &Address) -> TokenAmount {
        self.state.borrow().balance(owner)
    }

    #[must_use]
    pub fn allowance_of(&self, owner: &Address) -> TokenAmount {
        self.state.borrow().allowance(owner)
    }

    #[must_use]
    pub fn requests(&self) -> Vec<MockRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state.borrow_mut().requests.clear();
    }
}

fn insert_plan(state: &mut MockState, creator: &Address, price: TokenAmount, duration: u64) {
    let subscriber_count = state
        .plans
        .get(creator)
        .map_or(0, |plan| plan.subscriber_count);
    state.plans.insert(
        creator.clone(),
        OnChainPlan {
            price,
            duration,
            active: true,
            subscriber_count,
        },
    );
    state.block += 1;
    let block_number = state.block;
    state.events.push(PlanCreatedEvent {
        creator: creator.clone(),
        price,
        duration,
        block_number,
    });
}

#[async_trait(?Send)]
impl WalletProvider for MockChain {
    fn is_available(&self) -> bool {
        self.state.borrow().wallet_available
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError> {
        let result = {
            let mut state = self.state.borrow_mut();
            state.record(MockRequest::RequestAccounts);
            state
                .take_failure(MockCall::RequestAccounts)
                .map(|()| state.accounts.clone())
        };
        yield_now().await;
        result
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        let mut state = self.state.borrow_mut();
        state.record(MockRequest::ChainId);
        Ok(state.chain_id)
    }
}

#[async_trait(?Send)]
impl TokenContract for MockChain {
    async fn balance_of(&self, owner: &Address) -> Result<TokenAmount, ChainError> {
        let mut state = self.state.borrow_mut();
        state.record(MockRequest::BalanceOf(owner.clone()));
        state.take_failure(MockCall::BalanceOf)?;
        Ok(state.balance(owner))
    }

    async fn allowance(
        &self,
        owner: &Address,
        spender: &Address,
    ) -> Result<TokenAmount, ChainError> {
        let mut state = self.state.borrow_mut();
        state.record(MockRequest::Allowance {
            owner: owner.clone(),
            spender: spender.clone(),
        });
        state.take_failure(MockCall::Allowance)?;
        Ok(state
            .allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or_default())
    }

    async fn approve(
        &self,
        spender: &Address,
        amount: TokenAmount,
    ) -> Result<PendingTx, ChainError> {
        let mut state = self.state.borrow_mut();
        state.record(MockRequest::Approve {
            spender: spender.clone(),
            amount,
        });
        state.take_failure(MockCall::Approve)?;
        let owner = state.sender()?;
        state.allowances.insert((owner, spender.clone()), amount);
        Ok(state.mine())
    }

    async fn wait_for_confirmation(&self, tx: &PendingTx) -> Result<(), ChainError> {
        self.state
            .borrow_mut()
            .record(MockRequest::TokenConfirmation(tx.hash.clone()));
        yield_now().await;
        Ok(())
    }
}

#[async_trait(?Send)]
impl SubscriptionLedger for MockChain {
    async fn create_plan(
        &self,
        price: TokenAmount,
        duration_seconds: u64,
    ) -> Result<PendingTx, ChainError> {
        let mut state = self.state.borrow_mut();
        state.record(MockRequest::CreatePlan {
            price,
            duration: duration_seconds,
        });
        state.take_failure(MockCall::CreatePlan)?;
        if price.is_zero() || duration_seconds == 0 {
            return Err(revert("Invalid plan"));
        }
        let creator = state.sender()?;
        insert_plan(&mut state, &creator, price, duration_seconds);
        Ok(state.mine())
    }

    async fn subscribe(&self, creator: &Address) -> Result<PendingTx, ChainError> {
        let mut state = self.state.borrow_mut();
        state.record(MockRequest::Subscribe(creator.clone()));
        state.take_failure(MockCall::Subscribe)?;
        let user = state.sender()?;
        let plan = state.active_plan(creator)?;
        if state.subscription_view(&user, creator).active {
            return Err(revert("Already subscribed"));
        }
        state.collect(&user, creator, plan.price)?;

        let now = state.now;
        state.subscriptions.insert(
            (user, creator.clone()),
            OnChainSubscription {
                start: now,
                expiry: now.saturating_add(plan.duration),
                ever_subscribed: true,
                active: true,
            },
        );
        if let Some(plan) = state.plans.get_mut(creator) {
            plan.subscriber_count += 1;
        }
        Ok(state.mine())
    }

    async fn renew(&self, creator: &Address) -> Result<PendingTx, ChainError> {
        let mut state = self.state.borrow_mut();
        state.record(MockRequest::Renew(creator.clone()));
        state.take_failure(MockCall::Renew)?;
        let user = state.sender()?;
        let plan = state.active_plan(creator)?;
        let current = state.subscription_view(&user, creator);
        if !current.ever_subscribed {
            return Err(revert("Not subscribed"));
        }
        state.collect(&user, creator, plan.price)?;

        let now = state.now;
        let base = current.expiry.max(now);
        state.subscriptions.insert(
            (user, creator.clone()),
            OnChainSubscription {
                start: if current.active { current.start } else { now },
                expiry: base.saturating_add(plan.duration),
                ever_subscribed: true,
                active: true,
            },
        );
        Ok(state.mine())
    }

    async fn wait_for_confirmation(&self, tx: &PendingTx) -> Result<(), ChainError> {
        self.state
            .borrow_mut()
            .record(MockRequest::LedgerConfirmation(tx.hash.clone()));
        yield_now().await;
        Ok(())
    }

    async fn plan(&self, creator: &Address) -> Result<OnChainPlan, ChainError> {
        let mut state = self.state.borrow_mut();
        state.record(MockRequest::Plan(creator.clone()));
        if state.failing_plan_reads.contains(creator) {
            return Err(ChainError::Transport(format!("plan read failed for {creator}")));
        }
        state
            .plans
            .get(creator)
            .cloned()
            .ok_or_else(|| ChainError::Decode(format!("no plan for {creator}")))
    }

    async fn subscription(
        &self,
        user: &Address,
        creator: &Address,
    ) -> Result<OnChainSubscription, ChainError> {
        let mut state = self.state.borrow_mut();
        state.record(MockRequest::Subscription {
            user: user.clone(),
            creator: creator.clone(),
        });
        Ok(state.subscription_view(user, creator))
    }

    async fn time_remaining(&self, user: &Address, creator: &Address) -> Result<u64, ChainError> {
        let mut state = self.state.borrow_mut();
        state.record(MockRequest::TimeRemaining {
            user: user.clone(),
            creator: creator.clone(),
        });
        let expiry = state
            .subscriptions
            .get(&(user.clone(), creator.clone()))
            .map_or(0, |record| record.expiry);
        Ok(expiry.saturating_sub(state.now))
    }

    async fn latest_block(&self) -> Result<u64, ChainError> {
        let result = {
            let mut state = self.state.borrow_mut();
            state.record(MockRequest::LatestBlock);
            state.take_failure(MockCall::LatestBlock).map(|()| state.block)
        };
        yield_now().await;
        result
    }

    async fn plan_created_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<PlanCreatedEvent>, ChainError> {
        let mut state = self.state.borrow_mut();
        state.record(MockRequest::PlanCreatedEvents {
            from: from_block,
            to: to_block,
        });
        state.take_failure(MockCall::PlanCreatedEvents)?;
        Ok(state
            .events
            .iter()
            .filter(|event| (from_block..=to_block).contains(&event.block_number))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{MockChain, MockRequest};
    use crate::amount::TokenAmount;
    use crate::chain::{ChainError, SubscriptionLedger, TokenContract, WalletProvider};
    use crate::model::Address;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn address(digit: char) -> Result<Address, Box<dyn std::error::Error>> {
        Ok(Address::parse(&format!("0x{}", digit.to_string().repeat(40)))?)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn renew_extends_from_current_expiry() -> TestResult {
        let user = address('c')?;
        let creator = address('a')?;
        let chain = MockChain::new(address('f')?).with_accounts(vec![user.clone()]);
        chain.add_plan(&creator, TokenAmount::from_base_units(10), 100);
        chain.set_balance(&user, TokenAmount::from_base_units(100));
        chain.set_allowance(&user, TokenAmount::from_base_units(100));

        chain.subscribe(&creator).await?;
        chain.advance_time(40);
        chain.renew(&creator).await?;

        assert_eq!(chain.time_remaining(&user, &creator).await?, 160);
        assert_eq!(chain.balance(&user), TokenAmount::from_base_units(80));
        assert_eq!(chain.balance(&creator), TokenAmount::from_base_units(20));
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn double_subscribe_and_missing_allowance_revert() -> TestResult {
        let user = address('c')?;
        let creator = address('a')?;
        let chain = MockChain::new(address('f')?).with_accounts(vec![user.clone()]);
        chain.add_plan(&creator, TokenAmount::from_base_units(10), 100);
        chain.set_balance(&user, TokenAmount::from_base_units(100));

        assert_eq!(
            chain.subscribe(&creator).await,
            Err(ChainError::Reverted {
                reason: Some("ERC20: insufficient allowance".to_string())
            })
        );
        let ledger = address('f')?;
        chain.approve(&ledger, TokenAmount::from_base_units(50)).await?;
        chain.subscribe(&creator).await?;
        assert_eq!(
            chain.subscribe(&creator).await,
            Err(ChainError::Reverted {
                reason: Some("Already subscribed".to_string())
            })
        );
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn rejected_connect_is_consumed_once() -> TestResult {
        let chain = MockChain::new(address('f')?).with_accounts(vec![address('c')?]);
        chain.reject_next_connect();
        assert_eq!(chain.request_accounts().await, Err(ChainError::UserRejected));
        assert_eq!(chain.request_accounts().await?, vec![address('c')?]);
        assert_eq!(
            chain.requests(),
            vec![MockRequest::RequestAccounts, MockRequest::RequestAccounts]
        );
        Ok(())
    }
}
