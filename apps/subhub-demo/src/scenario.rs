//! Scripted sessions against the in-memory ledger.

use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use subhub_core::mock::MockChain;
use subhub_core::{
    Address, AppState, ChainSynchronizer, Controller, CreatePlanForm, MemoryStore, Outcome, Page,
    PlanProfile, PlanProfiles, PublishVideoForm, SECONDS_PER_DAY, SubHubConfig, TokenAmount,
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Connect and look around.
    Browse,
    /// Connect, then subscribe to the first seeded creator.
    Subscribe,
    /// Connect, create a plan for the account and publish a video to it.
    Publish,
}

struct SeedCreator {
    address: &'static str,
    name: &'static str,
    description: &'static str,
    price: &'static str,
    days: u64,
    video_title: &'static str,
    video_url: &'static str,
}

const SEED_CREATORS: [SeedCreator; 2] = [
    SeedCreator {
        address: "0xa11ce00000000000000000000000000000000001",
        name: "Alice's Kitchen",
        description: "Weekly cooking walkthroughs.",
        price: "12.50",
        days: 30,
        video_title: "Knife skills in ten minutes",
        video_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
    },
    SeedCreator {
        address: "0xb0b0000000000000000000000000000000000002",
        name: "Bob Builds",
        description: "Woodworking from rough stock.",
        price: "5",
        days: 7,
        video_title: "Cutting dovetails by hand",
        video_url: "https://youtu.be/9bZkp7q19f0",
    },
];

pub struct DemoRun {
    pub state: AppState,
    pub outcomes: Vec<(&'static str, Outcome)>,
}

fn record(outcomes: &mut Vec<(&'static str, Outcome)>, step: &'static str, outcome: Outcome) {
    info!(step, ?outcome, "demo step finished");
    outcomes.push((step, outcome));
}

/// Seeds two creators with plans, profiles and one video each, then drives a
/// controller as `account` through `scenario` and lands on `page`.
pub async fn run(
    config: &SubHubConfig,
    scenario: Scenario,
    account: &Address,
    balance: TokenAmount,
    page: Page,
) -> Result<DemoRun> {
    let chain = Rc::new(MockChain::new(config.ledger_address.clone()));
    let store = Rc::new(MemoryStore::new());
    seed(config, &chain, &store).await?;

    chain.set_accounts(vec![account.clone()]);
    chain.set_balance(account, balance);
    let controller = Controller::new(
        ChainSynchronizer::new(chain.clone(), chain.clone(), chain, config.clone()),
        store,
    );

    let mut outcomes = Vec::new();
    record(&mut outcomes, "boot", controller.boot().await);
    record(&mut outcomes, "connect", controller.connect_wallet().await);

    match scenario {
        Scenario::Browse => {}
        Scenario::Subscribe => {
            let creator = Address::parse(SEED_CREATORS[0].address)?;
            record(&mut outcomes, "subscribe", controller.subscribe(&creator).await);
        }
        Scenario::Publish => {
            let created = controller
                .submit_create_plan(CreatePlanForm {
                    name: "Demo Channel".to_string(),
                    description: "Published from the demo runner.".to_string(),
                    price: "3".to_string(),
                    duration_days: "14".to_string(),
                })
                .await;
            record(&mut outcomes, "create_plan", created);
            let published = controller
                .submit_publish_video(PublishVideoForm {
                    title: "Behind the scenes".to_string(),
                    url: "https://www.youtube.com/shorts/aqz-KE-bpKQ".to_string(),
                    plan: account.to_string(),
                })
                .await;
            record(&mut outcomes, "publish_video", published);
        }
    }

    controller.navigate(page);
    Ok(DemoRun {
        state: controller.snapshot(),
        outcomes,
    })
}

/// Each seeded creator publishes through its own controller, the same way the
/// browser build does.
async fn seed(config: &SubHubConfig, chain: &Rc<MockChain>, store: &Rc<MemoryStore>) -> Result<()> {
    let profiles = PlanProfiles::new(&config.storage_prefix);
    for creator in &SEED_CREATORS {
        let address = Address::parse(creator.address)
            .with_context(|| format!("seed creator address {}", creator.address))?;
        let price = TokenAmount::parse_units(creator.price, config.token_decimals)
            .with_context(|| format!("seed price for {}", creator.name))?;
        chain.add_plan(&address, price, creator.days * SECONDS_PER_DAY);
        profiles.upsert(
            store.as_ref(),
            &address,
            PlanProfile {
                name: creator.name.to_string(),
                description: creator.description.to_string(),
            },
        )?;

        chain.set_accounts(vec![address.clone()]);
        let publisher = Controller::new(
            ChainSynchronizer::new(chain.clone(), chain.clone(), chain.clone(), config.clone()),
            store.clone(),
        );
        if publisher.connect_wallet().await != Outcome::Completed {
            bail!("seed creator {} could not connect", creator.name);
        }
        let published = publisher
            .submit_publish_video(PublishVideoForm {
                title: creator.video_title.to_string(),
                url: creator.video_url.to_string(),
                plan: address.to_string(),
            })
            .await;
        if published != Outcome::Completed {
            bail!("seed video for {} was not published", creator.name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use subhub_core::{Address, Outcome, Page, SubHubConfig, TokenAmount, VideoAccess, video_access};

    use super::{Scenario, run};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn config() -> Result<SubHubConfig, Box<dyn std::error::Error>> {
        Ok(SubHubConfig {
            token_address: Address::parse("0x00000000000000000000000000000000000000e1")?,
            ledger_address: Address::parse("0x00000000000000000000000000000000000000f1")?,
            ..SubHubConfig::default()
        })
    }

    fn viewer() -> Result<Address, Box<dyn std::error::Error>> {
        Ok(Address::parse("0xc0ffee0000000000000000000000000000000003")?)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn browse_sees_seeded_creators_locked() -> TestResult {
        let run = run(
            &config()?,
            Scenario::Browse,
            &viewer()?,
            TokenAmount::parse_units("50", 18)?,
            Page::Library,
        )
        .await?;
        assert_eq!(run.state.plans.len(), 2);
        assert_eq!(run.state.videos.len(), 2);
        assert_eq!(run.state.page, Page::Library);
        assert!(
            run.state
                .videos
                .iter()
                .all(|video| video_access(&run.state, video) == VideoAccess::Locked)
        );
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn subscribe_scenario_unlocks_first_creator() -> TestResult {
        let run = run(
            &config()?,
            Scenario::Subscribe,
            &viewer()?,
            TokenAmount::parse_units("50", 18)?,
            Page::Dashboard,
        )
        .await?;
        assert!(run.outcomes.contains(&("subscribe", Outcome::Completed)));
        assert_eq!(run.state.subscriptions.len(), 1);
        assert_eq!(run.state.subscriptions[0].days_remaining, 30);
        let balance = run.state.session.as_ref().map(|session| session.balance);
        assert_eq!(balance, Some(TokenAmount::parse_units("37.50", 18)?));
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn publish_scenario_adds_owned_video() -> TestResult {
        let viewer = viewer()?;
        let run = run(
            &config()?,
            Scenario::Publish,
            &viewer,
            TokenAmount::ZERO,
            Page::Studio,
        )
        .await?;
        assert!(run.outcomes.contains(&("create_plan", Outcome::Completed)));
        assert!(run.outcomes.contains(&("publish_video", Outcome::Completed)));
        let owned: Vec<_> = run
            .state
            .videos
            .iter()
            .filter(|video| video.creator == viewer)
            .collect();
        assert_eq!(owned.len(), 1);
        assert_eq!(video_access(&run.state, owned[0]), VideoAccess::Owned);
        Ok(())
    }
}
