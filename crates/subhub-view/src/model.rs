//! Declarative description of everything on screen, derived from `AppState`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use subhub_core::{
    ActionKind, Address, AppState, ModalId, Page, Plan, SubHubConfig, Subscription, TokenAmount,
    Video, VideoAccess, embed_url, thumbnail_url, video_access,
};

/// `data-action` values understood by the event delegation layer.
pub mod actions {
    pub const CONNECT: &str = "connect";
    pub const REFRESH: &str = "refresh";
    pub const SUBSCRIBE: &str = "subscribe";
    pub const RENEW: &str = "renew";
    pub const OPEN_MODAL: &str = "open-modal";
    pub const CLOSE_MODAL: &str = "close-modal";
    pub const DISMISS: &str = "dismiss";
    pub const NAVIGATE: &str = "navigate";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonView {
    pub label: String,
    pub action: &'static str,
    /// Extra `data-*` attribute (`creator`, `modal`, `page`) and its value.
    pub target: Option<(&'static str, String)>,
    pub disabled: bool,
    pub primary: bool,
}

impl ButtonView {
    fn new(label: impl Into<String>, action: &'static str) -> Self {
        Self {
            label: label.into(),
            action,
            target: None,
            disabled: false,
            primary: false,
        }
    }

    fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    fn target(mut self, attribute: &'static str, value: impl Into<String>) -> Self {
        self.target = Some((attribute, value.into()));
        self
    }

    /// Disabled, with the progress label, while `kind` is in flight.
    fn busy_while(mut self, state: &AppState, kind: ActionKind) -> Self {
        if state.is_in_flight(kind) {
            self.disabled = true;
            self.label = kind.progress_label().to_string();
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub address: String,
    pub short: String,
    pub balance: String,
    pub network_warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderView {
    pub brand: String,
    pub nav: Vec<NavLinkView>,
    pub account: Option<AccountView>,
    pub connect: Option<ButtonView>,
    pub refresh: Option<ButtonView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLinkView {
    pub page: Page,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyStateView {
    pub message: String,
    pub action: Option<ButtonView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomeView {
    pub headline: String,
    pub creator_count: usize,
    pub video_count: usize,
    pub call_to_action: ButtonView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Own,
    Subscribed,
    Expired,
    Available,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanCardView {
    pub creator: String,
    pub creator_short: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub duration: String,
    pub subscribers: String,
    pub status: PlanStatus,
    pub status_label: Option<String>,
    pub action: Option<ButtonView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatorsView {
    pub cards: Vec<PlanCardView>,
    pub empty: Option<EmptyStateView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoCardView {
    pub id: String,
    pub title: String,
    pub creator_short: String,
    pub plan_name: String,
    pub access: VideoAccess,
    pub thumbnail_url: String,
    /// Only present when the viewer may watch.
    pub embed_url: Option<String>,
    pub unlock: Option<ButtonView>,
    pub published: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudioView {
    pub connected: bool,
    pub plan: Option<PlanCardView>,
    pub create_plan: Option<ButtonView>,
    pub publish_video: Option<ButtonView>,
    pub videos: Vec<VideoCardView>,
    pub empty: Option<EmptyStateView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRowView {
    pub creator: String,
    pub plan_name: String,
    pub active: bool,
    pub remaining: String,
    pub expires: String,
    pub renew: ButtonView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub balance: Option<String>,
    pub subscriptions: Vec<SubscriptionRowView>,
    pub empty: Option<EmptyStateView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryView {
    pub videos: Vec<VideoCardView>,
    pub empty: Option<EmptyStateView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierOptionView {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalView {
    pub id: ModalId,
    pub title: &'static str,
    pub token_symbol: String,
    pub tiers: Vec<TierOptionView>,
    pub submit_label: &'static str,
    /// Set while the form's action is in flight. Kept out of the rendered markup
    /// so swapping the modal region never clears what the user typed; the host
    /// applies it to the live submit button instead.
    pub busy_label: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToastView {
    pub id: u64,
    pub level: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellView {
    pub page: Page,
    pub header: HeaderView,
    pub home: HomeView,
    pub creators: CreatorsView,
    pub studio: StudioView,
    pub dashboard: DashboardView,
    pub library: LibraryView,
    pub modal: Option<ModalView>,
    pub toasts: Vec<ToastView>,
    /// Progress label for the loading overlay while a chain request is pending.
    pub loading: Option<String>,
}

struct Formatter<'a> {
    state: &'a AppState,
    config: &'a SubHubConfig,
}

impl Formatter<'_> {
    fn amount(&self, amount: TokenAmount) -> String {
        format!(
            "{} {}",
            amount.display(self.config.token_decimals),
            self.config.token_symbol
        )
    }

    fn plan_name(&self, creator: &Address) -> String {
        self.state
            .plan_for(creator)
            .map_or_else(|| format!("Creator {}", creator.short()), Plan::display_name)
    }

    fn plan_card(&self, plan: &Plan) -> PlanCardView {
        let own = self.state.account() == Some(&plan.creator);
        let subscription = self.state.subscription_for(&plan.creator);
        let creator = plan.creator.to_string();

        let (status, status_label, action) = if own {
            (PlanStatus::Own, Some("Your plan".to_string()), None)
        } else {
            match subscription {
                Some(subscription) if subscription.active => (
                    PlanStatus::Subscribed,
                    Some(days_label(subscription)),
                    Some(
                        ButtonView::new("Renew", actions::RENEW)
                            .target("creator", creator.clone())
                            .busy_while(self.state, ActionKind::Renew),
                    ),
                ),
                Some(_) => (
                    PlanStatus::Expired,
                    Some("Expired".to_string()),
                    Some(
                        ButtonView::new("Renew", actions::RENEW)
                            .primary()
                            .target("creator", creator.clone())
                            .busy_while(self.state, ActionKind::Renew),
                    ),
                ),
                None => (
                    PlanStatus::Available,
                    None,
                    Some(
                        ButtonView::new("Subscribe", actions::SUBSCRIBE)
                            .primary()
                            .target("creator", creator.clone())
                            .busy_while(self.state, ActionKind::Subscribe),
                    ),
                ),
            }
        };

        PlanCardView {
            creator_short: plan.creator.short(),
            creator,
            name: plan.display_name(),
            description: plan.description.clone(),
            price: self.amount(plan.price),
            duration: plural(plan.duration_days(), "day"),
            subscribers: plural(plan.subscriber_count, "subscriber"),
            status,
            status_label,
            action,
        }
    }

    fn video_card(&self, video: &Video) -> VideoCardView {
        let access = video_access(self.state, video);
        let unlocked = matches!(access, VideoAccess::Owned | VideoAccess::Unlocked);
        let unlock = match access {
            VideoAccess::Locked if self.state.plan_for(&video.plan).is_some() => {
                // An expired subscription is renewed, matching the plan card.
                let button = if self.state.subscription_for(&video.plan).is_some() {
                    ButtonView::new("Renew to unlock", actions::RENEW)
                        .busy_while(self.state, ActionKind::Renew)
                } else {
                    ButtonView::new("Subscribe to unlock", actions::SUBSCRIBE)
                        .busy_while(self.state, ActionKind::Subscribe)
                };
                Some(button.primary().target("creator", video.plan.to_string()))
            }
            _ => None,
        };
        VideoCardView {
            id: video.id.clone(),
            title: video.title.clone(),
            creator_short: video.creator.short(),
            plan_name: self.plan_name(&video.plan),
            access,
            thumbnail_url: thumbnail_url(&video.video_ref),
            embed_url: unlocked.then(|| embed_url(&video.video_ref)),
            unlock,
            published: DateTime::<Utc>::from_timestamp(video.published_at, 0)
                .filter(|_| video.published_at > 0)
                .map(|date| date.format("%Y-%m-%d").to_string()),
        }
    }
}

fn plural(count: u64, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn days_label(subscription: &Subscription) -> String {
    format!("{} left", plural(subscription.days_remaining, "day"))
}

fn format_timestamp(seconds: u64) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
        .map_or_else(|| "unknown".to_string(), |date| date.format("%Y-%m-%d %H:%M UTC").to_string())
}

fn connect_button(state: &AppState) -> ButtonView {
    ButtonView::new("Connect wallet", actions::CONNECT)
        .primary()
        .busy_while(state, ActionKind::Connect)
}

fn open_modal_button(state: &AppState, label: &str, modal: ModalId, kind: ActionKind) -> ButtonView {
    ButtonView::new(label, actions::OPEN_MODAL)
        .primary()
        .target("modal", modal.as_str())
        .busy_while(state, kind)
}

#[must_use]
pub fn build_shell_view(state: &AppState, config: &SubHubConfig) -> ShellView {
    let format = Formatter { state, config };
    let account = state.account();

    let header = HeaderView {
        brand: "SubHub".to_string(),
        nav: Page::ALL
            .into_iter()
            .map(|page| NavLinkView {
                page,
                label: page.label(),
                active: page == state.page,
            })
            .collect(),
        account: state.session.as_ref().map(|session| AccountView {
            address: session.account.to_string(),
            short: session.account.short(),
            balance: format.amount(session.balance),
            network_warning: session
                .chain_id
                .filter(|chain_id| *chain_id != config.chain_id)
                .map(|chain_id| format!("Wrong network ({chain_id}); expected {}", config.chain_id)),
        }),
        connect: state.session.is_none().then(|| connect_button(state)),
        refresh: state.session.is_some().then(|| {
            ButtonView::new("Refresh", actions::REFRESH).busy_while(state, ActionKind::Refresh)
        }),
    };

    let home = HomeView {
        headline: "Support creators directly. Unlock their videos with a token subscription."
            .to_string(),
        creator_count: state.plans.len(),
        video_count: state.videos.len(),
        call_to_action: if state.session.is_some() {
            ButtonView::new("Browse creators", actions::NAVIGATE)
                .primary()
                .target("page", Page::Creators.as_str())
        } else {
            connect_button(state)
        },
    };

    let cards: Vec<PlanCardView> = state
        .plans
        .iter()
        .filter(|plan| plan.active)
        .map(|plan| format.plan_card(plan))
        .collect();
    let creators = CreatorsView {
        empty: cards.is_empty().then(|| EmptyStateView {
            message: "No creators have published a plan yet.".to_string(),
            action: Some(
                ButtonView::new("Become the first creator", actions::NAVIGATE)
                    .target("page", Page::Studio.as_str()),
            ),
        }),
        cards,
    };

    let studio = match account {
        Some(account) => {
            let plan = state.plan_for(account);
            let videos: Vec<VideoCardView> = state
                .videos
                .iter()
                .filter(|video| &video.creator == account)
                .map(|video| format.video_card(video))
                .collect();
            StudioView {
                connected: true,
                plan: plan.map(|plan| format.plan_card(plan)),
                create_plan: plan.is_none().then(|| {
                    open_modal_button(state, "Create plan", ModalId::CreatePlan, ActionKind::CreatePlan)
                }),
                publish_video: plan.is_some().then(|| {
                    open_modal_button(
                        state,
                        "Publish video",
                        ModalId::PublishVideo,
                        ActionKind::PublishVideo,
                    )
                }),
                empty: videos.is_empty().then(|| EmptyStateView {
                    message: if plan.is_some() {
                        "You have not published any videos yet.".to_string()
                    } else {
                        "Create a plan to start publishing gated videos.".to_string()
                    },
                    action: None,
                }),
                videos,
            }
        }
        None => StudioView {
            connected: false,
            plan: None,
            create_plan: None,
            publish_video: None,
            videos: Vec::new(),
            empty: Some(EmptyStateView {
                message: "Connect your wallet to manage your plan and videos.".to_string(),
                action: Some(connect_button(state)),
            }),
        },
    };

    let rows: Vec<SubscriptionRowView> = state
        .subscriptions
        .iter()
        .map(|subscription| {
            let creator = subscription.creator.to_string();
            SubscriptionRowView {
                plan_name: format.plan_name(&subscription.creator),
                active: subscription.active,
                remaining: if subscription.active {
                    days_label(subscription)
                } else {
                    "Expired".to_string()
                },
                expires: format_timestamp(subscription.expires_at),
                renew: ButtonView::new("Renew", actions::RENEW)
                    .target("creator", creator.clone())
                    .busy_while(state, ActionKind::Renew),
                creator,
            }
        })
        .collect();
    let dashboard = DashboardView {
        balance: state
            .session
            .as_ref()
            .map(|session| format.amount(session.balance)),
        empty: rows.is_empty().then(|| {
            if state.session.is_some() {
                EmptyStateView {
                    message: "You are not subscribed to anyone yet.".to_string(),
                    action: Some(
                        ButtonView::new("Find creators", actions::NAVIGATE)
                            .target("page", Page::Creators.as_str()),
                    ),
                }
            } else {
                EmptyStateView {
                    message: "Connect your wallet to see your subscriptions.".to_string(),
                    action: Some(connect_button(state)),
                }
            }
        }),
        subscriptions: rows,
    };

    let library_videos: Vec<VideoCardView> = state
        .videos
        .iter()
        .map(|video| format.video_card(video))
        .collect();
    let library = LibraryView {
        empty: library_videos.is_empty().then(|| EmptyStateView {
            message: "No videos have been published yet.".to_string(),
            action: None,
        }),
        videos: library_videos,
    };

    let modal = state.modal.map(|id| {
        let (title, kind) = match id {
            ModalId::CreatePlan => ("Create your plan", ActionKind::CreatePlan),
            ModalId::PublishVideo => ("Publish a video", ActionKind::PublishVideo),
        };
        ModalView {
            id,
            title,
            token_symbol: config.token_symbol.clone(),
            tiers: state
                .plans
                .iter()
                .filter(|plan| plan.active && Some(&plan.creator) == account)
                .map(|plan| TierOptionView {
                    value: plan.creator.to_string(),
                    label: format!("{} ({})", plan.display_name(), format.amount(plan.price)),
                })
                .collect(),
            submit_label: match id {
                ModalId::CreatePlan => "Create plan",
                ModalId::PublishVideo => "Publish",
            },
            busy_label: state
                .is_in_flight(kind)
                .then(|| kind.progress_label()),
        }
    });

    ShellView {
        page: state.page,
        header,
        home,
        creators,
        studio,
        dashboard,
        library,
        modal,
        toasts: state
            .notifications
            .iter()
            .map(|notification| ToastView {
                id: notification.id,
                level: notification.level.as_str(),
                message: notification.message.clone(),
            })
            .collect(),
        loading: state
            .in_flight
            .iter()
            .next()
            .map(|kind| kind.progress_label().to_string()),
    }
}
