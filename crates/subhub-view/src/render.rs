use maud::{DOCTYPE, Markup, PreEscaped, html};
use subhub_core::{ModalId, Page, VideoAccess};

use crate::model::{
    ButtonView, CreatorsView, DashboardView, EmptyStateView, HeaderView, HomeView, LibraryView,
    ModalView, PlanCardView, ShellView, StudioView, ToastView, VideoCardView, actions,
};

pub const ROOT_ID: &str = "subhub-root";

/// Independently replaceable parts of the shell. The browser only rewrites a
/// region whose markup changed, so typing in a dialog survives unrelated renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Header,
    Main,
    Modal,
    Toasts,
    Overlay,
}

impl Region {
    pub const ALL: [Self; 5] = [
        Self::Header,
        Self::Main,
        Self::Modal,
        Self::Toasts,
        Self::Overlay,
    ];

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Header => "subhub-header",
            Self::Main => "subhub-main",
            Self::Modal => "subhub-modal",
            Self::Toasts => "subhub-toasts",
            Self::Overlay => "subhub-overlay",
        }
    }
}

/// Inner markup of every region, in document order.
#[must_use]
pub fn render_regions(view: &ShellView) -> Vec<(Region, String)> {
    Region::ALL
        .into_iter()
        .map(|region| (region, region_markup(view, region).into_string()))
        .collect()
}

fn region_markup(view: &ShellView, region: Region) -> Markup {
    match region {
        Region::Header => header(&view.header),
        Region::Main => main_sections(view),
        Region::Modal => html! {
            @if let Some(modal) = &view.modal {
                (modal_dialog(modal))
            }
        },
        Region::Toasts => toasts(&view.toasts),
        Region::Overlay => html! {
            @if let Some(label) = &view.loading {
                div class="sh-overlay" role="status" aria-live="polite" {
                    div class="sh-spinner" {}
                    span { (label) }
                }
            }
        },
    }
}

/// The whole app fragment mounted inside `#subhub-root`.
#[must_use]
pub fn render_shell(view: &ShellView) -> String {
    let markup = html! {
        div class="sh-app" {
            @for (region, inner) in render_regions(view) {
                div id=(region.id()) { (PreEscaped(inner)) }
            }
        }
    };
    markup.into_string()
}

/// Standalone HTML document, used by the native demo.
#[must_use]
pub fn render_page_document(view: &ShellView) -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (view.page.label()) " | SubHub" }
                style { (PreEscaped(stylesheet())) }
            }
            body {
                div id=(ROOT_ID) { (PreEscaped(render_shell(view))) }
            }
        }
    };
    markup.into_string()
}

fn button(view: &ButtonView) -> Markup {
    let class = if view.primary { "sh-btn primary" } else { "sh-btn" };
    html! {
        @match &view.target {
            Some((attribute, value)) => {
                button type="button" class=(class) data-action=(view.action)
                    data-target-kind=(attribute) data-target=(value)
                    disabled[view.disabled] { (view.label) }
            }
            None => {
                button type="button" class=(class) data-action=(view.action)
                    disabled[view.disabled] { (view.label) }
            }
        }
    }
}

fn empty_state(view: &EmptyStateView) -> Markup {
    html! {
        div class="sh-empty" {
            p { (view.message) }
            @if let Some(action) = &view.action {
                (button(action))
            }
        }
    }
}

fn header(view: &HeaderView) -> Markup {
    html! {
        header class="sh-topbar" {
            div class="sh-brand" { (view.brand) }
            nav class="sh-nav" {
                @for link in &view.nav {
                    a class={(if link.active { "sh-nav-link active" } else { "sh-nav-link" })}
                        href={"#" (link.page.as_str())}
                        data-page=(link.page.as_str()) { (link.label) }
                }
            }
            div class="sh-session" {
                @if let Some(account) = &view.account {
                    @if let Some(warning) = &account.network_warning {
                        span class="sh-badge warning" { (warning) }
                    }
                    span class="sh-balance" { (account.balance) }
                    span class="sh-account" title=(account.address) { (account.short) }
                }
                @if let Some(refresh) = &view.refresh {
                    (button(refresh))
                }
                @if let Some(connect) = &view.connect {
                    (button(connect))
                }
            }
        }
    }
}

fn section(page: Page, active: Page, heading: &str, body: Markup) -> Markup {
    html! {
        section id={"page-" (page.as_str())} class="sh-page" data-page-section=(page.as_str())
            hidden[page != active] {
            h1 { (heading) }
            (body)
        }
    }
}

fn main_sections(view: &ShellView) -> Markup {
    html! {
        main class="sh-main" {
            (section(Page::Home, view.page, "SubHub", home(&view.home)))
            (section(Page::Creators, view.page, "Creators", creators(&view.creators)))
            (section(Page::Studio, view.page, "Creator studio", studio(&view.studio)))
            (section(Page::Dashboard, view.page, "Your subscriptions", dashboard(&view.dashboard)))
            (section(Page::Library, view.page, "Video library", library(&view.library)))
        }
    }
}

fn home(view: &HomeView) -> Markup {
    html! {
        div class="sh-hero" {
            p class="sh-lead" { (view.headline) }
            div class="sh-stats" {
                span { strong { (view.creator_count) } " creators" }
                span { strong { (view.video_count) } " videos" }
            }
            (button(&view.call_to_action))
        }
    }
}

fn plan_card(card: &PlanCardView) -> Markup {
    html! {
        article class="sh-card sh-plan" data-creator=(card.creator) {
            header {
                h2 { (card.name) }
                span class="sh-muted" { (card.creator_short) }
            }
            @if !card.description.is_empty() {
                p { (card.description) }
            }
            dl class="sh-facts" {
                dt { "Price" } dd { (card.price) }
                dt { "Access" } dd { (card.duration) }
                dt { "Subscribers" } dd { (card.subscribers) }
            }
            @if let Some(label) = &card.status_label {
                span class="sh-badge" { (label) }
            }
            @if let Some(action) = &card.action {
                (button(action))
            }
        }
    }
}

fn creators(view: &CreatorsView) -> Markup {
    html! {
        @if let Some(empty) = &view.empty {
            (empty_state(empty))
        } @else {
            div class="sh-grid" id="creators-grid" {
                @for card in &view.cards {
                    (plan_card(card))
                }
            }
        }
    }
}

fn video_card(card: &VideoCardView) -> Markup {
    let (class, badge) = match card.access {
        VideoAccess::Owned => ("sh-card sh-video owned", "Yours"),
        VideoAccess::Unlocked => ("sh-card sh-video unlocked", "Unlocked"),
        VideoAccess::Locked => ("sh-card sh-video locked", "Locked"),
    };
    html! {
        article class=(class) data-video=(card.id) {
            @if let Some(embed) = &card.embed_url {
                iframe class="sh-player" src=(embed) title=(card.title)
                    loading="lazy" allowfullscreen {}
            } @else {
                div class="sh-thumb" {
                    img src=(card.thumbnail_url) alt="" loading="lazy";
                    span class="sh-lock" { "🔒" }
                }
            }
            header {
                h3 { (card.title) }
                span class="sh-badge" { (badge) }
            }
            p class="sh-muted" {
                (card.plan_name) " · " (card.creator_short)
                @if let Some(published) = &card.published {
                    " · " (published)
                }
            }
            @if let Some(unlock) = &card.unlock {
                (button(unlock))
            }
        }
    }
}

fn video_grid(videos: &[VideoCardView]) -> Markup {
    html! {
        div class="sh-grid" {
            @for card in videos {
                (video_card(card))
            }
        }
    }
}

fn studio(view: &StudioView) -> Markup {
    html! {
        @if let Some(plan) = &view.plan {
            (plan_card(plan))
        }
        div class="sh-toolbar" {
            @if let Some(create) = &view.create_plan {
                (button(create))
            }
            @if let Some(publish) = &view.publish_video {
                (button(publish))
            }
        }
        @if let Some(empty) = &view.empty {
            (empty_state(empty))
        } @else {
            (video_grid(&view.videos))
        }
    }
}

fn dashboard(view: &DashboardView) -> Markup {
    html! {
        @if let Some(balance) = &view.balance {
            p class="sh-muted" { "Balance: " strong { (balance) } }
        }
        @if let Some(empty) = &view.empty {
            (empty_state(empty))
        } @else {
            table class="sh-table" {
                thead {
                    tr { th { "Creator" } th { "Status" } th { "Expires" } th {} }
                }
                tbody {
                    @for row in &view.subscriptions {
                        tr class={(if row.active { "active" } else { "expired" })} data-creator=(row.creator) {
                            td { (row.plan_name) }
                            td { (row.remaining) }
                            td { (row.expires) }
                            td { (button(&row.renew)) }
                        }
                    }
                }
            }
        }
    }
}

fn library(view: &LibraryView) -> Markup {
    html! {
        @if let Some(empty) = &view.empty {
            (empty_state(empty))
        } @else {
            (video_grid(&view.videos))
        }
    }
}

fn modal_dialog(modal: &ModalView) -> Markup {
    html! {
        div class="sh-backdrop" data-action=(actions::CLOSE_MODAL) {}
        div class="sh-modal" role="dialog" aria-modal="true" data-modal=(modal.id.as_str()) {
            header {
                h2 { (modal.title) }
                button type="button" class="sh-btn subtle" data-action=(actions::CLOSE_MODAL)
                    aria-label="Close" { "×" }
            }
            form class="sh-form" data-form=(modal.id.as_str()) {
                @match modal.id {
                    ModalId::CreatePlan => {
                        label for="plan-name" { "Name" }
                        input id="plan-name" name="name" type="text" required;
                        label for="plan-description" { "Description" }
                        textarea id="plan-description" name="description" rows="3" {}
                        label for="plan-price" { "Price (" (modal.token_symbol) ")" }
                        input id="plan-price" name="price" type="text" inputmode="decimal"
                            placeholder="12.50" required;
                        label for="plan-duration" { "Duration (days)" }
                        input id="plan-duration" name="duration_days" type="number" min="1"
                            value="30" required;
                    }
                    ModalId::PublishVideo => {
                        label for="video-title" { "Title" }
                        input id="video-title" name="title" type="text" required;
                        label for="video-url" { "YouTube link" }
                        input id="video-url" name="url" type="url"
                            placeholder="https://youtu.be/…" required;
                        label for="video-plan" { "Tier" }
                        select id="video-plan" name="plan" required {
                            option value="" { "Select a tier" }
                            @for tier in &modal.tiers {
                                option value=(tier.value) { (tier.label) }
                            }
                        }
                    }
                }
                button type="submit" class="sh-btn primary" data-idle-label=(modal.submit_label) {
                    (modal.submit_label)
                }
            }
        }
    }
}

fn toasts(items: &[ToastView]) -> Markup {
    html! {
        ul class="sh-toasts" aria-live="polite" {
            @for toast in items {
                li class={"sh-toast " (toast.level)} data-notification=(toast.id) {
                    span { (toast.message) }
                    button type="button" class="sh-btn subtle" data-action=(actions::DISMISS)
                        data-target-kind="notification" data-target=(toast.id)
                        aria-label="Dismiss" { "×" }
                }
            }
        }
    }
}

#[must_use]
pub fn stylesheet() -> &'static str {
    r#"
:root {
  color-scheme: dark;
  --bg: #070b14;
  --panel: rgba(12, 20, 38, 0.88);
  --panel-border: rgba(120, 146, 196, 0.28);
  --text: #e6efff;
  --muted: #93a4c6;
  --accent: #35a7ff;
  --danger: #ff7589;
  --success: #4fd69c;
  --warning: #ffc857;
}
* { box-sizing: border-box; }
body { margin: 0; background: var(--bg); color: var(--text); font-family: "Inter", system-ui, sans-serif; }
.sh-app { min-height: 100vh; }
.sh-topbar {
  display: grid;
  grid-template-columns: 140px 1fr auto;
  gap: 1rem;
  align-items: center;
  padding: 0.8rem 1rem;
  border-bottom: 1px solid var(--panel-border);
}
.sh-brand { font-weight: 700; letter-spacing: 0.05em; text-transform: uppercase; font-size: 0.85rem; }
.sh-nav { display: flex; gap: 0.4rem; flex-wrap: wrap; }
.sh-nav-link { color: var(--muted); text-decoration: none; padding: 0.35rem 0.6rem; border-radius: 10px; border: 1px solid transparent; }
.sh-nav-link.active { color: var(--text); border-color: rgba(53, 167, 255, 0.5); }
.sh-session { display: flex; gap: 0.6rem; align-items: center; font-size: 0.88rem; }
.sh-account { color: var(--muted); font-family: ui-monospace, monospace; }
.sh-main { padding: 1rem; max-width: 1200px; margin: 0 auto; }
.sh-grid { display: grid; gap: 1rem; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); }
.sh-card { border: 1px solid var(--panel-border); border-radius: 14px; background: var(--panel); padding: 1rem; display: grid; gap: 0.55rem; }
.sh-card header { display: flex; justify-content: space-between; gap: 0.5rem; align-items: baseline; }
.sh-card h2, .sh-card h3 { margin: 0; font-size: 1.05rem; }
.sh-facts { display: grid; grid-template-columns: auto 1fr; gap: 0.2rem 0.8rem; margin: 0; }
.sh-facts dt { color: var(--muted); }
.sh-facts dd { margin: 0; }
.sh-video.locked .sh-thumb img { filter: blur(6px) brightness(0.5); }
.sh-thumb { position: relative; }
.sh-thumb img { width: 100%; border-radius: 10px; display: block; }
.sh-lock { position: absolute; inset: 0; display: grid; place-items: center; font-size: 2rem; }
.sh-player { width: 100%; aspect-ratio: 16 / 9; border: 0; border-radius: 10px; }
.sh-badge { font-size: 0.75rem; padding: 0.15rem 0.45rem; border-radius: 999px; border: 1px solid var(--panel-border); color: var(--muted); }
.sh-badge.warning { color: var(--warning); border-color: var(--warning); }
.sh-btn { appearance: none; border: 1px solid rgba(105, 126, 166, 0.45); border-radius: 10px; background: rgba(16, 28, 51, 0.9); color: var(--text); padding: 0.45rem 0.75rem; cursor: pointer; font: inherit; }
.sh-btn.primary { background: linear-gradient(180deg, #1a6ea5 0%, #0f4f7b 100%); border-color: rgba(75, 188, 255, 0.6); }
.sh-btn.subtle { background: transparent; border-color: transparent; }
.sh-btn:disabled { opacity: 0.55; cursor: progress; }
.sh-muted { color: var(--muted); }
.sh-empty { border: 1px dashed var(--panel-border); border-radius: 14px; padding: 1.5rem; text-align: center; color: var(--muted); }
.sh-toolbar { display: flex; gap: 0.6rem; margin: 1rem 0; }
.sh-table { width: 100%; border-collapse: collapse; }
.sh-table th, .sh-table td { text-align: left; padding: 0.55rem; border-bottom: 1px solid var(--panel-border); }
.sh-table tr.expired td { color: var(--muted); }
.sh-backdrop { position: fixed; inset: 0; background: rgba(2, 6, 14, 0.7); z-index: 10; }
.sh-modal { position: fixed; top: 10vh; left: 50%; transform: translateX(-50%); width: min(480px, 92vw); z-index: 11; background: var(--panel); border: 1px solid var(--panel-border); border-radius: 14px; padding: 1rem; }
.sh-modal header { display: flex; justify-content: space-between; align-items: center; }
.sh-form { display: grid; gap: 0.5rem; }
.sh-form input, .sh-form textarea, .sh-form select { width: 100%; border: 1px solid var(--panel-border); border-radius: 10px; padding: 0.5rem; background: #060d1b; color: var(--text); font: inherit; }
.sh-toasts { position: fixed; right: 1rem; bottom: 1rem; list-style: none; margin: 0; padding: 0; display: grid; gap: 0.5rem; z-index: 20; }
.sh-toast { display: flex; gap: 0.5rem; align-items: center; border-radius: 10px; padding: 0.55rem 0.75rem; background: var(--panel); border: 1px solid var(--panel-border); max-width: 380px; }
.sh-toast.success { border-color: var(--success); }
.sh-toast.error { border-color: var(--danger); }
.sh-toast.warning { border-color: var(--warning); }
.sh-overlay { position: fixed; inset: 0; display: grid; place-items: center; align-content: center; gap: 0.8rem; background: rgba(2, 6, 14, 0.55); z-index: 30; }
.sh-spinner { width: 36px; height: 36px; border-radius: 50%; border: 3px solid var(--panel-border); border-top-color: var(--accent); animation: sh-spin 0.9s linear infinite; }
@keyframes sh-spin { to { transform: rotate(360deg); } }
[hidden] { display: none !important; }
@media (max-width: 860px) {
  .sh-topbar { grid-template-columns: 1fr; }
}
"#
}
