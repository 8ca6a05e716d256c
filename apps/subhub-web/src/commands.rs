//! Decoding of delegated DOM events into controller calls.
//!
//! The rendered markup carries intent in `data-*` attributes; these helpers
//! turn the raw attribute strings into typed commands so the wasm glue stays
//! a thin dispatch table.

use std::collections::BTreeMap;

use subhub_core::{Address, CreatePlanForm, ModalId, Page, PublishVideoForm};
use subhub_view::actions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UiCommand {
    Connect,
    Refresh,
    Subscribe(Address),
    Renew(Address),
    OpenModal(ModalId),
    CloseModal,
    Dismiss(u64),
    Navigate(Page),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FormSubmission {
    CreatePlan(CreatePlanForm),
    PublishVideo(PublishVideoForm),
}

/// `target_kind` and `target` come from `data-target-kind` / `data-target`.
pub(crate) fn parse_command(
    action: &str,
    target_kind: Option<&str>,
    target: Option<&str>,
) -> Option<UiCommand> {
    let target_for = |kind: &str| {
        if target_kind.map(str::trim) == Some(kind) {
            target.map(str::trim).filter(|value| !value.is_empty())
        } else {
            None
        }
    };

    match action.trim() {
        actions::CONNECT => Some(UiCommand::Connect),
        actions::REFRESH => Some(UiCommand::Refresh),
        actions::SUBSCRIBE => target_for("creator")
            .and_then(|raw| Address::parse(raw).ok())
            .map(UiCommand::Subscribe),
        actions::RENEW => target_for("creator")
            .and_then(|raw| Address::parse(raw).ok())
            .map(UiCommand::Renew),
        actions::OPEN_MODAL => target_for("modal")
            .and_then(ModalId::from_id)
            .map(UiCommand::OpenModal),
        actions::CLOSE_MODAL => Some(UiCommand::CloseModal),
        actions::DISMISS => target_for("notification")
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(UiCommand::Dismiss),
        actions::NAVIGATE => target_for("page")
            .and_then(Page::from_id)
            .map(UiCommand::Navigate),
        _ => None,
    }
}

pub(crate) fn parse_form(form_id: &str, fields: &BTreeMap<String, String>) -> Option<FormSubmission> {
    let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
    match ModalId::from_id(form_id)? {
        ModalId::CreatePlan => Some(FormSubmission::CreatePlan(CreatePlanForm {
            name: field("name"),
            description: field("description"),
            price: field("price"),
            duration_days: field("duration_days"),
        })),
        ModalId::PublishVideo => Some(FormSubmission::PublishVideo(PublishVideoForm {
            title: field("title"),
            url: field("url"),
            plan: field("plan"),
        })),
    }
}

/// Page named by a location hash such as `#creators`; empty hashes land on home.
pub(crate) fn page_from_hash(hash: &str) -> Page {
    Page::from_id(hash).unwrap_or_default()
}
