use std::fmt;

use serde::{Deserialize, Serialize};

use crate::amount::TokenAmount;

pub const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must not be empty")]
    Empty,
    #[error("address must be 0x followed by 40 hex characters")]
    Malformed,
}

/// Lower-cased, 0x-prefixed 20-byte account or contract address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }
        let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        else {
            return Err(AddressError::Malformed);
        };
        if hex.len() != 40 || !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(AddressError::Malformed);
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    #[must_use]
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(40)))
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.bytes().skip(2).all(|byte| byte == b'0')
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234…abcd`
    #[must_use]
    pub fn short(&self) -> String {
        let head = self.0.get(..6).unwrap_or(&self.0);
        let tail = self.0.get(self.0.len().saturating_sub(4)..).unwrap_or("");
        format!("{head}…{tail}")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Off-chain display metadata a creator enters alongside the on-chain plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A creator's subscription tier. Keyed by creator address; one plan per creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub creator: Address,
    pub name: String,
    pub description: String,
    pub price: TokenAmount,
    pub duration_seconds: u64,
    pub active: bool,
    pub subscriber_count: u64,
}

impl Plan {
    #[must_use]
    pub fn duration_days(&self) -> u64 {
        self.duration_seconds.div_ceil(SECONDS_PER_DAY)
    }

    /// Profile name, or the shortened creator address when none was stored.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Creator {}", self.creator.short())
        } else {
            self.name.clone()
        }
    }
}

/// Snapshot of the caller's access to one creator, rebuilt on every sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub creator: Address,
    pub started_at: u64,
    pub expires_at: u64,
    pub seconds_remaining: u64,
    pub days_remaining: u64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    /// External (YouTube) video id.
    pub video_ref: String,
    /// Plan the video is gated behind; plans are keyed by creator address.
    pub plan: Address,
    pub creator: Address,
    #[serde(default)]
    pub published_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub account: Address,
    pub balance: TokenAmount,
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[default]
    Home,
    Creators,
    Studio,
    Dashboard,
    Library,
}

impl Page {
    pub const ALL: [Self; 5] = [
        Self::Home,
        Self::Creators,
        Self::Studio,
        Self::Dashboard,
        Self::Library,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Creators => "creators",
            Self::Studio => "studio",
            Self::Dashboard => "dashboard",
            Self::Library => "library",
        }
    }

    #[must_use]
    pub fn from_id(raw: &str) -> Option<Self> {
        let normalized = raw.trim().trim_start_matches('#').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|page| page.as_str() == normalized)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Creators => "Creators",
            Self::Studio => "Studio",
            Self::Dashboard => "Dashboard",
            Self::Library => "Library",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalId {
    CreatePlan,
    PublishVideo,
}

impl ModalId {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatePlan => "create-plan",
            Self::PublishVideo => "publish-video",
        }
    }

    #[must_use]
    pub fn from_id(raw: &str) -> Option<Self> {
        match raw.trim() {
            "create-plan" => Some(Self::CreatePlan),
            "publish-video" => Some(Self::PublishVideo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
}

/// Mutating user actions. At most one invocation of each kind is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Connect,
    Refresh,
    CreatePlan,
    PublishVideo,
    Subscribe,
    Renew,
}

impl ActionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Refresh => "refresh",
            Self::CreatePlan => "create plan",
            Self::PublishVideo => "publish",
            Self::Subscribe => "subscribe",
            Self::Renew => "renew",
        }
    }

    #[must_use]
    pub fn progress_label(self) -> &'static str {
        match self {
            Self::Connect => "Waiting for wallet…",
            Self::Refresh => "Refreshing from chain…",
            Self::CreatePlan => "Creating plan…",
            Self::PublishVideo => "Publishing video…",
            Self::Subscribe => "Subscribing…",
            Self::Renew => "Renewing subscription…",
        }
    }
}
