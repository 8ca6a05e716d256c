use std::cell::RefCell;
use std::collections::BTreeMap;

use tracing::warn;

use crate::model::{Address, PlanProfile, Video};

pub const VIDEOS_SLOT_SUFFIX: &str = "videos.v1";
pub const PLAN_PROFILES_SLOT_SUFFIX: &str = "plan_profiles.v1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("local storage is unavailable")]
    Unavailable,
    #[error("failed to write {key}: {message}")]
    Write { key: String, message: String },
    #[error("failed to encode {key}: {message}")]
    Encode { key: String, message: String },
}

/// On-device key-value slots (browser `localStorage` in the web shell).
pub trait LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.borrow().get(key).cloned()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.slots
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn slot_key(prefix: &str, suffix: &str) -> String {
    let prefix = prefix.trim().trim_end_matches('.');
    if prefix.is_empty() {
        suffix.to_string()
    } else {
        format!("{prefix}.{suffix}")
    }
}

fn load_slot<T: serde::de::DeserializeOwned + Default>(store: &dyn LocalStore, key: &str) -> T {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(error) => {
            warn!(key, %error, "local slot unreadable; starting empty");
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(error) => {
            warn!(key, %error, "local slot is corrupt; starting empty");
            T::default()
        }
    }
}

fn save_slot<T: serde::Serialize>(
    store: &dyn LocalStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(value).map_err(|error| StorageError::Encode {
        key: key.to_string(),
        message: error.to_string(),
    })?;
    store.set(key, &encoded)
}

/// Serialized list of published videos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLibrary {
    key: String,
}

impl VideoLibrary {
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            key: slot_key(prefix, VIDEOS_SLOT_SUFFIX),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn load(&self, store: &dyn LocalStore) -> Vec<Video> {
        load_slot(store, &self.key)
    }

    pub fn save(&self, store: &dyn LocalStore, videos: &[Video]) -> Result<(), StorageError> {
        save_slot(store, &self.key, &videos)
    }
}

/// Names and descriptions creators typed when creating their plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanProfiles {
    key: String,
}

impl PlanProfiles {
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            key: slot_key(prefix, PLAN_PROFILES_SLOT_SUFFIX),
        }
    }

    #[must_use]
    pub fn load(&self, store: &dyn LocalStore) -> BTreeMap<Address, PlanProfile> {
        load_slot(store, &self.key)
    }

    pub fn upsert(
        &self,
        store: &dyn LocalStore,
        creator: &Address,
        profile: PlanProfile,
    ) -> Result<BTreeMap<Address, PlanProfile>, StorageError> {
        let mut profiles = self.load(store);
        profiles.insert(creator.clone(), profile);
        save_slot(store, &self.key, &profiles)?;
        Ok(profiles)
    }
}
