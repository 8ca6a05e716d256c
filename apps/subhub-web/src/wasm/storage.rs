use subhub_core::{LocalStore, StorageError};

/// `window.localStorage`, looked up per call.
#[derive(Debug, Default)]
pub(super) struct BrowserStorage;

impl BrowserStorage {
    pub(super) fn new() -> Self {
        Self
    }

    fn storage() -> Result<web_sys::Storage, StorageError> {
        web_sys::window()
            .and_then(|window| window.local_storage().ok().flatten())
            .ok_or(StorageError::Unavailable)
    }
}

impl LocalStore for BrowserStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::storage()?
            .get_item(key)
            .map_err(|_| StorageError::Unavailable)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|error| StorageError::Write {
                key: key.to_string(),
                message: error
                    .as_string()
                    .unwrap_or_else(|| "storage quota exceeded or blocked".to_string()),
            })
    }
}
