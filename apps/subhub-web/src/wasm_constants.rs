use std::time::Duration;

pub(crate) const CONFIG_SCRIPT_ID: &str = "subhub-config";
pub(crate) const STYLESHEET_ID: &str = "subhub-styles";
pub(crate) const BOOT_ERROR_ID: &str = "subhub-boot-error";
pub(crate) const TOAST_TTL: Duration = Duration::from_secs(6);
pub(crate) const WALLET_ACCOUNTS_CHANGED: &str = "accountsChanged";
pub(crate) const WALLET_CHAIN_CHANGED: &str = "chainChanged";
