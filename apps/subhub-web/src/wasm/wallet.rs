use super::*;

use async_trait::async_trait;
use js_sys::{Array, Function, Object, Promise, Reflect};
use subhub_core::{Address, WalletProvider, classify_provider_error, parse_hex_quantity};
use wasm_bindgen_futures::JsFuture;

/// `window.ethereum`, captured once at boot.
pub(super) struct Eip1193Wallet {
    provider: Option<JsValue>,
}

impl Eip1193Wallet {
    pub(super) fn detect() -> Self {
        let provider = web_sys::window()
            .and_then(|window| Reflect::get(&window, &JsValue::from_str("ethereum")).ok())
            .filter(|value| !value.is_undefined() && !value.is_null());
        Self { provider }
    }

    pub(super) fn is_present(&self) -> bool {
        self.provider.is_some()
    }

    /// Registers `handler` for a provider event such as `accountsChanged`.
    pub(super) fn on(
        &self,
        event: &str,
        handler: &Closure<dyn FnMut(JsValue)>,
    ) -> Result<(), String> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| "wallet provider is unavailable".to_string())?;
        let on = provider_method(provider, "on")
            .ok_or_else(|| "wallet provider does not support events".to_string())?;
        on.call2(provider, &JsValue::from_str(event), handler.as_ref())
            .map_err(|_| format!("failed to subscribe to wallet event {event}"))?;
        Ok(())
    }

    async fn request(&self, method: &str) -> Result<JsValue, ChainError> {
        let provider = self.provider.as_ref().ok_or(ChainError::WalletUnavailable)?;
        let request = provider_method(provider, "request").ok_or(ChainError::WalletUnavailable)?;

        let arguments = Object::new();
        Reflect::set(
            &arguments,
            &JsValue::from_str("method"),
            &JsValue::from_str(method),
        )
        .map_err(provider_error)?;
        let pending = request.call1(provider, &arguments).map_err(provider_error)?;
        let promise = pending
            .dyn_into::<Promise>()
            .map_err(|_| ChainError::Decode(format!("{method} did not return a promise")))?;
        JsFuture::from(promise).await.map_err(provider_error)
    }
}

fn provider_method(provider: &JsValue, name: &str) -> Option<Function> {
    Reflect::get(provider, &JsValue::from_str(name))
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok())
}

/// Reads `{ code, message }` off a rejected provider request.
fn provider_error(error: JsValue) -> ChainError {
    let code = Reflect::get(&error, &JsValue::from_str("code"))
        .ok()
        .and_then(|value| value.as_f64())
        .map(|value| value as i64);
    let message = Reflect::get(&error, &JsValue::from_str("message"))
        .ok()
        .and_then(|value| value.as_string())
        .or_else(|| error.as_string());
    classify_provider_error(code, message)
}

#[async_trait(?Send)]
impl WalletProvider for Eip1193Wallet {
    fn is_available(&self) -> bool {
        self.is_present()
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError> {
        let value = self.request("eth_requestAccounts").await?;
        if !Array::is_array(&value) {
            return Err(ChainError::Decode(
                "eth_requestAccounts did not return a list".to_string(),
            ));
        }
        Array::from(&value)
            .iter()
            .map(|entry| {
                let raw = entry
                    .as_string()
                    .ok_or_else(|| ChainError::Decode("account is not a string".to_string()))?;
                Address::parse(&raw).map_err(|error| ChainError::Decode(error.to_string()))
            })
            .collect()
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        let value = self.request("eth_chainId").await?;
        let raw = value
            .as_string()
            .ok_or_else(|| ChainError::Decode("eth_chainId did not return a string".to_string()))?;
        parse_hex_quantity(&raw)
    }
}
