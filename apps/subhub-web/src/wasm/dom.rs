use super::*;

use js_sys::Array;
use web_sys::{Element, HtmlFormElement};

fn document() -> Result<web_sys::Document, String> {
    web_sys::window()
        .ok_or_else(|| "window is unavailable".to_string())?
        .document()
        .ok_or_else(|| "document is unavailable".to_string())
}

/// Reads the `<script type="application/json" id="subhub-config">` block.
pub(super) fn read_page_config() -> Result<SubHubConfig, String> {
    let raw = document()?
        .get_element_by_id(CONFIG_SCRIPT_ID)
        .and_then(|element| element.text_content())
        .ok_or_else(|| format!("missing #{CONFIG_SCRIPT_ID} configuration block"))?;
    SubHubConfig::from_json(&raw).map_err(|error| error.to_string())
}

pub(super) fn ensure_stylesheet(css: &str) -> Result<(), String> {
    let document = document()?;
    if document.get_element_by_id(STYLESHEET_ID).is_some() {
        return Ok(());
    }
    let style = document
        .create_element("style")
        .map_err(|_| "failed to create stylesheet".to_string())?;
    style.set_id(STYLESHEET_ID);
    style.set_text_content(Some(css));
    let head = document
        .query_selector("head")
        .ok()
        .flatten()
        .ok_or_else(|| "document head is unavailable".to_string())?;
    head.append_child(&style)
        .map_err(|_| "failed to attach stylesheet".to_string())?;
    Ok(())
}

pub(super) fn ensure_root() -> Result<Element, String> {
    let document = document()?;
    if let Some(root) = document.get_element_by_id(ROOT_ID) {
        return Ok(root);
    }
    let root = document
        .create_element("div")
        .map_err(|_| "failed to create app root".to_string())?;
    root.set_id(ROOT_ID);
    let body = document
        .body()
        .ok_or_else(|| "document body is unavailable".to_string())?;
    body.append_child(&root)
        .map_err(|_| "failed to attach app root".to_string())?;
    Ok(root)
}

/// Toggles the open form's submit button in place; the inputs are left alone.
pub(super) fn sync_modal_submit(busy_label: Option<&str>) -> Result<(), String> {
    let Some(button) = document()?
        .query_selector(".sh-modal button[type=\"submit\"]")
        .map_err(|_| "invalid modal submit selector".to_string())?
    else {
        return Ok(());
    };
    match busy_label {
        Some(label) => {
            button
                .set_attribute("disabled", "")
                .map_err(|_| "failed to disable modal submit".to_string())?;
            button.set_text_content(Some(label));
        }
        None => {
            button
                .remove_attribute("disabled")
                .map_err(|_| "failed to enable modal submit".to_string())?;
            if let Some(idle) = button.get_attribute("data-idle-label") {
                button.set_text_content(Some(&idle));
            }
        }
    }
    Ok(())
}

pub(super) fn show_boot_error(message: &str) -> Result<(), String> {
    let document = document()?;
    let root = ensure_root()?;
    let notice = document
        .create_element("p")
        .map_err(|_| "failed to create boot error".to_string())?;
    notice.set_id(BOOT_ERROR_ID);
    notice.set_class_name("sh-boot-error");
    notice.set_text_content(Some(&format!("SubHub failed to start: {message}")));
    root.set_inner_html("");
    root.append_child(&notice)
        .map_err(|_| "failed to attach boot error".to_string())?;
    Ok(())
}

pub(super) fn replace_region(region: Region, markup: &str) -> Result<(), String> {
    let element = document()?
        .get_element_by_id(region.id())
        .ok_or_else(|| format!("missing region #{}", region.id()))?;
    element.set_inner_html(markup);
    Ok(())
}

pub(super) fn current_hash() -> String {
    web_sys::window()
        .and_then(|window| window.location().hash().ok())
        .unwrap_or_default()
}

pub(super) fn set_hash(page: &str) -> Result<(), String> {
    web_sys::window()
        .ok_or_else(|| "window is unavailable".to_string())?
        .location()
        .set_hash(page)
        .map_err(|_| "failed to update location hash".to_string())
}

pub(super) fn reload_page() -> Result<(), String> {
    web_sys::window()
        .ok_or_else(|| "window is unavailable".to_string())?
        .location()
        .reload()
        .map_err(|_| "failed to reload page".to_string())
}

/// One click, one submit and one hashchange listener serve the whole shell.
pub(super) fn install_delegated_handlers() -> Result<(), String> {
    let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
    let document = document()?;

    CLICK_HANDLER.with(|slot| {
        if slot.borrow().is_some() {
            return Ok(());
        }
        let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(handle_click));
        document
            .add_event_listener_with_callback("click", callback.as_ref().unchecked_ref())
            .map_err(|_| "failed to install click handler".to_string())?;
        *slot.borrow_mut() = Some(callback);
        Ok::<(), String>(())
    })?;

    SUBMIT_HANDLER.with(|slot| {
        if slot.borrow().is_some() {
            return Ok(());
        }
        let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(handle_submit));
        document
            .add_event_listener_with_callback("submit", callback.as_ref().unchecked_ref())
            .map_err(|_| "failed to install submit handler".to_string())?;
        *slot.borrow_mut() = Some(callback);
        Ok::<(), String>(())
    })?;

    HASH_CHANGE_HANDLER.with(|slot| {
        if slot.borrow().is_some() {
            return Ok(());
        }
        let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
            let page = page_from_hash(&current_hash());
            with_controller(|controller| controller.navigate(page));
        }));
        window
            .add_event_listener_with_callback("hashchange", callback.as_ref().unchecked_ref())
            .map_err(|_| "failed to install hashchange handler".to_string())?;
        *slot.borrow_mut() = Some(callback);
        Ok::<(), String>(())
    })
}

fn handle_click(event: web_sys::Event) {
    let Some(element) = event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok())
        .and_then(|target| target.closest("[data-action]").ok().flatten())
    else {
        return;
    };
    if element.has_attribute("disabled") {
        return;
    }
    let Some(action) = element.get_attribute("data-action") else {
        return;
    };
    event.prevent_default();
    let target_kind = element.get_attribute("data-target-kind");
    let target = element.get_attribute("data-target");
    if let Some(command) = parse_command(&action, target_kind.as_deref(), target.as_deref()) {
        dispatch_command(command);
    }
}

fn handle_submit(event: web_sys::Event) {
    let Some(form) = event
        .target()
        .and_then(|target| target.dyn_into::<HtmlFormElement>().ok())
    else {
        return;
    };
    let Some(form_id) = form.get_attribute("data-form") else {
        return;
    };
    event.prevent_default();
    if let Some(submission) = parse_form(&form_id, &form_fields(&form)) {
        dispatch_form(submission);
    }
}

fn form_fields(form: &HtmlFormElement) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let Ok(data) = web_sys::FormData::new_with_form(form) else {
        return fields;
    };
    let Ok(Some(entries)) = js_sys::try_iter(&data) else {
        return fields;
    };
    for entry in entries.flatten() {
        let pair = Array::from(&entry);
        if let (Some(name), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) {
            fields.insert(name, value);
        }
    }
    fields
}

/// Any account or network switch reloads the page.
pub(super) fn install_wallet_listeners(wallet: &Eip1193Wallet) {
    if !wallet.is_present() {
        return;
    }
    for (name, event) in [
        (WALLET_ACCOUNTS_CHANGED, WalletEvent::AccountsChanged),
        (WALLET_CHAIN_CHANGED, WalletEvent::ChainChanged),
    ] {
        let callback =
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_payload| handle_wallet_event(event)));
        match wallet.on(name, &callback) {
            Ok(()) => WALLET_HANDLERS.with(|handlers| handlers.borrow_mut().push(callback)),
            Err(error) => web_sys::console::warn_1(&JsValue::from_str(&error)),
        }
    }
}
