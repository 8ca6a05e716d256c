#[cfg(any(target_arch = "wasm32", test))]
mod commands;
#[cfg(target_arch = "wasm32")]
mod wasm_constants;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::RefCell;
    use std::collections::{BTreeMap, BTreeSet, HashMap};
    use std::rc::Rc;

    use gloo_timers::future::sleep;
    use serde::Serialize;
    use subhub_core::{
        AppState, ChainError, ChainSynchronizer, Controller, Outcome, SubHubConfig, WalletEvent,
    };
    use subhub_view::{ROOT_ID, Region, build_shell_view, render_regions, render_shell, stylesheet};
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;

    use crate::commands::{FormSubmission, UiCommand, page_from_hash, parse_command, parse_form};
    use crate::wasm_constants::*;

    mod contracts;
    mod dom;
    mod storage;
    mod wallet;

    use contracts::JsContracts;
    use dom::*;
    use storage::BrowserStorage;
    use wallet::Eip1193Wallet;

    thread_local! {
        static APP: RefCell<Option<Rc<Controller>>> = const { RefCell::new(None) };
        static DIAGNOSTICS: RefCell<BootDiagnostics> = RefCell::new(BootDiagnostics::default());
        static RENDERED_REGIONS: RefCell<HashMap<Region, String>> = RefCell::new(HashMap::new());
        static SCHEDULED_TOASTS: RefCell<BTreeSet<u64>> = const { RefCell::new(BTreeSet::new()) };
        static CLICK_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
        static SUBMIT_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
        static HASH_CHANGE_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
        static WALLET_HANDLERS: RefCell<Vec<Closure<dyn FnMut(JsValue)>>> = const { RefCell::new(Vec::new()) };
    }

    #[derive(Debug, Clone, Default, Serialize)]
    struct BootDiagnostics {
        phase: String,
        detail: String,
        wallet_detected: bool,
        chain_id: Option<u64>,
    }

    #[wasm_bindgen(start)]
    pub fn start() {
        console_error_panic_hook::set_once();
        set_boot_phase("booting", "initializing SubHub web shell");
        spawn_local(async {
            if let Err(error) = boot().await {
                set_boot_error(&error);
            }
        });
    }

    #[wasm_bindgen]
    pub fn boot_diagnostics_json() -> String {
        DIAGNOSTICS.with(|state| {
            serde_json::to_string(&*state.borrow()).unwrap_or_else(|_| {
                "{\"phase\":\"error\",\"detail\":\"diagnostics serialization failed\"}".to_string()
            })
        })
    }

    #[wasm_bindgen]
    pub fn app_state_json() -> String {
        with_controller(|controller| serde_json::to_string(&controller.snapshot()).ok())
            .flatten()
            .unwrap_or_else(|| "{}".to_string())
    }

    async fn boot() -> Result<(), String> {
        let config = read_page_config()?;
        ensure_stylesheet(stylesheet())?;
        let root = ensure_root()?;

        let wallet = Rc::new(Eip1193Wallet::detect());
        let contracts = Rc::new(JsContracts::new(&config));
        let sync = ChainSynchronizer::new(
            wallet.clone(),
            contracts.clone(),
            contracts,
            config.clone(),
        );
        let controller = Rc::new(Controller::new(sync, Rc::new(BrowserStorage::new())));

        let initial = build_shell_view(&controller.snapshot(), &config);
        root.set_inner_html(&render_shell(&initial));
        RENDERED_REGIONS.with(|cache| {
            let mut cache = cache.borrow_mut();
            for (region, markup) in render_regions(&initial) {
                cache.insert(region, markup);
            }
        });

        let view_config = config.clone();
        controller.subscribe_view(Box::new(move |state| render_state(state, &view_config)));
        APP.with(|slot| *slot.borrow_mut() = Some(controller.clone()));
        DIAGNOSTICS.with(|state| {
            let mut state = state.borrow_mut();
            state.wallet_detected = wallet.is_present();
            state.chain_id = Some(config.chain_id);
        });

        install_delegated_handlers()?;
        install_wallet_listeners(&wallet);
        controller.navigate(page_from_hash(&current_hash()));

        set_boot_phase("loading", "reading plans and local library");
        controller.boot().await;
        set_boot_phase("ready", "SubHub web shell ready");
        Ok(())
    }

    fn with_controller<T>(f: impl FnOnce(&Rc<Controller>) -> T) -> Option<T> {
        let controller = APP.with(|slot| slot.borrow().clone())?;
        Some(f(&controller))
    }

    fn set_boot_phase(phase: &str, detail: &str) {
        DIAGNOSTICS.with(|state| {
            let mut state = state.borrow_mut();
            state.phase = phase.to_string();
            state.detail = detail.to_string();
        });
    }

    fn set_boot_error(message: &str) {
        set_boot_phase("error", message);
        web_sys::console::error_1(&JsValue::from_str(&format!("subhub boot failed: {message}")));
        let _ = show_boot_error(message);
    }

    /// Observer registered with the controller: patches changed regions and
    /// arms auto-dismiss timers for new toasts.
    fn render_state(state: &AppState, config: &SubHubConfig) {
        let view = build_shell_view(state, config);
        for (region, markup) in render_regions(&view) {
            let changed = RENDERED_REGIONS.with(|cache| {
                let mut cache = cache.borrow_mut();
                if cache.get(&region) == Some(&markup) {
                    false
                } else {
                    cache.insert(region, markup.clone());
                    true
                }
            });
            if changed && let Err(error) = replace_region(region, &markup) {
                web_sys::console::warn_1(&JsValue::from_str(&error));
            }
        }
        let busy_label = view.modal.as_ref().and_then(|modal| modal.busy_label);
        if let Err(error) = sync_modal_submit(busy_label) {
            web_sys::console::warn_1(&JsValue::from_str(&error));
        }
        schedule_toast_dismissals(state);
    }

    fn schedule_toast_dismissals(state: &AppState) {
        let live: BTreeSet<u64> = state.notifications.iter().map(|note| note.id).collect();
        let fresh: Vec<u64> = SCHEDULED_TOASTS.with(|scheduled| {
            let mut scheduled = scheduled.borrow_mut();
            scheduled.retain(|id| live.contains(id));
            live.iter()
                .copied()
                .filter(|id| scheduled.insert(*id))
                .collect()
        });
        for id in fresh {
            spawn_local(async move {
                sleep(TOAST_TTL).await;
                with_controller(|controller| controller.dismiss_notification(id));
            });
        }
    }

    fn dispatch_command(command: UiCommand) {
        let Some(controller) = with_controller(Rc::clone) else {
            return;
        };
        match command {
            UiCommand::Connect => spawn_local(async move {
                controller.connect_wallet().await;
            }),
            UiCommand::Refresh => spawn_local(async move {
                controller.refresh().await;
            }),
            UiCommand::Subscribe(creator) => spawn_local(async move {
                controller.subscribe(&creator).await;
            }),
            UiCommand::Renew(creator) => spawn_local(async move {
                controller.renew(&creator).await;
            }),
            UiCommand::OpenModal(modal) => controller.open_modal(modal),
            UiCommand::CloseModal => controller.close_modal(),
            UiCommand::Dismiss(id) => controller.dismiss_notification(id),
            UiCommand::Navigate(page) => {
                if set_hash(page.as_str()).is_err() {
                    controller.navigate(page);
                }
            }
        }
    }

    fn dispatch_form(submission: FormSubmission) {
        let Some(controller) = with_controller(Rc::clone) else {
            return;
        };
        spawn_local(async move {
            match submission {
                FormSubmission::CreatePlan(form) => {
                    controller.submit_create_plan(form).await;
                }
                FormSubmission::PublishVideo(form) => {
                    controller.submit_publish_video(form).await;
                }
            }
        });
    }

    fn handle_wallet_event(event: WalletEvent) {
        let outcome = with_controller(|controller| controller.on_wallet_event(event));
        if outcome == Some(Outcome::ReloadRequired) && let Err(error) = reload_page() {
            web_sys::console::error_1(&JsValue::from_str(&error));
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn boot_diagnostics_json() -> String {
    "{\"phase\":\"native\",\"detail\":\"web shell diagnostics only available on wasm\"}".to_string()
}
