/// Popup UI: sign in, pick the target sheet, disconnect

use crate::bridge::{ChromeStore, RuntimeMessenger, set_timeout};
use crate::config::ExtensionConfig;
use crate::control::Messenger;
use crate::error::{ErrorKind, SaverError};
use crate::protocol::{Request, Response, SheetSummary};
use crate::storage::{SelectedSheet, Session, SettingsStore};
use crate::ui::components::{SheetPicker, Status, StatusBanner};
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

/// Which of the two panels is visible
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Panel {
    Checking,
    Auth,
    Authenticating,
    Sheets,
}

impl Panel {
    fn for_session(session: &Session) -> Panel {
        if session.is_signed_in() {
            Panel::Sheets
        } else {
            Panel::Auth
        }
    }

    /// The panel to fall back to when a sheet listing fails, if any
    fn after_failure(error: &SaverError) -> Option<Panel> {
        match error.kind() {
            ErrorKind::AuthExpired | ErrorKind::MissingCredential => Some(Panel::Auth),
            _ => None,
        }
    }
}

fn refresh_label(loading: bool) -> &'static str {
    if loading { "Loading..." } else { "Refresh Sheets" }
}

/// The `{id, name}` to persist for a picked option
fn selection_for(sheets: &[SheetSummary], id: &str) -> Option<SelectedSheet> {
    if id.is_empty() {
        return None;
    }
    sheets.iter().find(|sheet| sheet.id == id).map(|sheet| SelectedSheet {
        id: sheet.id.clone(),
        name: sheet.name.clone(),
    })
}

async fn ask_background(request: Request) -> Result<Response, SaverError> {
    RuntimeMessenger
        .send(&request)
        .await?
        .ok_or(SaverError::NoResponse)?
        .into_result()
}

/// Shows `status` and clears it after the configured delay unless a newer
/// status replaced it meanwhile
#[derive(Clone)]
struct StatusHandle {
    status: UseStateHandle<Option<Status>>,
    serial: std::rc::Rc<std::cell::Cell<u32>>,
    clear_after_ms: u32,
}

impl StatusHandle {
    fn show(&self, status: Status) {
        let serial = self.serial.get().wrapping_add(1);
        self.serial.set(serial);
        self.status.set(Some(status));

        let handle = self.clone();
        set_timeout(self.clear_after_ms, move || {
            if handle.serial.get() == serial {
                handle.status.set(None);
            }
        });
    }
}

fn load_sheets(
    panel: UseStateHandle<Panel>,
    sheets: UseStateHandle<Vec<SheetSummary>>,
    loading: UseStateHandle<bool>,
    status: StatusHandle,
) {
    loading.set(true);
    spawn_local(async move {
        match ask_background(Request::GetSheets).await {
            Ok(response) => sheets.set(response.sheets.unwrap_or_default()),
            Err(e) => {
                log::error!("Error loading sheets: {}", e);
                if let Some(fallback) = Panel::after_failure(&e) {
                    sheets.set(Vec::new());
                    panel.set(fallback);
                }
                status.show(Status::error(format!("Failed to load sheets: {}", e)));
            }
        }
        loading.set(false);
    });
}

#[function_component(App)]
pub fn app() -> Html {
    let clear_after_ms = *use_memo((), |_| {
        ExtensionConfig::load()
            .map(|config| config.timing.status_clear_ms)
            .unwrap_or(5000)
    });

    let panel = use_state(|| Panel::Checking);
    let sheets = use_state(Vec::<SheetSummary>::new);
    let selected = use_state(|| None::<String>);
    let sheets_loading = use_state(|| false);
    let status_state = use_state(|| None::<Status>);
    let serial = use_memo((), |_| std::cell::Cell::new(0u32));
    let status = StatusHandle {
        status: status_state.clone(),
        serial: serial.clone(),
        clear_after_ms,
    };

    // Restore the session on open
    {
        let panel = panel.clone();
        let sheets = sheets.clone();
        let selected = selected.clone();
        let sheets_loading = sheets_loading.clone();
        let status = status.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                match ChromeStore.load_session().await {
                    Ok(session) => {
                        panel.set(Panel::for_session(&session));
                        if session.is_signed_in() {
                            load_sheets(panel.clone(), sheets, sheets_loading, status.clone());
                            if let Some(sheet) = session.selected_sheet {
                                selected.set(Some(sheet.id.clone()));
                                status.show(Status::success(format!("Connected to: {}", sheet.name)));
                            }
                        }
                    }
                    Err(e) => {
                        log::error!("Error checking auth status: {}", e);
                        panel.set(Panel::Auth);
                        status.show(Status::error("Error checking authentication status"));
                    }
                }
            });
            || ()
        });
    }

    let on_connect = {
        let panel = panel.clone();
        let sheets = sheets.clone();
        let sheets_loading = sheets_loading.clone();
        let status = status.clone();
        Callback::from(move |_| {
            let panel = panel.clone();
            let sheets = sheets.clone();
            let sheets_loading = sheets_loading.clone();
            let status = status.clone();

            panel.set(Panel::Authenticating);
            spawn_local(async move {
                match ask_background(Request::Authenticate).await {
                    Ok(_) => {
                        panel.set(Panel::Sheets);
                        load_sheets(panel.clone(), sheets, sheets_loading, status.clone());
                        status.show(Status::success("Successfully connected to Google!"));
                    }
                    Err(e) => {
                        log::error!("Authentication error: {}", e);
                        panel.set(Panel::Auth);
                        status.show(Status::error(format!("Authentication failed: {}", e)));
                    }
                }
            });
        })
    };

    let on_refresh = {
        let panel = panel.clone();
        let sheets = sheets.clone();
        let sheets_loading = sheets_loading.clone();
        let status = status.clone();
        Callback::from(move |_| {
            load_sheets(panel.clone(), sheets.clone(), sheets_loading.clone(), status.clone());
        })
    };

    let on_select = {
        let sheets = sheets.clone();
        let selected = selected.clone();
        let status = status.clone();
        Callback::from(move |id: String| {
            let Some(sheet) = selection_for(&sheets, &id) else {
                return;
            };
            let selected = selected.clone();
            let status = status.clone();
            spawn_local(async move {
                match ChromeStore.save_selected_sheet(&sheet).await {
                    Ok(()) => {
                        selected.set(Some(sheet.id.clone()));
                        status.show(Status::success(format!("Sheet selected: {}", sheet.name)));
                    }
                    Err(e) => {
                        log::error!("Error saving selected sheet: {}", e);
                        status.show(Status::error("Failed to save sheet selection"));
                    }
                }
            });
        })
    };

    let on_disconnect = {
        let panel = panel.clone();
        let sheets = sheets.clone();
        let selected = selected.clone();
        let status = status.clone();
        Callback::from(move |_| {
            let panel = panel.clone();
            let sheets = sheets.clone();
            let selected = selected.clone();
            let status = status.clone();
            spawn_local(async move {
                match ChromeStore.clear().await {
                    Ok(()) => {
                        sheets.set(Vec::new());
                        selected.set(None);
                        panel.set(Panel::Auth);
                        status.show(Status::success("Disconnected successfully"));
                    }
                    Err(e) => {
                        log::error!("Error disconnecting: {}", e);
                        status.show(Status::error("Error disconnecting"));
                    }
                }
            });
        })
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Post Saver"}</h1>

            <StatusBanner status={(*status_state).clone()} />

            {match *panel {
                Panel::Checking | Panel::Authenticating => html! {
                    <div class="loading-text-center">
                        <Spinner />
                    </div>
                },
                Panel::Auth => html! {
                    <div class="flex-column-gap">
                        <p class="message-text">{"Connect your Google account to save posts to a sheet."}</p>
                        <Button onclick={on_connect} variant={ButtonVariant::Primary} block={true}>
                            {"Connect Google Account"}
                        </Button>
                    </div>
                },
                Panel::Sheets => html! {
                    <div class="flex-column-gap">
                        <SheetPicker
                            sheets={(*sheets).clone()}
                            selected={(*selected).clone()}
                            disabled={*sheets_loading}
                            onchange={on_select}
                        />
                        <Button onclick={on_refresh} disabled={*sheets_loading} variant={ButtonVariant::Secondary} block={true}>
                            {refresh_label(*sheets_loading)}
                        </Button>
                        <Button onclick={on_disconnect} variant={ButtonVariant::Danger} block={true}>
                            {"Disconnect"}
                        </Button>
                    </div>
                },
            }}

            <p class="footer-popup">
                {concat!("Post Saver v", env!("CARGO_PKG_VERSION"))}
            </p>
        </div>
    }
}
