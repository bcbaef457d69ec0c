/// chrome.* extension APIs, reached through `js/bridge.js`
use crate::control::Messenger;
use crate::error::SaverError;
use crate::gateway::oauth::IdentityFlow;
use crate::protocol::{Request, Response};
use crate::storage::{ACCESS_TOKEN_KEY, SELECTED_SHEET_KEY, SelectedSheet, Session, SettingsStore};
use std::future::Future;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

#[wasm_bindgen(module = "/js/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(items: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeStorage(keys: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn clearStorage() -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendMessage(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn launchWebAuthFlow(url: &str) -> Result<JsValue, JsValue>;

    fn runtimeId() -> Option<String>;

    fn onMessage(handler: &js_sys::Function);
}

/// Best-effort text of a thrown JS value
pub fn describe(error: &JsValue) -> String {
    if let Some(text) = error.as_string() {
        return text;
    }
    match error.dyn_ref::<js_sys::Error>() {
        Some(error) => String::from(error.message()),
        None => format!("{:?}", error),
    }
}

fn key_list(keys: &[&str]) -> JsValue {
    keys.iter().map(|key| JsValue::from_str(key)).collect::<js_sys::Array>().into()
}

/// False once the extension was reloaded under a running content script
pub fn runtime_is_valid() -> bool {
    runtimeId().is_some()
}

/// window.setTimeout; `callback` runs once after `delay_ms`
pub fn set_timeout(delay_ms: u32, callback: impl FnOnce() + 'static) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let callback = Closure::once_into_js(callback);
    if let Err(e) =
        window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay_ms as i32)
    {
        log::error!("setTimeout failed: {}", describe(&e));
    }
}

/// chrome.storage.local
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStore;

impl ChromeStore {
    async fn write(&self, partial: &Session) -> Result<(), SaverError> {
        let items = serde_wasm_bindgen::to_value(partial)?;
        setStorage(items).await.map_err(|e| SaverError::storage(describe(&e)))
    }
}

impl SettingsStore for ChromeStore {
    async fn load_session(&self) -> Result<Session, SaverError> {
        let stored = getStorage(key_list(&[ACCESS_TOKEN_KEY, SELECTED_SHEET_KEY]))
            .await
            .map_err(|e| SaverError::storage(describe(&e)))?;
        if stored.is_undefined() || stored.is_null() {
            return Ok(Session::default());
        }
        Ok(serde_wasm_bindgen::from_value(stored)?)
    }

    async fn save_token(&self, token: &str) -> Result<(), SaverError> {
        self.write(&Session {
            access_token: Some(token.to_string()),
            selected_sheet: None,
        })
        .await
    }

    async fn clear_token(&self) -> Result<(), SaverError> {
        removeStorage(key_list(&[ACCESS_TOKEN_KEY]))
            .await
            .map_err(|e| SaverError::storage(describe(&e)))
    }

    async fn save_selected_sheet(&self, sheet: &SelectedSheet) -> Result<(), SaverError> {
        self.write(&Session {
            access_token: None,
            selected_sheet: Some(sheet.clone()),
        })
        .await
    }

    async fn clear(&self) -> Result<(), SaverError> {
        clearStorage().await.map_err(|e| SaverError::storage(describe(&e)))
    }
}

/// chrome.runtime.sendMessage to the background worker
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeMessenger;

impl Messenger for RuntimeMessenger {
    async fn send(&self, request: &Request) -> Result<Option<Response>, SaverError> {
        let message = serde_wasm_bindgen::to_value(request)?;
        let reply = sendMessage(message).await.map_err(|e| {
            let text = describe(&e);
            if text.contains("Extension context invalidated") {
                SaverError::ContextInvalidated
            } else {
                SaverError::transport(text)
            }
        })?;

        if reply.is_undefined() || reply.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_wasm_bindgen::from_value(reply)?))
    }
}

/// chrome.identity.launchWebAuthFlow, interactive
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeIdentity;

impl IdentityFlow for ChromeIdentity {
    async fn launch(&self, url: &str) -> Result<String, SaverError> {
        let redirect = launchWebAuthFlow(url)
            .await
            .map_err(|e| SaverError::auth_flow(describe(&e)))?;
        redirect
            .as_string()
            .ok_or_else(|| SaverError::auth_flow("No redirect URL received"))
    }
}

/// Answer every runtime message with whatever `handler` resolves to
pub fn listen_for_requests<H, Fut>(handler: H)
where
    H: Fn(serde_json::Value) -> Fut + 'static,
    Fut: Future<Output = Response> + 'static,
{
    let handler = Rc::new(handler);
    let callback = Closure::<dyn Fn(JsValue) -> js_sys::Promise>::new(move |message: JsValue| {
        let handler = handler.clone();
        future_to_promise(async move {
            let response = match serde_wasm_bindgen::from_value::<serde_json::Value>(message) {
                Ok(message) => handler(message).await,
                Err(e) => {
                    log::error!("Unreadable message: {}", e);
                    Response::unknown_action()
                }
            };
            Ok(serde_wasm_bindgen::to_value(&response)?)
        })
    });

    onMessage(callback.as_ref().unchecked_ref());
    // The listener lives as long as the worker
    callback.forget();
}
