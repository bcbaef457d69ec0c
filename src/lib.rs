/// Post Saver - Chrome Extension that saves social posts to Google Sheets
/// Built with Rust + WASM + Yew

pub mod background;
pub mod bridge;
pub mod config;
pub mod content;
pub mod control;
pub mod dom;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod injector;
pub mod navigation;
pub mod observer;
pub mod protocol;
pub mod record;
pub mod storage;
pub mod ui;

#[cfg(test)]
mod fixture;

use crate::background::BackgroundService;
use crate::bridge::{ChromeIdentity, ChromeStore};
use crate::config::ExtensionConfig;
use crate::gateway::http::ReqwestTransport;
use crate::gateway::sheets::SheetsGateway;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Inject save buttons into the page this content script runs in
#[wasm_bindgen]
pub fn start_content_script() -> Result<(), JsValue> {
    let config = ExtensionConfig::load()?;
    content::start(config)
}

// Answer requests from the content script and popup
#[wasm_bindgen]
pub fn start_background() -> Result<(), JsValue> {
    let config = ExtensionConfig::load()?;
    let gateway = SheetsGateway::new(ReqwestTransport::new(), ChromeStore, config.sheets);
    let service = Rc::new(BackgroundService::new(gateway, ChromeIdentity, config.oauth));

    bridge::listen_for_requests(move |message| {
        let service = service.clone();
        async move { service.handle_message(message).await }
    });
    log::info!("Background worker listening");
    Ok(())
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}
