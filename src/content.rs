/// Content script: the live page, its mutation observers and the save buttons
use crate::bridge::{ChromeStore, RuntimeMessenger, runtime_is_valid, set_timeout};
use crate::config::ExtensionConfig;
use crate::control::{ActionControl, ControlState, save_post};
use crate::dom::{PageElement, PageSurface};
use crate::navigation::{Lifecycle, NavigationWatcher};
use crate::observer::PageObserver;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Document, Element, Event, HtmlAnchorElement, HtmlButtonElement, MutationObserver,
    MutationObserverInit, MutationRecord, Node, NodeList,
};

impl PageElement for Element {
    fn query(&self, selector: &str) -> Option<Self> {
        self.query_selector(selector).ok().flatten()
    }

    fn matches(&self, selector: &str) -> bool {
        Element::matches(self, selector).unwrap_or(false)
    }

    fn closest(&self, selector: &str) -> Option<Self> {
        Element::closest(self, selector).ok().flatten()
    }

    fn parent(&self) -> Option<Self> {
        self.parent_element()
    }

    fn text(&self) -> String {
        self.text_content().unwrap_or_default()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.get_attribute(name)
    }

    fn link(&self) -> Option<String> {
        match self.dyn_ref::<HtmlAnchorElement>() {
            Some(anchor) => Some(anchor.href()),
            None => self.get_attribute("href"),
        }
    }
}

fn elements(list: &NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

fn current_url() -> String {
    web_sys::window()
        .and_then(|window| window.location().href().ok())
        .unwrap_or_default()
}

fn render(button: &HtmlButtonElement, state: ControlState, control_class: &str) {
    button.set_text_content(Some(state.label()));
    button.set_disabled(state.is_disabled());
    match state.modifier() {
        Some(modifier) => button.set_class_name(&format!("{} {}", control_class, modifier)),
        None => button.set_class_name(control_class),
    }
}

fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

/// The real document, as seen by one observer instance
pub struct DomPage {
    document: Document,
    config: Rc<ExtensionConfig>,
    listeners: RefCell<Vec<Closure<dyn FnMut(Event)>>>,
}

impl DomPage {
    pub fn new(document: Document, config: Rc<ExtensionConfig>) -> DomPage {
        DomPage {
            document,
            config,
            listeners: RefCell::new(Vec::new()),
        }
    }

    fn create_control(&self, unit: &Element) -> Result<Element, JsValue> {
        let profile = &self.config.profile;

        let wrapper = self.document.create_element("div")?;
        wrapper.set_class_name(&profile.wrapper_class);

        let button: HtmlButtonElement = self.document.create_element("button")?.dyn_into()?;
        button.set_type("button");
        render(&button, ControlState::Idle, &profile.control_class);

        let control = Rc::new(RefCell::new(ActionControl::new()));
        let unit = unit.clone();
        let config = self.config.clone();
        let target = button.clone();
        let listener = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            event.prevent_default();
            event.stop_propagation();
            on_click(&unit, &target, &control, &config);
        });
        button.add_event_listener_with_callback("click", listener.as_ref().unchecked_ref())?;
        self.listeners.borrow_mut().push(listener);

        wrapper.append_child(&button)?;
        Ok(wrapper)
    }
}

impl PageSurface for DomPage {
    type Element = Element;
    type Error = JsValue;

    fn pending_units(&self, unit_selector: &str, marker: &str) -> Vec<Element> {
        match self
            .document
            .query_selector_all(&format!("{}:not([{}])", unit_selector, marker))
        {
            Ok(list) => elements(&list),
            Err(e) => {
                log::error!("Invalid unit selector '{}': {:?}", unit_selector, e);
                Vec::new()
            }
        }
    }

    fn attach_control(&self, container: &Element, unit: &Element) -> Result<(), JsValue> {
        let control = self.create_control(unit)?;
        container.append_child(&control)?;
        Ok(())
    }

    fn mark(&self, unit: &Element, marker: &str) {
        if let Err(e) = unit.set_attribute(marker, "true") {
            log::warn!("Could not mark unit: {:?}", e);
        }
    }

    /// Also clears the markers, so surviving units get a fresh control
    /// from the next instance
    fn remove_controls(&self) -> usize {
        let profile = &self.config.profile;
        let wrappers = self
            .document
            .query_selector_all(&format!(".{}", profile.wrapper_class))
            .map(|list| elements(&list))
            .unwrap_or_default();
        for wrapper in &wrappers {
            wrapper.remove();
        }

        if let Ok(list) = self.document.query_selector_all(&format!("[{}]", profile.marker_attribute)) {
            for unit in elements(&list) {
                let _ = unit.remove_attribute(&profile.marker_attribute);
            }
        }

        self.listeners.borrow_mut().clear();
        wrappers.len()
    }
}

fn on_click(unit: &Element, button: &HtmlButtonElement, control: &Rc<RefCell<ActionControl>>, config: &Rc<ExtensionConfig>) {
    if !control.borrow_mut().begin() {
        return;
    }
    render(button, ControlState::Busy, &config.profile.control_class);

    let unit = unit.clone();
    let button = button.clone();
    let control = control.clone();
    let config = config.clone();
    spawn_local(async move {
        let timestamp = String::from(js_sys::Date::new_0().to_iso_string());
        let result = save_post(
            &unit,
            &config.profile,
            runtime_is_valid(),
            &ChromeStore,
            &RuntimeMessenger,
            timestamp,
        )
        .await;

        let finished = control.borrow_mut().finish(&result);
        render(&button, finished, &config.profile.control_class);
        if let Err(e) = &result {
            log::error!("Error saving post: {}", e);
            alert(&e.user_message());
        }

        if let Some(delay) = finished.revert_after(&config.timing) {
            set_timeout(delay, move || {
                control.borrow_mut().revert();
                render(&button, control.borrow().state(), &config.profile.control_class);
            });
        }
    });
}

/// One observer instance bound to the current page
pub struct LiveInstance {
    observer: Rc<RefCell<PageObserver>>,
    page: Rc<DomPage>,
    mutations: MutationObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
}

impl LiveInstance {
    pub fn spawn(config: Rc<ExtensionConfig>) -> Result<LiveInstance, JsValue> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let body = document.body().ok_or_else(|| JsValue::from_str("no body"))?;

        let page = Rc::new(DomPage::new(document, config.clone()));
        let observer = Rc::new(RefCell::new(PageObserver::new(config.timing.debounce_ms)));

        let callback = {
            let page = page.clone();
            let observer = observer.clone();
            let cancel = observer.borrow().cancellation();
            Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
                move |records: js_sys::Array, _: MutationObserver| {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let added: Vec<Element> = records
                        .iter()
                        .filter_map(|record| record.dyn_into::<MutationRecord>().ok())
                        .flat_map(|record| elements(&record.added_nodes()))
                        .collect();

                    let ticket = observer.borrow_mut().on_mutations(&added, &config.profile);
                    if let Some(ticket) = ticket {
                        let page = page.clone();
                        let observer = observer.clone();
                        let config = config.clone();
                        set_timeout(ticket.delay_ms, move || {
                            let report = observer.borrow_mut().on_quiescent(ticket, &*page, &config.profile);
                            if let Some(report) = report {
                                log::debug!("Injected {} controls, {} units skipped", report.injected, report.skipped);
                            }
                        });
                    }
                },
            )
        };

        let mutations = MutationObserver::new(callback.as_ref().unchecked_ref())?;
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        mutations.observe_with_options(&body, &options)?;

        if let Some(report) = observer.borrow_mut().start(&*page, &page.config.profile) {
            log::info!("Initial pass injected {} controls", report.injected);
        }

        Ok(LiveInstance {
            observer,
            page,
            mutations,
            _callback: callback,
        })
    }
}

impl Lifecycle for LiveInstance {
    fn teardown(&mut self) {
        self.mutations.disconnect();
        self.observer.borrow_mut().teardown(&*self.page);
    }
}

/// Spawn the first instance and follow SPA navigations from then on
fn boot(config: Rc<ExtensionConfig>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;

    let instance = LiveInstance::spawn(config.clone())?;
    let watcher = Rc::new(RefCell::new(NavigationWatcher::new(
        current_url(),
        instance,
        config.timing.settle_ms,
    )));

    let on_pagehide = {
        let watcher = watcher.clone();
        Closure::once_into_js(move || {
            watcher.borrow_mut().shutdown();
            log::debug!("Content script stopped on pagehide");
        })
    };
    window.add_event_listener_with_callback("pagehide", on_pagehide.unchecked_ref())?;

    let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
        move |_: js_sys::Array, _: MutationObserver| {
            let ticket = watcher.borrow_mut().on_location(&current_url());
            let Some(ticket) = ticket else {
                return;
            };

            let watcher = watcher.clone();
            let config = config.clone();
            set_timeout(ticket.delay_ms, move || {
                if !watcher.borrow().wants(ticket) {
                    return;
                }
                match LiveInstance::spawn(config) {
                    Ok(instance) => {
                        watcher.borrow_mut().on_settled(ticket, move || instance);
                    }
                    Err(e) => log::error!("Could not restart after navigation: {:?}", e),
                }
            });
        },
    );

    let url_watcher = MutationObserver::new(callback.as_ref().unchecked_ref())?;
    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    let root: &Node = document.as_ref();
    url_watcher.observe_with_options(root, &options)?;

    // The URL watcher lives as long as the page
    callback.forget();
    log::info!("Content script started");
    Ok(())
}

/// Start once the document has been parsed
pub fn start(config: ExtensionConfig) -> Result<(), JsValue> {
    let config = Rc::new(config);
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;

    if document.ready_state() != "loading" {
        return boot(config);
    }

    let on_ready = Closure::once_into_js(move || {
        if let Err(e) = boot(config) {
            log::error!("Content script failed to start: {:?}", e);
        }
    });
    document.add_event_listener_with_callback("DOMContentLoaded", on_ready.unchecked_ref())
}
