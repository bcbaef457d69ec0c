/// HTML-backed page for tests
///
/// The parsed document is immutable, so markers and attached controls are
/// tracked in side tables next to it.
use crate::dom::{PageElement, PageSurface};
use scraper::{ElementRef, Html, Selector};
use std::cell::RefCell;

impl<'a> PageElement for ElementRef<'a> {
    fn query(&self, selector: &str) -> Option<Self> {
        let selector = Selector::parse(selector).ok()?;
        self.select(&selector).next()
    }

    fn matches(&self, selector: &str) -> bool {
        Selector::parse(selector)
            .map(|selector| selector.matches(self))
            .unwrap_or(false)
    }

    fn closest(&self, selector: &str) -> Option<Self> {
        let selector = Selector::parse(selector).ok()?;
        std::iter::once(*self)
            .chain((**self).ancestors().filter_map(ElementRef::wrap))
            .find(|element| selector.matches(element))
    }

    fn parent(&self) -> Option<Self> {
        (**self).ancestors().find_map(ElementRef::wrap)
    }

    fn text(&self) -> String {
        ElementRef::text(self).collect()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.value().attr(name).map(str::to_string)
    }
}

pub struct FixturePage {
    html: &'static Html,
    marked: RefCell<Vec<ElementRef<'static>>>,
    controls: RefCell<Vec<(ElementRef<'static>, ElementRef<'static>)>>,
    refuse_attach: std::cell::Cell<bool>,
}

impl FixturePage {
    pub fn parse(markup: &str) -> FixturePage {
        FixturePage {
            html: Box::leak(Box::new(Html::parse_fragment(markup))),
            marked: RefCell::new(Vec::new()),
            controls: RefCell::new(Vec::new()),
            refuse_attach: std::cell::Cell::new(false),
        }
    }

    /// Make every later `attach_control` fail, or succeed again
    pub fn refuse_attach(&self, refuse: bool) {
        self.refuse_attach.set(refuse);
    }

    pub fn select_one(&self, selector: &str) -> Option<ElementRef<'static>> {
        let selector = Selector::parse(selector).ok()?;
        self.html.select(&selector).next()
    }

    pub fn select_all(&self, selector: &str) -> Vec<ElementRef<'static>> {
        match Selector::parse(selector) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn control_count(&self) -> usize {
        self.controls.borrow().len()
    }

    pub fn controls_for(&self, unit: &ElementRef<'static>) -> usize {
        self.controls.borrow().iter().filter(|(_, owner)| owner == unit).count()
    }

    /// Container the control for `unit` went into
    pub fn container_of(&self, unit: &ElementRef<'static>) -> Option<ElementRef<'static>> {
        self.controls
            .borrow()
            .iter()
            .find(|(_, owner)| owner == unit)
            .map(|(container, _)| *container)
    }

    pub fn is_marked(&self, unit: &ElementRef<'static>) -> bool {
        self.marked.borrow().contains(unit)
    }
}

impl PageSurface for FixturePage {
    type Element = ElementRef<'static>;
    type Error = String;

    fn pending_units(&self, unit_selector: &str, marker: &str) -> Vec<Self::Element> {
        let marked = self.marked.borrow();
        self.select_all(unit_selector)
            .into_iter()
            .filter(|unit| unit.value().attr(marker).is_none() && !marked.contains(unit))
            .collect()
    }

    fn attach_control(&self, container: &Self::Element, unit: &Self::Element) -> Result<(), String> {
        if self.refuse_attach.get() {
            return Err("attach refused".to_string());
        }
        self.controls.borrow_mut().push((*container, *unit));
        Ok(())
    }

    fn mark(&self, unit: &Self::Element, _marker: &str) {
        let mut marked = self.marked.borrow_mut();
        if !marked.contains(unit) {
            marked.push(*unit);
        }
    }

    fn remove_controls(&self) -> usize {
        self.controls.borrow_mut().drain(..).count()
    }
}
