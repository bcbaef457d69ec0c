/// Page abstractions the scraper and injector work against
use serde::{Deserialize, Serialize};

/// Read-only view of one element in the page.
///
/// Selector strings are CSS; an unparseable selector behaves as if it
/// matched nothing.
pub trait PageElement: Sized + Clone {
    /// First descendant matching `selector`
    fn query(&self, selector: &str) -> Option<Self>;

    fn matches(&self, selector: &str) -> bool;

    /// Nearest inclusive ancestor matching `selector`
    fn closest(&self, selector: &str) -> Option<Self>;

    fn parent(&self) -> Option<Self>;

    /// Concatenated text content
    fn text(&self) -> String;

    fn attr(&self, name: &str) -> Option<String>;

    /// Resolved link target for anchors, the raw `href` otherwise
    fn link(&self) -> Option<String> {
        self.attr("href")
    }
}

/// The mutable side of the page: finding units and attaching controls
pub trait PageSurface {
    type Element: PageElement;
    type Error: std::fmt::Debug;

    /// ContentUnits that do not carry `marker` yet, in document order
    fn pending_units(&self, unit_selector: &str, marker: &str) -> Vec<Self::Element>;

    /// Append one action control for `unit` inside `container`
    fn attach_control(&self, container: &Self::Element, unit: &Self::Element) -> Result<(), Self::Error>;

    fn mark(&self, unit: &Self::Element, marker: &str);

    /// Remove every control this extension attached; returns how many
    fn remove_controls(&self) -> usize;
}

/// Ordered selector fallbacks, first selector with a match wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorChain(pub Vec<String>);

impl SelectorChain {
    pub fn new<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectorChain(selectors.into_iter().map(Into::into).collect())
    }

    pub fn first_match<E: PageElement>(&self, root: &E) -> Option<E> {
        self.0.iter().find_map(|selector| root.query(selector))
    }
}

/// One strategy for locating a unit's action bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContainerMatcher {
    /// The container itself matches a selector inside the unit
    Select { select: String },
    /// Find a known button, then take its closest bar or its parent
    Anchor {
        anchor: String,
        #[serde(default)]
        closest: Option<String>,
    },
}

impl ContainerMatcher {
    pub fn locate<E: PageElement>(&self, unit: &E) -> Option<E> {
        match self {
            ContainerMatcher::Select { select } => unit.query(select),
            ContainerMatcher::Anchor { anchor, closest } => {
                let anchor = unit.query(anchor)?;
                closest
                    .as_deref()
                    .and_then(|selector| anchor.closest(selector))
                    .or_else(|| anchor.parent())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixturePage;

    #[test]
    fn test_first_match_respects_priority_not_document_order() {
        let page = FixturePage::parse(
            r#"<div id="unit">
                <p class="late">first in document</p>
                <p class="early">second in document</p>
            </div>"#,
        );
        let unit = page.select_one("#unit").unwrap();

        let chain = SelectorChain::new([".early", ".late"]);
        let found = chain.first_match(&unit).unwrap();

        assert_eq!(PageElement::text(&found), "second in document");
    }

    #[test]
    fn test_first_match_skips_invalid_selectors() {
        let page = FixturePage::parse(r#"<div id="unit"><span class="x">x</span></div>"#);
        let unit = page.select_one("#unit").unwrap();

        let chain = SelectorChain::new(["[[[", ".x"]);

        assert!(chain.first_match(&unit).is_some());
    }

    #[test]
    fn test_anchor_matcher_prefers_closest_bar() {
        let page = FixturePage::parse(
            r#"<div id="unit">
                <div class="social-actions-bar"><span><button aria-label="Like">Like</button></span></div>
            </div>"#,
        );
        let unit = page.select_one("#unit").unwrap();
        let matcher = ContainerMatcher::Anchor {
            anchor: r#"[aria-label*="Like"]"#.to_string(),
            closest: Some(".social-actions-bar".to_string()),
        };

        let container = matcher.locate(&unit).unwrap();

        assert!(PageElement::matches(&container, ".social-actions-bar"));
    }

    #[test]
    fn test_anchor_matcher_falls_back_to_parent() {
        let page = FixturePage::parse(
            r#"<div id="unit"><span class="holder"><button aria-label="Comment">c</button></span></div>"#,
        );
        let unit = page.select_one("#unit").unwrap();
        let matcher = ContainerMatcher::Anchor {
            anchor: r#"[aria-label*="Comment"]"#.to_string(),
            closest: Some(".social-actions-bar".to_string()),
        };

        let container = matcher.locate(&unit).unwrap();

        assert!(PageElement::matches(&container, ".holder"));
    }

    #[test]
    fn test_container_matcher_deserializes_both_shapes() {
        let matchers: Vec<ContainerMatcher> = serde_json::from_str(
            r#"[{"select": ".bar"}, {"anchor": "button", "closest": ".bar"}, {"anchor": "a"}]"#,
        )
        .unwrap();

        assert_eq!(matchers[0], ContainerMatcher::Select { select: ".bar".to_string() });
        assert_eq!(
            matchers[2],
            ContainerMatcher::Anchor {
                anchor: "a".to_string(),
                closest: None
            }
        );
    }
}
