/// Reading a post's fields out of its DOM node
use crate::config::SelectorProfile;
use crate::dom::{PageElement, SelectorChain};
use crate::record::ExtractedRecord;
use regex::Regex;
use std::sync::LazyLock;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid digit pattern"));

/// Build a record from `unit`.
///
/// Never fails: any field whose selectors find nothing falls back to an
/// empty string or zero.
pub fn extract_record<E: PageElement>(unit: &E, profile: &SelectorProfile, timestamp: String) -> ExtractedRecord {
    let content = profile
        .content
        .first_match(unit)
        .map(|element| truncate_chars(element.text().trim(), profile.content_limit))
        .unwrap_or_default();

    let url = profile
        .url
        .first_match(unit)
        .and_then(|element| element.link())
        .unwrap_or_default();

    ExtractedRecord {
        timestamp,
        content,
        likes: read_counter(unit, &profile.likes),
        comments: read_counter(unit, &profile.comments),
        reposts: read_counter(unit, &profile.reposts),
        url,
    }
}

/// First run of digits in the first matching element's text, or its
/// `aria-label` when the text is blank
pub fn read_counter<E: PageElement>(unit: &E, chain: &SelectorChain) -> u64 {
    chain
        .first_match(unit)
        .and_then(|element| {
            let text = element.text();
            let source = if text.trim().is_empty() {
                element.attr("aria-label").unwrap_or_default()
            } else {
                text
            };
            first_number(&source)
        })
        .unwrap_or(0)
}

/// First run of ASCII digits in `text`; a run too long for `u64` saturates
pub fn first_number(text: &str) -> Option<u64> {
    let digits = DIGITS.find(text)?.as_str();
    match digits.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            log::warn!("Counter '{}' overflows, saturating", digits);
            Some(u64::MAX)
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
