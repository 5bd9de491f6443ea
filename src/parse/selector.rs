//! CSS selector parsing.

use scraper::Selector;

/// Parses a CSS selector, logging and returning `None` when it is invalid.
///
/// `context` names the selector's purpose in the log line.
pub fn parse_selector(selector_str: &str, context: &str) -> Option<Selector> {
    match Selector::parse(selector_str) {
        Ok(selector) => Some(selector),
        Err(e) => {
            log::warn!("Ignoring invalid CSS selector '{selector_str}' ({context}): {e}");
            None
        }
    }
}

/// Parses every selector in `selectors`, dropping the invalid ones.
pub fn parse_selectors<S: AsRef<str>>(selectors: &[S], context: &str) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| parse_selector(s.as_ref(), context))
        .collect()
}
