//! Name-based guess at which layers are interactive.
//!
//! This is a heuristic over layer names, nothing more: a frame called "Navbar
//! background" is reported as navigation, and an unnamed clickable area is missed.

use crate::types::InteractiveKind;
use regex::Regex;
use std::sync::OnceLock;

/// Signature of a classifier; the extractor takes one so it can be swapped out.
pub type Classifier = fn(&str) -> Option<InteractiveKind>;

fn interactive_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)button|btn|click|press|submit|link|nav").expect("interactive pattern is valid")
    })
}

/// Whether a layer name looks interactive at all.
pub fn looks_interactive(name: &str) -> bool {
    interactive_pattern().is_match(name)
}

/// Classifies a layer name, or `None` when it does not look interactive.
///
/// Substrings are checked in priority order; a name that only matched the broad
/// pattern (e.g. "Submit", "Click area") falls back to a button.
pub fn classify_name(name: &str) -> Option<InteractiveKind> {
    if !looks_interactive(name) {
        return None;
    }

    let lower = name.to_lowercase();
    let kind = if lower.contains("button") || lower.contains("btn") {
        InteractiveKind::Button
    } else if lower.contains("input") || lower.contains("field") {
        InteractiveKind::Input
    } else if lower.contains("link") {
        InteractiveKind::Link
    } else if lower.contains("form") {
        InteractiveKind::Form
    } else if lower.contains("nav") || lower.contains("menu") {
        InteractiveKind::Navigation
    } else {
        InteractiveKind::Button
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert_eq!(classify_name("Primary Button"), Some(InteractiveKind::Button));
        assert_eq!(classify_name("nav-btn"), Some(InteractiveKind::Button));
        assert_eq!(classify_name("Footer Link"), Some(InteractiveKind::Link));
        assert_eq!(classify_name("Link field"), Some(InteractiveKind::Input));
        assert_eq!(classify_name("Submit form"), Some(InteractiveKind::Form));
        assert_eq!(classify_name("NavBar"), Some(InteractiveKind::Navigation));
    }

    #[test]
    fn test_broad_match_defaults_to_button() {
        assert_eq!(classify_name("Click area"), Some(InteractiveKind::Button));
        assert_eq!(classify_name("PRESS ME"), Some(InteractiveKind::Button));
    }

    #[test]
    fn test_non_interactive_names() {
        assert_eq!(classify_name("Hero image"), None);
        // "input" alone is not in the broad pattern
        assert_eq!(classify_name("Email input"), None);
        assert!(!looks_interactive("Menu"));
    }
}
