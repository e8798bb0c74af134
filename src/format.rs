//! Display-markup normalization for model output
//!
//! The completion API returns loosely formatted markdown. The web client
//! renders a small HTML subset, so raw emphasis markers are converted to
//! bold tags, inline bullets get explicit line breaks, and numbered lists
//! that lead with emphasis are rewritten as bullet lists.
//!
//! Normalization is idempotent: running it on already-normalized text is a
//! no-op.

use regex::Regex;

/// Normalize model output markup for display
///
/// # Examples
///
/// ```
/// use bridgechat::format::normalize_markup;
///
/// assert_eq!(normalize_markup("**Spot** the trigger"), "<b>Spot</b> the trigger");
/// assert_eq!(
///     normalize_markup("try this: \u{2022} step one \u{2022} step two"),
///     "try this:\n\u{2022} step one\n\u{2022} step two"
/// );
/// ```
pub fn normalize_markup(text: &str) -> String {
    let mut result = text.to_string();

    // Convert raw emphasis markers to bold tags
    result = Regex::new(r"\*\*([^*]+)\*\*")
        .unwrap()
        .replace_all(&result, "<b>$1</b>")
        .to_string();

    // Rewrite numbered items that lead with a bold tag as bullets
    result = Regex::new(r"(?m)^[ \t]*\d+\.[ \t]+<b>")
        .unwrap()
        .replace_all(&result, "\u{2022} <b>")
        .to_string();

    // Give inline bullets their own lines. Only bullets that are not
    // already at the start of a line are touched, which keeps the pass
    // idempotent.
    result = Regex::new(r"([^\n])[ \t]*\u{2022} ")
        .unwrap()
        .replace_all(&result, "$1\n\u{2022} ")
        .to_string();

    result
}
