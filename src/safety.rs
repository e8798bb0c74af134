//! Keyword-based safety classification
//!
//! Scans raw user text for keyword matches across three categories
//! (physical violence, crisis/harmful content, health) and decides whether
//! the turn should short-circuit with a fixed crisis-resource message
//! instead of reaching the completion API.
//!
//! The classification is a literal keyword heuristic, not an intent model:
//! matching is case-insensitive substring containment against the
//! enumerated term lists, evaluated in a fixed priority order because a
//! message can match more than one category.

use std::fmt;

/// Physical-violence terms. Any of these (outside a workload context)
/// triggers the violence warning.
const VIOLENCE_TERMS: &[&str] = &[
    "hit",
    "punch",
    "slap",
    "kick",
    "physical violence",
    "physically hurt",
    "assault",
    "attack",
    "threatened with violence",
];

/// Workload-context terms that suppress the violence warning. These exist
/// specifically to avoid false positives on figurative usage such as
/// "my boss beats me on workload".
const WORKLOAD_TERMS: &[&str] = &[
    "workload",
    "tasks",
    "deadline",
    "pressure",
    "stress",
    "overwhelm",
];

/// Physical indicators required before "beat" counts as violence.
/// "beat" on its own is ambiguous ("beat the deadline", "beats me").
const BEAT_INDICATORS: &[&str] = &["physically", "hit me", "hurt me", "threatened", "violence"];

/// Harmful-content terms; these fire regardless of workload context.
const CRISIS_TERMS: &[&str] = &[
    "kill", "murder", "suicide", "weapon", "gun", "knife", "blood", "stab", "threat", "harass",
];

/// Health terms redirected to medical professionals.
const HEALTH_TERMS: &[&str] = &[
    "headache",
    "sick",
    "pain",
    "fever",
    "medication",
    "doctor",
    "hospital",
];

/// Fixed response for the violence warning
pub const VIOLENCE_WARNING_TEXT: &str = "\u{26a0} **This is serious.** Physical violence at work is illegal and unacceptable.\n\nPlease take action immediately:\n\u{2022} Document everything (dates, witnesses, injuries)\n\u{2022} Report to HR or higher management NOW\n\u{2022} Contact workplace violence hotline: 1-800-799-7233\n\u{2022} If you're in immediate danger, call 911\n\nThis isn't a communication issue. It's workplace abuse. I can't coach you through this, but I strongly urge you to protect yourself and report this.";

/// Fixed response for the crisis warning
pub const CRISIS_WARNING_TEXT: &str = "\u{26a0} I'm concerned about what you've shared. If you're in immediate danger or witnessing illegal activity, please contact:\n\n\u{2022} Emergency Services: 911\n\u{2022} National Suicide Prevention Lifeline: 988\n\u{2022} Workplace Violence Hotline: 1-800-799-7233\n\nI'm designed to help with workplace communication challenges, not crisis or safety situations. Please reach out to professionals who can provide proper support.";

/// Fixed response for the health redirect
pub const HEALTH_REDIRECT_TEXT: &str = "I'm specifically designed for workplace communication challenges. For health concerns, please consult a medical professional. Can we focus on a work-related communication or teamwork challenge instead?";

/// Result of classifying a user message for safety concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No safety concern detected; the turn proceeds normally
    None,
    /// Physical violence detected; short-circuit with the violence warning
    ViolenceWarning,
    /// Harmful/crisis content detected; short-circuit with crisis resources
    CrisisWarning,
    /// Health topic detected; redirect to medical professionals
    HealthRedirect,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::ViolenceWarning => write!(f, "violence_warning"),
            Self::CrisisWarning => write!(f, "crisis_warning"),
            Self::HealthRedirect => write!(f, "health_redirect"),
        }
    }
}

impl Verdict {
    /// Get the fixed response text for this verdict
    ///
    /// Returns `None` for [`Verdict::None`]; the other variants map to one
    /// of the three hand-authored warning messages.
    pub fn warning_text(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::ViolenceWarning => Some(VIOLENCE_WARNING_TEXT),
            Self::CrisisWarning => Some(CRISIS_WARNING_TEXT),
            Self::HealthRedirect => Some(HEALTH_REDIRECT_TEXT),
        }
    }
}

/// Classify a user message for safety concerns
///
/// Rules are evaluated in priority order Violence > Crisis > Health; the
/// first match wins.
///
/// # Examples
///
/// ```
/// use bridgechat::safety::{classify, Verdict};
///
/// assert_eq!(classify("he threatened to hit me at work"), Verdict::ViolenceWarning);
/// assert_eq!(classify("my boss beats me on workload"), Verdict::None);
/// assert_eq!(classify("I have a headache"), Verdict::HealthRedirect);
/// assert_eq!(classify("my manager ignores my emails"), Verdict::None);
/// ```
pub fn classify(user_text: &str) -> Verdict {
    let text = user_text.to_lowercase();

    if matches_violence(&text) {
        return Verdict::ViolenceWarning;
    }

    if contains_any(&text, CRISIS_TERMS) {
        return Verdict::CrisisWarning;
    }

    if contains_any(&text, HEALTH_TERMS) {
        return Verdict::HealthRedirect;
    }

    Verdict::None
}

/// Violence rule: a physical-violence term (or "beat" with an explicit
/// physical indicator) with no workload-context term present.
fn matches_violence(text: &str) -> bool {
    let has_violence_term = contains_any(text, VIOLENCE_TERMS)
        || (text.contains("beat") && contains_any(text, BEAT_INDICATORS));

    has_violence_term && !contains_any(text, WORKLOAD_TERMS)
}

/// Case-sensitive substring scan; callers lowercase the text first.
fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}
