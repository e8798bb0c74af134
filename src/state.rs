//! Turn classification and tone state tracking
//!
//! Every accepted chat message is classified into exactly one [`TurnKind`]
//! before any external call is made. The classifier is the replacement for
//! the branch-heavy step counters of earlier revisions: one tagged variant
//! out, one dispatch switch in the orchestrator.
//!
//! The tone quick replies ("Professional"/"Casual") are offered exactly
//! once per conversation: when the first substantive message arrives with
//! no tone chosen. If the user ignores the prompt and keeps typing, later
//! substantive messages proceed as normal queries with the default tone.

use crate::session::Turn;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Short greeting vocabulary. Matched against the trimmed, lowercased
/// message in full, not as a substring.
const GREETING_WORDS: &[&str] = &[
    "hi", "hello", "hey", "hii", "hiii", "sup", "yo", "howdy", "helo", "hola",
];

/// Minimum word count for a message to count as substantive.
const MEANINGFUL_WORD_COUNT: usize = 3;

/// Fixed reply for greetings
pub const GREETING_REPLY: &str = "Hello! How can I help you today?";

/// Fixed prompt asking for a tone preference
pub const TONE_PROMPT: &str =
    "Before we dive in \u{2014} how would you like me to respond? Pick the style that feels right for you.";

/// Fixed clarifying question for very short messages sent before a tone
/// has been chosen
pub const ELABORATION_PROMPT: &str =
    "Could you tell me a bit more about what's going on? A sentence or two helps me give you useful advice.";

/// Display-style selector, chosen once per conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    /// Measured, empathetic, formal register
    Professional,
    /// Relaxed, conversational register
    Casual,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Professional => write!(f, "Professional"),
            Self::Casual => write!(f, "Casual"),
        }
    }
}

impl Tone {
    /// Parse a tone selection from a user message
    ///
    /// Only the exact trimmed labels count; "professional advice please"
    /// is a query, not a selection.
    ///
    /// # Examples
    ///
    /// ```
    /// use bridgechat::state::Tone;
    ///
    /// assert_eq!(Tone::from_selection("Professional"), Some(Tone::Professional));
    /// assert_eq!(Tone::from_selection("  Casual  "), Some(Tone::Casual));
    /// assert_eq!(Tone::from_selection("casual vibes"), None);
    /// ```
    pub fn from_selection(text: &str) -> Option<Self> {
        match text.trim() {
            "Professional" => Some(Self::Professional),
            "Casual" => Some(Self::Casual),
            _ => None,
        }
    }
}

/// Classification of one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnKind {
    /// Short greeting within the first turns; fixed friendly reply
    Greeting,
    /// Exact tone label; sets the tone and re-answers the last problem
    ToneSelection(Tone),
    /// First substantive message with no tone chosen; issue the tone
    /// prompt with quick replies, no completion call
    NeedsToneChoice,
    /// Too short to work with and no tone chosen; ask for more detail
    AwaitingElaboration,
    /// Proceed to retrieval and composition
    NormalQuery,
}

/// Classify one inbound message against the session so far
///
/// Evaluation order matters: greetings bypass tone gating, and an exact
/// tone label is always a selection even when a tone is already set
/// (reselection switches the register).
///
/// # Arguments
///
/// * `history` - Turns accepted so far, oldest first
/// * `tone` - Tone previously selected for this session, if any
/// * `user_text` - The raw inbound message
pub fn classify_turn(history: &[Turn], tone: Option<Tone>, user_text: &str) -> TurnKind {
    let trimmed = user_text.trim();

    if is_greeting(trimmed) && history.len() < 2 {
        return TurnKind::Greeting;
    }

    if let Some(selected) = Tone::from_selection(trimmed) {
        return TurnKind::ToneSelection(selected);
    }

    if tone.is_none() {
        if !is_meaningful(trimmed) {
            return TurnKind::AwaitingElaboration;
        }
        if !tone_prompt_issued(history) {
            return TurnKind::NeedsToneChoice;
        }
        // Prompt already shown once and ignored; fall through and answer
        // with the default tone rather than re-prompting.
    }

    TurnKind::NormalQuery
}

/// Whether the trimmed message is a bare greeting
fn is_greeting(trimmed: &str) -> bool {
    let lowered = trimmed.to_lowercase();
    GREETING_WORDS.contains(&lowered.as_str())
}

/// Whether the message carries enough content to coach on
fn is_meaningful(trimmed: &str) -> bool {
    trimmed.split_whitespace().count() >= MEANINGFUL_WORD_COUNT
}

/// Whether the tone prompt was already issued in this session
fn tone_prompt_issued(history: &[Turn]) -> bool {
    history.iter().any(|turn| turn.assistant_text == TONE_PROMPT)
}

/// Find the most recently stated substantive problem in the history
///
/// Scans backward, skipping greetings and tone labels, so that a tone
/// selection can re-answer the user's actual question instead of treating
/// the tone word itself as the topic.
pub fn last_problem_statement(history: &[Turn]) -> Option<&str> {
    history.iter().rev().find_map(|turn| {
        let trimmed = turn.user_text.trim();
        if is_greeting(trimmed) || Tone::from_selection(trimmed).is_some() {
            None
        } else if trimmed.is_empty() {
            None
        } else {
            Some(turn.user_text.as_str())
        }
    })
}
