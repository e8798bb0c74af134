//! Prompt assembly and response composition
//!
//! Builds the instruction block for the completion API from the selected
//! tone, the retrieved context, and the recent turn history, invokes the
//! model, and post-processes the raw text into display markup.
//!
//! Composition failure is non-fatal: any API error collapses into a fixed
//! apology sentinel and the HTTP turn continues.

use crate::format::normalize_markup;
use crate::providers::{ChatModel, ChatRequest};
use crate::session::Turn;
use crate::state::Tone;

use std::sync::Arc;

/// Fixed reply when the completion API fails
pub const APOLOGY_SENTINEL: &str =
    "Sorry, I'm having trouble generating a response right now. Please try again.";

/// Instruction block for the casual register
const CASUAL_TONE_INSTRUCTION: &str = "\u{2022} Use a CASUAL, Gen Z tone: relaxed, conversational, like texting a smart friend\n\u{2022} Use phrases like: \"That sucks\", \"Ugh that's annoying\", \"Yeah I get it\", \"Super frustrating\"\n\u{2022} Use contractions: \"you're\", \"that's\", \"don't\", \"can't\"\n\u{2022} Keep it SHORT and NATURAL - sound like you're texting, not writing an essay\n\u{2022} Be supportive but chill: \"Okay let's figure this out\" instead of \"I understand your concern\"";

/// Instruction block for the professional register
const PROFESSIONAL_TONE_INSTRUCTION: &str = "\u{2022} Use a PROFESSIONAL tone: measured, empathetic, but formal like a workplace mentor or HR coach\n\u{2022} Use complete sentences with proper grammar\n\u{2022} Use phrases like: \"I understand this is challenging\", \"That's a difficult situation\", \"Let's explore this together\"\n\u{2022} Be empathetic but maintain professional distance\n\u{2022} Avoid slang or Gen Z casual language";

/// Composes model prompts and post-processes replies
///
/// Holds the completion client plus the sampling parameters and the
/// history window so callers pass only per-turn data.
pub struct ResponseComposer {
    model: Arc<dyn ChatModel>,
    temperature: f32,
    max_tokens: u32,
    history_window: usize,
}

impl ResponseComposer {
    /// Create a composer over the given completion client
    pub fn new(
        model: Arc<dyn ChatModel>,
        temperature: f32,
        max_tokens: u32,
        history_window: usize,
    ) -> Self {
        Self {
            model,
            temperature,
            max_tokens,
            history_window,
        }
    }

    /// Compose a display-ready reply for a substantive query
    ///
    /// Never returns an error: generation failure yields
    /// [`APOLOGY_SENTINEL`], already display-ready.
    pub async fn compose(
        &self,
        user_text: &str,
        context: &str,
        history: &[Turn],
        tone: Tone,
    ) -> String {
        let system_prompt = self.build_system_prompt(user_text, context, history, tone);

        let request = ChatRequest {
            system_prompt,
            user_message: user_text.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        match self.model.complete(request).await {
            Ok(raw) => normalize_markup(&raw),
            Err(e) => {
                tracing::error!("Response generation failed: {}", e);
                APOLOGY_SENTINEL.to_string()
            }
        }
    }

    /// Build the full instruction block for one turn
    fn build_system_prompt(
        &self,
        user_text: &str,
        context: &str,
        history: &[Turn],
        tone: Tone,
    ) -> String {
        let tone_instruction = match tone {
            Tone::Casual => CASUAL_TONE_INSTRUCTION,
            Tone::Professional => PROFESSIONAL_TONE_INSTRUCTION,
        };

        let chat_history = format_history(history, self.history_window);

        format!(
            "You are a Gen Z workplace coach. Your job is to help young professionals handle workplace challenges using TWO frameworks:\n\n\
             **STEP Framework** (Adaptability): Spot -> Think -> Engage -> Perform\n\
             **4Rs Framework** (Emotional Intelligence): Recognize -> Regulate -> Respect -> Reflect\n\n\
             CRITICAL RULES:\n\n\
             1. **BE DIRECT & ACTIONABLE** - Stop asking endless questions. After 1-2 clarifying questions, jump straight to practical advice using STEP or 4Rs.\n\n\
             2. **USE THE DATASET CONTEXT** - You have access to real workplace scenarios. Reference them to give specific, relevant advice.\n\n\
             3. **MATCH THE TONE**:\n{tone_instruction}\n\n\
             4. **KEEP IT SHORT** - Maximum 3-4 sentences. No fluff, no over-validation. Get to the point.\n\n\
             5. **AVOID QUESTION LOOPS** - Don't ask questions in every single response.\n\n\
             6. **BE SMART ABOUT CONTEXT** - Use the chat history. Don't ask what they already told you.\n\n\
             **CONTEXT FROM DATASET (Use this to make your advice specific):**\n{context}\n\n\
             **CHAT HISTORY:**\n{chat_history}\n\n\
             **USER'S MESSAGE:**\n{user_text}\n\n\
             **YOUR RESPONSE (Be direct, actionable, and concise):**"
        )
    }
}

/// Format the last `window` turns verbatim for prompt inclusion
fn format_history(history: &[Turn], window: usize) -> String {
    let start = history.len().saturating_sub(window);
    history[start..]
        .iter()
        .map(|turn| format!("User: {}\nAI: {}", turn.user_text, turn.assistant_text))
        .collect::<Vec<_>>()
        .join("\n")
}
