//! Per-request turn orchestration
//!
//! Sequences one chat turn end to end: decode the inbound session token,
//! enforce the turn limit, run the safety classifier, dispatch on the
//! turn kind, and re-encode the updated session. Every branch terminates
//! in a [`TurnOutcome`]; no session state outlives the request server-side.
//!
//! Dependencies (completion client, embedder, vector index) are injected
//! at construction, so the whole state machine runs against canned
//! implementations in tests.

use crate::composer::ResponseComposer;
use crate::error::{BridgechatError, Result};
use crate::providers::Embedder;
use crate::retrieval::{retrieve, VectorIndex};
use crate::safety;
use crate::session::{SessionCodec, Turn};
use crate::state::{
    classify_turn, last_problem_statement, Tone, TurnKind, ELABORATION_PROMPT, GREETING_REPLY,
    TONE_PROMPT,
};

use std::sync::Arc;

/// Result of processing one chat turn
#[derive(Debug)]
pub struct TurnOutcome {
    /// Display-ready reply text
    pub response: String,
    /// Quick-reply labels to offer; empty on every branch except the
    /// tone prompt
    pub quick_replies: Vec<String>,
    /// Re-encoded session token for the client to carry forward
    pub token: String,
    /// Whether the turn limit blocked this message
    pub limit_reached: bool,
}

/// Orchestrates the per-request chat state machine
pub struct TurnOrchestrator {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    composer: ResponseComposer,
    codec: SessionCodec,
    top_k: usize,
    max_turns: usize,
}

impl TurnOrchestrator {
    /// Create an orchestrator over the injected dependencies
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        composer: ResponseComposer,
        codec: SessionCodec,
        top_k: usize,
        max_turns: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            composer,
            codec,
            top_k,
            max_turns,
        }
    }

    /// The session codec, shared with the history and clear endpoints
    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    /// Process one inbound chat message
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty message and a serialization
    /// error if token encoding fails; retrieval, generation, and token
    /// decoding failures are all recovered internally.
    pub async fn process(&self, message: &str, token: Option<&str>) -> Result<TurnOutcome> {
        let user_text = message.trim();
        if user_text.is_empty() {
            return Err(BridgechatError::Validation("Message cannot be empty".to_string()).into());
        }

        // An invalid or expired token is the same as no token: fresh session.
        let (mut history, mut tone) = match token {
            Some(token) => {
                let decoded = self.codec.decode(token);
                if !decoded.valid {
                    if let Some(reason) = &decoded.error {
                        tracing::info!("Starting fresh session: {}", reason);
                    }
                }
                (decoded.history, decoded.tone)
            }
            None => (Vec::new(), None),
        };

        if history.len() >= self.max_turns {
            tracing::info!("Turn limit reached ({} turns), rejecting message", history.len());
            return Ok(TurnOutcome {
                response: self.limit_reached_text(),
                quick_replies: Vec::new(),
                token: self.codec.encode(&history, tone)?,
                limit_reached: true,
            });
        }

        let verdict = safety::classify(user_text);
        if let Some(warning) = verdict.warning_text() {
            tracing::warn!("Safety verdict {} for inbound message", verdict);
            history.push(Turn::new(user_text.to_string(), warning.to_string()));
            return Ok(TurnOutcome {
                response: warning.to_string(),
                quick_replies: Vec::new(),
                token: self.codec.encode(&history, tone)?,
                limit_reached: false,
            });
        }

        let kind = classify_turn(&history, tone, user_text);
        tracing::debug!("Classified turn as {:?}", kind);

        let (response, quick_replies) = match kind {
            TurnKind::Greeting => (GREETING_REPLY.to_string(), Vec::new()),
            TurnKind::ToneSelection(selected) => {
                tone = Some(selected);
                let response = match last_problem_statement(&history) {
                    // Re-answer the user's actual problem in the newly
                    // selected register instead of treating the tone word
                    // as the topic.
                    Some(problem) => {
                        let problem = problem.to_string();
                        let context =
                            retrieve(&*self.embedder, &*self.index, &problem, self.top_k).await;
                        self.composer
                            .compose(&problem, &context, &history, selected)
                            .await
                    }
                    None => format!(
                        "Perfect! I'll keep it {}. Let's tackle this together.",
                        selected.to_string().to_lowercase()
                    ),
                };
                (response, Vec::new())
            }
            TurnKind::NeedsToneChoice => (
                TONE_PROMPT.to_string(),
                vec!["Professional".to_string(), "Casual".to_string()],
            ),
            TurnKind::AwaitingElaboration => (ELABORATION_PROMPT.to_string(), Vec::new()),
            TurnKind::NormalQuery => {
                let effective_tone = tone.unwrap_or(Tone::Professional);
                let context =
                    retrieve(&*self.embedder, &*self.index, user_text, self.top_k).await;
                let response = self
                    .composer
                    .compose(user_text, &context, &history, effective_tone)
                    .await;
                (response, Vec::new())
            }
        };

        history.push(Turn::new(user_text.to_string(), response.clone()));

        Ok(TurnOutcome {
            response,
            quick_replies,
            token: self.codec.encode(&history, tone)?,
            limit_reached: false,
        })
    }

    fn limit_reached_text(&self) -> String {
        format!(
            "You've reached the free message limit ({} messages). Upgrade to Premium for unlimited conversations!",
            self.max_turns
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    struct FixedIndex;

    #[async_trait]
    impl VectorIndex for FixedIndex {
        async fn search(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<serde_json::Value>> {
            Ok(vec![json!({"text": "scenario snippet"})])
        }
    }

    /// Echoes the user message so tests can see what was re-answered
    struct EchoModel;

    #[async_trait]
    impl crate::providers::ChatModel for EchoModel {
        async fn complete(&self, request: crate::providers::ChatRequest) -> Result<String> {
            Ok(format!("coached: {}", request.user_message))
        }
    }

    fn orchestrator() -> TurnOrchestrator {
        let composer = ResponseComposer::new(Arc::new(EchoModel), 0.7, 200, 2);
        TurnOrchestrator::new(
            Arc::new(FixedEmbedder),
            Arc::new(FixedIndex),
            composer,
            SessionCodec::new("a-long-enough-test-secret".to_string(), 24),
            3,
            10,
        )
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let result = orchestrator().process("   ", None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_first_greeting() {
        let outcome = orchestrator().process("hi", None).await.unwrap();
        assert_eq!(outcome.response, "Hello! How can I help you today?");
        assert!(outcome.quick_replies.is_empty());
        assert!(!outcome.limit_reached);
    }

    #[tokio::test]
    async fn test_first_substantive_message_prompts_for_tone() {
        let outcome = orchestrator()
            .process("My manager keeps changing deadlines without notice", None)
            .await
            .unwrap();
        assert!(outcome.response.contains("how would you like me to respond?"));
        assert_eq!(outcome.quick_replies, vec!["Professional", "Casual"]);
    }

    #[tokio::test]
    async fn test_violence_short_circuits() {
        let outcome = orchestrator()
            .process("he threatened to hit me at work", None)
            .await
            .unwrap();
        assert_eq!(outcome.response, safety::VIOLENCE_WARNING_TEXT);
        assert!(outcome.quick_replies.is_empty());

        // The warning was still appended as the assistant turn
        let orch = orchestrator();
        let decoded = orch.codec().decode(&outcome.token);
        assert!(decoded.valid);
        assert_eq!(decoded.history.len(), 1);
        assert_eq!(decoded.history[0].assistant_text, safety::VIOLENCE_WARNING_TEXT);
    }

    #[tokio::test]
    async fn test_tone_selection_re_answers_last_problem() {
        let orch = orchestrator();

        let first = orch
            .process("My manager keeps changing deadlines without notice", None)
            .await
            .unwrap();
        let second = orch
            .process("Professional", Some(&first.token))
            .await
            .unwrap();

        // The model saw the original problem, not the tone word
        assert_eq!(
            second.response,
            "coached: My manager keeps changing deadlines without notice"
        );
        assert!(second.quick_replies.is_empty());

        let decoded = orch.codec().decode(&second.token);
        assert_eq!(decoded.tone, Some(Tone::Professional));
        assert_eq!(decoded.history.len(), 2);
        assert_eq!(decoded.history[1].user_text, "Professional");
    }

    #[tokio::test]
    async fn test_tone_selection_without_prior_problem_acknowledges() {
        let outcome = orchestrator().process("Casual", None).await.unwrap();
        assert_eq!(
            outcome.response,
            "Perfect! I'll keep it casual. Let's tackle this together."
        );
        assert!(outcome.quick_replies.is_empty());
    }

    #[tokio::test]
    async fn test_normal_query_with_tone_set() {
        let orch = orchestrator();

        let first = orch.process("my coworker interrupts me in meetings", None).await.unwrap();
        let second = orch.process("Casual", Some(&first.token)).await.unwrap();
        let third = orch
            .process("what should I actually say to them?", Some(&second.token))
            .await
            .unwrap();

        assert_eq!(third.response, "coached: what should I actually say to them?");
        assert!(third.quick_replies.is_empty());
    }

    #[tokio::test]
    async fn test_tone_prompt_shown_at_most_once() {
        let orch = orchestrator();

        let first = orch
            .process("my coworker interrupts me in meetings", None)
            .await
            .unwrap();
        assert_eq!(first.quick_replies, vec!["Professional", "Casual"]);

        // User ignores the buttons and elaborates instead
        let second = orch
            .process("and it happens every single day", Some(&first.token))
            .await
            .unwrap();
        assert!(second.quick_replies.is_empty());
        assert_eq!(second.response, "coached: and it happens every single day");
    }

    #[tokio::test]
    async fn test_short_message_without_tone_asks_for_more() {
        let orch = orchestrator();
        let first = orch.process("hi", None).await.unwrap();
        let second = orch.process("hey again", Some(&first.token)).await.unwrap();
        assert_eq!(second.response, ELABORATION_PROMPT);
        assert!(second.quick_replies.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_token_treated_as_fresh_session() {
        let outcome = orchestrator()
            .process("hi", Some("garbage.token"))
            .await
            .unwrap();
        assert_eq!(outcome.response, "Hello! How can I help you today?");
    }

    #[tokio::test]
    async fn test_turn_limit_blocks_eleventh_message() {
        let orch = orchestrator();

        let full_history: Vec<Turn> = (0..10)
            .map(|i| Turn::new(format!("message {}", i), format!("reply {}", i)))
            .collect();
        let token = orch
            .codec()
            .encode(&full_history, Some(Tone::Casual))
            .unwrap();

        let outcome = orch
            .process("one more question please", Some(&token))
            .await
            .unwrap();

        assert!(outcome.limit_reached);
        assert!(outcome.response.contains("free message limit"));
        assert!(outcome.quick_replies.is_empty());

        // History is unchanged in the returned token
        let decoded = orch.codec().decode(&outcome.token);
        assert!(decoded.valid);
        assert_eq!(decoded.history.len(), 10);
        assert_eq!(decoded.tone, Some(Tone::Casual));
    }

    #[tokio::test]
    async fn test_history_grows_by_one_per_accepted_turn() {
        let orch = orchestrator();

        let first = orch.process("hi", None).await.unwrap();
        let decoded = orch.codec().decode(&first.token);
        assert_eq!(decoded.history.len(), 1);

        let second = orch
            .process("my boss takes credit for my work", Some(&first.token))
            .await
            .unwrap();
        let decoded = orch.codec().decode(&second.token);
        assert_eq!(decoded.history.len(), 2);
        assert_eq!(decoded.history[0].user_text, "hi");
    }
}
