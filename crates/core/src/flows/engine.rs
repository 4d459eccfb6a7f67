use serde::{Deserialize, Serialize};

use crate::domain::state::ConversationState;
use crate::errors::TurnError;
use crate::extract::extract_json_object;
use crate::flows::states::{TurnOutcome, TurnStage};
use crate::reconcile::{StateReconciler, DEFAULT_PLACEHOLDER_REPLY};
use crate::sanitize::ResponseSanitizer;
use crate::schema::parse_turn_response;

pub const PREVIEW_ELLIPSIS: &str = "…";

/// Fixed texts used when a turn cannot produce a reconciled reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTemplates {
    pub placeholder: String,
    pub parse_failure: String,
    pub non_json_prefix: String,
    pub generation_failure_prefix: String,
    pub preview_chars: usize,
}

impl Default for ReplyTemplates {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER_REPLY.to_string(),
            parse_failure: "Sorry, I couldn't make sense of that. Could you say it another way?"
                .to_string(),
            non_json_prefix: "The model did not return JSON. Raw output: ".to_string(),
            generation_failure_prefix: "Error: ".to_string(),
            preview_chars: 500,
        }
    }
}

/// Runs the synchronous half of a turn: everything after the backend has
/// returned text.
#[derive(Clone, Debug, Default)]
pub struct TurnEngine {
    sanitizer: ResponseSanitizer,
    reconciler: StateReconciler,
    replies: ReplyTemplates,
}

impl TurnEngine {
    pub fn new(sanitizer: ResponseSanitizer, replies: ReplyTemplates) -> Self {
        let reconciler = StateReconciler::new(replies.placeholder.clone());
        Self { sanitizer, reconciler, replies }
    }

    pub fn replies(&self) -> &ReplyTemplates {
        &self.replies
    }

    /// Never mutates `state`; a successful outcome carries the merged copy in
    /// its reconciliation for the caller to commit.
    pub fn interpret(&self, raw: Option<&str>, state: &ConversationState) -> TurnOutcome {
        let sanitized = self.sanitizer.sanitize(raw);

        let candidate = match extract_json_object(&sanitized) {
            Ok(candidate) => candidate,
            Err(source) => {
                let preview = truncate_preview(sanitized.trim(), self.replies.preview_chars);
                let reply = format!("{}{}", self.replies.non_json_prefix, preview);
                return TurnOutcome::failed(
                    TurnStage::Extracting,
                    reply,
                    TurnError::ExtractionFailed { source, preview },
                );
            }
        };

        let parsed = match parse_turn_response(candidate) {
            Ok(parsed) => parsed,
            Err(error) => {
                return TurnOutcome::failed(
                    TurnStage::Parsing,
                    self.replies.parse_failure.clone(),
                    TurnError::from(error),
                );
            }
        };

        TurnOutcome::succeeded(self.reconciler.reconcile(&parsed, state))
    }

    pub fn generation_failed(&self, failure: TurnError) -> TurnOutcome {
        let message = match &failure {
            TurnError::GenerationUnavailable(message) | TurnError::Generation(message) => {
                message.clone()
            }
            other => other.to_string(),
        };
        let reply = format!("{}{}", self.replies.generation_failure_prefix, message);
        TurnOutcome::failed(TurnStage::Generating, reply, failure)
    }
}

/// First `limit` characters of `text`, with an ellipsis when anything was cut.
pub fn truncate_preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{PREVIEW_ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}
