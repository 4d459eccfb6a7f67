use tiller_core::audit::{AuditContext, AuditEvent, AuditSink, NoopAuditSink};
use tiller_core::config::{AppConfig, GenerationConfig};
use tiller_core::domain::state::{ConversationState, StateSnapshot};
use tiller_core::errors::TurnError;
use tiller_core::flows::{TurnEngine, TurnOutcome, TurnStage};
use tiller_core::prompt::PromptBuilder;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::llm::{GenerationError, GenerationPort, GenerationRequest};

/// What the caller shows after a turn. `failure` classifies turns that ended
/// early; the reply is user-facing either way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReply {
    pub reply: String,
    pub changed: bool,
    pub failure: Option<TurnError>,
}

/// One conversation session. Owns the conversation state and is the only
/// writer of it; `handle_user_turn` borrows the runtime mutably, so a single
/// owner cannot interleave turns.
pub struct AgentRuntime<G, S = NoopAuditSink> {
    generator: G,
    prompt_builder: PromptBuilder,
    engine: TurnEngine,
    sampling: GenerationConfig,
    audit_sink: S,
    state: ConversationState,
    session_id: String,
    turn_count: u64,
}

impl<G> AgentRuntime<G>
where
    G: GenerationPort,
{
    pub fn new(generator: G, config: &AppConfig) -> Self {
        Self::from_parts(generator, config.prompt_builder(), config.turn_engine(), config.generation)
    }

    pub fn from_parts(
        generator: G,
        prompt_builder: PromptBuilder,
        engine: TurnEngine,
        sampling: GenerationConfig,
    ) -> Self {
        Self {
            generator,
            prompt_builder,
            engine,
            sampling,
            audit_sink: NoopAuditSink,
            state: ConversationState::new(),
            session_id: Uuid::new_v4().to_string(),
            turn_count: 0,
        }
    }
}

impl<G, S> AgentRuntime<G, S>
where
    G: GenerationPort,
    S: AuditSink,
{
    pub fn with_audit_sink<T>(self, audit_sink: T) -> AgentRuntime<G, T>
    where
        T: AuditSink,
    {
        AgentRuntime {
            generator: self.generator,
            prompt_builder: self.prompt_builder,
            engine: self.engine,
            sampling: self.sampling,
            audit_sink,
            state: self.state,
            session_id: self.session_id,
            turn_count: self.turn_count,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn turn_count(&self) -> u64 {
        self.turn_count
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    /// Runs one turn end to end. Failures of any stage come back as a normal
    /// reply with `changed == false` and leave the state untouched.
    pub async fn handle_user_turn(&mut self, user_text: &str) -> TurnReply {
        self.turn_count += 1;
        let correlation_id = Uuid::new_v4().to_string();

        let prompt = self.prompt_builder.build(&self.state, user_text);
        debug!(
            event_name = "agent.turn.prompt_ready",
            correlation_id = %correlation_id,
            session_id = %self.session_id,
            stage = TurnStage::PromptReady.as_str(),
            prompt_chars = prompt.len(),
            "prompt assembled"
        );

        let request = GenerationRequest::new(prompt, &self.sampling);
        debug!(
            event_name = "agent.turn.generating",
            correlation_id = %correlation_id,
            session_id = %self.session_id,
            stage = TurnStage::Generating.as_str(),
            max_new_tokens = request.max_new_tokens,
            "awaiting generation engine"
        );

        let outcome = match self.generator.generate(&request).await {
            Ok(raw) => {
                debug!(
                    event_name = "agent.turn.generated",
                    correlation_id = %correlation_id,
                    session_id = %self.session_id,
                    raw_output = %raw,
                    "generation engine returned"
                );
                self.engine.interpret(Some(&raw), &self.state)
            }
            Err(error) => {
                let failure = classify_generation_error(&error);
                warn!(
                    event_name = "agent.turn.generation_failed",
                    correlation_id = %correlation_id,
                    session_id = %self.session_id,
                    error = %failure,
                    "generation engine failed"
                );
                self.engine.generation_failed(failure)
            }
        };

        self.commit(&outcome, &correlation_id);
        self.audit_sink.emit(AuditEvent::for_turn(
            &AuditContext::new(self.session_id.clone(), correlation_id, "agent-runtime"),
            &outcome,
        ));

        TurnReply { reply: outcome.reply, changed: outcome.changed, failure: outcome.failure }
    }

    fn commit(&mut self, outcome: &TurnOutcome, correlation_id: &str) {
        let Some(reconciliation) = &outcome.reconciliation else {
            if let Some(failure) = &outcome.failure {
                info!(
                    event_name = failure.event_type(),
                    correlation_id = %correlation_id,
                    session_id = %self.session_id,
                    ended_at = outcome.ended_at.as_str(),
                    "turn ended without reconciling"
                );
            }
            return;
        };

        for rejected in &reconciliation.rejected {
            debug!(
                event_name = "agent.turn.validation_rejected",
                correlation_id = %correlation_id,
                session_id = %self.session_id,
                rejected = ?rejected,
                "dropped invalid field from model output"
            );
        }

        self.state = reconciliation.state.clone();
        info!(
            event_name = "agent.turn.completed",
            correlation_id = %correlation_id,
            session_id = %self.session_id,
            changed = outcome.changed,
            items_added = reconciliation.items_added.len(),
            address_updated = reconciliation.address_updated,
            is_complete = self.state.is_complete(),
            "turn reconciled"
        );
    }
}

fn classify_generation_error(error: &anyhow::Error) -> TurnError {
    match error.downcast_ref::<GenerationError>() {
        Some(GenerationError::Unavailable(message)) => {
            TurnError::GenerationUnavailable(message.clone())
        }
        Some(GenerationError::Failed(message)) => TurnError::Generation(message.clone()),
        None => TurnError::Generation(format!("{error:#}")),
    }
}
