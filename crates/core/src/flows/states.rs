use serde::{Deserialize, Serialize};

use crate::errors::TurnError;
use crate::reconcile::Reconciliation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStage {
    PromptReady,
    Generating,
    Sanitizing,
    Extracting,
    Parsing,
    Reconciling,
    TurnComplete,
}

impl TurnStage {
    /// Stage that follows on success. Failures jump straight to `TurnComplete`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::PromptReady => Some(Self::Generating),
            Self::Generating => Some(Self::Sanitizing),
            Self::Sanitizing => Some(Self::Extracting),
            Self::Extracting => Some(Self::Parsing),
            Self::Parsing => Some(Self::Reconciling),
            Self::Reconciling => Some(Self::TurnComplete),
            Self::TurnComplete => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PromptReady => "prompt_ready",
            Self::Generating => "generating",
            Self::Sanitizing => "sanitizing",
            Self::Extracting => "extracting",
            Self::Parsing => "parsing",
            Self::Reconciling => "reconciling",
            Self::TurnComplete => "turn_complete",
        }
    }
}

/// Result of one turn. `ended_at` is the last stage that ran; it is
/// `Reconciling` for a successful turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply: String,
    pub changed: bool,
    pub ended_at: TurnStage,
    pub reconciliation: Option<Reconciliation>,
    pub failure: Option<TurnError>,
}

impl TurnOutcome {
    pub fn failed(ended_at: TurnStage, reply: String, failure: TurnError) -> Self {
        Self { reply, changed: false, ended_at, reconciliation: None, failure: Some(failure) }
    }

    pub fn succeeded(reconciliation: Reconciliation) -> Self {
        Self {
            reply: reconciliation.reply.clone(),
            changed: reconciliation.changed,
            ended_at: TurnStage::Reconciling,
            reconciliation: Some(reconciliation),
            failure: None,
        }
    }
}
