//! Synchronous core of the Tiller sales assistant: conversation state, prompt
//! assembly and the recovery of structured facts from model output.

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod flows;
pub mod prompt;
pub mod reconcile;
pub mod sanitize;
pub mod schema;

pub use audit::{AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use domain::catalog::{Catalog, OfferingName};
pub use domain::state::{ConversationState, StateSnapshot};
pub use domain::turn::ParsedTurnResponse;
pub use errors::{ExtractionError, SchemaError, TurnError};
pub use extract::extract_json_object;
pub use flows::{ReplyTemplates, TurnEngine, TurnOutcome, TurnStage};
pub use prompt::{ChatTemplate, PromptBuilder};
pub use reconcile::{is_loose_address, Reconciliation, StateReconciler, ValidationRejected};
pub use sanitize::{ReasoningMarkers, ResponseSanitizer};
pub use schema::parse_turn_response;
