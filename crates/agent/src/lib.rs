//! Agent runtime - drives one sales conversation over a generation engine.
//!
//! Each user turn flows through:
//! 1. **Prompt** (`tiller_core::prompt`) - catalog, schema and known facts
//! 2. **Generation** (`llm`) - one call to the pluggable `GenerationPort`
//! 3. **Interpretation** (`tiller_core::flows`) - strip reasoning, find the
//!    JSON object, decode it, merge it into state
//!
//! # Key Types
//!
//! - `AgentRuntime` - per-session orchestrator (see `runtime` module)
//! - `GenerationPort` - trait the local model engine is plugged in behind
//!
//! # Safety Principle
//!
//! The model only proposes facts. Whether they are stored, and whether the
//! conversation is complete, is decided deterministically from state.

pub mod llm;
pub mod runtime;
pub mod telemetry;

pub use llm::{
    BlockingGenerator, GenerationError, GenerationPort, GenerationRequest, ScriptedGenerator,
    UnavailableGenerator,
};
pub use runtime::{AgentRuntime, TurnReply};
