pub mod engine;
pub mod states;

pub use engine::{truncate_preview, ReplyTemplates, TurnEngine};
pub use states::{TurnOutcome, TurnStage};
