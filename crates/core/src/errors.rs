use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no opening brace found in model output")]
    NoObject,
    #[error("object starting at byte {start} is never closed (depth {depth} at end of input)")]
    Unbalanced { start: usize, depth: usize },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("response is not valid JSON: {0}")]
    Syntax(String),
    #[error("response top level is not a JSON object")]
    NotAnObject,
    #[error("response field has the wrong type: {0}")]
    FieldType(String),
}

/// Why a turn ended without reconciling anything.
///
/// Every variant is converted into a normal reply for the user; none of them
/// abort the conversation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("generation engine unavailable: {0}")]
    GenerationUnavailable(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("model output contained no JSON object: {source}")]
    ExtractionFailed { source: ExtractionError, preview: String },
    #[error("model output failed schema decoding: {0}")]
    ParseFailed(#[from] SchemaError),
}

impl TurnError {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::GenerationUnavailable(_) | Self::Generation(_) => "turn.generation_failed",
            Self::ExtractionFailed { .. } => "turn.extraction_failed",
            Self::ParseFailed(_) => "turn.parse_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ExtractionError, SchemaError, TurnError};

    #[test]
    fn schema_error_converts_into_parse_failure() {
        let error = TurnError::from(SchemaError::NotAnObject);
        assert!(matches!(error, TurnError::ParseFailed(SchemaError::NotAnObject)));
        assert_eq!(error.event_type(), "turn.parse_failed");
    }

    #[test]
    fn generation_errors_share_an_event_type() {
        assert_eq!(
            TurnError::GenerationUnavailable("no model loaded".to_owned()).event_type(),
            TurnError::Generation("out of memory".to_owned()).event_type()
        );
    }

    #[test]
    fn extraction_failure_message_names_the_cause() {
        let error = TurnError::ExtractionFailed {
            source: ExtractionError::Unbalanced { start: 3, depth: 1 },
            preview: "so {".to_owned(),
        };
        assert_eq!(error.event_type(), "turn.extraction_failed");
        assert!(error.to_string().contains("never closed"));
    }
}
