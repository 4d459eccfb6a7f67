//! Wire schema the model is instructed to emit, and its tolerant decoder.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::turn::ParsedTurnResponse;
use crate::errors::SchemaError;

/// Literal schema description embedded in the system prompt.
pub const SCHEMA_DESCRIPTION: &str = r#"{
  "reply": string,              // what to say to the user next
  "selected_lines": [string],   // catalog lines the user wants, exact names
  "ask_email": boolean,         // true when you are asking for their email
  "email": string | null,       // email address the user gave, if any
  "done": boolean               // true once lines and email are both known
}"#;

#[derive(Debug, Default, Deserialize)]
struct WireTurnResponse {
    reply: Option<String>,
    selected_lines: Option<Vec<String>>,
    ask_email: Option<bool>,
    email: Option<String>,
    done: Option<bool>,
}

impl From<WireTurnResponse> for ParsedTurnResponse {
    fn from(wire: WireTurnResponse) -> Self {
        Self {
            reply: wire.reply,
            selected_items: wire.selected_lines,
            request_contact: wire.ask_email.unwrap_or(false),
            contact_address: wire.email,
            complete: wire.done.unwrap_or(false),
        }
    }
}

/// Decodes an extracted object. Keys match case-insensitively, unknown keys
/// are ignored and `null` counts as missing; a type mismatch on a known key
/// fails the whole decode.
pub fn parse_turn_response(candidate: &str) -> Result<ParsedTurnResponse, SchemaError> {
    let value: Value =
        serde_json::from_str(candidate).map_err(|error| SchemaError::Syntax(error.to_string()))?;
    let Value::Object(object) = value else {
        return Err(SchemaError::NotAnObject);
    };

    let normalized = object
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect::<Map<String, Value>>();

    serde_json::from_value::<WireTurnResponse>(Value::Object(normalized))
        .map(ParsedTurnResponse::from)
        .map_err(|error| SchemaError::FieldType(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::parse_turn_response;
    use crate::domain::turn::ParsedTurnResponse;
    use crate::errors::SchemaError;

    #[test]
    fn parses_full_response() {
        let parsed = parse_turn_response(
            r#"{"reply":"Got it","selected_lines":["RiverLite"],"ask_email":true,"email":null,"done":false}"#,
        )
        .expect("full response should parse");

        assert_eq!(
            parsed,
            ParsedTurnResponse {
                reply: Some("Got it".to_string()),
                selected_items: Some(vec!["RiverLite".to_string()]),
                request_contact: true,
                contact_address: None,
                complete: false,
            }
        );
    }

    #[test]
    fn empty_object_parses_to_defaults() {
        assert_eq!(parse_turn_response("{}"), Ok(ParsedTurnResponse::default()));
    }

    #[test]
    fn keys_match_case_insensitively() {
        let parsed =
            parse_turn_response(r#"{"Reply":"hi","SELECTED_LINES":["A"],"Email":"a@b.c","DONE":true}"#)
                .expect("mixed case keys should parse");

        assert_eq!(parsed.reply.as_deref(), Some("hi"));
        assert_eq!(parsed.selected_items, Some(vec!["A".to_string()]));
        assert_eq!(parsed.contact_address.as_deref(), Some("a@b.c"));
        assert!(parsed.complete);
        assert!(!parsed.request_contact);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let parsed = parse_turn_response(r#"{"reply":"ok","confidence":0.9,"extra":{"x":[1]}}"#)
            .expect("unknown fields should be ignored");
        assert_eq!(parsed.reply.as_deref(), Some("ok"));
    }

    #[test]
    fn null_booleans_default_to_false() {
        let parsed = parse_turn_response(r#"{"ask_email":null,"done":null}"#)
            .expect("null booleans should parse");
        assert!(!parsed.request_contact);
        assert!(!parsed.complete);
    }

    #[test]
    fn type_mismatch_fails_instead_of_partial_result() {
        let result = parse_turn_response(r#"{"reply":"ok","selected_lines":"RiverLite"}"#);
        assert!(matches!(result, Err(SchemaError::FieldType(_))));

        let result = parse_turn_response(r#"{"reply":"ok","done":"yes"}"#);
        assert!(matches!(result, Err(SchemaError::FieldType(_))));
    }

    #[test]
    fn malformed_json_fails() {
        let result = parse_turn_response(r#"{"reply":"ok",}"#);
        assert!(matches!(result, Err(SchemaError::Syntax(_))));
    }

    #[test]
    fn top_level_must_be_an_object() {
        assert_eq!(parse_turn_response("[1, 2]"), Err(SchemaError::NotAnObject));
    }
}
