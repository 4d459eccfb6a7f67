//! Locates the first balanced `{ ... }` span in free-form model output.
//!
//! Braces are counted without tracking string literals, so a `{` or `}` inside
//! a JSON string value shifts the detected boundary. The result is still
//! deterministic; schema decoding rejects whatever span comes out wrong.

use crate::errors::ExtractionError;

pub fn extract_json_object(text: &str) -> Result<&str, ExtractionError> {
    let start = text.find('{').ok_or(ExtractionError::NoObject)?;
    let mut depth = 0usize;

    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    Err(ExtractionError::Unbalanced { start, depth })
}
