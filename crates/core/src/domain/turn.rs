use serde::{Deserialize, Serialize};

/// Structured facts recovered from one generated response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTurnResponse {
    pub reply: Option<String>,
    pub selected_items: Option<Vec<String>>,
    /// The model wants to ask for contact details next. Informational only.
    pub request_contact: bool,
    pub contact_address: Option<String>,
    /// The model's own completion signal. Completion is always derived from
    /// state, never from this flag.
    pub complete: bool,
}
