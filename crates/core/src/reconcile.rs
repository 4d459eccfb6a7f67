use serde::{Deserialize, Serialize};

use crate::domain::state::ConversationState;
use crate::domain::turn::ParsedTurnResponse;

pub const DEFAULT_PLACEHOLDER_REPLY: &str = "Okay.";

/// A candidate field that failed validation and was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationRejected {
    ContactAddress { candidate: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub state: ConversationState,
    pub reply: String,
    pub changed: bool,
    pub items_added: Vec<String>,
    pub address_updated: bool,
    pub rejected: Vec<ValidationRejected>,
}

#[derive(Clone, Debug)]
pub struct StateReconciler {
    placeholder_reply: String,
}

impl Default for StateReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER_REPLY)
    }
}

impl StateReconciler {
    pub fn new(placeholder_reply: impl Into<String>) -> Self {
        Self { placeholder_reply: placeholder_reply.into() }
    }

    /// Merges `response` into a copy of `current`. Items are only appended and
    /// the address only moves to a different, valid value, so merging the same
    /// response twice reports no change the second time.
    pub fn reconcile(
        &self,
        response: &ParsedTurnResponse,
        current: &ConversationState,
    ) -> Reconciliation {
        let mut state = current.clone();
        let mut items_added = Vec::new();
        let mut rejected = Vec::new();

        for item in response.selected_items.iter().flatten() {
            if state.add_item(item) {
                items_added.push(item.clone());
            }
        }

        let mut address_updated = false;
        if let Some(candidate) = response.contact_address.as_deref().map(str::trim) {
            if !candidate.is_empty() {
                if is_loose_address(candidate) {
                    address_updated = state.set_contact_address(candidate);
                } else {
                    rejected
                        .push(ValidationRejected::ContactAddress { candidate: candidate.to_string() });
                }
            }
        }

        let reply = response.reply.clone().unwrap_or_else(|| self.placeholder_reply.clone());
        let changed = !items_added.is_empty() || address_updated;

        Reconciliation { state, reply, changed, items_added, address_updated, rejected }
    }
}

/// `local@domain.tld` shape check: no `@` or whitespace in either segment and
/// at least one interior `.` in the domain.
pub fn is_loose_address(candidate: &str) -> bool {
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    let segment_ok =
        |segment: &str| !segment.is_empty() && !segment.contains(|c: char| c == '@' || c.is_whitespace());
    if !segment_ok(local) || !segment_ok(domain) {
        return false;
    }

    domain.char_indices().any(|(index, c)| c == '.' && index > 0 && index + 1 < domain.len())
}
