use serde::{Deserialize, Serialize};

/// Facts accumulated across the turns of one conversation.
///
/// Only the reconciler in this crate can mutate a state; everything outside
/// reads it through [`StateSnapshot`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationState {
    selected_items: Vec<String>,
    contact_address: Option<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_items(&self) -> &[String] {
        &self.selected_items
    }

    pub fn contact_address(&self) -> Option<&str> {
        self.contact_address.as_deref()
    }

    pub fn contains_item(&self, item: &str) -> bool {
        self.selected_items.iter().any(|existing| existing == item)
    }

    pub fn is_complete(&self) -> bool {
        !self.selected_items.is_empty()
            && self.contact_address.as_deref().is_some_and(|address| !address.trim().is_empty())
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            selected_items: self.selected_items.clone(),
            contact_address: self.contact_address.clone(),
            is_complete: self.is_complete(),
        }
    }

    /// Appends `item` unless it is blank or already selected. Returns whether
    /// the state changed.
    pub(crate) fn add_item(&mut self, item: &str) -> bool {
        if item.trim().is_empty() || self.contains_item(item) {
            return false;
        }
        self.selected_items.push(item.to_string());
        true
    }

    /// Callers must validate `address` first.
    pub(crate) fn set_contact_address(&mut self, address: &str) -> bool {
        if self.contact_address.as_deref() == Some(address) {
            return false;
        }
        self.contact_address = Some(address.to_string());
        true
    }
}

/// Read-only copy of a [`ConversationState`] handed to observers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub selected_items: Vec<String>,
    pub contact_address: Option<String>,
    pub is_complete: bool,
}
