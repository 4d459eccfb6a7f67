//! Prompt assembly. The backend keeps no memory between calls, so every
//! prompt restates the catalog and the facts collected so far.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::Catalog;
use crate::domain::state::ConversationState;
use crate::schema::SCHEMA_DESCRIPTION;

pub const NONE_TOKEN: &str = "none";

pub const DEFAULT_INSTRUCTIONS: &str = "You are a friendly sales assistant for an outboard motor \
dealer. Help the customer pick product lines from the catalog below and collect their email \
address so a specialist can follow up with a quote. Only recommend lines that appear in the \
catalog, using their exact names. Ask for the email once at least one line has been chosen.\n\n\
Respond with a single JSON object and nothing else: no markdown, no code fences, no commentary. \
The object must follow this schema:";

/// Turn delimiters of the backend's chat format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTemplate {
    pub system_prefix: String,
    pub user_prefix: String,
    pub assistant_prefix: String,
    pub turn_suffix: String,
    /// Placed before the user text to switch off the model's reasoning trace.
    pub reasoning_directive: String,
}

impl Default for ChatTemplate {
    fn default() -> Self {
        Self {
            system_prefix: "<|im_start|>system\n".to_string(),
            user_prefix: "<|im_start|>user\n".to_string(),
            assistant_prefix: "<|im_start|>assistant\n".to_string(),
            turn_suffix: "<|im_end|>\n".to_string(),
            reasoning_directive: "/no_think".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PromptBuilder {
    instructions: String,
    catalog: Catalog,
    template: ChatTemplate,
}

impl PromptBuilder {
    pub fn new(instructions: impl Into<String>, catalog: Catalog, template: ChatTemplate) -> Self {
        Self { instructions: instructions.into(), catalog, template }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn template(&self) -> &ChatTemplate {
        &self.template
    }

    pub fn build(&self, state: &ConversationState, user_text: &str) -> String {
        let template = &self.template;
        let mut prompt = String::new();

        prompt.push_str(&template.system_prefix);
        prompt.push_str(&self.instructions);
        prompt.push('\n');
        prompt.push_str(SCHEMA_DESCRIPTION);
        prompt.push_str("\n\nCatalog:\n");
        for offering in self.catalog.iter() {
            prompt.push_str("- ");
            prompt.push_str(offering);
            prompt.push('\n');
        }
        prompt.push('\n');
        prompt.push_str(&render_state(state));
        prompt.push_str(&template.turn_suffix);

        prompt.push_str(&template.user_prefix);
        if !template.reasoning_directive.is_empty() {
            prompt.push_str(&template.reasoning_directive);
            prompt.push(' ');
        }
        prompt.push_str(user_text);
        prompt.push_str(&template.turn_suffix);

        prompt.push_str(&template.assistant_prefix);
        prompt
    }
}

pub fn render_state(state: &ConversationState) -> String {
    let items = if state.selected_items().is_empty() {
        NONE_TOKEN.to_string()
    } else {
        state.selected_items().join(", ")
    };
    let address = state.contact_address().unwrap_or(NONE_TOKEN);

    format!(
        "Current conversation state (authoritative; it is already known, so never ask for \
         anything listed here again):\n- selected_lines: {items}\n- email: {address}\n"
    )
}
