//! Interactive prompting.
use anyhow::{Context as _, Result};
use dialoguer::{Confirm, Input, Password};

use crate::steps::VarType;

/// One question to put to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// Variable name.
    pub name: String,
    /// Value kind, which picks the widget.
    pub kind: VarType,
    /// Definition description, shown as the prompt text.
    pub description: String,
    /// Extracted value or default, pre-filled. An empty answer keeps it.
    pub fallback: Option<String>,
}

impl PromptRequest {
    fn label(&self) -> String {
        if self.description.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.description, self.name)
        }
    }
}

/// Asks the user for variable values.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter: Send + Sync {
    /// Ask for one value. The returned string is the final answer, with the
    /// fallback already applied to an empty reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn ask(&self, request: &PromptRequest) -> Result<String>;
}

/// [`Prompter`] on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn ask(&self, request: &PromptRequest) -> Result<String> {
        let fallback = request.fallback.clone().unwrap_or_default();
        let answer = match request.kind {
            VarType::Boolean => Confirm::new()
                .with_prompt(request.label())
                .default(parse_bool(&fallback))
                .interact()
                .map(|b| b.to_string()),
            VarType::Secret => {
                let label = if fallback.is_empty() {
                    request.label()
                } else {
                    format!("{} [keep current]", request.label())
                };
                Password::new()
                    .with_prompt(label)
                    .allow_empty_password(true)
                    .interact()
            }
            VarType::String => Input::<String>::new()
                .with_prompt(request.label())
                .with_initial_text(fallback.clone())
                .allow_empty(true)
                .interact_text(),
        }
        .with_context(|| format!("Failed to read value for {}", request.name))?;

        if answer.is_empty() {
            Ok(fallback)
        } else {
            Ok(answer)
        }
    }
}

/// Interpret a stored boolean default.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "on"
    )
}
