//! Prompt command interpreter
//!
//! The prompt accepts free text. Input is normalized (trimmed, lowercased)
//! and looked up in a registry of exact phrases. Anything else is ignored.

use std::collections::HashMap;

use crate::config::LoadConfig;

/// Phrase that loads the demo STEP model
pub const LOAD_STEP_PHRASE: &str = "load step file";

/// A recognized prompt command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Load a STEP file from a static resource path and show it
    LoadStep { path: String, color: [f32; 3] },
}

/// Normalize prompt text for lookup
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Maps normalized phrases to commands
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
}

impl CommandRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in commands
    pub fn with_defaults(load: &LoadConfig) -> Self {
        let mut registry = Self::new();
        registry.register(
            LOAD_STEP_PHRASE,
            Command::LoadStep {
                path: load.demo_path.clone(),
                color: load.default_color,
            },
        );
        registry
    }

    /// Register a command under a phrase (normalized before storing)
    pub fn register(&mut self, phrase: &str, command: Command) {
        self.commands.insert(normalize(phrase), command);
    }

    /// Look up the command for a piece of prompt text
    pub fn interpret(&self, text: &str) -> Option<Command> {
        self.commands.get(&normalize(text)).cloned()
    }

    /// All registered phrases, sorted
    pub fn phrases(&self) -> Vec<&str> {
        let mut phrases: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        phrases.sort_unstable();
        phrases
    }
}

/// What a key press in the prompt box should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIntent {
    /// Submit the prompt text
    Submit,
    /// Insert a line break
    InsertNewline,
    /// Not a prompt key
    Ignore,
}

/// Enter submits, Shift+Enter inserts a newline
pub fn prompt_key_intent(enter: bool, shift: bool) -> KeyIntent {
    match (enter, shift) {
        (true, false) => KeyIntent::Submit,
        (true, true) => KeyIntent::InsertNewline,
        (false, _) => KeyIntent::Ignore,
    }
}

/// Text currently in the prompt box
#[derive(Debug, Clone, Default)]
pub struct PromptState {
    pub text: String,
}

impl PromptState {
    /// Interpret the current text and clear it, whether or not it matched
    pub fn submit(&mut self, registry: &CommandRegistry) -> Option<Command> {
        let command = registry.interpret(&self.text);
        match &command {
            Some(command) => tracing::debug!(?command, "Prompt command recognized"),
            None => tracing::debug!(text = %self.text, "Prompt text not recognized"),
        }
        self.text.clear();
        command
    }
}
