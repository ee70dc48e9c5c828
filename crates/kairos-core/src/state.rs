//! UI-agnostic chat state types
//!
//! These are shared between the session, the history store and every front
//! end, and don't depend on any specific display technology.

use serde::{Deserialize, Serialize};

/// A chat message as shown in the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    /// Compiled markup (see [`crate::markup`])
    pub content: String,
    /// Display-formatted time, e.g. "14:05"
    pub timestamp: String,
}

impl ChatMessage {
    /// Create a message stamped with the current local time
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: current_time_label(),
        }
    }

    pub fn with_timestamp(role: ChatRole, content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    System,
    Error,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::System => "system",
            ChatRole::Error => "error",
        }
    }
}

/// Local wall-clock time as "HH:MM"
pub fn current_time_label() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}
