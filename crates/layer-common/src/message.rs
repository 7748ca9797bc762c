//! User-facing notifications.
//!
//! Messages carry a localization key plus arguments; turning them into text
//! is up to the UI layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Success,
    Info,
    Warning,
    Error,
}

/// A single notification in the wizard's message queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Localization key, e.g. "messages.saveSuccess"
    pub key: String,

    #[serde(rename = "type")]
    pub kind: MessageKind,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub args: Map<String, Value>,
}

impl Message {
    pub fn new(key: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            key: key.into(),
            kind,
            args: Map::new(),
        }
    }

    pub fn success(key: impl Into<String>) -> Self {
        Self::new(key, MessageKind::Success)
    }

    pub fn warning(key: impl Into<String>) -> Self {
        Self::new(key, MessageKind::Warning)
    }

    pub fn error(key: impl Into<String>) -> Self {
        Self::new(key, MessageKind::Error)
    }

    /// Attach a message argument.
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }
}
