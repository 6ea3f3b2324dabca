//! User interaction tracking
//!
//! Browsers only let a page start audio after a genuine user gesture. The
//! tracker latches the first click, touch or key press.

use serde::{Deserialize, Serialize};

/// Kind of user gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Click,
    TouchStart,
    KeyDown,
}

/// Keyboard key relevant to media controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Enter,
    Space,
    Escape,
    Other,
}

impl Key {
    /// Parse from a DOM `KeyboardEvent.key` value
    pub fn parse(key: &str) -> Self {
        match key {
            "Enter" => Key::Enter,
            " " | "Spacebar" | "Space" => Key::Space,
            "Escape" | "Esc" => Key::Escape,
            _ => Key::Other,
        }
    }

    /// Keys that activate a focused button
    pub fn activates(&self) -> bool {
        matches!(self, Key::Enter | Key::Space)
    }
}

/// Latches the first user interaction
#[derive(Debug, Default)]
pub struct InteractionTracker {
    first: Option<InteractionKind>,
}

impl InteractionTracker {
    pub fn new() -> Self { Self::default() }

    /// Record a gesture. Returns true only for the first one.
    pub fn record(&mut self, kind: InteractionKind) -> bool {
        if self.first.is_some() {
            return false;
        }
        self.first = Some(kind);
        tracing::info!(?kind, "user interaction detected, audio now available");
        true
    }

    pub fn has_interacted(&self) -> bool {
        self.first.is_some()
    }

    pub fn first_interaction(&self) -> Option<InteractionKind> {
        self.first
    }
}
