//! Host commands
//!
//! The coordinator never touches the media stack directly. It queues
//! commands; the host drains and executes them, then reports play outcomes
//! back with the ticket it was given.

use mwh_dom::NodeId;
use serde::{Deserialize, Serialize};

/// What a play request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayTarget {
    Video(NodeId),
    Music,
}

/// Identifies one asynchronous play request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayTicket {
    pub target: PlayTarget,
    pub seq: u64,
}

/// Background-music command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MusicCommand {
    Play { ticket: PlayTicket },
    Pause,
    SetMuted(bool),
    SetVolume(f32),
}

/// Command for the host media stack
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MediaCommand {
    Play { video: NodeId, ticket: PlayTicket },
    Pause { video: NodeId },
    SetMuted { video: NodeId, muted: bool },
    Seek { video: NodeId, time: f64 },
    Music(MusicCommand),
}

impl MediaCommand {
    /// Video the command applies to, if any
    pub fn video(&self) -> Option<NodeId> {
        match *self {
            MediaCommand::Play { video, .. }
            | MediaCommand::Pause { video }
            | MediaCommand::SetMuted { video, .. }
            | MediaCommand::Seek { video, .. } => Some(video),
            MediaCommand::Music(_) => None,
        }
    }
}
