//! Media Elements
//!
//! The coordinator's model of one `<video>`: the attributes it forces on
//! registration and the mute/play/visibility state it tracks.

use mwh_dom::NodeId;
use serde::{Deserialize, Serialize};

/// Preload hint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreloadHint {
    None,
    #[default]
    Metadata,
    Auto,
}

impl PreloadHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreloadHint::None => "none",
            PreloadHint::Metadata => "metadata",
            PreloadHint::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaErrorCode {
    Aborted = 1,
    Network = 2,
    Decode = 3,
    SrcNotSupported = 4,
}

/// The media resource failed to load or decode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("media load error ({code:?}): {message}")]
pub struct MediaLoadError {
    pub code: MediaErrorCode,
    pub message: String,
}

impl MediaLoadError {
    pub fn new(code: MediaErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Why the host declined a `play()` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Autoplay policy
    NotAllowed,
    /// Interrupted by a pause or a newer load
    Aborted,
    /// No playable source
    NotSupported,
}

/// The host declined a `play()` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("playback rejected: {reason:?}")]
pub struct PlaybackRejected {
    pub reason: RejectReason,
}

impl PlaybackRejected {
    pub fn new(reason: RejectReason) -> Self {
        Self { reason }
    }
}

/// Observable per-video state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoState {
    MutedVisiblePlaying,
    /// Autoplay was rejected; the next visibility callback retries
    MutedVisiblePaused,
    MutedHiddenPaused,
    /// Only seen mid-handler; handlers pause a muted video once it is hidden
    MutedHiddenPlaying,
    UnmutedPlaying,
    /// Play was rejected after unmuting; the video keeps the audio slot
    UnmutedPaused,
    /// Terminal
    Errored,
}

impl VideoState {
    pub fn is_unmuted(&self) -> bool {
        matches!(self, VideoState::UnmutedPlaying | VideoState::UnmutedPaused)
    }
}

/// Tracked video element
#[derive(Debug, Clone)]
pub struct MediaElement {
    id: NodeId,

    // Sound
    pub muted: bool,

    // Playback
    pub paused: bool,
    pub current_time: f64,
    pub autoplay: bool,
    pub loop_: bool,
    pub plays_inline: bool,
    pub preload: PreloadHint,

    // Viewport
    pub visible: bool,

    // Failure
    pub error: Option<MediaLoadError>,

    /// Ticket of the play request still in flight, if any
    pending_play: Option<u64>,
}

impl MediaElement {
    /// Element with the forced registration baseline: muted, looping, autoplay,
    /// inline, optimistically visible and playing.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            muted: true,
            paused: false,
            current_time: 0.0,
            autoplay: true,
            loop_: true,
            plays_inline: true,
            preload: PreloadHint::Metadata,
            visible: true,
            error: None,
            pending_play: None,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        !self.paused
    }

    pub fn state(&self) -> VideoState {
        match (self.has_error(), self.muted, self.visible, self.paused) {
            (true, ..) => VideoState::Errored,
            (false, false, _, false) => VideoState::UnmutedPlaying,
            (false, false, _, true) => VideoState::UnmutedPaused,
            (false, true, true, false) => VideoState::MutedVisiblePlaying,
            (false, true, true, true) => VideoState::MutedVisiblePaused,
            (false, true, false, true) => VideoState::MutedHiddenPaused,
            (false, true, false, false) => VideoState::MutedHiddenPlaying,
        }
    }

    /// Record an in-flight play request. Playback is assumed to start;
    /// `settle_play` reconciles.
    pub(crate) fn begin_play(&mut self, ticket: u64) {
        self.paused = false;
        self.pending_play = Some(ticket);
    }

    /// Apply the outcome of a play request. Returns false for stale tickets.
    pub(crate) fn settle_play(&mut self, ticket: u64, started: bool) -> bool {
        if self.pending_play != Some(ticket) {
            return false;
        }
        self.pending_play = None;
        if !started {
            self.paused = true;
        }
        true
    }

    pub(crate) fn pause(&mut self) {
        self.paused = true;
        self.pending_play = None;
    }

    pub(crate) fn fail(&mut self, error: MediaLoadError) {
        self.error = Some(error);
        self.pause();
    }

    pub fn play_pending(&self) -> bool {
        self.pending_play.is_some()
    }
}
