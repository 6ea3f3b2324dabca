//! mwh Media
//!
//! Sound and playback coordination for the videos on a page.
//!
//! Features:
//! - At most one video has sound at a time
//! - Viewport-driven autoplay that never interrupts a video with sound
//! - Background music ducked while a video has sound
//! - Overlay play/mute buttons with accessible labels
//!
//! # Example
//! ```
//! use mwh_dom::Document;
//! use mwh_media::{InteractionKind, MediaCommand, MediaConfig, MediaCoordinator, MemoryPreferences};
//!
//! let mut doc = Document::new();
//! let body = doc.body();
//! let card = doc.append_element(body, "div", &["media"]);
//! let hero = doc.append_element(card, "video", &[]);
//!
//! let mut media = MediaCoordinator::new(MediaConfig::default(), MemoryPreferences::new())?;
//! media.register_all(&mut doc.tree);
//! media.notify_user_interaction(InteractionKind::Click);
//! media.toggle_sound(hero);
//!
//! let commands = media.take_commands();
//! assert!(commands.contains(&MediaCommand::SetMuted { video: hero, muted: false }));
//! assert_eq!(media.active_video(), Some(hero));
//! # Ok::<(), mwh_media::MediaError>(())
//! ```

pub mod background;
pub mod command;
pub mod config;
pub mod coordinator;
pub mod element;
pub mod interaction;
pub mod overlay;
pub mod preference;

pub use background::{BackgroundMusic, MusicButtonState};
pub use command::{MediaCommand, MusicCommand, PlayTarget, PlayTicket};
pub use config::MediaConfig;
pub use coordinator::{CoordinatorSnapshot, MediaCoordinator, MusicSnapshot, VideoSnapshot};
pub use element::{
    MediaElement, MediaErrorCode, MediaLoadError, PlaybackRejected, PreloadHint, RejectReason,
    VideoState,
};
pub use interaction::{InteractionKind, InteractionTracker, Key};
pub use overlay::{ActivationInput, OverlayControl};
pub use preference::{MemoryPreferences, PreferenceStore};

use mwh_dom::{DomError, NodeId};

/// Media error
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error(transparent)]
    PlaybackRejected(#[from] PlaybackRejected),

    #[error(transparent)]
    Load(#[from] MediaLoadError),

    #[error("No overlay container for video {0:?}")]
    MissingContainer(NodeId),

    #[error("Not a video element: {0:?}")]
    NotAVideo(NodeId),

    #[error("Audio requires a user interaction first")]
    InteractionNotYetGranted,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Dom(#[from] DomError),
}
