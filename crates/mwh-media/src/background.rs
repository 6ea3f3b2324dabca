//! Background Music
//!
//! The single site-wide audio track. Its volume follows the video audio
//! slot: ducked while a video has sound, normal otherwise.

use serde::Serialize;

use crate::command::{MusicCommand, PlayTarget, PlayTicket};
use crate::element::{MediaLoadError, PlaybackRejected};
use crate::preference::PreferenceStore;

pub const LABEL_PLAY_MUSIC: &str = "Play background music";
pub const LABEL_PAUSE_MUSIC: &str = "Pause background music";
pub const LABEL_MUSIC_UNAVAILABLE: &str = "Background music unavailable";

/// State of the music toggle button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MusicButtonState {
    pub label: &'static str,
    pub pressed: bool,
    pub disabled: bool,
}

/// Background audio track
#[derive(Debug)]
pub struct BackgroundMusic<P> {
    prefs: P,
    preference_key: String,
    normal_volume: f32,
    ducked_volume: f32,

    pub(crate) muted: bool,
    pub(crate) volume: f32,
    pub(crate) paused: bool,
    enabled: bool,
    unavailable: Option<MediaLoadError>,
    pending_play: Option<u64>,
}

impl<P: PreferenceStore> BackgroundMusic<P> {
    /// Track starts muted and paused at the normal volume; the stored
    /// preference decides whether it is enabled.
    pub fn new(prefs: P, preference_key: &str, normal_volume: f32, ducked_volume: f32) -> Self {
        let enabled = prefs.load(preference_key).as_deref() == Some("true");
        Self {
            prefs,
            preference_key: preference_key.to_string(),
            normal_volume,
            ducked_volume,
            muted: true,
            volume: normal_volume,
            paused: true,
            enabled,
            unavailable: None,
            pending_play: None,
        }
    }

    pub fn muted(&self) -> bool { self.muted }
    pub fn volume(&self) -> f32 { self.volume }
    pub fn paused(&self) -> bool { self.paused }
    pub fn enabled(&self) -> bool { self.enabled }
    pub fn is_unavailable(&self) -> bool { self.unavailable.is_some() }

    pub fn preferences(&self) -> &P {
        &self.prefs
    }

    /// Move the volume to the ducked or normal preset
    pub fn set_ducked(&mut self, ducked: bool) -> Option<MusicCommand> {
        let target = if ducked { self.ducked_volume } else { self.normal_volume };
        if self.volume == target {
            return None;
        }
        tracing::debug!(from = self.volume, to = target, "background music volume");
        self.volume = target;
        Some(MusicCommand::SetVolume(target))
    }

    /// The toggle button plays when music is disabled or paused
    pub fn toggle_plays(&self) -> bool {
        !self.enabled || self.paused
    }

    /// Unmute and request playback
    pub fn start(&mut self, seq: u64) -> Vec<MusicCommand> {
        if self.is_unavailable() {
            tracing::debug!("background music unavailable, not starting");
            return Vec::new();
        }
        self.muted = false;
        self.paused = false;
        self.pending_play = Some(seq);
        vec![
            MusicCommand::SetMuted(false),
            MusicCommand::Play {
                ticket: PlayTicket { target: PlayTarget::Music, seq },
            },
        ]
    }

    /// Reconcile a play request. Success enables and persists the
    /// preference; rejection re-mutes and persists it off.
    pub fn settle_play(&mut self, seq: u64, result: Result<(), PlaybackRejected>) -> Vec<MusicCommand> {
        if self.pending_play != Some(seq) {
            return Vec::new();
        }
        self.pending_play = None;
        match result {
            Ok(()) => {
                self.enabled = true;
                self.persist();
                tracing::info!("background music started");
                Vec::new()
            }
            Err(rejected) => {
                tracing::warn!(%rejected, "background music play failed");
                self.enabled = false;
                self.muted = true;
                self.paused = true;
                self.persist();
                vec![MusicCommand::SetMuted(true)]
            }
        }
    }

    /// User pause: stop, mute and persist the preference off
    pub fn stop(&mut self) -> Vec<MusicCommand> {
        self.paused = true;
        self.muted = true;
        self.enabled = false;
        self.pending_play = None;
        self.persist();
        tracing::info!("background music paused by user");
        vec![MusicCommand::Pause, MusicCommand::SetMuted(true)]
    }

    /// Pause without touching the preference (page teardown)
    pub(crate) fn halt(&mut self) -> Option<MusicCommand> {
        self.pending_play = None;
        if self.paused {
            return None;
        }
        self.paused = true;
        Some(MusicCommand::Pause)
    }

    /// The track failed to load; the button becomes unavailable
    pub fn fail(&mut self, error: MediaLoadError) {
        tracing::error!(%error, "background music failed to load");
        self.unavailable = Some(error);
        self.paused = true;
        self.pending_play = None;
    }

    pub fn button_state(&self) -> MusicButtonState {
        if self.is_unavailable() {
            return MusicButtonState {
                label: LABEL_MUSIC_UNAVAILABLE,
                pressed: false,
                disabled: true,
            };
        }
        let playing = self.enabled && !self.paused;
        MusicButtonState {
            label: if playing { LABEL_PAUSE_MUSIC } else { LABEL_PLAY_MUSIC },
            pressed: playing,
            disabled: false,
        }
    }

    fn persist(&mut self) {
        let value = if self.enabled { "true" } else { "false" };
        self.prefs.store(&self.preference_key, value);
    }
}
