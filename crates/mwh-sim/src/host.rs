//! Simulated browser media stack
//!
//! Applies coordinator commands to its own copy of the media state and
//! answers play requests the way a browser would under its autoplay policy.

use std::collections::HashMap;

use mwh_dom::NodeId;
use mwh_media::{
    MediaCommand, MusicCommand, PlayTicket, PlaybackRejected, RejectReason,
};

use crate::scenario::HostPolicy;

#[derive(Debug, Clone, Copy, Default)]
struct HostVideo {
    muted: bool,
    playing: bool,
    time: f64,
}

/// Host-side media state
#[derive(Debug)]
pub struct SimHost {
    policy: HostPolicy,
    user_activated: bool,
    videos: HashMap<NodeId, HostVideo>,
    music_muted: bool,
    music_playing: bool,
    music_volume: f32,
    applied: usize,
}

impl SimHost {
    pub fn new(policy: HostPolicy, music_volume: f32) -> Self {
        Self {
            policy,
            user_activated: false,
            videos: HashMap::new(),
            music_muted: true,
            music_playing: false,
            music_volume,
            applied: 0,
        }
    }

    /// A genuine user gesture happened
    pub fn activate(&mut self) {
        self.user_activated = true;
    }

    pub fn set_video_muted(&mut self, video: NodeId, muted: bool) {
        self.videos.entry(video).or_default().muted = muted;
    }

    /// Apply commands in order. Returns the outcome of every play request.
    pub fn apply(&mut self, commands: &[MediaCommand]) -> Vec<(PlayTicket, Result<(), PlaybackRejected>)> {
        let mut outcomes = Vec::new();
        for command in commands {
            self.applied += 1;
            tracing::trace!(?command, "host applying");
            match *command {
                MediaCommand::Play { video, ticket } => {
                    let muted = self.videos.get(&video).map(|v| v.muted).unwrap_or(true);
                    let result = self.play_outcome(muted);
                    self.videos.entry(video).or_default().playing = result.is_ok();
                    outcomes.push((ticket, result));
                }
                MediaCommand::Pause { video } => {
                    self.videos.entry(video).or_default().playing = false;
                }
                MediaCommand::SetMuted { video, muted } => {
                    self.set_video_muted(video, muted);
                }
                MediaCommand::Seek { video, time } => {
                    self.videos.entry(video).or_default().time = time;
                }
                MediaCommand::Music(MusicCommand::Play { ticket }) => {
                    let result = if self.policy.music_unavailable {
                        Err(PlaybackRejected::new(RejectReason::NotSupported))
                    } else {
                        self.play_outcome(self.music_muted)
                    };
                    self.music_playing = result.is_ok();
                    outcomes.push((ticket, result));
                }
                MediaCommand::Music(MusicCommand::Pause) => self.music_playing = false,
                MediaCommand::Music(MusicCommand::SetMuted(muted)) => self.music_muted = muted,
                MediaCommand::Music(MusicCommand::SetVolume(volume)) => self.music_volume = volume,
            }
        }
        outcomes
    }

    fn play_outcome(&self, muted: bool) -> Result<(), PlaybackRejected> {
        if self.policy.reject_all {
            return Err(PlaybackRejected::new(RejectReason::NotAllowed));
        }
        if self.policy.enforce_autoplay_policy && !self.user_activated && !muted {
            return Err(PlaybackRejected::new(RejectReason::NotAllowed));
        }
        Ok(())
    }

    /// Videos the host is actually playing with sound
    pub fn audible_videos(&self) -> Vec<NodeId> {
        let mut audible: Vec<NodeId> = self
            .videos
            .iter()
            .filter(|(_, v)| v.playing && !v.muted)
            .map(|(id, _)| *id)
            .collect();
        audible.sort();
        audible
    }

    pub fn is_playing(&self, video: NodeId) -> bool {
        self.videos.get(&video).map(|v| v.playing).unwrap_or(false)
    }

    pub fn music_audible(&self) -> bool {
        self.music_playing && !self.music_muted
    }

    pub fn music_volume(&self) -> f32 {
        self.music_volume
    }

    pub fn commands_applied(&self) -> usize {
        self.applied
    }
}
