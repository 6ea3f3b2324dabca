//! Media Coordinator
//!
//! Owns every registered video and the background track, and keeps the
//! audio slot exclusive: at most one video is unmuted, and the background
//! music is ducked exactly while one is.
//!
//! All handlers run on the page's event loop and take `&mut self`, so the
//! invariant only has to hold between calls. Within a call, commands are
//! queued in the order the host must apply them: other videos are muted
//! before the music is ducked, and the music is ducked before the target is
//! unmuted. Restoring the music always follows the mute that released the
//! slot.

use std::collections::{BTreeMap, HashMap};

use mwh_dom::{
    DOMRect, DomError, DomTree, IntersectionObserver, IntersectionObserverOptions, NodeId,
};
use serde::Serialize;

use crate::background::{BackgroundMusic, MusicButtonState};
use crate::command::{MediaCommand, MusicCommand, PlayTarget, PlayTicket};
use crate::config::MediaConfig;
use crate::element::{MediaElement, MediaLoadError, PlaybackRejected, VideoState};
use crate::interaction::{InteractionKind, InteractionTracker, Key};
use crate::overlay::{ActivationInput, OverlayControl};
use crate::preference::{MemoryPreferences, PreferenceStore};
use crate::MediaError;

/// Element-local flag marking a registered video
pub const INITIALIZED_ATTR: &str = "data-video-initialized";

/// Class added to containers synthesized for orphan videos
pub const FALLBACK_CONTAINER_CLASS: &str = "media-fallback";

#[derive(Debug)]
struct TrackedVideo {
    element: MediaElement,
    overlay: OverlayControl,
}

/// Per-video view for hosts and tests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSnapshot {
    pub id: NodeId,
    pub state: VideoState,
    pub muted: bool,
    pub paused: bool,
    pub visible: bool,
    pub overlay_visible: bool,
    pub overlay_label: &'static str,
    pub overlay_pressed: bool,
    pub overlay_disabled: bool,
}

/// Background track view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MusicSnapshot {
    pub muted: bool,
    pub paused: bool,
    pub volume: f32,
    pub enabled: bool,
    pub button: MusicButtonState,
}

/// Whole-coordinator view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatorSnapshot {
    pub user_interacted: bool,
    pub active_video: Option<NodeId>,
    pub videos: Vec<VideoSnapshot>,
    pub music: MusicSnapshot,
}

/// Media coordinator
#[derive(Debug)]
pub struct MediaCoordinator<P = MemoryPreferences> {
    config: MediaConfig,
    videos: BTreeMap<NodeId, TrackedVideo>,
    active: Option<NodeId>,
    music: BackgroundMusic<P>,
    interaction: InteractionTracker,
    observer: IntersectionObserver,
    commands: Vec<MediaCommand>,
    next_seq: u64,
}

impl<P: PreferenceStore> MediaCoordinator<P> {
    /// Create a coordinator for one page session
    pub fn new(config: MediaConfig, prefs: P) -> Result<Self, MediaError> {
        let root_margin = config.validate()?;
        let observer = IntersectionObserver::new(IntersectionObserverOptions {
            root_margin,
            threshold: vec![config.visibility_threshold],
        });
        let music = BackgroundMusic::new(
            prefs,
            &config.preference_key,
            config.normal_volume,
            config.ducked_volume,
        );

        Ok(Self {
            config,
            videos: BTreeMap::new(),
            active: None,
            music,
            interaction: InteractionTracker::new(),
            observer,
            commands: Vec::new(),
            next_seq: 1,
        })
    }

    // === Registration ===

    /// Start coordinating a `<video>`. Registering the same element again is
    /// a no-op; anything that is not a video is ignored.
    pub fn register_video(&mut self, dom: &mut DomTree, node: NodeId) {
        if let Err(err) = self.try_register(dom, node) {
            tracing::warn!(%err, video = ?node, "video not registered");
        }
    }

    /// Register every connected `<video>` not yet registered. Hosts call this
    /// on page-ready and again whenever new content is inserted.
    pub fn register_all(&mut self, dom: &mut DomTree) -> usize {
        let mut registered = 0;
        for node in dom.elements_by_tag("video") {
            match self.try_register(dom, node) {
                Ok(true) => registered += 1,
                Ok(false) => {}
                Err(err) => tracing::warn!(%err, video = ?node, "video not registered"),
            }
        }
        if registered > 0 {
            tracing::info!(registered, total = self.videos.len(), "video overlays initialized");
        }
        registered
    }

    fn try_register(&mut self, dom: &mut DomTree, node: NodeId) -> Result<bool, MediaError> {
        match dom.tag(node) {
            Some("video") => {}
            Some(_) => return Err(MediaError::NotAVideo(node)),
            None => return Err(DomError::NodeNotFound(node).into()),
        }
        if self.videos.contains_key(&node) || dom.attr(node, INITIALIZED_ATTR) == Some("true") {
            return Ok(false);
        }

        let element = MediaElement::new(node);
        if let Some(video) = dom.get_mut(node) {
            video.set_attr(INITIALIZED_ATTR, "true");
            video.set_attr("muted", "");
            video.set_attr("loop", "");
            video.set_attr("autoplay", "");
            video.set_attr("playsinline", "");
            video.set_attr("webkit-playsinline", "");
            video.set_attr("preload", element.preload.as_str());
        }

        let (container, fallback) = self.resolve_container(dom, node)?;
        if matches!(dom.get(container).and_then(|c| c.style("position")), None | Some("static")) {
            dom.set_style(container, "position", "relative");
        }
        let overlay = OverlayControl::mount(dom, node, container, fallback);

        self.videos.insert(node, TrackedVideo { element, overlay });
        self.observer.observe(node);
        self.commands.push(MediaCommand::SetMuted { video: node, muted: true });
        self.request_play(node);

        tracing::debug!(video = ?node, ?container, fallback, "video registered");
        Ok(true)
    }

    /// Closest ancestor with the container class, else the parent element,
    /// else a synthesized wrapper.
    fn resolve_container(&self, dom: &mut DomTree, node: NodeId) -> Result<(NodeId, bool), MediaError> {
        let parent = dom.parent(node).filter(|&p| p != dom.root());
        if let Some(parent) = parent {
            let container = dom
                .closest_with_class(parent, &self.config.container_class)
                .unwrap_or(parent);
            return Ok((container, false));
        }

        tracing::warn!(err = %MediaError::MissingContainer(node), "using fallback container");
        let wrapper = dom.create_element("div");
        if let Some(w) = dom.get_mut(wrapper) {
            w.add_class(&self.config.container_class);
            w.add_class(FALLBACK_CONTAINER_CLASS);
        }
        if let Some(old_parent) = dom.parent(node) {
            dom.append_child(old_parent, wrapper)?;
        }
        dom.append_child(wrapper, node)?;
        Ok((wrapper, true))
    }

    // === Sound ===

    /// Give `video` the audio slot, or take it away if it already has it.
    /// Does nothing before the first user interaction.
    pub fn toggle_sound(&mut self, video: NodeId) {
        if !self.interaction.has_interacted() {
            tracing::debug!(err = %MediaError::InteractionNotYetGranted, video = ?video, "toggle ignored");
            return;
        }
        let Some(tracked) = self.videos.get(&video) else {
            tracing::debug!(video = ?video, "toggle for unregistered video");
            return;
        };
        if tracked.element.has_error() {
            return;
        }

        if tracked.element.muted {
            self.activate(video, true);
        } else {
            self.deactivate(video, true);
        }
        self.debug_check();
    }

    /// Mute whatever holds the audio slot and restore the music
    pub fn reset_all_audio(&mut self) {
        let unmuted: Vec<NodeId> = self.unmuted_videos().collect();
        for video in &unmuted {
            self.mute_video(*video, true);
        }
        self.sync_ducking();
        if !unmuted.is_empty() {
            tracing::info!(count = unmuted.len(), "all video audio reset");
        }
        self.debug_check();
    }

    fn activate(&mut self, video: NodeId, emit: bool) {
        let others: Vec<NodeId> = self.unmuted_videos().filter(|&id| id != video).collect();
        for other in others {
            self.mute_video(other, true);
        }

        if let Some(cmd) = self.music.set_ducked(true) {
            self.commands.push(MediaCommand::Music(cmd));
        }

        let Some(tracked) = self.videos.get_mut(&video) else {
            return;
        };
        tracked.element.muted = false;
        tracked.overlay.hide();
        let paused = tracked.element.paused;
        if emit {
            self.commands.push(MediaCommand::SetMuted { video, muted: false });
        }
        self.active = Some(video);
        if paused {
            self.request_play(video);
        }
        tracing::info!(video = ?video, "video sound enabled");
    }

    fn deactivate(&mut self, video: NodeId, emit: bool) {
        self.mute_video(video, emit);
        self.sync_ducking();
        tracing::info!(video = ?video, "video sound disabled");
    }

    /// Mute one video and show its overlay. A muted video off screen has no
    /// reason to keep playing.
    fn mute_video(&mut self, video: NodeId, emit: bool) {
        let Some(tracked) = self.videos.get_mut(&video) else {
            return;
        };
        tracked.element.muted = true;
        tracked.overlay.show();
        let offscreen_playing = !tracked.element.visible && !tracked.element.paused;
        if emit {
            self.commands.push(MediaCommand::SetMuted { video, muted: true });
        }
        if self.active == Some(video) {
            self.active = None;
        }
        if offscreen_playing {
            self.pause_video(video);
        }
    }

    fn sync_ducking(&mut self) {
        let ducked = self.unmuted_videos().next().is_some();
        if let Some(cmd) = self.music.set_ducked(ducked) {
            self.commands.push(MediaCommand::Music(cmd));
        }
    }

    fn unmuted_videos(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.videos
            .iter()
            .filter(|(_, t)| !t.element.muted)
            .map(|(id, _)| *id)
    }

    // === Playback ===

    fn request_play(&mut self, video: NodeId) {
        let seq = self.next_seq();
        let Some(tracked) = self.videos.get_mut(&video) else {
            return;
        };
        tracked.element.begin_play(seq);
        self.commands.push(MediaCommand::Play {
            video,
            ticket: PlayTicket { target: PlayTarget::Video(video), seq },
        });
    }

    fn pause_video(&mut self, video: NodeId) {
        let Some(tracked) = self.videos.get_mut(&video) else {
            return;
        };
        if tracked.element.paused {
            return;
        }
        tracked.element.pause();
        self.commands.push(MediaCommand::Pause { video });
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Continuation for a queued play request
    pub fn on_play_settled(&mut self, ticket: PlayTicket, result: Result<(), PlaybackRejected>) {
        match ticket.target {
            PlayTarget::Video(video) => {
                let Some(tracked) = self.videos.get_mut(&video) else {
                    return;
                };
                if tracked.element.has_error() {
                    return;
                }
                if !tracked.element.settle_play(ticket.seq, result.is_ok()) {
                    tracing::trace!(video = ?video, seq = ticket.seq, "stale play result");
                    return;
                }
                if let Err(rejected) = result {
                    tracing::debug!(%rejected, video = ?video, "video play failed");
                }
            }
            PlayTarget::Music => {
                let cmds = self.music.settle_play(ticket.seq, result);
                self.push_music(cmds);
            }
        }
    }

    // === Viewport ===

    /// Viewport crossing for one video. Hidden videos pause only while muted.
    pub fn on_visibility_change(&mut self, video: NodeId, visible: bool) {
        let Some(tracked) = self.videos.get_mut(&video) else {
            return;
        };
        if tracked.element.has_error() {
            return;
        }
        tracked.element.visible = visible;
        let (muted, paused) = (tracked.element.muted, tracked.element.paused);

        if visible {
            if paused {
                self.request_play(video);
            }
        } else if muted && !paused {
            self.pause_video(video);
        }
        tracing::trace!(video = ?video, visible, "visibility changed");
    }

    /// Run intersection checks and dispatch threshold crossings
    pub fn update_viewport(&mut self, viewport: DOMRect, rects: &HashMap<NodeId, DOMRect>, time: f64) {
        self.observer.check_intersections(viewport, rects, time);
        let threshold = self.config.visibility_threshold;
        for entry in self.observer.take_entries() {
            let visible = if threshold > 0.0 {
                entry.intersection_ratio >= threshold
            } else {
                entry.is_intersecting
            };
            self.on_visibility_change(entry.target, visible);
        }
    }

    // === Media events ===

    /// Loop end without a seamless loop: rewind, and play again only if the
    /// video should be playing. A muted video that ended off screen stays paused.
    pub fn on_playback_ended(&mut self, video: NodeId) {
        let Some(tracked) = self.videos.get_mut(&video) else {
            return;
        };
        if tracked.element.has_error() {
            return;
        }
        tracked.element.current_time = 0.0;
        self.commands.push(MediaCommand::Seek { video, time: 0.0 });

        let e = &tracked.element;
        if e.visible || !e.muted {
            self.request_play(video);
        } else {
            self.pause_video(video);
        }
    }

    /// The media resource failed. The video is done for this session.
    pub fn on_playback_error(&mut self, video: NodeId, error: MediaLoadError) {
        let Some(tracked) = self.videos.get_mut(&video) else {
            return;
        };
        if tracked.element.has_error() {
            return;
        }
        tracing::error!(err = %MediaError::Load(error.clone()), video = ?video, "video loading error");

        let had_sound = !tracked.element.muted;
        tracked.element.fail(error);
        tracked.overlay.disable();
        self.observer.unobserve(video);

        if had_sound {
            tracked.element.muted = true;
            self.commands.push(MediaCommand::SetMuted { video, muted: true });
            if self.active == Some(video) {
                self.active = None;
            }
            self.sync_ducking();
        }
        self.debug_check();
    }

    /// Enough data to render: resume if the video should be playing
    pub fn on_loaded_data(&mut self, video: NodeId) {
        let Some(tracked) = self.videos.get(&video) else {
            return;
        };
        let e = &tracked.element;
        if !e.has_error() && e.paused && (e.visible || !e.muted) {
            self.request_play(video);
        }
    }

    /// Mute state changed outside the coordinator (native controls)
    pub fn on_volume_change(&mut self, video: NodeId, muted: bool) {
        let Some(tracked) = self.videos.get_mut(&video) else {
            return;
        };
        if tracked.element.has_error() || tracked.element.muted == muted {
            tracked.overlay.mirror(tracked.element.muted);
            return;
        }

        if muted {
            self.deactivate(video, false);
        } else {
            self.activate(video, false);
        }
        self.debug_check();
    }

    /// Click on the video surface. With the overlay hidden this is how a
    /// video with sound gets muted.
    pub fn on_video_click(&mut self, video: NodeId) {
        let has_sound = self
            .videos
            .get(&video)
            .map(|t| !t.element.muted && !t.element.has_error())
            .unwrap_or(false);
        if self.interaction.has_interacted() && has_sound {
            self.toggle_sound(video);
        }
    }

    // === Input ===

    /// Click or key press on an overlay button. Returns true if consumed.
    ///
    /// The activation itself is a user gesture, so it also counts as the
    /// first interaction.
    pub fn handle_overlay_activation(&mut self, video: NodeId, input: ActivationInput) -> bool {
        let accepts = self
            .videos
            .get(&video)
            .map(|t| t.overlay.accepts(input))
            .unwrap_or(false);
        if !accepts {
            return false;
        }
        let kind = match input {
            ActivationInput::Click => InteractionKind::Click,
            ActivationInput::Key(_) => InteractionKind::KeyDown,
        };
        self.notify_user_interaction(kind);
        self.toggle_sound(video);
        true
    }

    /// Document-level key press. Escape resets all video audio.
    pub fn handle_key(&mut self, key: Key) -> bool {
        match key {
            Key::Escape => {
                self.reset_all_audio();
                true
            }
            _ => false,
        }
    }

    /// Click, touch or key press anywhere on the page
    pub fn notify_user_interaction(&mut self, kind: InteractionKind) {
        if !self.interaction.record(kind) {
            return;
        }
        if self.music.enabled() && self.music.paused() {
            let seq = self.next_seq();
            let cmds = self.music.start(seq);
            self.push_music(cmds);
        }
    }

    pub fn has_user_interacted(&self) -> bool {
        self.interaction.has_interacted()
    }

    // === Background music ===

    /// The music button: play when disabled or paused, pause otherwise
    pub fn toggle_music(&mut self) {
        if !self.interaction.has_interacted() {
            tracing::debug!(err = %MediaError::InteractionNotYetGranted, "music toggle ignored");
            return;
        }
        let cmds = if self.music.toggle_plays() {
            let seq = self.next_seq();
            self.music.start(seq)
        } else {
            self.music.stop()
        };
        self.push_music(cmds);
    }

    pub fn on_music_error(&mut self, error: MediaLoadError) {
        self.music.fail(error);
    }

    fn push_music(&mut self, cmds: Vec<MusicCommand>) {
        self.commands.extend(cmds.into_iter().map(MediaCommand::Music));
    }

    // === Host plumbing ===

    /// Drain queued commands in the order they must be applied
    pub fn take_commands(&mut self) -> Vec<MediaCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn pending_commands(&self) -> &[MediaCommand] {
        &self.commands
    }

    /// Write every overlay's state onto its DOM nodes
    pub fn sync_dom(&self, dom: &mut DomTree) {
        for tracked in self.videos.values() {
            tracked.overlay.apply(dom);
        }
    }

    /// Page unload: stop observing and pause everything
    pub fn teardown(mut self) -> Vec<MediaCommand> {
        self.observer.disconnect();
        let playing: Vec<NodeId> = self
            .videos
            .iter()
            .filter(|(_, t)| !t.element.paused)
            .map(|(id, _)| *id)
            .collect();
        for video in playing {
            self.pause_video(video);
        }
        if let Some(cmd) = self.music.halt() {
            self.commands.push(MediaCommand::Music(cmd));
        }
        tracing::debug!(videos = self.videos.len(), "media coordinator torn down");
        self.take_commands()
    }

    // === Queries ===

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Video currently holding the audio slot
    pub fn active_video(&self) -> Option<NodeId> {
        self.active
    }

    pub fn video(&self, id: NodeId) -> Option<&MediaElement> {
        self.videos.get(&id).map(|t| &t.element)
    }

    pub fn overlay(&self, id: NodeId) -> Option<&OverlayControl> {
        self.videos.get(&id).map(|t| &t.overlay)
    }

    pub fn video_ids(&self) -> Vec<NodeId> {
        self.videos.keys().copied().collect()
    }

    pub fn video_count(&self) -> usize {
        self.videos.len()
    }

    pub fn unmuted_count(&self) -> usize {
        self.unmuted_videos().count()
    }

    pub fn is_observing(&self, id: NodeId) -> bool {
        self.observer.is_observing(id)
    }

    pub fn music(&self) -> &BackgroundMusic<P> {
        &self.music
    }

    pub fn preferences(&self) -> &P {
        self.music.preferences()
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            user_interacted: self.interaction.has_interacted(),
            active_video: self.active,
            videos: self
                .videos
                .values()
                .map(|t| VideoSnapshot {
                    id: t.element.id(),
                    state: t.element.state(),
                    muted: t.element.muted,
                    paused: t.element.paused,
                    visible: t.element.visible,
                    overlay_visible: t.overlay.is_visible(),
                    overlay_label: t.overlay.label(),
                    overlay_pressed: t.overlay.pressed(),
                    overlay_disabled: t.overlay.is_disabled(),
                })
                .collect(),
            music: MusicSnapshot {
                muted: self.music.muted(),
                paused: self.music.paused(),
                volume: self.music.volume(),
                enabled: self.music.enabled(),
                button: self.music.button_state(),
            },
        }
    }

    fn debug_check(&self) {
        debug_assert!(self.unmuted_count() <= 1, "more than one video has sound");
        debug_assert_eq!(self.active, self.unmuted_videos().next());
    }
}
