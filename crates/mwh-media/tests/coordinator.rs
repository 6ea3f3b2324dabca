//! Integration tests - coordinator behaviour over a whole page
//!
//! Builds a document with several videos, drives the coordinator through
//! user and host events, and checks the audio-slot and ducking guarantees.

use std::collections::HashMap;

use mwh_dom::{DOMRect, Document, NodeId};
use mwh_media::{
    ActivationInput, InteractionKind, Key, MediaCommand, MediaConfig, MediaCoordinator,
    MediaErrorCode, MediaLoadError, MemoryPreferences, MusicCommand, PlayTarget, PlaybackRejected,
    RejectReason, VideoState,
};

const NORMAL: f32 = 0.25;
const DUCKED: f32 = 0.1;

/// Page with `count` videos, each inside a `.media` card
fn page(count: usize) -> (Document, Vec<NodeId>) {
    let mut doc = Document::new();
    let body = doc.body();
    let section = doc.append_element(body, "section", &["testimonials"]);
    let videos = (0..count)
        .map(|_| {
            let card = doc.append_element(section, "div", &["media", "card"]);
            doc.append_element(card, "video", &["v916"])
        })
        .collect();
    (doc, videos)
}

/// Coordinator with registered videos and background music playing
fn playing_page(count: usize) -> (Document, Vec<NodeId>, MediaCoordinator) {
    let (mut doc, videos) = page(count);
    let prefs = MemoryPreferences::new().with("audioEnabled", "true");
    let mut media = MediaCoordinator::new(MediaConfig::default(), prefs).unwrap();
    media.register_all(&mut doc.tree);
    media.notify_user_interaction(InteractionKind::Click);
    settle_all(&mut media, |_| Ok(()));
    (doc, videos, media)
}

/// Drain commands and answer every play request
fn settle_all(
    media: &mut MediaCoordinator,
    outcome: impl Fn(PlayTarget) -> Result<(), PlaybackRejected>,
) -> Vec<MediaCommand> {
    let cmds = media.take_commands();
    for cmd in &cmds {
        let ticket = match cmd {
            MediaCommand::Play { ticket, .. } => *ticket,
            MediaCommand::Music(MusicCommand::Play { ticket }) => *ticket,
            _ => continue,
        };
        media.on_play_settled(ticket, outcome(ticket.target));
    }
    cmds
}

fn assert_invariants(media: &MediaCoordinator) {
    let snapshot = media.snapshot();
    let unmuted: Vec<_> = snapshot.videos.iter().filter(|v| !v.muted).collect();
    assert!(unmuted.len() <= 1, "two videos with sound: {unmuted:?}");
    assert_eq!(snapshot.active_video, unmuted.first().map(|v| v.id));
    for video in &snapshot.videos {
        assert_eq!(video.overlay_visible, video.muted || video.overlay_disabled);
    }
    let expected = if unmuted.is_empty() { NORMAL } else { DUCKED };
    assert_eq!(snapshot.music.volume, expected);
}

// ============================================================================
// EXCLUSIVITY AND DUCKING
// ============================================================================

#[test]
fn test_exclusivity_over_toggle_sequence() {
    let (_doc, videos, mut media) = playing_page(5);

    // Deterministic pseudo-random walk over the videos
    let mut seed: u32 = 0x2545_f491;
    for _ in 0..200 {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let target = videos[(seed >> 16) as usize % videos.len()];
        media.toggle_sound(target);
        assert_invariants(&media);

        if seed % 7 == 0 {
            media.reset_all_audio();
            assert_invariants(&media);
        }
        settle_all(&mut media, |_| Ok(()));
    }
}

#[test]
fn test_mutes_before_unmute_in_command_order() {
    let (_doc, videos, mut media) = playing_page(2);
    media.toggle_sound(videos[0]);
    media.take_commands();

    media.toggle_sound(videos[1]);
    let cmds = media.take_commands();
    let mute_a = cmds
        .iter()
        .position(|c| *c == MediaCommand::SetMuted { video: videos[0], muted: true })
        .unwrap();
    let unmute_b = cmds
        .iter()
        .position(|c| *c == MediaCommand::SetMuted { video: videos[1], muted: false })
        .unwrap();
    assert!(mute_a < unmute_b);
}

#[test]
fn test_duck_precedes_unmute_and_restore_follows_mute() {
    let (_doc, videos, mut media) = playing_page(1);

    media.toggle_sound(videos[0]);
    let cmds = media.take_commands();
    assert_eq!(
        &cmds[..2],
        &[
            MediaCommand::Music(MusicCommand::SetVolume(DUCKED)),
            MediaCommand::SetMuted { video: videos[0], muted: false },
        ]
    );

    media.toggle_sound(videos[0]);
    let cmds = media.take_commands();
    assert_eq!(
        cmds,
        vec![
            MediaCommand::SetMuted { video: videos[0], muted: true },
            MediaCommand::Music(MusicCommand::SetVolume(NORMAL)),
        ]
    );
}

#[test]
fn test_end_to_end_three_videos() {
    let (mut doc, videos) = page(3);
    let (a, b, c) = (videos[0], videos[1], videos[2]);
    let prefs = MemoryPreferences::new().with("audioEnabled", "true");
    let mut media = MediaCoordinator::new(MediaConfig::default(), prefs).unwrap();
    media.register_all(&mut doc.tree);

    for id in [a, b, c] {
        assert!(media.video(id).unwrap().muted);
        assert!(media.overlay(id).unwrap().is_visible());
    }

    media.notify_user_interaction(InteractionKind::Click);
    settle_all(&mut media, |_| Ok(()));
    assert!(!media.music().muted());
    assert_eq!(media.music().volume(), NORMAL);

    media.toggle_sound(a);
    assert!(!media.video(a).unwrap().muted);
    assert!(!media.overlay(a).unwrap().is_visible());
    assert_eq!(media.music().volume(), DUCKED);

    media.toggle_sound(b);
    assert!(media.video(a).unwrap().muted);
    assert!(media.overlay(a).unwrap().is_visible());
    assert!(!media.video(b).unwrap().muted);
    assert!(!media.overlay(b).unwrap().is_visible());
    assert_eq!(media.music().volume(), DUCKED);

    media.toggle_sound(b);
    assert!(media.video(b).unwrap().muted);
    assert_eq!(media.active_video(), None);
    assert_eq!(media.music().volume(), NORMAL);
    assert!(media.video(c).unwrap().muted);
}

// ============================================================================
// REGISTRATION
// ============================================================================

#[test]
fn test_registration_is_idempotent() {
    let (mut doc, videos) = page(2);
    let mut media = MediaCoordinator::new(MediaConfig::default(), MemoryPreferences::new()).unwrap();

    assert_eq!(media.register_all(&mut doc.tree), 2);
    let nodes_after_first = doc.tree.len();
    let first = media.snapshot();
    media.take_commands();

    assert_eq!(media.register_all(&mut doc.tree), 0);
    media.register_video(&mut doc.tree, videos[0]);

    assert_eq!(doc.tree.len(), nodes_after_first);
    assert_eq!(media.snapshot(), first);
    assert!(media.take_commands().is_empty());
    for &video in &videos {
        let container = media.overlay(video).unwrap().container();
        let overlays = doc.tree.query_classes(container, &["video-overlay"]);
        assert_eq!(overlays.len(), 1);
    }
}

#[test]
fn test_late_videos_registered_on_rescan() {
    let (mut doc, _) = page(1);
    let mut media = MediaCoordinator::new(MediaConfig::default(), MemoryPreferences::new()).unwrap();
    media.register_all(&mut doc.tree);

    let body = doc.body();
    let card = doc.append_element(body, "div", &["media"]);
    let late = doc.append_element(card, "video", &[]);

    assert_eq!(media.register_all(&mut doc.tree), 1);
    assert_eq!(media.video_count(), 2);
    assert!(media.is_observing(late));
}

// ============================================================================
// VISIBILITY
// ============================================================================

#[test]
fn test_hidden_muted_pauses_hidden_unmuted_keeps_playing() {
    let (_doc, videos, mut media) = playing_page(2);
    let (quiet, loud) = (videos[0], videos[1]);
    media.toggle_sound(loud);
    settle_all(&mut media, |_| Ok(()));

    media.on_visibility_change(quiet, false);
    media.on_visibility_change(loud, false);

    assert_eq!(media.video(quiet).unwrap().state(), VideoState::MutedHiddenPaused);
    assert_eq!(media.video(loud).unwrap().state(), VideoState::UnmutedPlaying);
    assert_eq!(media.take_commands(), vec![MediaCommand::Pause { video: quiet }]);

    // Muting the off-screen video pauses it
    media.toggle_sound(loud);
    assert_eq!(media.video(loud).unwrap().state(), VideoState::MutedHiddenPaused);
}

#[test]
fn test_viewport_scroll_drives_playback() {
    let (_doc, videos, mut media) = playing_page(2);
    let (top, bottom) = (videos[0], videos[1]);
    let viewport = DOMRect::new(0.0, 0.0, 1280.0, 720.0);
    let layout = |scroll: f32| {
        HashMap::from([
            (top, DOMRect::new(0.0, 100.0 - scroll, 400.0, 300.0)),
            (bottom, DOMRect::new(0.0, 1500.0 - scroll, 400.0, 300.0)),
        ])
    };

    media.update_viewport(viewport, &layout(0.0), 0.0);
    assert!(media.video(top).unwrap().is_playing());
    assert!(!media.video(bottom).unwrap().is_playing());
    settle_all(&mut media, |_| Ok(()));

    // Scroll so the first card is gone and the second is fully in view
    media.update_viewport(viewport, &layout(1200.0), 1.0);
    assert!(!media.video(top).unwrap().is_playing());
    assert!(media.video(bottom).unwrap().is_playing());
}

#[test]
fn test_zero_threshold_pauses_when_scrolled_away() {
    let (mut doc, videos) = page(1);
    let config = MediaConfig { visibility_threshold: 0.0, ..MediaConfig::default() };
    let mut media = MediaCoordinator::new(config, MemoryPreferences::new()).unwrap();
    media.register_all(&mut doc.tree);
    settle_all(&mut media, |_| Ok(()));
    let viewport = DOMRect::new(0.0, 0.0, 1280.0, 720.0);

    let rects = HashMap::from([(videos[0], DOMRect::new(0.0, 100.0, 400.0, 300.0))]);
    media.update_viewport(viewport, &rects, 0.0);
    assert!(media.video(videos[0]).unwrap().is_playing());

    let rects = HashMap::from([(videos[0], DOMRect::new(0.0, 5000.0, 400.0, 300.0))]);
    media.update_viewport(viewport, &rects, 1.0);
    let video = media.video(videos[0]).unwrap();
    assert!(!video.visible);
    assert!(!video.is_playing());

    let rects = HashMap::from([(videos[0], DOMRect::new(0.0, 100.0, 400.0, 300.0))]);
    media.update_viewport(viewport, &rects, 2.0);
    assert!(media.video(videos[0]).unwrap().is_playing());
}

#[test]
fn test_root_margin_starts_playback_early() {
    let (_doc, videos, mut media) = playing_page(1);
    let viewport = DOMRect::new(0.0, 0.0, 1280.0, 720.0);

    // Well below the fold
    let rects = HashMap::from([(videos[0], DOMRect::new(0.0, 900.0, 400.0, 30.0))]);
    media.update_viewport(viewport, &rects, 0.0);
    assert!(!media.video(videos[0]).unwrap().visible);
    assert!(!media.video(videos[0]).unwrap().is_playing());

    // Just below the fold but within the 50px margin
    let rects = HashMap::from([(videos[0], DOMRect::new(0.0, 730.0, 400.0, 30.0))]);
    media.update_viewport(viewport, &rects, 1.0);
    assert!(media.video(videos[0]).unwrap().visible);
    assert!(media.video(videos[0]).unwrap().is_playing());
}

// ============================================================================
// GUARDS AND ERRORS
// ============================================================================

#[test]
fn test_toggle_before_interaction_changes_nothing() {
    let (mut doc, videos) = page(2);
    let mut media = MediaCoordinator::new(MediaConfig::default(), MemoryPreferences::new()).unwrap();
    media.register_all(&mut doc.tree);
    media.take_commands();
    let before = media.snapshot();

    media.toggle_sound(videos[0]);
    media.toggle_music();

    assert_eq!(media.snapshot(), before);
    assert!(media.take_commands().is_empty());
}

#[test]
fn test_error_isolated_to_one_video() {
    let (mut doc, videos, mut media) = playing_page(2);
    let (broken, fine) = (videos[0], videos[1]);

    media.on_playback_error(broken, MediaLoadError::new(MediaErrorCode::SrcNotSupported, "no source"));
    media.sync_dom(&mut doc.tree);

    let broken_overlay = media.overlay(broken).unwrap();
    assert!(broken_overlay.is_disabled());
    let button = doc.tree.get(broken_overlay.button_node()).unwrap();
    assert_eq!(button.attr("aria-label"), Some("Video unavailable"));
    assert!(!media.handle_overlay_activation(broken, ActivationInput::Click));

    let fine_overlay = media.overlay(fine).unwrap();
    assert!(!fine_overlay.is_disabled());
    assert_eq!(media.video(fine).unwrap().state(), VideoState::MutedVisiblePlaying);
    assert!(media.handle_overlay_activation(fine, ActivationInput::Key(Key::Enter)));
    assert_eq!(media.active_video(), Some(fine));
}

#[test]
fn test_rejected_play_is_absorbed() {
    let (_doc, videos, mut media) = playing_page(1);
    media.on_visibility_change(videos[0], false);
    media.take_commands();

    media.on_visibility_change(videos[0], true);
    settle_all(&mut media, |_| Err(PlaybackRejected::new(RejectReason::NotAllowed)));
    assert_eq!(media.video(videos[0]).unwrap().state(), VideoState::MutedVisiblePaused);
    assert_invariants(&media);
}

// ============================================================================
// KEYBOARD AND DOM PROJECTION
// ============================================================================

#[test]
fn test_escape_resets_audio() {
    let (mut doc, videos, mut media) = playing_page(2);
    assert!(media.handle_overlay_activation(videos[1], ActivationInput::Key(Key::Space)));
    assert_eq!(media.music().volume(), DUCKED);

    assert!(!media.handle_key(Key::parse("a")));
    assert!(media.handle_key(Key::parse("Escape")));
    assert_eq!(media.active_video(), None);
    assert_eq!(media.music().volume(), NORMAL);

    media.sync_dom(&mut doc.tree);
    let button = doc.tree.get(media.overlay(videos[1]).unwrap().button_node()).unwrap();
    assert_eq!(button.attr("aria-label"), Some("Play with sound"));
    assert_eq!(button.attr("aria-pressed"), Some("false"));
}

#[test]
fn test_overlay_activation_counts_as_interaction() {
    let (mut doc, videos) = page(1);
    let mut media = MediaCoordinator::new(MediaConfig::default(), MemoryPreferences::new()).unwrap();
    media.register_all(&mut doc.tree);

    assert!(media.handle_overlay_activation(videos[0], ActivationInput::Click));
    assert!(media.has_user_interacted());
    assert_eq!(media.active_video(), Some(videos[0]));

    media.sync_dom(&mut doc.tree);
    let overlay = media.overlay(videos[0]).unwrap();
    let button = doc.tree.get(overlay.button_node()).unwrap();
    assert_eq!(button.attr("aria-label"), Some("Mute video"));
    assert_eq!(button.attr("aria-pressed"), Some("true"));
    assert_eq!(doc.tree.get(overlay.overlay_node()).unwrap().style("pointer-events"), Some("none"));
}
