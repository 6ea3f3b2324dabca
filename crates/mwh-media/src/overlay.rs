//! Overlay Controls
//!
//! The play-with-sound button layered over each video. It mirrors the
//! video's muted state: shown while muted, hidden while the video has sound.

use mwh_dom::{DomTree, NodeId};
use serde::{Deserialize, Serialize};

use crate::interaction::Key;

pub const LABEL_PLAY_WITH_SOUND: &str = "Play with sound";
pub const LABEL_MUTE: &str = "Mute video";
pub const LABEL_UNAVAILABLE: &str = "Video unavailable";

/// Classes of overlays left behind by earlier page scripts
pub const STALE_OVERLAY_CLASSES: [&str; 3] = ["video-overlay", "video-control", "media-control"];

/// Input that may activate an overlay button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationInput {
    Click,
    Key(Key),
}

/// Overlay control bound to one video
#[derive(Debug, Clone)]
pub struct OverlayControl {
    /// Video this overlay controls (not owned)
    video: NodeId,
    container: NodeId,
    overlay: NodeId,
    button: NodeId,
    fallback_container: bool,
    visible: bool,
    disabled: bool,
}

impl OverlayControl {
    /// Build the overlay nodes inside `container`, replacing stale overlays
    pub fn mount(dom: &mut DomTree, video: NodeId, container: NodeId, fallback_container: bool) -> Self {
        for stale in dom.query_classes(container, &STALE_OVERLAY_CLASSES) {
            dom.detach(stale);
        }

        let overlay = dom.create_element("div");
        let button = dom.create_element("button");
        if let Some(node) = dom.get_mut(overlay) {
            node.add_class("video-overlay");
        }
        if let Some(node) = dom.get_mut(button) {
            node.add_class("video-ctl");
            node.set_attr("type", "button");
            node.set_attr("tabindex", "0");
        }

        // Both nodes are fresh, so neither append can form a cycle
        if let Err(err) = dom.append_child(overlay, button) {
            tracing::warn!(%err, ?video, "overlay button left detached");
        }
        if let Err(err) = dom.append_child(container, overlay) {
            tracing::warn!(%err, ?video, "overlay left detached");
        }

        let control = Self {
            video,
            container,
            overlay,
            button,
            fallback_container,
            visible: true,
            disabled: false,
        };
        control.apply(dom);
        control
    }

    pub fn video(&self) -> NodeId { self.video }
    pub fn container(&self) -> NodeId { self.container }
    pub fn overlay_node(&self) -> NodeId { self.overlay }
    pub fn button_node(&self) -> NodeId { self.button }

    /// Whether the container was synthesized because the video had none
    pub fn uses_fallback_container(&self) -> bool {
        self.fallback_container
    }

    pub fn is_visible(&self) -> bool { self.visible }
    pub fn is_disabled(&self) -> bool { self.disabled }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Mirror the video's muted state
    pub fn mirror(&mut self, muted: bool) {
        self.visible = muted;
    }

    /// Permanently disable after a load error
    pub fn disable(&mut self) {
        self.disabled = true;
        self.visible = true;
    }

    /// Accessible label
    pub fn label(&self) -> &'static str {
        if self.disabled {
            LABEL_UNAVAILABLE
        } else if self.visible {
            LABEL_PLAY_WITH_SOUND
        } else {
            LABEL_MUTE
        }
    }

    /// `aria-pressed`: true while the video has sound
    pub fn pressed(&self) -> bool {
        !self.disabled && !self.visible
    }

    /// Whether `input` should toggle the video's sound
    pub fn accepts(&self, input: ActivationInput) -> bool {
        if self.disabled {
            return false;
        }
        match input {
            ActivationInput::Click => true,
            ActivationInput::Key(key) => key.activates(),
        }
    }

    /// Project the control state onto its DOM nodes
    pub fn apply(&self, dom: &mut DomTree) {
        if let Some(node) = dom.get_mut(self.overlay) {
            node.set_style("opacity", if self.visible { "1" } else { "0" });
            node.set_style("pointer-events", if self.visible { "auto" } else { "none" });
            if self.disabled {
                node.set_style("background", "rgba(128, 128, 128, 0.5)");
            }
        }
        if let Some(node) = dom.get_mut(self.button) {
            node.set_attr("aria-label", self.label());
            node.set_attr("aria-pressed", if self.pressed() { "true" } else { "false" });
            if self.disabled {
                node.set_attr("disabled", "");
            } else {
                node.remove_attr("disabled");
            }
        }
    }
}
