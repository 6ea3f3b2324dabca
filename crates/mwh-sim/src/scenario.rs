//! Scenario files
//!
//! A scenario describes a page (videos and their layout), the host's
//! autoplay behaviour and a list of user/host events to replay.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use mwh_dom::DOMRect;
use mwh_media::{InteractionKind, MediaConfig, MediaErrorCode};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: MediaConfig,
    /// Stored preferences (`localStorage`)
    #[serde(default)]
    pub preferences: HashMap<String, String>,
    #[serde(default = "default_viewport")]
    pub viewport: DOMRect,
    #[serde(default)]
    pub host: HostPolicy,
    pub videos: Vec<VideoSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_viewport() -> DOMRect {
    DOMRect::new(0.0, 0.0, 1280.0, 720.0)
}

/// How the simulated browser answers play requests
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostPolicy {
    /// Reject unmuted playback before the first user gesture
    pub enforce_autoplay_policy: bool,
    /// Reject every play request
    pub reject_all: bool,
    /// Fail loading the background track
    pub music_unavailable: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoSpec {
    pub name: String,
    /// Page offset of the video's top edge
    pub top: f32,
    #[serde(default = "default_height")]
    pub height: f32,
    /// Wrap the video in a `.media` card; bare videos get a fallback container
    #[serde(default = "default_true")]
    pub container: bool,
}

fn default_height() -> f32 {
    360.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Interact { kind: InteractionKind },
    Toggle { video: String },
    Overlay { video: String, key: Option<String> },
    ClickVideo { video: String },
    Key { key: String },
    Scroll { y: f32 },
    Ended { video: String },
    LoadError { video: String, code: MediaErrorCode },
    NativeMute { video: String, muted: bool },
    ToggleMusic,
    AddVideo { video: VideoSpec },
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(text).context("invalid scenario JSON")?;
        scenario.check()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("loading scenario {}", path.display()))
    }

    /// Every referenced video must be declared
    fn check(&self) -> Result<()> {
        let mut names: Vec<&str> = self.videos.iter().map(|v| v.name.as_str()).collect();
        for step in &self.steps {
            if let Step::AddVideo { video } = step {
                names.push(&video.name);
            }
        }
        for (index, step) in self.steps.iter().enumerate() {
            if let Some(name) = step.video() {
                if !names.contains(&name) {
                    bail!("step {index} references unknown video {name:?}");
                }
            }
        }
        Ok(())
    }
}

impl Step {
    pub fn video(&self) -> Option<&str> {
        match self {
            Step::Toggle { video }
            | Step::Overlay { video, .. }
            | Step::ClickVideo { video }
            | Step::Ended { video }
            | Step::LoadError { video, .. }
            | Step::NativeMute { video, .. } => Some(video),
            _ => None,
        }
    }
}
