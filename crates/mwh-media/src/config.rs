//! Media Configuration

use mwh_dom::RootMargin;
use serde::{Deserialize, Serialize};

use crate::MediaError;

/// Coordinator configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Background music volume while no video has sound
    pub normal_volume: f32,

    /// Background music volume while a video has sound
    pub ducked_volume: f32,

    /// Visible fraction at which a video counts as on screen
    pub visibility_threshold: f32,

    /// Margin around the viewport, CSS shorthand
    pub root_margin: String,

    /// Class marking a video's overlay container
    pub container_class: String,

    /// Preference key for the background-music setting
    pub preference_key: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            normal_volume: 0.25,
            ducked_volume: 0.1,
            visibility_threshold: 0.3,
            root_margin: "50px 0px 50px 0px".to_string(),
            container_class: "media".to_string(),
            preference_key: "audioEnabled".to_string(),
        }
    }
}

impl MediaConfig {
    /// Check ranges and parse the margin
    pub fn validate(&self) -> Result<RootMargin, MediaError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.normal_volume) {
            return Err(MediaError::InvalidConfig(format!(
                "normal_volume {} outside [0, 1]",
                self.normal_volume
            )));
        }
        if !unit.contains(&self.ducked_volume) {
            return Err(MediaError::InvalidConfig(format!(
                "ducked_volume {} outside [0, 1]",
                self.ducked_volume
            )));
        }
        if self.ducked_volume > self.normal_volume {
            return Err(MediaError::InvalidConfig(format!(
                "ducked_volume {} louder than normal_volume {}",
                self.ducked_volume, self.normal_volume
            )));
        }
        if !unit.contains(&self.visibility_threshold) {
            return Err(MediaError::InvalidConfig(format!(
                "visibility_threshold {} outside [0, 1]",
                self.visibility_threshold
            )));
        }
        if self.container_class.trim().is_empty() {
            return Err(MediaError::InvalidConfig("container_class is empty".into()));
        }
        Ok(self.root_margin.parse::<RootMargin>()?)
    }
}
