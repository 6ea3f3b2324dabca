//! Scenario runner
//!
//! Wires a document, a coordinator and the simulated host together and
//! replays scenario steps, pumping commands until the page settles.

use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, bail, Context, Result};
use mwh_dom::{DOMRect, Document, NodeId};
use mwh_media::{
    ActivationInput, CoordinatorSnapshot, InteractionKind, Key, MediaCoordinator, MediaErrorCode,
    MediaLoadError, MemoryPreferences,
};
use serde::Serialize;

use crate::host::SimHost;
use crate::scenario::{Scenario, Step, VideoSpec};

/// Upper bound on command/settle rounds per step
const MAX_PUMP_ROUNDS: usize = 16;

/// State after one step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub action: String,
    pub snapshot: CoordinatorSnapshot,
    /// Videos the host is playing with sound
    pub audible: Vec<String>,
    /// Videos the host is playing at all
    pub playing: Vec<String>,
    pub music_audible: bool,
    pub music_volume: f32,
}

pub struct Simulation {
    doc: Document,
    media: MediaCoordinator<MemoryPreferences>,
    host: SimHost,
    names: BTreeMap<String, NodeId>,
    layout: HashMap<NodeId, DOMRect>,
    viewport: DOMRect,
    scroll: f32,
    time: f64,
}

impl Simulation {
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let prefs = scenario
            .preferences
            .iter()
            .fold(MemoryPreferences::new(), |p, (k, v)| p.with(k, v));
        let media = MediaCoordinator::new(scenario.config.clone(), prefs)
            .context("creating media coordinator")?;
        let host = SimHost::new(scenario.host.clone(), media.music().volume());

        let mut sim = Self {
            doc: Document::new(),
            media,
            host,
            names: BTreeMap::new(),
            layout: HashMap::new(),
            viewport: scenario.viewport,
            scroll: 0.0,
            time: 0.0,
        };

        for spec in &scenario.videos {
            sim.add_video(spec)?;
        }
        let registered = sim.media.register_all(&mut sim.doc.tree);
        tracing::info!(registered, "page ready");

        if scenario.host.music_unavailable {
            sim.media.on_music_error(MediaLoadError::new(
                MediaErrorCode::Network,
                "background track failed to load",
            ));
        }
        sim.pump()?;
        sim.refresh_viewport()?;
        Ok(sim)
    }

    fn add_video(&mut self, spec: &VideoSpec) -> Result<NodeId> {
        if self.names.contains_key(&spec.name) {
            bail!("duplicate video name {:?}", spec.name);
        }
        let body = self.doc.body();
        let video = if spec.container {
            let card = self.doc.append_element(body, "div", &["media"]);
            self.doc.append_element(card, "video", &[])
        } else {
            self.doc.append_element(body, "video", &[])
        };
        let width = self.viewport.width.min(640.0);
        self.layout.insert(video, DOMRect::new(0.0, spec.top, width, spec.height));
        self.names.insert(spec.name.clone(), video);
        Ok(video)
    }

    fn video(&self, name: &str) -> Result<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("unknown video {name:?}"))
    }

    fn name_of(&self, id: NodeId) -> String {
        self.names
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| format!("{id:?}"))
    }

    /// A user gesture reaches both the browser and the coordinator
    fn gesture(&mut self, kind: InteractionKind) {
        self.host.activate();
        self.media.notify_user_interaction(kind);
    }

    pub fn apply(&mut self, step: &Step) -> Result<()> {
        match step {
            Step::Interact { kind } => self.gesture(*kind),
            Step::Toggle { video } => {
                let id = self.video(video)?;
                self.media.toggle_sound(id);
            }
            Step::Overlay { video, key } => {
                let id = self.video(video)?;
                let input = match key {
                    Some(k) => ActivationInput::Key(Key::parse(k)),
                    None => ActivationInput::Click,
                };
                self.host.activate();
                if !self.media.handle_overlay_activation(id, input) {
                    tracing::info!(video = %video, "overlay ignored activation");
                }
            }
            Step::ClickVideo { video } => {
                let id = self.video(video)?;
                self.gesture(InteractionKind::Click);
                self.media.on_video_click(id);
            }
            Step::Key { key } => {
                self.gesture(InteractionKind::KeyDown);
                self.media.handle_key(Key::parse(key));
            }
            Step::Scroll { y } => {
                self.scroll = *y;
            }
            Step::Ended { video } => {
                let id = self.video(video)?;
                self.media.on_playback_ended(id);
            }
            Step::LoadError { video, code } => {
                let id = self.video(video)?;
                self.media
                    .on_playback_error(id, MediaLoadError::new(*code, "simulated load failure"));
            }
            Step::NativeMute { video, muted } => {
                let id = self.video(video)?;
                self.host.set_video_muted(id, *muted);
                self.media.on_volume_change(id, *muted);
            }
            Step::ToggleMusic => {
                self.gesture(InteractionKind::Click);
                self.media.toggle_music();
            }
            Step::AddVideo { video } => {
                self.add_video(video)?;
                self.media.register_all(&mut self.doc.tree);
            }
        }
        self.pump()?;
        self.refresh_viewport()
    }

    fn refresh_viewport(&mut self) -> Result<()> {
        self.time += 1.0;
        let rects: HashMap<NodeId, DOMRect> = self
            .layout
            .iter()
            .map(|(id, rect)| (*id, rect.offset(0.0, -self.scroll)))
            .collect();
        self.media.update_viewport(self.viewport, &rects, self.time);
        self.pump()
    }

    /// Feed commands to the host and play outcomes back until quiet
    fn pump(&mut self) -> Result<()> {
        for _ in 0..MAX_PUMP_ROUNDS {
            let commands = self.media.take_commands();
            if commands.is_empty() {
                self.media.sync_dom(&mut self.doc.tree);
                return Ok(());
            }
            for (ticket, result) in self.host.apply(&commands) {
                self.media.on_play_settled(ticket, result);
            }
        }
        bail!("media commands did not settle after {MAX_PUMP_ROUNDS} rounds")
    }

    pub fn report(&self, step: usize, action: String) -> StepReport {
        let names = |ids: Vec<NodeId>| ids.into_iter().map(|id| self.name_of(id)).collect();
        let playing = self
            .names
            .iter()
            .filter(|(_, id)| self.host.is_playing(**id))
            .map(|(n, _)| n.clone())
            .collect();
        StepReport {
            step,
            action,
            snapshot: self.media.snapshot(),
            audible: names(self.host.audible_videos()),
            playing,
            music_audible: self.host.music_audible(),
            music_volume: self.host.music_volume(),
        }
    }

    pub fn media(&self) -> &MediaCoordinator<MemoryPreferences> {
        &self.media
    }

    /// Page unload
    pub fn finish(self) -> usize {
        let Self { media, mut host, .. } = self;
        let commands = media.teardown();
        host.apply(&commands);
        host.commands_applied()
    }
}

/// Replay a whole scenario
pub fn run(scenario: &Scenario) -> Result<Vec<StepReport>> {
    let mut sim = Simulation::new(scenario)?;
    let mut reports = vec![sim.report(0, "page ready".into())];

    for (index, step) in scenario.steps.iter().enumerate() {
        sim.apply(step)
            .with_context(|| format!("step {} ({step:?})", index + 1))?;
        reports.push(sim.report(index + 1, format!("{step:?}")));
    }

    let active = sim.media().active_video();
    let applied = sim.finish();
    tracing::info!(steps = scenario.steps.len(), applied, ?active, "scenario complete");
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_VIDEOS: &str = include_str!("../scenarios/three_videos.json");

    fn last(reports: &[StepReport]) -> &StepReport {
        reports.last().unwrap()
    }

    #[test]
    fn test_three_video_scenario() {
        let scenario = Scenario::from_json(THREE_VIDEOS).unwrap();
        let reports = run(&scenario).unwrap();

        for report in &reports {
            assert!(report.audible.len() <= 1, "step {}: {:?}", report.step, report.audible);
        }

        // After the first toggle, only "a" is heard and the music is ducked
        let after_a = &reports[2];
        assert_eq!(after_a.audible, vec!["a".to_string()]);
        assert_eq!(after_a.music_volume, 0.1);

        let after_b = &reports[3];
        assert_eq!(after_b.audible, vec!["b".to_string()]);
        assert_eq!(after_b.music_volume, 0.1);

        let end = last(&reports);
        assert!(end.audible.is_empty());
        assert_eq!(end.music_volume, 0.25);
        assert!(end.music_audible);
    }

    #[test]
    fn test_autoplay_policy_blocks_music_until_gesture() {
        let scenario = Scenario::from_json(
            r#"{
                "preferences": {"audioEnabled": "true"},
                "host": {"enforce_autoplay_policy": true},
                "videos": [{"name": "hero", "top": 0}],
                "steps": [{"action": "interact", "kind": "touchstart"}]
            }"#,
        )
        .unwrap();
        let reports = run(&scenario).unwrap();

        assert!(!reports[0].music_audible);
        assert_eq!(reports[0].playing, vec!["hero".to_string()]);
        assert!(reports[1].music_audible);
        assert!(reports[1].snapshot.music.enabled);
    }

    #[test]
    fn test_scrolling_pauses_muted_but_not_audible() {
        let scenario = Scenario::from_json(
            r#"{
                "videos": [
                    {"name": "top", "top": 100},
                    {"name": "loud", "top": 200}
                ],
                "steps": [
                    {"action": "overlay", "video": "loud"},
                    {"action": "scroll", "y": 2000}
                ]
            }"#,
        )
        .unwrap();
        let reports = run(&scenario).unwrap();
        let end = last(&reports);
        assert_eq!(end.playing, vec!["loud".to_string()]);
        assert_eq!(end.audible, vec!["loud".to_string()]);
    }

    #[test]
    fn test_orphan_video_and_load_error() {
        let scenario = Scenario::from_json(
            r#"{
                "videos": [
                    {"name": "bare", "top": 0, "container": false},
                    {"name": "card", "top": 400}
                ],
                "steps": [
                    {"action": "load_error", "video": "bare", "code": "SrcNotSupported"},
                    {"action": "overlay", "video": "bare", "key": "Enter"},
                    {"action": "overlay", "video": "card", "key": " "}
                ]
            }"#,
        )
        .unwrap();
        let reports = run(&scenario).unwrap();
        let end = last(&reports);
        let bare = &end.snapshot.videos[0];
        assert!(bare.overlay_disabled);
        assert_eq!(bare.overlay_label, "Video unavailable");
        assert_eq!(end.audible, vec!["card".to_string()]);
    }

    #[test]
    fn test_late_video_registered() {
        let scenario = Scenario::from_json(
            r#"{
                "videos": [{"name": "first", "top": 0}],
                "steps": [
                    {"action": "add_video", "video": {"name": "second", "top": 300}},
                    {"action": "overlay", "video": "second"}
                ]
            }"#,
        )
        .unwrap();
        let mut sim = Simulation::new(&scenario).unwrap();
        for step in &scenario.steps {
            sim.apply(step).unwrap();
        }
        assert_eq!(sim.media().video_count(), 2);
        let second = sim.video("second").unwrap();
        assert_eq!(sim.media().active_video(), Some(second));
        assert!(sim.finish() > 0);
    }
}
