use std::path::PathBuf;

use crate::motion::EffectSpec;

/// One narrated still: an image shown for exactly as long as its audio plays
#[derive(Debug, Clone)]
pub struct Scene {
    /// Ordering key; scenes play in ascending position
    pub position: u32,

    /// Name/identifier for the scene
    pub name: String,

    pub image: PathBuf,

    pub audio: PathBuf,

    /// Narration text, split into caption chunks at playback
    pub script: String,

    /// Camera motion; `None` plays the default gentle zoom-in
    pub effect: Option<EffectSpec>,
}

impl Scene {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(position: u32, image: P, audio: Q, script: impl Into<String>) -> Self {
        Self {
            position,
            name: format!("scene_{:02}", position),
            image: image.into(),
            audio: audio.into(),
            script: script.into(),
            effect: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_effect(mut self, effect: EffectSpec) -> Self {
        self.effect = Some(effect);
        self
    }

    /// Parse position and name from a file stem like "01_intro"
    pub fn parse_stem(stem: &str) -> Option<(u32, String)> {
        let (number, name) = stem.split_once('_')?;
        let position = number.parse().ok()?;
        Some((position, name.to_string()))
    }
}

/// Ordered scenes of one export
#[derive(Debug, Clone, Default)]
pub struct SceneList {
    title: String,
    scenes: Vec<Scene>,
}

impl SceneList {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            scenes: Vec::new(),
        }
    }

    /// Add a scene, keeping the list sorted by position. Scenes with equal
    /// positions keep their insertion order.
    pub fn add_scene(&mut self, scene: Scene) {
        let index = self.scenes.partition_point(|s| s.position <= scene.position);
        self.scenes.insert(index, scene);
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Get all scenes in playback order
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Get a scene by its position
    pub fn get(&self, position: u32) -> Option<&Scene> {
        self.scenes.iter().find(|scene| scene.position == position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter()
    }
}

impl FromIterator<Scene> for SceneList {
    fn from_iter<I: IntoIterator<Item = Scene>>(iter: I) -> Self {
        let mut list = Self::default();
        for scene in iter {
            list.add_scene(scene);
        }
        list
    }
}

impl<'a> IntoIterator for &'a SceneList {
    type Item = &'a Scene;
    type IntoIter = std::slice::Iter<'a, Scene>;

    fn into_iter(self) -> Self::IntoIter {
        self.scenes.iter()
    }
}
