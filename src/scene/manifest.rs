use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::audio::AudioLoader;
use crate::error::ManifestError;
use crate::motion::EffectSpec;
use crate::scene::types::{Scene, SceneList};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp"];

#[derive(Debug, Deserialize)]
struct ManifestFile {
    title: Option<String>,
    #[serde(default)]
    scenes: Vec<ManifestScene>,
}

#[derive(Debug, Deserialize)]
struct ManifestScene {
    position: Option<u32>,
    name: Option<String>,
    image: Option<PathBuf>,
    audio: Option<PathBuf>,
    #[serde(default, alias = "text", alias = "dialogue")]
    script: String,
    effect: Option<EffectSpec>,
}

/// Load scenes from a manifest file or a directory of numbered assets
pub fn load_scenes<P: AsRef<Path>>(path: P) -> Result<SceneList, ManifestError> {
    let path = path.as_ref();
    if path.is_dir() {
        discover_scenes(path)
    } else {
        load_manifest(path)
    }
}

/// Parse a TOML or JSON manifest. Relative asset paths resolve against the
/// manifest's directory.
pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<SceneList, ManifestError> {
    let path = path.as_ref();
    let shown = path.display().to_string();

    if !path.is_file() {
        return Err(ManifestError::NotFound { path: shown });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ManifestError::ParseFailed {
        path: shown.clone(),
        reason: e.to_string(),
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    let manifest: ManifestFile = match extension.as_str() {
        "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
        "toml" => toml::from_str(&content).map_err(|e| e.to_string()),
        other => Err(format!("unsupported manifest extension '{}'", other)),
    }
    .map_err(|reason| ManifestError::ParseFailed {
        path: shown.clone(),
        reason,
    })?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let title = manifest
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| stem_or(path, "video"));

    build_list(title, manifest.scenes, base, &shown)
}

fn build_list(title: String, entries: Vec<ManifestScene>, base: &Path, source: &str) -> Result<SceneList, ManifestError> {
    if entries.is_empty() {
        return Err(ManifestError::NoScenes {
            path: source.to_string(),
        });
    }

    let mut list = SceneList::new(title);
    for (i, entry) in entries.into_iter().enumerate() {
        let position = entry.position.unwrap_or(i as u32 + 1);

        if list.get(position).is_some() {
            return Err(ManifestError::DuplicatePosition { position });
        }

        let image = entry.image.ok_or(ManifestError::MissingAsset {
            position,
            asset: "image",
        })?;
        let audio = entry.audio.ok_or(ManifestError::MissingAsset {
            position,
            asset: "audio",
        })?;

        let mut scene = Scene::new(position, base.join(image), base.join(audio), entry.script);
        if let Some(name) = entry.name {
            scene = scene.with_name(name);
        }

        if let Some(effect) = entry.effect {
            if effect.target_scale < 1.0 {
                warn!(
                    "Scene {}: target scale {} is below 1.0 and will be treated as 1.0",
                    position, effect.target_scale
                );
            }
            scene = scene.with_effect(effect);
        }

        list.add_scene(scene);
    }

    info!("Loaded {} scenes for \"{}\"", list.len(), list.title());
    Ok(list)
}

#[derive(Default)]
struct DiscoveredScene {
    name: String,
    image: Option<PathBuf>,
    audio: Option<PathBuf>,
    script: Option<PathBuf>,
}

/// Group `NN_name.<ext>` files into scenes: one image, one audio clip and an
/// optional `.txt` script per number.
pub fn discover_scenes<P: AsRef<Path>>(directory: P) -> Result<SceneList, ManifestError> {
    let directory = directory.as_ref();
    let shown = directory.display().to_string();

    let entries = std::fs::read_dir(directory).map_err(|_| ManifestError::NotFound {
        path: shown.clone(),
    })?;

    let mut found: BTreeMap<u32, DiscoveredScene> = BTreeMap::new();
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", shown, e);
                continue;
            }
        };

        if !path.is_file() || is_hidden_file(&path) {
            continue;
        }

        let Some((position, name)) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(Scene::parse_stem)
        else {
            continue;
        };

        let extension = AudioLoader::detect_format(&path).unwrap_or_default();
        let slot = found.entry(position).or_default();
        if slot.name.is_empty() {
            slot.name = name;
        }

        let target = if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            &mut slot.image
        } else if AudioLoader::is_format_supported(&extension) {
            &mut slot.audio
        } else if extension == "txt" {
            &mut slot.script
        } else {
            debug!("Ignoring {:?}", path);
            continue;
        };

        if target.is_some() {
            return Err(ManifestError::DuplicatePosition { position });
        }
        *target = Some(path);
    }

    if found.is_empty() {
        return Err(ManifestError::NoScenes { path: shown });
    }

    let mut list = SceneList::new(stem_or(directory, "video"));
    for (position, discovered) in found {
        let image = discovered.image.ok_or(ManifestError::MissingAsset {
            position,
            asset: "image",
        })?;
        let audio = discovered.audio.ok_or(ManifestError::MissingAsset {
            position,
            asset: "audio",
        })?;

        let script = match discovered.script {
            Some(path) => std::fs::read_to_string(&path)
                .map_err(|e| ManifestError::ParseFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?
                .trim()
                .to_string(),
            None => String::new(),
        };

        list.add_scene(Scene::new(position, image, audio, script).with_name(discovered.name));
    }

    info!("Discovered {} scenes in {}", list.len(), shown);
    Ok(list)
}

fn stem_or(path: &Path, fallback: &str) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{Direction, EffectType, Speed};
    use tempfile::tempdir;

    #[test]
    fn test_toml_manifest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("story.toml");
        std::fs::write(
            &path,
            r#"
title = "My Story"

[[scenes]]
position = 2
image = "b.png"
audio = "b.wav"
script = "Second."

[[scenes]]
position = 1
image = "a.png"
audio = "/abs/a.wav"
script = "안녕하세요, 오늘은 맑습니다."

[scenes.effect]
type = "pan_left"
target_scale = 1.3
"#,
        )
        .unwrap();

        let list = load_manifest(&path).unwrap();
        assert_eq!(list.title(), "My Story");
        assert_eq!(list.len(), 2);

        let first = &list.scenes()[0];
        assert_eq!(first.position, 1);
        assert_eq!(first.image, dir.path().join("a.png"));
        assert_eq!(first.audio, PathBuf::from("/abs/a.wav"));
        let effect = first.effect.unwrap();
        assert_eq!(effect.effect_type, EffectType::PanLeft);
        assert_eq!(effect.target_scale, 1.3);

        assert!(list.scenes()[1].effect.is_none());
    }

    #[test]
    fn test_json_manifest_with_nested_motion_params() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("story.json");
        std::fs::write(
            &path,
            r#"{
                "scenes": [
                    {
                        "image": "1.png",
                        "audio": "1.mp3",
                        "text": "Hello.",
                        "effect": {
                            "type": "3d_parallax",
                            "motion_params": { "scale": 1.4, "direction": "right", "speed": "fast" }
                        }
                    },
                    { "image": "2.png", "audio": "2.mp3", "script": "Bye." }
                ]
            }"#,
        )
        .unwrap();

        let list = load_manifest(&path).unwrap();
        assert_eq!(list.title(), "story");
        assert_eq!(list.scenes()[0].position, 1);
        assert_eq!(list.scenes()[0].script, "Hello.");
        assert_eq!(list.scenes()[1].position, 2);

        let effect = list.scenes()[0].effect.unwrap();
        assert_eq!(effect.effect_type, EffectType::Parallax3d);
        assert_eq!(effect.target_scale, 1.4);
        assert_eq!(effect.direction, Direction::Right);
        assert_eq!(effect.speed, Some(Speed::Fast));
    }

    #[test]
    fn test_manifest_errors() {
        let dir = tempdir().unwrap();

        assert!(matches!(
            load_manifest(dir.path().join("missing.toml")),
            Err(ManifestError::NotFound { .. })
        ));

        let empty = dir.path().join("empty.toml");
        std::fs::write(&empty, "title = \"x\"\n").unwrap();
        assert!(matches!(load_manifest(&empty), Err(ManifestError::NoScenes { .. })));

        let no_audio = dir.path().join("no_audio.toml");
        std::fs::write(&no_audio, "[[scenes]]\nimage = \"a.png\"\n").unwrap();
        assert!(matches!(
            load_manifest(&no_audio),
            Err(ManifestError::MissingAsset { position: 1, asset: "audio" })
        ));

        let duplicate = dir.path().join("dup.toml");
        std::fs::write(
            &duplicate,
            "[[scenes]]\nposition = 3\nimage = \"a.png\"\naudio = \"a.wav\"\n\n[[scenes]]\nposition = 3\nimage = \"b.png\"\naudio = \"b.wav\"\n",
        )
        .unwrap();
        assert!(matches!(
            load_manifest(&duplicate),
            Err(ManifestError::DuplicatePosition { position: 3 })
        ));

        let yaml = dir.path().join("story.yaml");
        std::fs::write(&yaml, "scenes: []").unwrap();
        assert!(matches!(load_manifest(&yaml), Err(ManifestError::ParseFailed { .. })));
    }

    #[test]
    fn test_directory_discovery() {
        let dir = tempdir().unwrap();
        for name in [
            "02_outro.jpg",
            "02_outro.mp3",
            "01_intro.png",
            "01_intro.wav",
            "notes.md",
            ".01_hidden.png",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::write(dir.path().join("01_intro.txt"), "  Hello there.\n").unwrap();

        let list = load_scenes(dir.path()).unwrap();
        assert_eq!(list.len(), 2);

        let intro = &list.scenes()[0];
        assert_eq!(intro.position, 1);
        assert_eq!(intro.name, "intro");
        assert_eq!(intro.script, "Hello there.");
        assert_eq!(intro.image, dir.path().join("01_intro.png"));

        let outro = &list.scenes()[1];
        assert_eq!(outro.audio, dir.path().join("02_outro.mp3"));
        assert!(outro.script.is_empty());
    }

    #[test]
    fn test_directory_missing_audio() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("01_intro.png"), b"").unwrap();

        assert!(matches!(
            discover_scenes(dir.path()),
            Err(ManifestError::MissingAsset { position: 1, asset: "audio" })
        ));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            discover_scenes(dir.path()),
            Err(ManifestError::NoScenes { .. })
        ));
    }
}
