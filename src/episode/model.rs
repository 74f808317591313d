use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{StoryreelError, StoryreelResult};

/// JSON-facing episode document as written by the content generators.
///
/// Unknown keys are ignored so generator metadata (prompts, descriptions) can ride along.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeDef {
    pub scenes: Vec<SceneDef>,
    #[serde(default)]
    pub text_overlays: Vec<TextOverlayDef>,
    pub background_music: AssetRef,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDef {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: SceneContentDef,
    /// Optional transition hint: `false` hard-cuts into the next scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_out: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneContentDef {
    pub filename: PathBuf,
    pub audio: AssetRef,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetRef {
    pub filename: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TextOverlayDef {
    pub text: String,
    pub appearance: AppearanceDef,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AppearanceDef {
    pub start: f64,
    pub end: f64,
}

/// Visual asset kind of a scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SceneKind {
    /// A still image held (and slowly zoomed) for the narration length.
    Image,
    /// A video clip time-stretched to the narration length.
    Video,
}

impl SceneKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub kind: SceneKind,
    /// Image or video file.
    pub visual: PathBuf,
    /// Voice-over track; its length is the scene length.
    pub narration: PathBuf,
    /// Document-level transition hint, see [`crate::episode::fades::derive_scene_fades`].
    pub fade_out_hint: Option<bool>,
}

/// Timed text shown over the concatenated episode.
#[derive(Clone, Debug, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    /// Seconds on the combined timeline.
    pub start: f64,
    pub end: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundMusic {
    pub path: PathBuf,
}

/// Validated, immutable episode.
#[derive(Clone, Debug, PartialEq)]
pub struct Episode {
    scenes: Vec<Scene>,
    overlays: Vec<TextOverlay>,
    music: BackgroundMusic,
}

impl Episode {
    /// Parse and validate an episode from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> StoryreelResult<Self> {
        let def: EpisodeDef = serde_json::from_reader(r)
            .map_err(|e| StoryreelError::serde(format!("parse episode JSON: {e}")))?;
        Self::from_def(def)
    }

    /// Parse and validate an episode from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> StoryreelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            StoryreelError::validation(format!("open episode JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn from_def(def: EpisodeDef) -> StoryreelResult<Self> {
        if def.scenes.is_empty() {
            return Err(StoryreelError::validation(
                "episode must contain at least one scene",
            ));
        }

        let scenes = def
            .scenes
            .into_iter()
            .enumerate()
            .map(|(index, s)| {
                let kind = SceneKind::parse(&s.kind).ok_or_else(|| {
                    StoryreelError::UnsupportedSceneType {
                        index,
                        kind: s.kind.clone(),
                    }
                })?;
                Ok(Scene {
                    kind,
                    visual: s.content.filename,
                    narration: s.content.audio.filename,
                    fade_out_hint: s.fade_out,
                })
            })
            .collect::<StoryreelResult<Vec<_>>>()?;

        let overlays = def
            .text_overlays
            .into_iter()
            .enumerate()
            .map(|(i, o)| {
                let AppearanceDef { start, end } = o.appearance;
                if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
                    return Err(StoryreelError::validation(format!(
                        "text overlay #{i} has an invalid window [{start}, {end}]"
                    )));
                }
                Ok(TextOverlay {
                    text: o.text,
                    start,
                    end,
                })
            })
            .collect::<StoryreelResult<Vec<_>>>()?;

        Ok(Self {
            scenes,
            overlays,
            music: BackgroundMusic {
                path: def.background_music.filename,
            },
        })
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn overlays(&self) -> &[TextOverlay] {
        &self.overlays
    }

    pub fn music(&self) -> &BackgroundMusic {
        &self.music
    }

    /// Fail with [`StoryreelError::MissingAsset`] on the first referenced file that is absent.
    pub fn check_assets(&self) -> StoryreelResult<()> {
        for (index, scene) in self.scenes.iter().enumerate() {
            scene.check_assets().map_err(|e| e.in_scene(index))?;
        }
        require_file("background music", &self.music.path)
    }
}

impl Scene {
    pub fn check_assets(&self) -> StoryreelResult<()> {
        require_file("narration audio", &self.narration)?;
        let role = match self.kind {
            SceneKind::Image => "scene image",
            SceneKind::Video => "scene video",
        };
        require_file(role, &self.visual)
    }
}

pub(crate) fn require_file(role: &'static str, path: &Path) -> StoryreelResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(StoryreelError::missing_asset(role, path))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/episode/model.rs"]
mod tests;
