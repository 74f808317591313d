use crate::episode::model::Scene;

/// Per-scene transition flags derived from the scene sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneFades {
    pub fade_in: bool,
    pub fade_out: bool,
}

/// Compute fade flags for every scene in one forward pass.
///
/// A scene fades out when it has a successor unless its `fadeOut` hint says otherwise; the
/// last scene follows `fade_out_final`. Each fade-out is mirrored as the successor's
/// fade-in, and the first scene never fades in.
pub fn derive_scene_fades(scenes: &[Scene], fade_out_final: bool) -> Vec<SceneFades> {
    let mut out = Vec::with_capacity(scenes.len());
    let mut prev_fade_out = false;
    for (i, scene) in scenes.iter().enumerate() {
        let has_next = i + 1 < scenes.len();
        let fade_out = scene
            .fade_out_hint
            .unwrap_or(if has_next { true } else { fade_out_final });
        out.push(SceneFades {
            fade_in: prev_fade_out,
            fade_out,
        });
        prev_fade_out = fade_out;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/episode/fades.rs"]
mod tests;
