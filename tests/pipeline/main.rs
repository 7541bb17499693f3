//! Tests running the whole rendering pipeline over in-memory assets.

mod control_flow;
mod end_to_end;
mod measures;
mod tempo;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use bms_mixdown::{
    ChartRenderer, Mixdown,
    command::SlotId,
    error::{RenderError, Result},
    media::{PathResolver, SampleLoader},
    mixer::AudioClip,
    rng::Rng,
};

/// Resolves every declared name to `<dir>/<stem>.wav` without looking at the disk.
pub struct MemoryResolver;

impl PathResolver for MemoryResolver {
    fn resolve(&self, directory: &Path, file_name: &str) -> Result<PathBuf> {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(file_name);
        Ok(directory.join(format!("{stem}.wav")))
    }
}

/// Serves clips from a map, reporting unknown paths as missing.
pub struct MemoryLoader {
    clips: HashMap<PathBuf, AudioClip>,
    sample_rate: u32,
}

impl SampleLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<(AudioClip, u32)> {
        let clip = self
            .clips
            .get(path)
            .cloned()
            .ok_or_else(|| RenderError::FileNotFound {
                declared: path.display().to_string(),
                searched: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            })?;
        Ok((clip, self.sample_rate))
    }
}

/// A renderer whose assets `(stem, clip)` live in memory under `chart/`.
pub fn renderer<R: Rng>(
    rng: R,
    sample_rate: u32,
    assets: Vec<(&str, AudioClip)>,
) -> ChartRenderer<R, MemoryResolver, MemoryLoader> {
    let clips = assets
        .into_iter()
        .map(|(stem, clip)| (Path::new("chart").join(format!("{stem}.wav")), clip))
        .collect();
    ChartRenderer::with_rng(rng)
        .with_resolver(MemoryResolver)
        .with_loader(MemoryLoader { clips, sample_rate })
}

/// Mixes `src` with the given assets.
pub fn mix<R: Rng>(
    src: &str,
    rng: R,
    sample_rate: u32,
    assets: Vec<(&str, AudioClip)>,
) -> Mixdown {
    renderer(rng, sample_rate, assets)
        .mix_source(src, Path::new("chart"))
        .expect("chart must be mixed")
}

/// A constant clip of `frames` frames.
pub fn tone(value: f32, frames: usize) -> AudioClip {
    AudioClip::new(vec![[value, value]; frames])
}

pub fn id(s: &str) -> SlotId {
    SlotId::try_from(s).expect("valid slot id")
}
