//! Renders a BMS chart into one fully mixed autoplay audio file.
//!
//! A run goes through these stages, each in its own module:
//!
//! 1. [`load`] reads the chart text (UTF-8 or Shift_JIS) and [`lex`] classifies every line.
//! 2. [`reduce`] resolves `#RANDOM`/`#IF` blocks with the configured [`rng::Rng`].
//! 3. [`header`] extracts metadata and the tempo table, [`media`] loads the declared audio.
//! 4. [`measure`] decodes the `#mmmcc:` event records.
//! 5. [`timeline`] converts events into absolute time and mixes the background tracks.
//! 6. [`render`] overlays the lane notes and writes the result.
//!
//! Any failure aborts the run with a [`RenderError`] naming the stage and, where known, the line.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! let summary = bms_mixdown::render_chart_to_file(Path::new("song/chart.bms"), Path::new("song.wav"))?;
//! println!("{} frames at {} Hz", summary.frames, summary.sample_rate);
//! # Ok::<(), bms_mixdown::error::RenderError>(())
//! ```
//!
//! In detail, our policies are:
//!
//! - Every `#RANDOM` draw goes through the renderer's generator, so a seeded generator gives a
//!   reproducible mix.
//! - Nothing is normalized or clipped, overlapping sounds are summed as they are.
//! - Images are indexed but never decoded.

pub mod command;
pub mod error;
pub mod header;
pub mod lex;
pub mod load;
pub mod measure;
pub mod media;
pub mod mixer;
pub mod reduce;
pub mod render;
pub mod rng;
pub mod table;
pub mod timeline;
mod util;

use std::path::Path;

pub use self::error::{ParseError, RenderError, Result, Stage};
use self::{
    header::ChartHeader,
    media::{FsPathResolver, ImageIndex, MediaIndex, PathResolver, SampleLoader, WavLoader},
    render::{RenderSummary, SampleWriter, WavWriter},
    rng::Rng,
    timeline::{DEFAULT_BPM, Timeline},
};

/// A chart mixed in memory, not written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Mixdown {
    /// Metadata of the chart.
    pub header: ChartHeader,
    /// Declared images.
    pub images: ImageIndex,
    /// Resolved events, with every sound mixed into [`Timeline::master`].
    pub timeline: Timeline,
    /// The number of lane notes which were mixed.
    pub notes: usize,
}

/// Runs the rendering pipeline.
///
/// Each collaborator can be replaced with a builder method, which is how tests run the pipeline
/// without touching the filesystem.
#[derive(Debug, Clone)]
pub struct ChartRenderer<R, P = FsPathResolver, L = WavLoader, W = WavWriter> {
    rng: R,
    resolver: P,
    loader: L,
    writer: W,
    default_bpm: f64,
}

#[cfg(feature = "rand")]
impl ChartRenderer<rng::RandRng<rand::rngs::StdRng>> {
    /// Creates a renderer drawing `#RANDOM` values from the OS entropy source.
    #[must_use]
    pub fn new() -> Self {
        use rand::{SeedableRng, rngs::StdRng};
        Self::with_rng(rng::RandRng(StdRng::from_os_rng()))
    }
}

#[cfg(feature = "rand")]
impl Default for ChartRenderer<rng::RandRng<rand::rngs::StdRng>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ChartRenderer<R> {
    /// Creates a renderer drawing `#RANDOM` values from `rng`, reading and writing WAV files.
    pub const fn with_rng(rng: R) -> Self {
        Self {
            rng,
            resolver: FsPathResolver,
            loader: WavLoader,
            writer: WavWriter,
            default_bpm: DEFAULT_BPM,
        }
    }
}

impl<R, P, L, W> ChartRenderer<R, P, L, W> {
    /// Replaces how declared asset names are located.
    pub fn with_resolver<P2: PathResolver>(self, resolver: P2) -> ChartRenderer<R, P2, L, W> {
        ChartRenderer {
            rng: self.rng,
            resolver,
            loader: self.loader,
            writer: self.writer,
            default_bpm: self.default_bpm,
        }
    }

    /// Replaces how assets are decoded.
    pub fn with_loader<L2: SampleLoader>(self, loader: L2) -> ChartRenderer<R, P, L2, W> {
        ChartRenderer {
            rng: self.rng,
            resolver: self.resolver,
            loader,
            writer: self.writer,
            default_bpm: self.default_bpm,
        }
    }

    /// Replaces how the mix is written.
    pub fn with_writer<W2: SampleWriter>(self, writer: W2) -> ChartRenderer<R, P, L, W2> {
        ChartRenderer {
            rng: self.rng,
            resolver: self.resolver,
            loader: self.loader,
            writer,
            default_bpm: self.default_bpm,
        }
    }

    /// Sets the tempo used by charts without `#BPM`.
    #[must_use]
    pub fn with_default_bpm(mut self, bpm: f64) -> Self {
        self.default_bpm = bpm;
        self
    }
}

impl<R, P, L, W> ChartRenderer<R, P, L, W>
where
    R: Rng,
    P: PathResolver,
    L: SampleLoader,
    W: SampleWriter,
{
    /// Mixes chart text whose assets live under `base_dir`.
    ///
    /// # Errors
    ///
    /// The first failing stage aborts the mix.
    pub fn mix_source(&mut self, source: &str, base_dir: &Path) -> Result<Mixdown> {
        let lines = load::lines(source);
        let tokens = lex::lex(&lines)?;
        let tokens = reduce::reduce_control_flow(tokens, &mut self.rng)?;

        let header = ChartHeader::from_tokens(&tokens)?;
        let media = MediaIndex::build(&tokens, base_dir, &self.resolver, &self.loader)?;
        let images = ImageIndex::from_tokens(&tokens);
        tracing::debug!(
            title = header.title.as_deref().unwrap_or_default(),
            audio = media.len(),
            images = images.len(),
            "chart header parsed"
        );

        let measures = measure::decode_measures(&tokens)?;
        let mut timeline = Timeline::build(&header, measures, &media, self.default_bpm)?;
        let notes = render::overlay_notes(&mut timeline, &media)?;
        Ok(Mixdown {
            header,
            images,
            timeline,
            notes,
        })
    }

    /// Renders the chart at `chart` into `output`.
    ///
    /// Assets are searched relative to the directory of `chart`.
    ///
    /// # Errors
    ///
    /// The first failing stage aborts the run, and nothing is written.
    pub fn render_file(&mut self, chart: &Path, output: &Path) -> Result<RenderSummary> {
        let source = load::read_chart_text(chart)?;
        let base_dir = chart
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let Mixdown {
            timeline, notes, ..
        } = self.mix_source(&source, base_dir)?;
        self.writer
            .write(&timeline.master, timeline.sample_rate, output)?;
        let summary = RenderSummary {
            output: output.to_path_buf(),
            sample_rate: timeline.sample_rate,
            frames: timeline.master.len(),
            notes,
            chart_end: timeline.end_time,
        };
        tracing::info!(
            chart = %chart.display(),
            output = %output.display(),
            frames = summary.frames,
            sample_rate = summary.sample_rate,
            notes,
            "chart rendered"
        );
        Ok(summary)
    }
}

/// Renders the chart at `chart` into a WAV file at `output`.
///
/// `#RANDOM` draws come from the OS entropy source. Use [`ChartRenderer::with_rng`] for
/// reproducible output.
///
/// # Errors
///
/// The first failing stage aborts the run, see [`RenderError::stage`].
#[cfg(feature = "rand")]
pub fn render_chart_to_file(chart: &Path, output: &Path) -> Result<RenderSummary> {
    ChartRenderer::new().render_file(chart, output)
}
