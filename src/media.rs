//! Asset declarations (`#WAVxx` / `#BMPxx`) and the decoded audio index.
//!
//! Decoding and file lookup are delegated to [`SampleLoader`] and [`PathResolver`], so the index
//! can be built from the real filesystem ([`WavLoader`], [`FsPathResolver`]) or from memory in
//! tests.
//!
//! All clips of one run share a sample rate: the first loaded clip fixes it and a clip with any
//! other rate is rejected.

use std::path::{Path, PathBuf};

use crate::{
    command::SlotId,
    error::{RenderError, Result},
    lex::{LineToken, Token},
    mixer::AudioClip,
    table::SlotTable,
    util::StrExtension,
};

/// The rate used when a chart declares no audio at all.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Decodes an audio file into a stereo clip.
///
/// Loaders are shared between the workers loading assets in parallel, hence `Sync`.
pub trait SampleLoader: Sync {
    /// Decodes the file at `path`, returning the clip and its sample rate.
    ///
    /// # Errors
    ///
    /// [`RenderError::FileNotFound`], [`RenderError::Decode`] or
    /// [`RenderError::UnsupportedFormat`].
    fn load(&self, path: &Path) -> Result<(AudioClip, u32)>;
}

/// Finds the file of a declared asset, whose extension in the chart may be wrong or missing.
pub trait PathResolver: Sync {
    /// Resolves the declared `file_name` inside `directory` to an existing file.
    ///
    /// # Errors
    ///
    /// [`RenderError::FileNotFound`] if nothing matches.
    fn resolve(&self, directory: &Path, file_name: &str) -> Result<PathBuf>;
}

/// The kind of asset a declaration refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// `#WAVxx`
    Audio,
    /// `#BMPxx`
    Image,
}

impl AssetKind {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Audio => "WAV",
            Self::Image => "BMP",
        }
    }
}

/// One `#WAVxx file` or `#BMPxx file` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetDecl<'a> {
    /// The slot being defined.
    pub slot: SlotId,
    /// The file as written, relative to the chart directory.
    pub file: &'a str,
    /// The source line number.
    pub line: usize,
}

impl AssetDecl<'_> {
    /// Splits the declared file into the directory to search and the file name to look for.
    #[must_use]
    pub fn search_location(&self, base_dir: &Path) -> (PathBuf, String) {
        let declared = Path::new(self.file);
        let directory = declared
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| base_dir.to_path_buf(), |parent| base_dir.join(parent));
        let file_name = declared
            .file_name()
            .map_or_else(|| self.file.to_owned(), |s| s.to_string_lossy().into_owned());
        (directory, file_name)
    }
}

/// Collects the declarations of `kind`, in source order.
///
/// Lines whose id is not two base-36 digits, or which name no file, are not declarations.
/// Slot `00` is reserved for "no sound" and skipped.
#[must_use]
pub fn declarations<'a>(tokens: &[LineToken<'a>], kind: AssetKind) -> Vec<AssetDecl<'a>> {
    tokens
        .iter()
        .filter_map(|token| {
            let Token::Header { name, args } = token.token else {
                return None;
            };
            let slot = SlotId::try_from(name.strip_prefix_ignore_case(kind.prefix())?).ok()?;
            if slot.is_null() || args.is_empty() {
                return None;
            }
            Some(AssetDecl {
                slot,
                file: args,
                line: token.line,
            })
        })
        .collect()
}

/// Decoded audio of every declared slot.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaIndex {
    clips: SlotTable<AudioClip>,
    sample_rate: u32,
}

impl MediaIndex {
    /// Creates an index from already decoded clips.
    #[must_use]
    pub const fn new(clips: SlotTable<AudioClip>, sample_rate: u32) -> Self {
        Self { clips, sample_rate }
    }

    /// Locates and decodes every `#WAVxx` asset.
    ///
    /// # Errors
    ///
    /// The first failing asset, in declaration order, aborts the build, also when assets are
    /// loaded in parallel. Clips whose sample rate differs from the first clip fail with
    /// [`RenderError::UnsupportedFormat`].
    pub fn build(
        tokens: &[LineToken<'_>],
        base_dir: &Path,
        resolver: &impl PathResolver,
        loader: &impl SampleLoader,
    ) -> Result<Self> {
        let decls = declarations(tokens, AssetKind::Audio);
        let load_one = |decl: &AssetDecl<'_>| -> Result<(SlotId, PathBuf, AudioClip, u32)> {
            let (directory, file_name) = decl.search_location(base_dir);
            let path = resolver
                .resolve(&directory, &file_name)
                .map_err(|err| match err {
                    RenderError::FileNotFound { searched, .. } => RenderError::FileNotFound {
                        declared: decl.file.to_owned(),
                        searched,
                    },
                    other => other,
                })?;
            let (clip, rate) = loader.load(&path)?;
            tracing::debug!(slot = %decl.slot, path = %path.display(), frames = clip.len(), "asset loaded");
            Ok((decl.slot, path, clip, rate))
        };

        // in declaration order, the first failure wins
        #[cfg(feature = "parallel")]
        let results: Vec<_> = {
            use rayon::prelude::*;
            decls.par_iter().map(load_one).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = decls.iter().map(load_one).collect();
        let loaded = results.into_iter().collect::<Result<Vec<_>>>()?;

        let mut sample_rate = None;
        let mut clips = SlotTable::new();
        for (slot, path, clip, rate) in loaded {
            let expected = *sample_rate.get_or_insert(rate);
            if rate != expected {
                return Err(RenderError::UnsupportedFormat {
                    path,
                    message: format!("sample rate {rate} Hz differs from {expected} Hz"),
                });
            }
            if clips.insert(slot, clip).is_some() {
                tracing::debug!(slot = %slot, "later #WAV overrides earlier definition");
            }
        }
        Ok(Self {
            clips,
            sample_rate: sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE),
        })
    }

    /// Returns the clip of `slot`.
    #[must_use]
    pub fn clip(&self, slot: SlotId) -> Option<&AudioClip> {
        self.clips.get(slot)
    }

    /// Returns the sample rate shared by every clip.
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of loaded clips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Returns whether no clip is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Declared image paths. Images are only indexed, never decoded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageIndex {
    paths: SlotTable<PathBuf>,
}

impl ImageIndex {
    /// Collects every `#BMPxx` declaration.
    #[must_use]
    pub fn from_tokens(tokens: &[LineToken<'_>]) -> Self {
        Self {
            paths: declarations(tokens, AssetKind::Image)
                .into_iter()
                .map(|decl| (decl.slot, PathBuf::from(decl.file)))
                .collect(),
        }
    }

    /// Returns the declared path of `slot`, relative to the chart directory.
    #[must_use]
    pub fn path(&self, slot: SlotId) -> Option<&Path> {
        self.paths.get(slot).map(PathBuf::as_path)
    }

    /// Returns the number of declared images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns whether no image is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Resolves declared file names against directory listings.
///
/// Candidates are ranked: the declared name itself, then the same name in another case, then a
/// file with the same stem and another extension, then the same stem in another case. Among
/// equals the first in byte order of the file name wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPathResolver;

impl PathResolver for FsPathResolver {
    fn resolve(&self, directory: &Path, file_name: &str) -> Result<PathBuf> {
        let not_found = || RenderError::FileNotFound {
            declared: file_name.to_owned(),
            searched: directory.to_path_buf(),
        };
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(file_name);
        let rank = |path: &Path| -> Option<u8> {
            let name = path.file_name()?.to_str()?;
            let candidate_stem = path.file_stem()?.to_str()?;
            if name == file_name {
                Some(0)
            } else if name.eq_ignore_ascii_case(file_name) {
                Some(1)
            } else if candidate_stem == stem {
                Some(2)
            } else if candidate_stem.eq_ignore_ascii_case(stem) {
                Some(3)
            } else {
                None
            }
        };
        let entries = std::fs::read_dir(directory).map_err(|_| not_found())?;
        entries
            .filter_map(core::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter_map(|path| Some((rank(&path)?, path)))
            .min()
            .map(|(_, path)| path)
            .ok_or_else(not_found)
    }
}

/// Decodes WAV files with [`hound`].
///
/// Integer samples are scaled into `[-1, 1)`. Mono is duplicated into stereo; more than two
/// channels is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavLoader;

impl SampleLoader for WavLoader {
    fn load(&self, path: &Path) -> Result<(AudioClip, u32)> {
        let decode_err = |err: hound::Error| RenderError::Decode {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let reader = hound::WavReader::open(path).map_err(decode_err)?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<core::result::Result<_, _>>()
                .map_err(decode_err)?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / scale))
                    .collect::<core::result::Result<_, _>>()
                    .map_err(decode_err)?
            }
        };
        let clip = AudioClip::from_interleaved(&samples, usize::from(spec.channels)).ok_or_else(
            || RenderError::UnsupportedFormat {
                path: path.to_path_buf(),
                message: format!("{} channels, expected mono or stereo", spec.channels),
            },
        )?;
        Ok((clip, spec.sample_rate))
    }
}
