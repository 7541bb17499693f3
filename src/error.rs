//! Error types of the rendering pipeline.
//!
//! Every failure aborts the run for the chart being rendered, so the errors here carry enough
//! context to tell which [`Stage`] failed and, where it is known, which source line caused it.

use std::path::PathBuf;

use thiserror::Error;

/// A step of the rendering pipeline, used to report where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading and decoding the chart text.
    Load,
    /// Resolving `#RANDOM`/`#IF` blocks.
    Reduce,
    /// Extracting metadata and the indexed tempo table.
    Header,
    /// Locating and decoding the declared assets.
    Media,
    /// Decoding `#mmmcc:` event records.
    Measure,
    /// Converting events into absolute time and mixing the background tracks.
    Timeline,
    /// Overlaying notes and writing the output file.
    Render,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Reduce => "control flow",
            Self::Header => "header",
            Self::Media => "media",
            Self::Measure => "measure",
            Self::Timeline => "timeline",
            Self::Render => "render",
        };
        f.write_str(name)
    }
}

/// What went wrong while parsing the chart.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ParseErrorKind {
    /// `#RANDOM`/`#SETRANDOM` needs a positive integer.
    #[error("expected a positive integer for #RANDOM, but found `{0}`")]
    InvalidRandomOperand(String),
    /// `#IF` needs an integer.
    #[error("expected an integer for #IF, but found `{0}`")]
    InvalidIfOperand(String),
    /// `#BPM` or `#BPMxx` value is not a number.
    #[error("expected a decimal tempo, but found `{0}`")]
    InvalidBpm(String),
    /// Two characters expected to be base-36 digits were not.
    #[error("`{0}` is not a base-36 slot id")]
    InvalidSlotId(String),
    /// The beat-count channel must hold a positive decimal.
    #[error("expected a positive beat-count multiplier, but found `{0}`")]
    InvalidBeatCount(String),
    /// Event content must be made of two-character pairs.
    #[error("event content `{0}` has an odd length")]
    OddMessageLength(String),
    /// The measure number of an event record is not three decimal digits.
    #[error("`{0}` is not a measure number")]
    InvalidMeasureNumber(String),
    /// A tempo-change token is not hexadecimal.
    #[error("tempo token `{0}` is not hexadecimal")]
    InvalidTempoToken(String),
    /// A tempo-change token refers to a `#BPMxx` that was never defined.
    #[error("tempo slot `{0}` is referenced but not defined by #BPM{0}")]
    UndefinedBpmSlot(String),
    /// Tempo must be strictly positive for beats to map to seconds.
    #[error("tempo must be positive, but got {0}")]
    NonPositiveTempo(String),
    /// A sound would end past the longest mix the renderer builds.
    #[error("a sound at {0} would end past the mix length limit")]
    MixTooLong(String),
}

/// A parse failure, with the stage that raised it and the 1-based source line if known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseError {
    /// The stage which rejected the input.
    pub stage: Stage,
    /// The source line number, starts with 1.
    pub line: Option<usize>,
    /// The reason.
    pub kind: ParseErrorKind,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} stage, line {line}: {}", self.stage, self.kind),
            None => write!(f, "{} stage: {}", self.stage, self.kind),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl ParseErrorKind {
    /// Attaches the stage and the source line.
    #[must_use]
    pub const fn at(self, stage: Stage, line: usize) -> ParseError {
        ParseError {
            stage,
            line: Some(line),
            kind: self,
        }
    }

    /// Attaches only the stage, for failures not tied to one line.
    #[must_use]
    pub const fn in_stage(self, stage: Stage) -> ParseError {
        ParseError {
            stage,
            line: None,
            kind: self,
        }
    }
}

/// The chart bytes could be decoded neither as UTF-8 nor as Shift_JIS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("chart text is neither UTF-8 nor Shift_JIS (first invalid UTF-8 byte at {valid_up_to})")]
pub struct EncodingError {
    /// Length of the longest valid UTF-8 prefix.
    pub valid_up_to: usize,
}

/// An error which aborts rendering a chart.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RenderError {
    /// The chart file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The chart text could not be decoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The chart text is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A declared asset does not exist on disk.
    #[error("asset `{declared}` not found in {}", searched.display())]
    FileNotFound {
        /// The filename as written in the chart.
        declared: String,
        /// The directory which was searched.
        searched: PathBuf,
    },
    /// A declared asset exists but could not be decoded.
    #[error("failed to decode {}: {message}", path.display())]
    Decode {
        /// The asset file.
        path: PathBuf,
        /// Decoder message.
        message: String,
    },
    /// A declared asset uses a layout this renderer does not mix.
    #[error("unsupported audio format in {}: {message}", path.display())]
    UnsupportedFormat {
        /// The asset file.
        path: PathBuf,
        /// What is unsupported.
        message: String,
    },
    /// The mixed output could not be written.
    #[error("failed to write {}: {message}", path.display())]
    Write {
        /// The destination.
        path: PathBuf,
        /// Writer message.
        message: String,
    },
}

impl RenderError {
    /// Returns the stage which failed.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Io { .. } | Self::Encoding(_) => Stage::Load,
            Self::Parse(err) => err.stage,
            Self::FileNotFound { .. } | Self::Decode { .. } | Self::UnsupportedFormat { .. } => {
                Stage::Media
            }
            Self::Write { .. } => Stage::Render,
        }
    }

    /// Returns the source line which caused the failure, if any.
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::Parse(err) => err.line,
            _ => None,
        }
    }
}

/// type alias of `core::result::Result<T, RenderError>`
pub type Result<T> = core::result::Result<T, RenderError>;
