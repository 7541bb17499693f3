//! Extraction of chart metadata and the indexed tempo table.
//!
//! This module handles the tokens:
//!
//! - `#PLAYER n`, `#RANK n`, `#TOTAL n`, `#PLAYLEVEL n`, `#DIFFICULTY n` - numeric metadata.
//! - `#TITLE`, `#SUBTITLE`, `#ARTIST`, `#SUBARTIST`, `#GENRE`, `#STAGEFILE` - text metadata.
//! - `#BPM n` - Initial BPM definition.
//! - `#BPM[01-ZZ] n` - BPM change definition, referenced from the tempo-change channel.
//!
//! Unknown commands are skipped, so charts using newer directives still load.

use std::path::PathBuf;

use crate::{
    command::SlotId,
    error::{ParseError, ParseErrorKind, Stage},
    lex::{LineToken, Token},
    table::SlotTable,
    util::StrExtension,
};

/// A play style of the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerMode {
    /// For single play, a player uses 5 or 7 keys.
    Single,
    /// For couple play, two players use each 5 or 7 keys.
    Two,
    /// For double play, a player uses 10 or 14 keys.
    Double,
}

impl<'a> TryFrom<&'a str> for PlayerMode {
    type Error = &'a str;
    fn try_from(value: &'a str) -> core::result::Result<Self, Self::Error> {
        match value {
            "1" => Ok(Self::Single),
            "2" => Ok(Self::Two),
            "3" => Ok(Self::Double),
            _ => Err(value),
        }
    }
}

/// A rank to determine judge level, but treatment differs among the BMS players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JudgeLevel {
    /// Rank 0, the most difficult rank.
    VeryHard,
    /// Rank 1, the harder rank.
    Hard,
    /// Rank 2, the normal rank.
    Normal,
    /// Rank 3, the easier rank.
    Easy,
    /// Other integer value.
    OtherInt(i64),
}

impl From<i64> for JudgeLevel {
    fn from(value: i64) -> Self {
        match value {
            0 => Self::VeryHard,
            1 => Self::Hard,
            2 => Self::Normal,
            3 => Self::Easy,
            val => Self::OtherInt(val),
        }
    }
}

impl<'a> TryFrom<&'a str> for JudgeLevel {
    type Error = &'a str;
    fn try_from(value: &'a str) -> core::result::Result<Self, Self::Error> {
        value.parse::<i64>().map(Self::from).map_err(|_| value)
    }
}

/// Metadata of a chart, plus the tempo table used by the tempo-change channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartHeader {
    /// `#PLAYER`
    pub player: Option<PlayerMode>,
    /// `#RANK`
    pub rank: Option<JudgeLevel>,
    /// `#TOTAL`, the gauge increase total.
    pub total: Option<f64>,
    /// `#TITLE`
    pub title: Option<String>,
    /// `#SUBTITLE`
    pub subtitle: Option<String>,
    /// `#ARTIST`
    pub artist: Option<String>,
    /// `#SUBARTIST`
    pub sub_artist: Option<String>,
    /// `#GENRE`
    pub genre: Option<String>,
    /// `#DIFFICULTY`, usually 1 (beginner) to 5 (insane).
    pub difficulty: Option<u8>,
    /// `#PLAYLEVEL`
    pub play_level: Option<u32>,
    /// `#STAGEFILE`, the splash image path.
    pub stage_file: Option<PathBuf>,
    /// `#BPM`, the tempo at the start of the chart.
    pub bpm: Option<f64>,
    /// `#BPMxx` definitions.
    pub bpm_defs: SlotTable<f64>,
    /// Whether any `#BPMxx` was seen. When set, tempo-change tokens are resolved through
    /// [`Self::bpm_defs`] instead of being read as hexadecimal.
    pub uses_bpm_defs: bool,
}

/// Parses a numeric metadata value, logging and dropping it on failure.
fn lenient<T: std::str::FromStr>(name: &str, args: &str, line: usize) -> Option<T> {
    let parsed = args.parse().ok();
    if parsed.is_none() {
        tracing::warn!(line, command = name, value = args, "ignoring unparsable metadata");
    }
    parsed
}

fn parse_bpm(args: &str) -> core::result::Result<f64, ParseErrorKind> {
    args.parse()
        .ok()
        .filter(|bpm: &f64| bpm.is_finite())
        .ok_or_else(|| ParseErrorKind::InvalidBpm(args.to_owned()))
}

impl ChartHeader {
    /// Scans the reduced tokens for metadata.
    ///
    /// # Errors
    ///
    /// An unparsable `#BPM` or `#BPMxx` value fails with a [`ParseError`] naming the line.
    pub fn from_tokens(tokens: &[LineToken<'_>]) -> core::result::Result<Self, ParseError> {
        let mut header = Self::default();
        for token in tokens {
            if let Token::Header { name, args } = token.token {
                header
                    .on_header(name, args, token.line)
                    .map_err(|kind| kind.at(Stage::Header, token.line))?;
            }
        }
        Ok(header)
    }

    fn on_header(
        &mut self,
        name: &str,
        args: &str,
        line: usize,
    ) -> core::result::Result<(), ParseErrorKind> {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "PLAYER" => self.player = PlayerMode::try_from(args).ok(),
            "RANK" => self.rank = JudgeLevel::try_from(args).ok(),
            "TOTAL" => self.total = lenient(name, args, line),
            "TITLE" => self.title = Some(args.to_owned()),
            "SUBTITLE" => self.subtitle = Some(args.to_owned()),
            "ARTIST" => self.artist = Some(args.to_owned()),
            "SUBARTIST" => self.sub_artist = Some(args.to_owned()),
            "GENRE" => self.genre = Some(args.to_owned()),
            "DIFFICULTY" => self.difficulty = lenient(name, args, line),
            "PLAYLEVEL" => self.play_level = lenient(name, args, line),
            "STAGEFILE" => self.stage_file = Some(PathBuf::from(args)),
            "BPM" => self.bpm = Some(parse_bpm(args)?),
            _ => {
                let Some(id) = name
                    .strip_prefix_ignore_case("BPM")
                    .and_then(|id| SlotId::try_from(id).ok())
                else {
                    return Ok(());
                };
                self.bpm_defs.insert(id, parse_bpm(args)?);
                self.uses_bpm_defs = true;
            }
        }
        Ok(())
    }
}
