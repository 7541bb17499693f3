//! Lexical analyzer of the chart text.
//!
//! Raw lines ([`crate::load::lines`]) == [`lex`] ==> [`LineToken`]s == reduce/header/measure.
//!
//! Every line becomes exactly one token, so later stages can report the source line of a failure.

use crate::{
    command::Track,
    error::{ParseError, ParseErrorKind, Stage},
    load::Line,
    util::StrExtension,
};

/// A classified chart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token<'a> {
    /// `#NAME args`, covering metadata, asset declarations and control flow.
    Header {
        /// The command name without `#`, case preserved.
        name: &'a str,
        /// The trimmed rest of the line, may be empty.
        args: &'a str,
    },
    /// `#mmmcc:message`, an event record.
    Message {
        /// The measure number.
        track: Track,
        /// The two-character channel id.
        channel: &'a str,
        /// The trimmed content after `:`.
        message: &'a str,
    },
    /// Comments, blank lines and everything else not starting with `#`.
    NotACommand(&'a str),
}

/// A token with the number of the line it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineToken<'a> {
    /// The line number, starts with 1.
    pub line: usize,
    /// The token.
    pub token: Token<'a>,
}

impl<'a> Token<'a> {
    /// Classifies one line.
    ///
    /// # Errors
    ///
    /// [`ParseErrorKind::InvalidMeasureNumber`] for an event record whose measure part is not
    /// three decimal digits.
    pub fn parse(line: &'a str) -> core::result::Result<Self, ParseErrorKind> {
        let trimmed = line.trim();
        let Some(command) = trimmed.strip_prefix('#') else {
            return Ok(Self::NotACommand(trimmed));
        };
        let (name, args) = command.split_first_word();
        if name.eq_ignore_ascii_case("EXT")
            && let Some(inner) = args.strip_prefix('#')
            && let Some(message) = Self::parse_message(inner)?
        {
            return Ok(message);
        }
        if let Some(message) = Self::parse_message(command)? {
            return Ok(message);
        }
        Ok(Self::Header { name, args })
    }

    /// Parses `mmmcc:content`, returning `None` if the text is not shaped as an event record.
    fn parse_message(text: &'a str) -> core::result::Result<Option<Self>, ParseErrorKind> {
        let Some((head, message)) = text.split_once(':') else {
            return Ok(None);
        };
        if head.len() != 5 || !head.is_char_boundary(3) || head.contains(char::is_whitespace) {
            return Ok(None);
        }
        let (track, channel) = head.split_at(3);
        if !track.bytes().all(|b| b.is_ascii_digit()) {
            // `#TITLE:x` and the like are headers glued to a colon, not records
            if track.starts_with(|c: char| c.is_ascii_alphabetic()) {
                return Ok(None);
            }
            return Err(ParseErrorKind::InvalidMeasureNumber(track.to_owned()));
        }
        let track = track
            .parse()
            .map_err(|_| ParseErrorKind::InvalidMeasureNumber(track.to_owned()))?;
        Ok(Some(Self::Message {
            track: Track(track),
            channel,
            message: message.trim(),
        }))
    }
}

/// Analyzes the lines into tokens.
///
/// # Errors
///
/// A malformed event record fails with a [`ParseError`] naming its line.
pub fn lex<'a>(lines: &[Line<'a>]) -> core::result::Result<Vec<LineToken<'a>>, ParseError> {
    lines
        .iter()
        .map(|line| {
            Token::parse(line.text)
                .map(|token| LineToken {
                    line: line.number,
                    token,
                })
                .map_err(|kind| kind.at(Stage::Measure, line.number))
        })
        .collect()
}
