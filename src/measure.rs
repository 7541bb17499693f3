//! Decoding of `#mmmcc:content` event records into per-measure data.
//!
//! Each channel id is looked up with [`ChannelKind::from_id`] and its content is handed to the
//! decoder of that kind. Content is a run of two-character pairs spread evenly over the measure;
//! pair `00` is a rest.
//!
//! Malformed content (odd length, non base-36 pairs) is rejected. Channels outside the supported
//! set are skipped.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{
    command::{ChannelKind, Lane, SlotId, Track},
    error::{ParseError, ParseErrorKind, Stage},
    lex::{LineToken, Token},
};

/// The tempo-change channel of a measure, kept undecoded until the header is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BpmChannel {
    /// The source line of the channel.
    pub line: usize,
    /// Two-character tokens, `00` meaning no change.
    pub tokens: Vec<String>,
}

/// Events of one measure.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    /// The measure number.
    pub track: Track,
    /// The length of the measure in beats, `4` unless the beat-count channel scales it.
    pub beats: f64,
    /// The tempo-change channel, if present and non-empty.
    pub bpm_changes: Option<BpmChannel>,
    /// Background tracks, one per `#mmm01:` line.
    pub bgm: Vec<Vec<SlotId>>,
    /// Background image changes.
    pub bga: Vec<SlotId>,
    /// Visible notes, one sequence per lane.
    pub lanes: [Vec<SlotId>; Lane::COUNT],
}

impl Measure {
    /// The length of a measure without a beat-count override.
    pub const DEFAULT_BEATS: f64 = 4.0;

    /// Creates an empty 4-beat measure.
    #[must_use]
    pub fn new(track: Track) -> Self {
        Self {
            track,
            beats: Self::DEFAULT_BEATS,
            bpm_changes: None,
            bgm: Vec::new(),
            bga: Vec::new(),
            lanes: Default::default(),
        }
    }

    /// Returns the notes of `lane`.
    #[must_use]
    pub fn lane(&self, lane: Lane) -> &[SlotId] {
        self.lanes.get(lane.index()).map_or(&[], Vec::as_slice)
    }
}

type DecodeFn = fn(&mut Measure, ChannelKind, &str, usize) -> Result<(), ParseErrorKind>;

impl ChannelKind {
    fn decoder(self) -> DecodeFn {
        match self {
            Self::Bgm => decode_bgm,
            Self::BeatCount => decode_beat_count,
            Self::BpmChange => decode_bpm_change,
            Self::BgaBase => decode_bga,
            Self::Lane(_) => decode_lane,
        }
    }
}

fn pairs(message: &str) -> Result<impl Iterator<Item = [u8; 2]> + '_, ParseErrorKind> {
    if message.len() % 2 != 0 {
        return Err(ParseErrorKind::OddMessageLength(message.to_owned()));
    }
    Ok(message.bytes().tuples().map(|(hi, lo)| [hi, lo]))
}

/// Decodes content into slots.
///
/// # Errors
///
/// [`ParseErrorKind::OddMessageLength`] or [`ParseErrorKind::InvalidSlotId`].
pub fn decode_slots(message: &str) -> Result<Vec<SlotId>, ParseErrorKind> {
    pairs(message)?
        .map(|pair| {
            SlotId::try_from(pair).map_err(|_| {
                ParseErrorKind::InvalidSlotId(String::from_utf8_lossy(&pair).into_owned())
            })
        })
        .collect()
}

fn decode_bgm(
    measure: &mut Measure,
    _: ChannelKind,
    message: &str,
    _: usize,
) -> Result<(), ParseErrorKind> {
    measure.bgm.push(decode_slots(message)?);
    Ok(())
}

fn decode_beat_count(
    measure: &mut Measure,
    _: ChannelKind,
    message: &str,
    _: usize,
) -> Result<(), ParseErrorKind> {
    let multiplier = message
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
        .ok_or_else(|| ParseErrorKind::InvalidBeatCount(message.to_owned()))?;
    measure.beats = Measure::DEFAULT_BEATS * multiplier;
    Ok(())
}

fn decode_bpm_change(
    measure: &mut Measure,
    _: ChannelKind,
    message: &str,
    line: usize,
) -> Result<(), ParseErrorKind> {
    let tokens = pairs(message)?
        .map(|pair| {
            std::str::from_utf8(&pair)
                .ok()
                .filter(|token| token.is_ascii())
                .map(str::to_owned)
                .ok_or_else(|| {
                    ParseErrorKind::InvalidTempoToken(String::from_utf8_lossy(&pair).into_owned())
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    measure.bpm_changes = (!tokens.is_empty()).then_some(BpmChannel { line, tokens });
    Ok(())
}

fn decode_bga(
    measure: &mut Measure,
    _: ChannelKind,
    message: &str,
    _: usize,
) -> Result<(), ParseErrorKind> {
    measure.bga = decode_slots(message)?;
    Ok(())
}

fn decode_lane(
    measure: &mut Measure,
    kind: ChannelKind,
    message: &str,
    _: usize,
) -> Result<(), ParseErrorKind> {
    let ChannelKind::Lane(lane) = kind else {
        return Ok(());
    };
    let slots = decode_slots(message)?;
    if let Some(notes) = measure.lanes.get_mut(lane.index()) {
        if !notes.is_empty() {
            tracing::debug!(track = %measure.track, lane = lane.index(), "later line replaces lane");
        }
        *notes = slots;
    }
    Ok(())
}

/// Decodes every event record into measures, ordered by measure number.
///
/// Lines of the same measure are merged even when other measures come in between, so there is
/// exactly one [`Measure`] per distinct measure number.
///
/// # Errors
///
/// Malformed content fails with a [`ParseError`] naming the line.
pub fn decode_measures(tokens: &[LineToken<'_>]) -> Result<Vec<Measure>, ParseError> {
    let mut measures = BTreeMap::<Track, Measure>::new();
    for token in tokens {
        let Token::Message {
            track,
            channel,
            message,
        } = token.token
        else {
            continue;
        };
        let Some(kind) = ChannelKind::from_id(channel) else {
            tracing::debug!(line = token.line, channel, "skipping unsupported channel");
            continue;
        };
        let measure = measures
            .entry(track)
            .or_insert_with(|| Measure::new(track));
        kind.decoder()(measure, kind, message, token.line)
            .map_err(|err| err.at(Stage::Measure, token.line))?;
    }
    Ok(measures.into_values().collect())
}
