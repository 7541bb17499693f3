//! Definitions of command argument data.
//!
//! Structures in this module are shared by the lexer, the header and measure decoders, and the
//! timeline.

/// The number of distinct two-digit base-36 ids, `00` to `ZZ`.
pub const SLOT_COUNT: usize = 36 * 36;

/// An object id. Its meaning is determined by the channel belonged to: an audio slot on sound
/// channels, an image slot on the BGA channel, a tempo slot on the tempo-change channel when the
/// chart defines `#BPMxx`.
///
/// The representation is 2 digits of base-36 characters `0-9A-Z`, case-insensitive.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SlotId(u16);

impl std::fmt::Debug for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SlotId").field(&self.to_string()).finish()
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digit = |n: u16| char::from_digit(u32::from(n), 36).map(|c| c.to_ascii_uppercase());
        let (Some(hi), Some(lo)) = (digit(self.0 / 36), digit(self.0 % 36)) else {
            return Err(std::fmt::Error);
        };
        write!(f, "{hi}{lo}")
    }
}

impl TryFrom<[u8; 2]> for SlotId {
    type Error = [u8; 2];
    fn try_from(value: [u8; 2]) -> core::result::Result<Self, Self::Error> {
        let digit = |b: u8| char::from(b).to_digit(36);
        match (digit(value[0]), digit(value[1])) {
            (Some(hi), Some(lo)) => Ok(Self((hi * 36 + lo) as u16)),
            _ => Err(value),
        }
    }
}

impl<'a> TryFrom<&'a str> for SlotId {
    type Error = &'a str;
    fn try_from(value: &'a str) -> core::result::Result<Self, Self::Error> {
        let mut bytes = value.bytes();
        let [Some(ch1), Some(ch2), None] = [bytes.next(), bytes.next(), bytes.next()] else {
            return Err(value);
        };
        Self::try_from([ch1, ch2]).map_err(|_| value)
    }
}

impl From<SlotId> for usize {
    fn from(value: SlotId) -> Self {
        value.0 as usize
    }
}

impl SlotId {
    /// Instances a special null id, which means the rest object.
    #[must_use]
    pub const fn null() -> Self {
        Self(0)
    }

    /// Instances an id from its numeric value, `None` if it is out of `00..=ZZ`.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < SLOT_COUNT {
            Some(Self(index as u16))
        } else {
            None
        }
    }

    /// Returns whether the id is null (`00`).
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Converts the object id into its index, `0..SLOT_COUNT`.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A measure number, the `mmm` part of `#mmmcc:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Track(pub u32);

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// One of the eight visible lanes, numbered `0..8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lane(u8);

impl Lane {
    /// The number of visible lanes.
    pub const COUNT: usize = 8;

    /// Instances a lane, `None` if `index >= Lane::COUNT`.
    #[must_use]
    pub const fn new(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Returns the lane number.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of a channel, the `cc` part of `#mmmcc:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// `01`: auto-played background audio. Every line is an independent track.
    Bgm,
    /// `02`: multiplier of the 4-beat measure length.
    BeatCount,
    /// `03`: tempo changes spread evenly over the measure.
    BpmChange,
    /// `04`: background image changes.
    BgaBase,
    /// `11`-`19`: visible notes of a lane.
    Lane(Lane),
}

/// Channel ids and kinds, in the order lanes are numbered.
///
/// `16` is the scratch lane and comes last, after `18` and `19`.
const CHANNELS: [(&str, ChannelKind); 12] = [
    ("01", ChannelKind::Bgm),
    ("02", ChannelKind::BeatCount),
    ("03", ChannelKind::BpmChange),
    ("04", ChannelKind::BgaBase),
    ("11", ChannelKind::Lane(Lane(0))),
    ("12", ChannelKind::Lane(Lane(1))),
    ("13", ChannelKind::Lane(Lane(2))),
    ("14", ChannelKind::Lane(Lane(3))),
    ("15", ChannelKind::Lane(Lane(4))),
    ("18", ChannelKind::Lane(Lane(5))),
    ("19", ChannelKind::Lane(Lane(6))),
    ("16", ChannelKind::Lane(Lane(7))),
];

impl ChannelKind {
    /// Looks the channel id up, `None` for channels outside the supported set.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        CHANNELS
            .iter()
            .find(|(channel_id, _)| channel_id.eq_ignore_ascii_case(id))
            .map(|&(_, kind)| kind)
    }
}
