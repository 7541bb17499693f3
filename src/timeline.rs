//! Conversion of measure-relative events into absolute time, and background mixing.
//!
//! Measures are walked in order while the running tempo and the start time of the current
//! measure are carried along. Inside a measure the tempo is piecewise constant: a
//! [`TempoSchedule`] lists the points where it changes together with their absolute times, and
//! every event is placed by extrapolating from the latest point at or before it.
//!
//! Background tracks are mixed into the [`MasterBuffer`] during the walk. Lane notes are only
//! collected, for [`crate::render`] to overlay afterwards.

use crate::{
    command::{Lane, SlotId, Track},
    error::{ParseError, ParseErrorKind, Stage},
    header::ChartHeader,
    measure::{BpmChannel, Measure},
    media::MediaIndex,
    mixer::{MasterBuffer, frame_offset},
};

/// The tempo used when the chart has no `#BPM`.
pub const DEFAULT_BPM: f64 = 130.0;

const SECONDS_PER_MINUTE: f64 = 60.0;

/// A lane note at its onset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// Absolute time in seconds.
    pub onset: f64,
    /// The audio slot to play.
    pub slot: SlotId,
}

/// A background image change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BgaEvent {
    /// Absolute time in seconds.
    pub time: f64,
    /// The image slot to show.
    pub slot: SlotId,
}

/// A point of a [`TempoSchedule`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoPoint {
    /// Offset from the measure start in beats.
    pub beat: f64,
    /// Tempo from this point on, in beats per minute.
    pub bpm: f64,
    /// Absolute time of this point in seconds.
    pub time: f64,
}

/// The piecewise-constant tempo curve of one measure.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoSchedule {
    /// Never empty, the first point is at beat 0.
    points: Vec<TempoPoint>,
    beats: f64,
}

fn resolve_tempo(token: &str, header: &ChartHeader) -> Result<Option<f64>, ParseErrorKind> {
    let bpm = if header.uses_bpm_defs {
        let id = SlotId::try_from(token)
            .map_err(|token| ParseErrorKind::InvalidTempoToken(token.to_owned()))?;
        if id.is_null() {
            return Ok(None);
        }
        *header
            .bpm_defs
            .get(id)
            .ok_or_else(|| ParseErrorKind::UndefinedBpmSlot(id.to_string()))?
    } else {
        let value = u8::from_str_radix(token, 16)
            .map_err(|_| ParseErrorKind::InvalidTempoToken(token.to_owned()))?;
        if value == 0 {
            return Ok(None);
        }
        f64::from(value)
    };
    if bpm <= 0.0 {
        return Err(ParseErrorKind::NonPositiveTempo(bpm.to_string()));
    }
    Ok(Some(bpm))
}

impl TempoSchedule {
    /// Builds the schedule of `measure`, which starts at `start` seconds with tempo `bpm`.
    ///
    /// # Errors
    ///
    /// A tempo token which is malformed, undefined or resolves to a non-positive tempo.
    pub fn build(
        measure: &Measure,
        bpm: f64,
        start: f64,
        header: &ChartHeader,
    ) -> Result<Self, ParseError> {
        let beats = measure.beats;
        let Some(BpmChannel { line, tokens }) = &measure.bpm_changes else {
            return Ok(Self {
                points: vec![TempoPoint {
                    beat: 0.0,
                    bpm,
                    time: start,
                }],
                beats,
            });
        };
        let count = tokens.len() as f64;
        let mut points: Vec<TempoPoint> = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            let changed =
                resolve_tempo(token, header).map_err(|kind| kind.at(Stage::Timeline, *line))?;
            let beat = i as f64 * beats / count;
            let time = points.last().map_or(start, |prev| {
                prev.time + (beat - prev.beat) * SECONDS_PER_MINUTE / prev.bpm
            });
            let active = changed.unwrap_or_else(|| points.last().map_or(bpm, |prev| prev.bpm));
            points.push(TempoPoint {
                beat,
                bpm: active,
                time,
            });
        }
        Ok(Self { points, beats })
    }

    /// Returns the points, ordered by beat.
    #[must_use]
    pub fn points(&self) -> &[TempoPoint] {
        &self.points
    }

    fn anchor(&self, beat: f64) -> TempoPoint {
        let after = self.points.partition_point(|point| point.beat <= beat);
        self.points
            .get(after.saturating_sub(1))
            .copied()
            .unwrap_or(TempoPoint {
                beat: 0.0,
                bpm: DEFAULT_BPM,
                time: 0.0,
            })
    }

    /// Converts an offset in beats from the measure start into absolute seconds.
    #[must_use]
    pub fn time_at(&self, beat: f64) -> f64 {
        let anchor = self.anchor(beat);
        anchor.time + (beat - anchor.beat) * SECONDS_PER_MINUTE / anchor.bpm
    }

    /// Returns the absolute time at which the measure ends and the next one starts.
    #[must_use]
    pub fn end_time(&self) -> f64 {
        self.time_at(self.beats)
    }

    /// Returns the tempo in effect at the end of the measure.
    #[must_use]
    pub fn end_bpm(&self) -> f64 {
        self.anchor(self.beats).bpm
    }
}

/// Yields the beat offset of every non-rest slot, spacing the sequence evenly over `beats`.
fn spread(slots: &[SlotId], beats: f64) -> impl Iterator<Item = (f64, SlotId)> + '_ {
    let count = slots.len() as f64;
    slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| !slot.is_null())
        .map(move |(i, &slot)| (i as f64 * beats / count, slot))
}

/// Every resolved event of a chart, with the background tracks already mixed.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    /// Notes of each lane, in measure order.
    pub lanes: [Vec<Note>; Lane::COUNT],
    /// Background image changes.
    pub bga: Vec<BgaEvent>,
    /// The mix of every background track.
    pub master: MasterBuffer,
    /// The sample rate of [`Self::master`].
    pub sample_rate: u32,
    /// The time at which the last measure ends, in seconds.
    pub end_time: f64,
}

impl Timeline {
    /// Walks `measures` (ordered by measure number) and resolves their events.
    ///
    /// Measure numbers missing between present ones are walked as empty 4-beat measures. The
    /// chart starts at `header.bpm`, or at `default_bpm` if the chart has none.
    ///
    /// # Errors
    ///
    /// A tempo that cannot be resolved, a non-positive starting tempo, or a background sound
    /// ending past [`crate::mixer::MAX_FRAMES`].
    pub fn build(
        header: &ChartHeader,
        measures: Vec<Measure>,
        media: &MediaIndex,
        default_bpm: f64,
    ) -> Result<Self, ParseError> {
        let mut bpm = header.bpm.unwrap_or_else(|| {
            tracing::warn!(default_bpm, "chart has no #BPM, using default");
            default_bpm
        });
        if bpm <= 0.0 || !bpm.is_finite() {
            return Err(ParseErrorKind::NonPositiveTempo(bpm.to_string()).in_stage(Stage::Timeline));
        }

        let mut timeline = Self {
            lanes: Default::default(),
            bga: Vec::new(),
            master: MasterBuffer::new(),
            sample_rate: media.sample_rate(),
            end_time: 0.0,
        };
        let last = measures.last().map(|measure| measure.track.0);
        let mut present = measures.into_iter().peekable();
        let mut start = 0.0;
        for number in last.into_iter().flat_map(|last| 0..=last) {
            let measure = present
                .next_if(|measure| measure.track.0 == number)
                .unwrap_or_else(|| Measure::new(Track(number)));
            let schedule = TempoSchedule::build(&measure, bpm, start, header)?;
            timeline.place(&measure, &schedule, media)?;
            bpm = schedule.end_bpm();
            start = schedule.end_time();
        }
        timeline.end_time = start;
        tracing::debug!(
            end_time = timeline.end_time,
            frames = timeline.master.len(),
            "timeline resolved"
        );
        Ok(timeline)
    }

    fn place(
        &mut self,
        measure: &Measure,
        schedule: &TempoSchedule,
        media: &MediaIndex,
    ) -> Result<(), ParseError> {
        for track in &measure.bgm {
            for (beat, slot) in spread(track, measure.beats) {
                let time = schedule.time_at(beat);
                let Some(clip) = media.clip(slot) else {
                    tracing::debug!(track = %measure.track, slot = %slot, "no audio for slot");
                    continue;
                };
                self.master
                    .mix(frame_offset(time, self.sample_rate), clip)
                    .map_err(|_| {
                        ParseErrorKind::MixTooLong(format!("{time}s in measure {}", measure.track))
                            .in_stage(Stage::Timeline)
                    })?;
            }
        }
        for (notes, slots) in self.lanes.iter_mut().zip(&measure.lanes) {
            notes.extend(spread(slots, measure.beats).map(|(beat, slot)| Note {
                onset: schedule.time_at(beat),
                slot,
            }));
        }
        self.bga
            .extend(spread(&measure.bga, measure.beats).map(|(beat, slot)| BgaEvent {
                time: schedule.time_at(beat),
                slot,
            }));
        Ok(())
    }

    /// Returns the number of lane notes.
    #[must_use]
    pub fn note_count(&self) -> usize {
        self.lanes.iter().map(Vec::len).sum()
    }
}
