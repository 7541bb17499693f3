//! The last stage: overlaying lane notes and writing the mix.
//!
//! [`crate::timeline`] leaves every background track mixed into the [`MasterBuffer`]. Here each
//! lane note is added on top with the same rounding, and the result is handed to a
//! [`SampleWriter`].

use std::path::{Path, PathBuf};

use crate::{
    error::{ParseError, ParseErrorKind, RenderError, Result, Stage},
    media::MediaIndex,
    mixer::{CHANNELS, MasterBuffer, frame_offset},
    timeline::Timeline,
};

/// Encodes the final mix into a file.
pub trait SampleWriter {
    /// Writes `master` at `sample_rate` to `path`.
    ///
    /// # Errors
    ///
    /// [`RenderError::Write`] if the file cannot be created or encoded.
    fn write(&self, master: &MasterBuffer, sample_rate: u32, path: &Path) -> Result<()>;
}

/// Writes 32-bit float stereo WAV files with [`hound`].
///
/// Samples are written as mixed, without normalization or clipping.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavWriter;

impl SampleWriter for WavWriter {
    fn write(&self, master: &MasterBuffer, sample_rate: u32, path: &Path) -> Result<()> {
        let write_err = |err: hound::Error| RenderError::Write {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let spec = hound::WavSpec {
            channels: CHANNELS as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).map_err(write_err)?;
        for sample in master.interleaved() {
            writer.write_sample(sample).map_err(write_err)?;
        }
        writer.finalize().map_err(write_err)
    }
}

/// Adds every lane note of `timeline` into its master buffer.
///
/// Notes whose slot has no loaded clip are skipped. Returns the number of notes mixed.
///
/// # Errors
///
/// A note whose sound would end past [`crate::mixer::MAX_FRAMES`].
pub fn overlay_notes(
    timeline: &mut Timeline,
    media: &MediaIndex,
) -> core::result::Result<usize, ParseError> {
    let Timeline {
        lanes,
        master,
        sample_rate,
        ..
    } = timeline;
    let mut mixed = 0;
    for (lane, notes) in lanes.iter().enumerate() {
        for note in notes {
            let Some(clip) = media.clip(note.slot) else {
                tracing::debug!(lane, slot = %note.slot, "no audio for note");
                continue;
            };
            master
                .mix(frame_offset(note.onset, *sample_rate), clip)
                .map_err(|_| {
                    ParseErrorKind::MixTooLong(format!("{}s in lane {lane}", note.onset))
                        .in_stage(Stage::Render)
                })?;
            mixed += 1;
        }
    }
    Ok(mixed)
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    /// The written file.
    pub output: PathBuf,
    /// The sample rate of the output.
    pub sample_rate: u32,
    /// The number of stereo frames written.
    pub frames: usize,
    /// The number of lane notes which were mixed.
    pub notes: usize,
    /// The time at which the last measure ends, in seconds.
    pub chart_end: f64,
}

impl RenderSummary {
    /// Returns the length of the output in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.frames as f64 / f64::from(self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        command::SlotId,
        mixer::AudioClip,
        table::SlotTable,
        timeline::Note,
    };

    fn id(s: &str) -> SlotId {
        SlotId::try_from(s).expect("valid id")
    }

    fn timeline(notes: Vec<Note>) -> Timeline {
        let mut lanes: [Vec<Note>; 8] = Default::default();
        lanes[3] = notes;
        Timeline {
            lanes,
            bga: Vec::new(),
            master: MasterBuffer::new(),
            sample_rate: 10,
            end_time: 1.0,
        }
    }

    #[test]
    fn notes_are_added_at_rounded_offsets() {
        let media = MediaIndex::new(
            [(id("01"), AudioClip::new(vec![[0.5, 0.25]; 2]))]
                .into_iter()
                .collect::<SlotTable<_>>(),
            10,
        );
        let mut timeline = timeline(vec![
            Note {
                onset: 0.26,
                slot: id("01"),
            },
            Note {
                onset: 0.36,
                slot: id("01"),
            },
            Note {
                onset: 0.5,
                slot: id("02"),
            },
        ]);
        assert_eq!(overlay_notes(&mut timeline, &media), Ok(2));
        assert_eq!(
            timeline.master.frames(),
            &[
                [0.0, 0.0],
                [0.0, 0.0],
                [0.0, 0.0],
                [0.5, 0.25],
                [1.0, 0.5],
                [0.5, 0.25],
            ]
        );
    }

    #[test]
    fn note_past_mix_limit_is_an_error() {
        let media = MediaIndex::new(
            [(id("01"), AudioClip::new(vec![[0.5, 0.5]; 2]))]
                .into_iter()
                .collect::<SlotTable<_>>(),
            10,
        );
        let mut timeline = timeline(vec![Note {
            onset: 1e300,
            slot: id("01"),
        }]);
        let err = overlay_notes(&mut timeline, &media).expect_err("too long");
        assert_eq!(err.stage, Stage::Render);
        assert_eq!(timeline.master.len(), 1);
    }

    #[test]
    fn summary_duration() {
        let summary = RenderSummary {
            output: PathBuf::from("out.wav"),
            sample_rate: 44100,
            frames: 88200,
            notes: 0,
            chart_end: 2.0,
        };
        assert_eq!(summary.duration(), 2.0);
    }
}
