//! Stereo sample buffers and additive mixing.
//!
//! Both the decoded assets ([`AudioClip`]) and the final mix ([`MasterBuffer`]) are stored as
//! stereo frames. Clips are always summed into the master, never copied over it, and the master
//! only ever grows.

use crate::error::ParseErrorKind;

/// The number of channels of every buffer.
pub const CHANNELS: usize = 2;

/// The most frames a [`MasterBuffer`] grows to, a little over 100 minutes at 44.1 kHz.
pub const MAX_FRAMES: usize = 1 << 28;

/// One sample per channel.
pub type Frame = [f32; CHANNELS];

/// Converts a position in seconds into a frame offset.
///
/// Offsets are rounded to the nearest frame (halves away from zero). Background tracks and lane
/// notes both go through this function, so an event lands on the same frame whichever channel
/// carries it. Negative times clamp to frame 0.
#[must_use]
pub fn frame_offset(seconds: f64, sample_rate: u32) -> usize {
    (seconds * f64::from(sample_rate)).round().max(0.0) as usize
}

/// A decoded asset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioClip {
    frames: Vec<Frame>,
}

impl AudioClip {
    /// Creates a clip from stereo frames.
    #[must_use]
    pub const fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    /// Creates a clip from interleaved samples of `channels` channels.
    ///
    /// Mono is copied to both sides, stereo is kept as is. Returns `None` for other channel
    /// counts.
    #[must_use]
    pub fn from_interleaved(samples: &[f32], channels: usize) -> Option<Self> {
        let frames = match channels {
            1 => samples.iter().map(|&s| [s, s]).collect(),
            2 => samples
                .chunks_exact(2)
                .map(|pair| [pair[0], pair[1]])
                .collect(),
            _ => return None,
        };
        Some(Self { frames })
    }

    /// Returns the frames.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Returns the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns whether the clip has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// The growable final mix.
///
/// It starts as a single silent frame and is zero-padded whenever a clip would end past it.
/// `Vec` growth keeps the reallocations amortized.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterBuffer {
    frames: Vec<Frame>,
}

impl Default for MasterBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MasterBuffer {
    /// Creates a buffer of one silent frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: vec![[0.0; CHANNELS]],
        }
    }

    /// Adds `clip` into the buffer starting at frame `offset`, growing the buffer to fit.
    ///
    /// # Errors
    ///
    /// [`ParseErrorKind::MixTooLong`] if the clip would end past [`MAX_FRAMES`]. The buffer is
    /// left untouched.
    pub fn mix(&mut self, offset: usize, clip: &AudioClip) -> Result<(), ParseErrorKind> {
        if clip.is_empty() {
            return Ok(());
        }
        let end = offset
            .checked_add(clip.len())
            .filter(|&end| end <= MAX_FRAMES)
            .ok_or_else(|| ParseErrorKind::MixTooLong(format!("frame {offset}")))?;
        if self.frames.len() < end {
            self.frames.resize(end, [0.0; CHANNELS]);
        }
        for (dst, src) in self.frames[offset..end].iter_mut().zip(clip.frames()) {
            for (d, s) in dst.iter_mut().zip(src) {
                *d += s;
            }
        }
        Ok(())
    }

    /// Returns the frames.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Returns the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always `false`, the buffer keeps at least one frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the samples interleaved by channel, `L R L R ...`.
    pub fn interleaved(&self) -> impl Iterator<Item = f32> + '_ {
        self.frames.iter().flatten().copied()
    }
}
