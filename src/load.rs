//! Reading chart text from disk.
//!
//! Charts are written either in UTF-8 or in Shift_JIS. The bytes are tried as UTF-8 first and,
//! only if that fails, decoded once more as Shift_JIS.

use std::path::Path;

use encoding_rs::SHIFT_JIS;

use crate::error::{EncodingError, RenderError, Result};

/// A raw line of the chart with its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Line<'a> {
    /// The line number, starts with 1.
    pub number: usize,
    /// The line content without the line terminator.
    pub text: &'a str,
}

/// Reads the chart file at `path` and decodes it into text.
///
/// # Errors
///
/// [`RenderError::Io`] if the file cannot be read, [`RenderError::Encoding`] if it is neither
/// UTF-8 nor Shift_JIS.
pub fn read_chart_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_chart_text(&bytes)?)
}

/// Decodes chart bytes, trying UTF-8 and then Shift_JIS.
///
/// A leading UTF-8 byte order mark is dropped.
///
/// # Errors
///
/// [`EncodingError`] if the Shift_JIS fallback also meets malformed bytes.
pub fn decode_chart_text(bytes: &[u8]) -> core::result::Result<String, EncodingError> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_owned()),
        Err(utf8_err) => {
            let (text, had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
            if had_errors {
                return Err(EncodingError {
                    valid_up_to: utf8_err.valid_up_to(),
                });
            }
            tracing::debug!("chart text decoded as Shift_JIS");
            Ok(text.into_owned())
        }
    }
}

/// Splits the text into numbered lines, accepting both LF and CRLF terminators.
#[must_use]
pub fn lines(text: &str) -> Vec<Line<'_>> {
    text.split('\n')
        .enumerate()
        .map(|(index, line)| Line {
            number: index + 1,
            text: line.strip_suffix('\r').unwrap_or(line),
        })
        .collect()
}
