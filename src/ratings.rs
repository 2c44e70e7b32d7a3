/// The ratings module holds the pure conversions between the Plex 0-10 rating
/// scale and the two on-disk encodings: the POPM frame byte (0-255) used by
/// MP3 files and the textual "1".."5" RATING field used by FLAC files.
///
/// The two directions of the POPM pair are intentionally not perfect inverses:
/// frame values are bucketed into stars on the way back, so e.g. a frame value
/// of 1 reads as Plex 2 even though Plex 1 may round down to star 0. That
/// lossiness matches how every mainstream tagger interprets POPM and must not
/// be "fixed".
///
/// Rounding is half away from zero (`f64::round`) in both star conversions, so
/// Plex 5.0 lands in star bucket 3 and Plex 1.0 in bucket 1.
use std::path::Path;

use crate::error::{Result, SyncError};

/// Absolute difference on the Plex scale below which a file rating and a
/// catalog rating are considered equal. Absorbs float round-trip noise.
pub const RATING_TOLERANCE: f64 = 0.1;

/// POPM byte for each star bucket 0..=5.
const POPM_BY_STARS: [u8; 6] = [0, 1, 64, 128, 196, 255];

/// The rating value as stored in a track's on-disk tag container. Which
/// variant applies is fixed by the file's format.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalRating {
    /// POPM frame rating, 0-255.
    Frame(u8),
    /// Textual rating, "1".."5".
    Text(String),
}

impl std::fmt::Display for LocalRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalRating::Frame(v) => write!(f, "{v}"),
            LocalRating::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Convert a Plex rating to the POPM byte encoding.
pub fn plex_to_popm(rating: f64) -> u8 {
    let stars = (rating / 2.0).round().clamp(0.0, 5.0) as usize;
    POPM_BY_STARS[stars]
}

/// Convert a POPM byte back to the Plex scale. Buckets are half-open with an
/// inclusive upper bound: 0 -> 0, 1 -> 2, (1,64] -> 4, (64,128] -> 6,
/// (128,196] -> 8, (196,255] -> 10.
pub fn popm_to_plex(popm: u8) -> f64 {
    match popm {
        0 => 0.0,
        1 => 2.0,
        v if v <= 64 => 4.0,
        v if v <= 128 => 6.0,
        v if v <= 196 => 8.0,
        _ => 10.0,
    }
}

/// Convert a Plex rating to the textual "1".."5" encoding.
pub fn plex_to_text(rating: f64) -> String {
    let stars = (rating / 2.0).round().clamp(1.0, 5.0) as u8;
    stars.to_string()
}

/// Parse a textual rating back to the Plex scale. A string that does not
/// parse as a number is treated as a tag read failure.
pub fn text_to_plex(text: &str, path: &Path) -> Result<f64> {
    let value: f64 = text.trim().parse().map_err(|_| SyncError::TagRead {
        path: path.to_path_buf(),
        message: format!("malformed RATING value {text:?}"),
    })?;
    Ok(value * 2.0)
}

/// Convert a local rating, whichever encoding it uses, to the Plex scale.
pub fn local_to_plex(rating: &LocalRating, path: &Path) -> Result<f64> {
    match rating {
        LocalRating::Frame(v) => Ok(popm_to_plex(*v)),
        LocalRating::Text(s) => text_to_plex(s, path),
    }
}
