/// The audiotags module abstracts over rating tag reading and writing for the
/// two supported audio formats, exposing a single interface for both.
///
/// MP3 files keep their rating in the POPM frame with a blank user string;
/// POPM frames carrying other users' ratings are left untouched, and the play
/// counter of the blank-user frame survives a rating update. FLAC files keep
/// theirs in the first value of the RATING Vorbis comment.
use std::path::{Path, PathBuf};

use id3::frame::{Content, Popularimeter};
use id3::{Frame, Tag as Id3Tag, TagLike};
use metaflac::Tag as FlacTag;

use crate::error::{Result, SyncError};
use crate::ratings::{plex_to_popm, plex_to_text, LocalRating};

pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".flac"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    Mp3,
    Flac,
}

impl TagFormat {
    /// Classify a file by its lowercased extension. An extension outside
    /// SUPPORTED_AUDIO_EXTENSIONS is an error, never a silent skip.
    pub fn from_path(p: &Path) -> Result<TagFormat> {
        let extension = p.extension().and_then(|s| s.to_str()).map(|s| format!(".{}", s.to_lowercase())).unwrap_or_default();
        if !SUPPORTED_AUDIO_EXTENSIONS.contains(&extension.as_str()) {
            return Err(SyncError::UnsupportedFormat { path: p.to_path_buf() });
        }
        match extension.as_str() {
            ".mp3" => Ok(TagFormat::Mp3),
            _ => Ok(TagFormat::Flac),
        }
    }

    /// Encode a Plex rating in this format's native representation.
    pub fn encode(&self, plex_rating: f64) -> LocalRating {
        match self {
            TagFormat::Mp3 => LocalRating::Frame(plex_to_popm(plex_rating)),
            TagFormat::Flac => LocalRating::Text(plex_to_text(plex_rating)),
        }
    }
}

enum TagContainer {
    Mp3(Id3Tag),
    Flac(FlacTag),
}

/// An opened tag container, scoped to the rating field.
pub struct RatingTag {
    path: PathBuf,
    inner: TagContainer,
}

impl RatingTag {
    pub fn open(path: &Path) -> Result<RatingTag> {
        let inner = match TagFormat::from_path(path)? {
            // A missing ID3 header is a read error, same as any other parse
            // failure: the file exists but we cannot tell what its rating is.
            TagFormat::Mp3 => TagContainer::Mp3(Id3Tag::read_from_path(path).map_err(|e| SyncError::TagRead {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?),
            TagFormat::Flac => TagContainer::Flac(FlacTag::read_from_path(path).map_err(|e| SyncError::TagRead {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?),
        };
        Ok(RatingTag { path: path.to_path_buf(), inner })
    }

    pub fn format(&self) -> TagFormat {
        match self.inner {
            TagContainer::Mp3(_) => TagFormat::Mp3,
            TagContainer::Flac(_) => TagFormat::Flac,
        }
    }

    /// The rating currently embedded in the container, if any.
    pub fn rating(&self) -> Option<LocalRating> {
        match &self.inner {
            TagContainer::Mp3(tag) => {
                for frame in tag.frames() {
                    if let Content::Popularimeter(popm) = frame.content() {
                        if popm.user.is_empty() {
                            return Some(LocalRating::Frame(popm.rating));
                        }
                    }
                }
                None
            }
            TagContainer::Flac(tag) => {
                let value = tag.vorbis_comments().and_then(|vc| vc.get("RATING")).and_then(|values| values.first());
                // An empty RATING value is no rating at all.
                value.filter(|s| !s.is_empty()).map(|s| LocalRating::Text(s.clone()))
            }
        }
    }

    /// Stage a new rating value. The encoding must match the container's
    /// format; the reconciler always derives it from `TagFormat::encode`.
    pub fn set_rating(&mut self, rating: &LocalRating) -> Result<()> {
        match (&mut self.inner, rating) {
            (TagContainer::Mp3(tag), LocalRating::Frame(value)) => {
                // Pull out every POPM frame, preserve foreign ones verbatim
                // and the blank-user frame's play counter.
                let mut counter = 0;
                let mut foreign = Vec::new();
                for frame in tag.remove("POPM") {
                    if let Content::Popularimeter(popm) = frame.content() {
                        if popm.user.is_empty() {
                            counter = popm.counter;
                        } else {
                            foreign.push(popm.clone());
                        }
                    }
                }
                for popm in foreign {
                    tag.add_frame(Frame::with_content("POPM", Content::Popularimeter(popm)));
                }
                tag.add_frame(Frame::with_content(
                    "POPM",
                    Content::Popularimeter(Popularimeter { user: String::new(), rating: *value, counter }),
                ));
                Ok(())
            }
            (TagContainer::Flac(tag), LocalRating::Text(value)) => {
                tag.vorbis_comments_mut().set("RATING", vec![value.clone()]);
                Ok(())
            }
            _ => Err(SyncError::TagWrite {
                path: self.path.clone(),
                message: "Impossible: rating encoding does not match the container format".to_string(),
            }),
        }
    }

    /// Persist staged changes to disk.
    pub fn save(&mut self) -> Result<()> {
        match &mut self.inner {
            TagContainer::Mp3(tag) => tag.write_to_path(&self.path, id3::Version::Id3v24).map_err(|e| SyncError::TagWrite {
                path: self.path.clone(),
                message: e.to_string(),
            }),
            TagContainer::Flac(tag) => tag.write_to_path(&self.path).map_err(|e| SyncError::TagWrite {
                path: self.path.clone(),
                message: e.to_string(),
            }),
        }
    }
}
