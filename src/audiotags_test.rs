use std::path::Path;

use id3::frame::{Content, Popularimeter};
use id3::{Frame, Tag as Id3Tag, TagLike};

use crate::audiotags::*;
use crate::error::SyncError;
use crate::ratings::LocalRating;
use crate::testing;

#[test]
fn test_format_from_path() {
    assert_eq!(TagFormat::from_path(Path::new("/a/b.mp3")).unwrap(), TagFormat::Mp3);
    assert_eq!(TagFormat::from_path(Path::new("/a/b.FLAC")).unwrap(), TagFormat::Flac);
    assert!(matches!(TagFormat::from_path(Path::new("/a/b.ogg")), Err(SyncError::UnsupportedFormat { .. })));
    assert!(matches!(TagFormat::from_path(Path::new("/a/noext")), Err(SyncError::UnsupportedFormat { .. })));
}

#[test]
fn test_encode() {
    assert_eq!(TagFormat::Mp3.encode(8.0), LocalRating::Frame(196));
    assert_eq!(TagFormat::Flac.encode(8.0), LocalRating::Text("4".to_string()));
}

#[test]
fn test_mp3_read_write_rating() {
    let temp_dir = testing::init();
    let path = temp_dir.path().join("track.mp3");
    testing::write_mp3(&path, Some(196));

    assert_eq!(RatingTag::open(&path).unwrap().rating(), Some(LocalRating::Frame(196)));

    let mut tag = RatingTag::open(&path).unwrap();
    tag.set_rating(&LocalRating::Frame(64)).unwrap();
    tag.save().unwrap();

    assert_eq!(RatingTag::open(&path).unwrap().rating(), Some(LocalRating::Frame(64)));
}

#[test]
fn test_mp3_without_popm_has_no_rating() {
    let temp_dir = testing::init();
    let path = temp_dir.path().join("track.mp3");
    testing::write_mp3(&path, None);
    assert_eq!(RatingTag::open(&path).unwrap().rating(), None);
}

#[test]
fn test_mp3_ignores_foreign_popm_and_preserves_it_on_write() {
    let temp_dir = testing::init();
    let path = temp_dir.path().join("track.mp3");
    testing::write_mp3(&path, None);

    // Another application's rating frame, keyed by its email.
    let mut raw = Id3Tag::read_from_path(&path).unwrap();
    raw.add_frame(Frame::with_content(
        "POPM",
        Content::Popularimeter(Popularimeter { user: "other@example.com".to_string(), rating: 42, counter: 7 }),
    ));
    raw.write_to_path(&path, id3::Version::Id3v24).unwrap();

    // The foreign frame is not our rating.
    assert_eq!(RatingTag::open(&path).unwrap().rating(), None);

    let mut tag = RatingTag::open(&path).unwrap();
    tag.set_rating(&LocalRating::Frame(128)).unwrap();
    tag.save().unwrap();

    assert_eq!(RatingTag::open(&path).unwrap().rating(), Some(LocalRating::Frame(128)));
    let raw = Id3Tag::read_from_path(&path).unwrap();
    let foreign: Vec<&Popularimeter> = raw
        .frames()
        .filter_map(|f| match f.content() {
            Content::Popularimeter(p) if !p.user.is_empty() => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(foreign.len(), 1);
    assert_eq!(foreign[0].rating, 42);
    assert_eq!(foreign[0].counter, 7);
}

#[test]
fn test_mp3_preserves_play_counter_on_rating_update() {
    let temp_dir = testing::init();
    let path = temp_dir.path().join("track.mp3");
    testing::write_mp3(&path, None);

    let mut raw = Id3Tag::read_from_path(&path).unwrap();
    raw.add_frame(Frame::with_content(
        "POPM",
        Content::Popularimeter(Popularimeter { user: String::new(), rating: 1, counter: 99 }),
    ));
    raw.write_to_path(&path, id3::Version::Id3v24).unwrap();

    let mut tag = RatingTag::open(&path).unwrap();
    tag.set_rating(&LocalRating::Frame(255)).unwrap();
    tag.save().unwrap();

    let raw = Id3Tag::read_from_path(&path).unwrap();
    let ours: Vec<&Popularimeter> = raw
        .frames()
        .filter_map(|f| match f.content() {
            Content::Popularimeter(p) if p.user.is_empty() => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(ours.len(), 1);
    assert_eq!(ours[0].rating, 255);
    assert_eq!(ours[0].counter, 99);
}

#[test]
fn test_flac_read_write_rating() {
    let temp_dir = testing::init();
    let path = temp_dir.path().join("track.flac");
    testing::write_flac(&path, Some("3"));

    assert_eq!(RatingTag::open(&path).unwrap().rating(), Some(LocalRating::Text("3".to_string())));

    let mut tag = RatingTag::open(&path).unwrap();
    tag.set_rating(&LocalRating::Text("5".to_string())).unwrap();
    tag.save().unwrap();

    assert_eq!(RatingTag::open(&path).unwrap().rating(), Some(LocalRating::Text("5".to_string())));
}

#[test]
fn test_flac_without_rating_field() {
    let temp_dir = testing::init();
    let path = temp_dir.path().join("track.flac");
    testing::write_flac(&path, None);
    assert_eq!(RatingTag::open(&path).unwrap().rating(), None);
}

#[test]
fn test_open_fails_on_garbage() {
    let temp_dir = testing::init();

    let flac = temp_dir.path().join("broken.flac");
    std::fs::write(&flac, b"this is not a flac stream").unwrap();
    assert!(matches!(RatingTag::open(&flac), Err(SyncError::TagRead { .. })));

    // An MP3 without any ID3 header cannot tell us its rating either.
    let mp3 = temp_dir.path().join("headerless.mp3");
    std::fs::write(&mp3, b"\xff\xfb\x90\x00 not really audio").unwrap();
    assert!(matches!(RatingTag::open(&mp3), Err(SyncError::TagRead { .. })));
}

#[test]
fn test_open_rejects_unsupported_extension() {
    let temp_dir = testing::init();
    let path = temp_dir.path().join("track.ogg");
    std::fs::write(&path, b"OggS").unwrap();
    assert!(matches!(RatingTag::open(&path), Err(SyncError::UnsupportedFormat { .. })));
}
