use std::path::PathBuf;

use crate::pathmap::PathTranslator;

#[test]
fn test_translate_replaces_prefix() {
    let translator = PathTranslator::new("/Music/", "/mnt/Music/");
    assert_eq!(translator.translate("/Music/Artist/Album/01.mp3"), PathBuf::from("/mnt/Music/Artist/Album/01.mp3"));
}

#[test]
fn test_translate_unmatched_prefix_returns_input_unchanged() {
    let translator = PathTranslator::new("/Music/", "/mnt/Music/");
    assert_eq!(translator.translate("/Other/Album/01.mp3"), PathBuf::from("/Other/Album/01.mp3"));
}

#[test]
fn test_translate_is_idempotent_and_cached() {
    let translator = PathTranslator::new("/Music/", "/mnt/Music/");
    let first = translator.translate("/Music/a/b.flac");
    let second = translator.translate("/Music/a/b.flac");
    assert_eq!(first, second);
    assert_eq!(translator.cached_len(), 1);

    translator.translate("/Music/a/c.flac");
    assert_eq!(translator.cached_len(), 2);
}

#[test]
fn test_translate_normalizes_separators_to_host_style() {
    let to_windows = PathTranslator::new("/Music/", "C:\\Music\\");
    assert_eq!(to_windows.translate("/Music/Artist/01.mp3"), PathBuf::from("C:\\Music\\Artist\\01.mp3"));

    let to_unix = PathTranslator::new("C:\\Music\\", "/mnt/music/");
    assert_eq!(to_unix.translate("C:\\Music\\Artist\\01.mp3"), PathBuf::from("/mnt/music/Artist/01.mp3"));
}

#[test]
fn test_translate_is_total() {
    let translator = PathTranslator::new("/Music/", "/mnt/Music/");
    // Never fails, whatever the input looks like.
    translator.translate("");
    translator.translate("/Music/");
    translator.translate("not a path at all \u{1F3B5}");
}
