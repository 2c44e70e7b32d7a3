use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, Once};

use id3::frame::{Content, Popularimeter};
use id3::{Frame, Tag as Id3Tag, TagLike};
use metaflac::Tag as FlacTag;
use tempfile::TempDir;

use crate::config::{Config, MasterSource};
use crate::error::{Result, SyncError};
use crate::sync::CatalogWriter;

static INIT: Once = Once::new();

pub fn init() -> TempDir {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")))
            .with_test_writer()
            .try_init();
    });
    TempDir::new().expect("failed to create temp dir")
}

// Fabricates a file carrying an ID3 tag, with an optional blank-user POPM
// rating. The file has no audio frames; the tag reader does not care.
pub fn write_mp3(path: &Path, rating: Option<u8>) {
    fs::write(path, b"").expect("failed to create file");
    let mut tag = Id3Tag::new();
    tag.set_title("Test Track");
    if let Some(r) = rating {
        tag.add_frame(Frame::with_content(
            "POPM",
            Content::Popularimeter(Popularimeter { user: String::new(), rating: r, counter: 0 }),
        ));
    }
    tag.write_to_path(path, id3::Version::Id3v24).expect("failed to write mp3 tag");
}

// Fabricates a minimal FLAC stream (magic + empty STREAMINFO) with an
// optional RATING Vorbis comment.
pub fn write_flac(path: &Path, rating: Option<&str>) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"fLaC");
    bytes.push(0x80); // STREAMINFO, last-metadata-block flag set
    bytes.extend_from_slice(&[0, 0, 34]);
    bytes.extend_from_slice(&[0u8; 34]);
    fs::write(path, &bytes).expect("failed to create file");
    if let Some(r) = rating {
        let mut tag = FlacTag::read_from_path(path).expect("failed to open flac");
        tag.vorbis_comments_mut().set("RATING", vec![r.to_string()]);
        tag.write_to_path(path).expect("failed to save flac tag");
    }
}

// A config whose host prefix points into the given temp directory, so
// translated paths land on real fabricated files.
pub fn config(temp_dir: &TempDir, master: MasterSource, dry_run: bool) -> Config {
    Config {
        server_url: "http://localhost:32400".to_string(),
        token: "test-token".to_string(),
        library: "Music".to_string(),
        plex_path_prefix: "/plex/music/".to_string(),
        host_path_prefix: format!("{}/", temp_dir.path().display()),
        master,
        dry_run,
        workers: 4,
        progress_interval: 100,
        log_level: "debug".to_string(),
    }
}

// In-memory catalog stand-in: records every rating write and can be told to
// fail for specific rating keys.
#[derive(Default)]
pub struct FakeCatalog {
    writes: Mutex<Vec<(String, Option<f64>)>>,
    fail_keys: HashSet<String>,
}

impl FakeCatalog {
    pub fn new() -> FakeCatalog {
        FakeCatalog::default()
    }

    pub fn failing(keys: &[&str]) -> FakeCatalog {
        FakeCatalog {
            writes: Mutex::new(Vec::new()),
            fail_keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn recorded(&self) -> Vec<(String, Option<f64>)> {
        self.writes.lock().unwrap().clone()
    }
}

impl CatalogWriter for FakeCatalog {
    fn set_track_rating(&self, rating_key: &str, rating: Option<f64>) -> Result<()> {
        if self.fail_keys.contains(rating_key) {
            return Err(SyncError::CatalogWrite(format!("simulated failure for {rating_key}")));
        }
        self.writes.lock().unwrap().push((rating_key.to_string(), rating));
        Ok(())
    }
}
