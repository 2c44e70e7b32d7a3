/// The plex module is the thin catalog collaborator: a blocking HTTP client
/// for the Plex Media Server JSON API covering exactly what a sync run needs.
/// Connection and library lookup failures are fatal; a failed per-track
/// rating write surfaces as a catalog write error and is contained to its
/// track by the reconciler.
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::sync::{CatalogWriter, WorkItem};

const RATE_IDENTIFIER: &str = "com.plexapp.plugins.library";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PlexClient {
    http: Client,
    base_url: String,
    token: String,
}

pub struct PlexLibrary {
    key: String,
    pub title: String,
}

pub struct PlexAlbum {
    pub rating_key: String,
    pub title: String,
    /// Track count as reported on the album listing, used for the upfront
    /// size estimate before tracks are fetched.
    pub leaf_count: usize,
}

pub struct PlexTrack {
    pub rating_key: String,
    pub title: String,
    pub user_rating: Option<f64>,
    pub locations: Vec<String>,
}

#[derive(Deserialize)]
struct RootResponse {
    #[serde(rename = "MediaContainer")]
    container: RootContainer,
}

#[derive(Deserialize)]
struct RootContainer {
    #[serde(rename = "friendlyName")]
    friendly_name: Option<String>,
}

#[derive(Deserialize)]
struct SectionsResponse {
    #[serde(rename = "MediaContainer")]
    container: SectionsContainer,
}

#[derive(Deserialize)]
struct SectionsContainer {
    #[serde(rename = "Directory", default)]
    directories: Vec<SectionDirectory>,
}

#[derive(Deserialize)]
struct SectionDirectory {
    key: String,
    title: String,
}

#[derive(Deserialize)]
struct MetadataResponse {
    #[serde(rename = "MediaContainer")]
    container: MetadataContainer,
}

#[derive(Deserialize)]
struct MetadataContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<MetadataItem>,
}

#[derive(Deserialize)]
struct MetadataItem {
    #[serde(rename = "ratingKey")]
    rating_key: String,
    title: Option<String>,
    #[serde(rename = "userRating")]
    user_rating: Option<f64>,
    #[serde(rename = "leafCount")]
    leaf_count: Option<usize>,
    #[serde(rename = "Media", default)]
    media: Vec<MediaItem>,
}

#[derive(Deserialize)]
struct MediaItem {
    #[serde(rename = "Part", default)]
    parts: Vec<PartItem>,
}

#[derive(Deserialize)]
struct PartItem {
    file: Option<String>,
}

impl PlexClient {
    /// Open a connection to the server and confirm the token works.
    pub fn connect(server_url: &str, token: &str) -> Result<PlexClient> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Connection(e.to_string()))?;
        let client = PlexClient {
            http,
            base_url: server_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        };
        let root: RootResponse = client.get_json("/")?;
        debug!("Connected to Plex server: {}", root.container.friendly_name.as_deref().unwrap_or("(unnamed)"));
        Ok(client)
    }

    fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let response = self
            .http
            .get(&url)
            .header("X-Plex-Token", &self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| SyncError::Connection(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SyncError::Auth(format!("HTTP 401 from {url}")));
        }
        if !status.is_success() {
            return Err(SyncError::Connection(format!("HTTP {status} from {url}")));
        }
        let body = response.text().map_err(|e| SyncError::Connection(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| SyncError::Connection(format!("Malformed response from {url}: {e}")))
    }

    /// Look up a music library section by name.
    pub fn music_library(&self, name: &str) -> Result<PlexLibrary> {
        let sections: SectionsResponse = self.get_json("/library/sections")?;
        sections
            .container
            .directories
            .into_iter()
            .find(|d| d.title == name)
            .map(|d| PlexLibrary { key: d.key, title: d.title })
            .ok_or_else(|| SyncError::LibraryNotFound { name: name.to_string() })
    }

    pub fn albums(&self, library: &PlexLibrary) -> Result<Vec<PlexAlbum>> {
        let response: MetadataResponse = self.get_json(&format!("/library/sections/{}/albums", library.key))?;
        Ok(response
            .container
            .metadata
            .into_iter()
            .map(|m| PlexAlbum {
                rating_key: m.rating_key,
                title: m.title.unwrap_or_default(),
                leaf_count: m.leaf_count.unwrap_or(0),
            })
            .collect())
    }

    pub fn tracks(&self, album: &PlexAlbum) -> Result<Vec<PlexTrack>> {
        let response: MetadataResponse = self.get_json(&format!("/library/metadata/{}/children", album.rating_key))?;
        Ok(response
            .container
            .metadata
            .into_iter()
            .map(|m| PlexTrack {
                rating_key: m.rating_key,
                title: m.title.unwrap_or_default(),
                user_rating: m.user_rating,
                locations: m.media.into_iter().flat_map(|media| media.parts).filter_map(|p| p.file).collect(),
            })
            .collect())
    }

    /// Set or clear a track's user rating. Plex treats -1 as "unrated".
    pub fn set_track_rating(&self, rating_key: &str, rating: Option<f64>) -> Result<()> {
        let value = rating.unwrap_or(-1.0).to_string();
        let url = format!("{}/:/rate", self.base_url);
        let response = self
            .http
            .put(&url)
            .query(&[("key", rating_key), ("identifier", RATE_IDENTIFIER), ("rating", value.as_str())])
            .header("X-Plex-Token", &self.token)
            .send()
            .map_err(|e| SyncError::CatalogWrite(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::CatalogWrite(format!("HTTP {status} rating track {rating_key}")));
        }
        Ok(())
    }
}

impl CatalogWriter for PlexClient {
    fn set_track_rating(&self, rating_key: &str, rating: Option<f64>) -> Result<()> {
        PlexClient::set_track_rating(self, rating_key, rating)
    }
}

/// Flatten the library into the dispatcher's work list. Two passes: the
/// first sums the albums' reported track counts so the run size is known
/// before the slow per-album fetches, the second fetches each album's tracks
/// in listing order. Only a track's first reported location is kept.
pub fn build_worklist(client: &PlexClient, library: &PlexLibrary) -> Result<Vec<WorkItem>> {
    let albums = client.albums(library)?;
    let expected: usize = albums.iter().map(|a| a.leaf_count).sum();
    info!("Found {} albums (~{} tracks) in library {}", albums.len(), expected, library.title);

    let mut items = Vec::with_capacity(expected);
    for album in &albums {
        for track in client.tracks(album)? {
            let Some(location) = track.locations.into_iter().next() else {
                debug!("Track {} has no file location, skipping", track.title);
                continue;
            };
            items.push(WorkItem {
                album: album.title.clone(),
                title: track.title,
                rating_key: track.rating_key,
                plex_rating: track.user_rating,
                location,
            });
        }
    }
    Ok(items)
}
