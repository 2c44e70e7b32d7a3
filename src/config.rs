/// The config module provides the config spec and parsing logic.
///
/// Parsing is strict where it matters: a missing or invalid required key is a
/// detailed fatal error, while unrecognized keys only produce warnings.
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::{Result, SyncError};

/// Which side wins when the two ratings disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterSource {
    Plex,
    File,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Plex server, without a trailing slash.
    pub server_url: String,
    pub token: String,
    /// Name of the music library section on the server.
    pub library: String,
    /// Prefix of track paths as the Plex server reports them.
    pub plex_path_prefix: String,
    /// Prefix the same tracks are reachable under on this host.
    pub host_path_prefix: String,
    pub master: MasterSource,
    /// Observe-only mode: decisions are computed and counted but nothing is
    /// written to either side.
    pub dry_run: bool,
    pub workers: usize,
    /// Emit a progress line every this many processed tracks.
    pub progress_interval: usize,
    pub log_level: String,
}

#[derive(Deserialize, Default)]
struct RawConfig {
    server_url: Option<String>,
    token: Option<String>,
    library: Option<String>,
    plex_path_prefix: Option<String>,
    host_path_prefix: Option<String>,
    master: Option<String>,
    dry_run: Option<bool>,
    workers: Option<usize>,
    progress_interval: Option<usize>,
    log_level: Option<String>,
}

const KNOWN_KEYS: &[&str] = &[
    "server_url",
    "token",
    "library",
    "plex_path_prefix",
    "host_path_prefix",
    "master",
    "dry_run",
    "workers",
    "progress_interval",
    "log_level",
];

fn require(value: Option<String>, key: &str, path: &Path) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(SyncError::ConfigInvalidValue {
            key: key.to_string(),
            path: path.to_path_buf(),
            message: "must be a non-empty string".to_string(),
        }),
        None => Err(SyncError::ConfigMissingKey { key: key.to_string(), path: path.to_path_buf() }),
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("ratesync").join("config.toml")
    }

    pub fn parse(path: Option<&Path>) -> Result<Config> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Config::default_path);

        let contents = fs::read_to_string(&path).map_err(|_| SyncError::ConfigNotFound { path: path.clone() })?;
        let value: toml::Value = toml::from_str(&contents).map_err(|e| SyncError::ConfigDecode {
            path: path.clone(),
            message: e.to_string(),
        })?;

        if let Some(table) = value.as_table() {
            for key in table.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    warn!("Unrecognized configuration key: {key}");
                }
            }
        }

        let raw: RawConfig = value.try_into().map_err(|e| SyncError::ConfigDecode {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let mut server_url = require(raw.server_url, "server_url", &path)?;
        while server_url.ends_with('/') {
            server_url.pop();
        }
        let token = require(raw.token, "token", &path)?;
        let library = require(raw.library, "library", &path)?;
        let plex_path_prefix = require(raw.plex_path_prefix, "plex_path_prefix", &path)?;
        let host_path_prefix = shellexpand::tilde(&require(raw.host_path_prefix, "host_path_prefix", &path)?).to_string();

        let master = match require(raw.master, "master", &path)?.to_lowercase().as_str() {
            "plex" => MasterSource::Plex,
            "file" => MasterSource::File,
            other => {
                return Err(SyncError::ConfigInvalidValue {
                    key: "master".to_string(),
                    path,
                    message: format!("must be \"plex\" or \"file\", got {other:?}"),
                })
            }
        };

        let workers = raw.workers.unwrap_or(4);
        if workers == 0 {
            return Err(SyncError::ConfigInvalidValue {
                key: "workers".to_string(),
                path,
                message: "must be at least 1".to_string(),
            });
        }
        let progress_interval = raw.progress_interval.unwrap_or(100);
        if progress_interval == 0 {
            return Err(SyncError::ConfigInvalidValue {
                key: "progress_interval".to_string(),
                path,
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Config {
            server_url,
            token,
            library,
            plex_path_prefix,
            host_path_prefix,
            master,
            // The cautious default: a live run must be asked for explicitly.
            dry_run: raw.dry_run.unwrap_or(true),
            workers,
            progress_interval,
            log_level: raw.log_level.unwrap_or_else(|| "info".to_string()),
        })
    }
}
