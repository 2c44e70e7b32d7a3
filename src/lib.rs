pub mod audiotags;
pub mod config;
pub mod error;
pub mod pathmap;
pub mod plex;
pub mod ratings;
pub mod sync;

pub use error::{Result, SyncError};

#[cfg(test)]
mod testing;

#[cfg(test)]
mod audiotags_test;
#[cfg(test)]
mod pathmap_test;
