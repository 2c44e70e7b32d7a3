/// The sync module is the reconciliation core: the per-track decision logic
/// that classifies every track into one of five outcomes, the shared outcome
/// tally, and the dispatcher that fans the work list out across a fixed pool
/// of worker threads.
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::audiotags::RatingTag;
use crate::config::{Config, MasterSource};
use crate::error::{Result, SyncError};
use crate::pathmap::PathTranslator;
use crate::ratings::{local_to_plex, LocalRating, RATING_TOLERANCE};

/// The classification of one reconciliation pass over one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Both sides already agree.
    InSync,
    /// The non-master side was updated (or would have been, under dry-run).
    Synced,
    /// Neither side has a rating.
    NoTag,
    /// Tag access failed, the format is unsupported, or a write could not be
    /// verified.
    Error,
    /// The translated path does not exist on this host.
    NotFound,
}

/// One unit of work for the dispatcher: a track flattened out of its album.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub album: String,
    pub title: String,
    pub rating_key: String,
    pub plex_rating: Option<f64>,
    /// The first catalog-reported location for the track.
    pub location: String,
}

/// The catalog-side write operation, as a seam so tests can substitute a
/// recording fake for the live Plex client.
pub trait CatalogWriter: Send + Sync {
    /// Set or, with `None`, clear a track's user rating.
    fn set_track_rating(&self, rating_key: &str, rating: Option<f64>) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub insync: usize,
    pub synced: usize,
    pub notag: usize,
    pub error: usize,
    pub notfound: usize,
    pub processed: usize,
}

impl Tally {
    fn bump(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::InSync => self.insync += 1,
            SyncOutcome::Synced => self.synced += 1,
            SyncOutcome::NoTag => self.notag += 1,
            SyncOutcome::Error => self.error += 1,
            SyncOutcome::NotFound => self.notfound += 1,
        }
    }
}

/// Process-wide outcome tally. `record` is the single critical section shared
/// by all workers: classify, count, and maybe emit a progress line, as one
/// atomic unit. That keeps progress lines from interleaving and guarantees
/// the counters sum to the number of dispatched tracks once the run is done.
pub struct Aggregator {
    state: Mutex<Tally>,
    total: usize,
    interval: usize,
    started: Instant,
}

impl Aggregator {
    pub fn new(total: usize, interval: usize) -> Aggregator {
        Aggregator {
            state: Mutex::new(Tally::default()),
            total,
            interval: interval.max(1),
            started: Instant::now(),
        }
    }

    pub fn record(&self, outcome: SyncOutcome) {
        let mut tally = self.state.lock().unwrap();
        tally.bump(outcome);
        tally.processed += 1;
        if tally.processed % self.interval == 0 {
            let elapsed = self.started.elapsed();
            let percent = tally.processed as f64 * 100.0 / self.total.max(1) as f64;
            let per_track = elapsed.as_secs_f64() / tally.processed as f64;
            let eta = Duration::from_secs_f64(per_track * (self.total.saturating_sub(tally.processed)) as f64);
            info!(
                "Processed {}/{} ({percent:.1}%), elapsed {}, eta {}",
                tally.processed,
                self.total,
                format_hms(elapsed),
                format_hms(eta)
            );
        }
    }

    pub fn snapshot(&self) -> Tally {
        self.state.lock().unwrap().clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

pub fn format_hms(d: Duration) -> String {
    let total = d.as_secs();
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Everything a worker needs for one run, constructed fresh in the entry
/// point and shared by reference across the pool. No ambient state.
pub struct RunContext<'a> {
    pub config: &'a Config,
    pub paths: PathTranslator,
    pub catalog: &'a dyn CatalogWriter,
    pub aggregator: Aggregator,
}

impl<'a> RunContext<'a> {
    pub fn new(config: &'a Config, catalog: &'a dyn CatalogWriter, total_tracks: usize) -> RunContext<'a> {
        RunContext {
            config,
            paths: PathTranslator::new(&config.plex_path_prefix, &config.host_path_prefix),
            catalog,
            aggregator: Aggregator::new(total_tracks, config.progress_interval),
        }
    }
}

/// Drain the work list on a fixed-size thread pool. Blocks until every item
/// has been recorded in the aggregate tally; one track's failure never
/// affects its siblings.
pub fn run_sync(ctx: &RunContext, items: &[WorkItem]) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.config.workers)
        .build()
        .map_err(|e| SyncError::Generic(format!("Failed to build worker pool: {e}")))?;
    pool.install(|| {
        items.par_iter().for_each(|item| {
            let outcome = reconcile_track(ctx, item);
            ctx.aggregator.record(outcome);
        });
    });
    Ok(())
}

/// Run the full pipeline for one track and classify the result. Every error
/// is contained here; nothing propagates past this boundary.
pub fn reconcile_track(ctx: &RunContext, item: &WorkItem) -> SyncOutcome {
    let host_path = ctx.paths.translate(&item.location);
    if !host_path.exists() {
        debug!("Not found: {} ({})", item.title, host_path.display());
        return SyncOutcome::NotFound;
    }
    match sync_one(ctx, item, &host_path) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Error syncing {}: {e}", item.title);
            SyncOutcome::Error
        }
    }
}

fn sync_one(ctx: &RunContext, item: &WorkItem, host_path: &Path) -> Result<SyncOutcome> {
    let tag = RatingTag::open(host_path)?;
    let local = tag.rating();
    match ctx.config.master {
        MasterSource::Plex => sync_plex_master(ctx, item, host_path, tag, local),
        MasterSource::File => sync_file_master(ctx, item, host_path, local),
    }
}

/// Plex is authoritative: the file tag is brought into line with the catalog
/// rating, and a backfill pushes a file-only rating up to an unrated catalog
/// entry. File writes are verified by re-reading from disk.
fn sync_plex_master(
    ctx: &RunContext,
    item: &WorkItem,
    host_path: &Path,
    mut tag: RatingTag,
    local: Option<LocalRating>,
) -> Result<SyncOutcome> {
    match item.plex_rating {
        Some(plex_rating) => {
            let desired = tag.format().encode(plex_rating);
            if local.as_ref() == Some(&desired) {
                debug!("Already in sync: {}", item.title);
                return Ok(SyncOutcome::InSync);
            }
            if ctx.config.dry_run {
                debug!("Would update {} with rating {desired}", item.title);
                return Ok(SyncOutcome::Synced);
            }
            tag.set_rating(&desired)?;
            tag.save()?;
            let reread = RatingTag::open(host_path)?.rating();
            if reread.as_ref() == Some(&desired) {
                debug!("Updated and verified: {} with rating {desired}", item.title);
                Ok(SyncOutcome::Synced)
            } else {
                Err(SyncError::VerificationMismatch {
                    path: host_path.to_path_buf(),
                    expected: desired.to_string(),
                    actual: reread.map(|r| r.to_string()).unwrap_or_else(|| "nothing".to_string()),
                })
            }
        }
        None => match local {
            Some(local_rating) => {
                let plex_rating = local_to_plex(&local_rating, host_path)?;
                if !ctx.config.dry_run {
                    ctx.catalog.set_track_rating(&item.rating_key, Some(plex_rating))?;
                }
                debug!("Updated Plex: {} with rating {plex_rating}", item.title);
                Ok(SyncOutcome::Synced)
            }
            None => Ok(SyncOutcome::NoTag),
        },
    }
}

/// The file tag is authoritative: the catalog follows the file, compared with
/// a tolerance that absorbs float round-trip noise. Catalog writes are
/// trusted without a re-read; a file with no rating clears the catalog side.
fn sync_file_master(ctx: &RunContext, item: &WorkItem, host_path: &Path, local: Option<LocalRating>) -> Result<SyncOutcome> {
    match local {
        Some(local_rating) => {
            let plex_equivalent = local_to_plex(&local_rating, host_path)?;
            match item.plex_rating {
                Some(current) if (plex_equivalent - current).abs() < RATING_TOLERANCE => {
                    debug!("Already in sync: {}", item.title);
                    Ok(SyncOutcome::InSync)
                }
                _ => {
                    if !ctx.config.dry_run {
                        ctx.catalog.set_track_rating(&item.rating_key, Some(plex_equivalent))?;
                    }
                    debug!("Updated Plex: {} with rating {plex_equivalent}", item.title);
                    Ok(SyncOutcome::Synced)
                }
            }
        }
        None => match item.plex_rating {
            Some(_) => {
                if !ctx.config.dry_run {
                    ctx.catalog.set_track_rating(&item.rating_key, None)?;
                }
                debug!("Cleared Plex rating: {}", item.title);
                Ok(SyncOutcome::Synced)
            }
            None => Ok(SyncOutcome::NoTag),
        },
    }
}
