use std::path::PathBuf;
use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::EnvFilter;

use ratesync::config::Config;
use ratesync::error::Result;
use ratesync::plex::{build_worklist, PlexClient};
use ratesync::sync::{format_hms, run_sync, RunContext};

fn init_logging(level: &str) {
    // RUST_LOG wins when set; reqwest/hyper are kept quiet either way so
    // per-request chatter does not drown the sync log.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("{level},reqwest=warn,hyper=warn")));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::parse(config_path.as_deref())?;
    init_logging(&config.log_level);

    if config.dry_run {
        info!("Dry run: computing sync decisions without writing anything");
    }

    let client = PlexClient::connect(&config.server_url, &config.token)?;
    let library = client.music_library(&config.library)?;
    let items = build_worklist(&client, &library)?;
    info!("Syncing {} tracks with {} workers", items.len(), config.workers);

    let ctx = RunContext::new(&config, &client, items.len());
    run_sync(&ctx, &items)?;

    let tally = ctx.aggregator.snapshot();
    info!("Summary:");
    info!("{} files already in sync", tally.insync);
    info!("{} newly synced files", tally.synced);
    info!("{} files with no rating on either side", tally.notag);
    info!("{} files had errors", tally.error);
    info!("{} files not found", tally.notfound);
    info!("{} tracks processed in {}", tally.processed, format_hms(ctx.aggregator.elapsed()));
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ratesync: {e}");
            ExitCode::FAILURE
        }
    }
}
