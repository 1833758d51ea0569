//! Sheet → platform sync: candidate selection, tag mapping and the write loop.
pub mod engine;
pub mod filter;
pub mod tags;

pub use engine::{Outcome, SyncEngine, SyncSummary};
pub use filter::{is_candidate, select_candidates};
pub use tags::{canonical_tag, map_tags};

use rand::Rng;
use tracing::info;

use crate::config::{Config, SyncOptions};
use crate::error::Result;
use crate::sheet::{self, Record};
use crate::wp::{WordPress, WpClient};

/// Fetch the sheet and sync it against the configured site.
pub async fn run(config: &Config) -> Result<SyncSummary> {
    let client = WpClient::new(&config.wordpress)?;
    let records = sheet::fetch_records(client.http(), &config.sheet.csv_url()).await?;
    run_with(&client, records, &config.sync, &mut rand::thread_rng()).await
}

/// Select candidates from already-fetched rows and run the write loop.
pub async fn run_with<R>(
    wp: &dyn WordPress,
    records: Vec<Record>,
    opts: &SyncOptions,
    rng: &mut R,
) -> Result<SyncSummary>
where
    R: Rng + ?Sized,
{
    let candidates = select_candidates(records, opts.shuffle, rng);
    SyncEngine::new(wp, opts).run(candidates).await
}

/// Authenticated probe: list one post and report how many came back.
pub async fn check_connection(wp: &dyn WordPress) -> Result<usize> {
    let posts = wp.list_posts(1).await?;
    info!(count = posts.len(), "sync: connection check passed");
    Ok(posts.len())
}
