//! Qualification of sheet rows before any platform call.
use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::sheet::record::{AFFILIATE_URL, API_STATUS};
use crate::sheet::Record;

const STATUS_OK_PREFIX: &str = "ok";

/// A row qualifies when its API lookup succeeded and it has both an id and a
/// referral link.
pub fn is_candidate(record: &Record) -> bool {
    let status = record.get(API_STATUS);
    let status_ok = status
        .get(..STATUS_OK_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(STATUS_OK_PREFIX));
    status_ok && !record.content_id().is_empty() && !record.get(AFFILIATE_URL).is_empty()
}

/// Keep qualifying rows, drop repeated slugs (first row wins), and optionally
/// shuffle the survivors.
pub fn select_candidates<R>(records: Vec<Record>, shuffle: bool, rng: &mut R) -> Vec<Record>
where
    R: Rng + ?Sized,
{
    let total = records.len();
    let mut seen = HashSet::new();
    let mut out: Vec<Record> = Vec::with_capacity(total);
    for record in records {
        if !is_candidate(&record) {
            continue;
        }
        let slug = record.slug();
        if !seen.insert(slug.clone()) {
            warn!(%slug, "sync: duplicate content_id in sheet; keeping first row");
            continue;
        }
        out.push(record);
    }
    if shuffle {
        out.shuffle(rng);
    }
    debug!(total, candidates = out.len(), shuffle, "sync: candidates selected");
    out
}
