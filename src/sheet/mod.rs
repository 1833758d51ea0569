//! Spreadsheet row source: builds the CSV export URL, fetches it, and parses
//! the header + rows into [`Record`]s.
pub mod record;

pub use record::{Record, Review};

use csv::ReaderBuilder;
use itertools::Itertools;
use reqwest::Client;
use tracing::{debug, info};

use crate::error::{truncate_for_log, Result, SyncError};

const GVIZ_CSV_TEMPLATE: &str = "https://docs.google.com/spreadsheets/d/{id}/gviz/tq?tqx=out:csv&sheet={name}";

/// Where the rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSource {
    pub sheet_id: String,
    pub sheet_name: String,
    /// Full export URL; wins over the id/name template when set.
    pub csv_url: Option<String>,
}

impl SheetSource {
    pub fn csv_url(&self) -> String {
        if let Some(url) = &self.csv_url {
            return url.clone();
        }
        GVIZ_CSV_TEMPLATE
            .replace("{id}", &urlencoding::encode(&self.sheet_id))
            .replace("{name}", &urlencoding::encode(&self.sheet_name))
    }
}

/// Derive the post slug for an external identifier: lowercase of the trimmed id.
pub fn slug_for(content_id: &str) -> String {
    content_id.trim().to_lowercase()
}

/// GET the export and parse it. Any non-success status aborts with [`SyncError::Fetch`].
pub async fn fetch_records(http: &Client, url: &str) -> Result<Vec<Record>> {
    info!(%url, "sheet: fetching CSV export");
    let resp = http.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = truncate_for_log(resp.text().await.unwrap_or_default(), 500);
        return Err(SyncError::Fetch {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        });
    }
    let text = resp.text().await?;
    let records = parse_records(&text)?;
    info!(rows = records.len(), "sheet: rows parsed");
    Ok(records)
}

/// Parse comma-separated text with a header row.
///
/// Rows must have as many cells as the header. Columns with a blank header are
/// ignored; a repeated header name is an error.
pub fn parse_records(text: &str) -> Result<Vec<Record>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| SyncError::Parse(format!("header row: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if let Some(dup) = headers.iter().filter(|h| !h.is_empty()).duplicates().next() {
        return Err(SyncError::Parse(format!("header row: duplicate column '{dup}'")));
    }
    debug!(columns = headers.len(), "sheet: header parsed");

    let mut out = Vec::new();
    for (idx, row) in rdr.records().enumerate() {
        let row = row.map_err(|e| SyncError::Parse(format!("row {}: {e}", idx + 2)))?;
        let record = Record::from_pairs(
            headers
                .iter()
                .zip(row.iter())
                .filter(|(h, _)| !h.is_empty())
                .map(|(h, v)| (h.as_str(), v)),
        );
        out.push(record);
    }
    Ok(out)
}
