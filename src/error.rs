use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Failure cases of a sync run.
///
/// Everything except [`SyncError::Media`] aborts the run; media failures are
/// caught by the post writer and the post is written without a featured image.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required setting is missing or a value does not parse.
    #[error("configuration error: {0}")]
    Config(String),

    /// The spreadsheet export endpoint answered with a non-success status.
    #[error("sheet fetch failed: {status} url={url} body={body}")]
    Fetch {
        status: u16,
        url: String,
        body: String,
    },

    /// The export body is not well-formed tabular text.
    #[error("sheet parse error: {0}")]
    Parse(String),

    /// The WordPress REST API answered with a non-success status.
    #[error("WP error {status}: {method} {url} body={body}")]
    Api {
        status: u16,
        method: &'static str,
        url: String,
        body: String,
    },

    /// Featured image download or upload failed.
    #[error("media error: {0}")]
    Media(String),

    /// Transport-level failure from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Raised when a response body is not the JSON shape we expect.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

pub(crate) fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}
