use indexmap::IndexMap;
use serde::Serialize;

pub const CONTENT_ID: &str = "content_id";
pub const TITLE: &str = "title";
pub const API_STATUS: &str = "api_status";
pub const AFFILIATE_URL: &str = "dmm_affiliate_url";
pub const GENRES: &str = "genres";
pub const ACTRESSES: &str = "actresses";
pub const DIRECTORS: &str = "directors";
pub const MAKER: &str = "maker";
pub const LABEL: &str = "label";
pub const SERIES: &str = "series";
pub const JACKET_IMAGE: &str = "jacket_image";

pub const MAX_SAMPLE_IMAGES: usize = 20;
pub const MAX_REVIEWS: usize = 5;

/// One spreadsheet row, keyed by header name in sheet column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    fields: IndexMap<String, String>,
}

/// A review block (`reviewN_*` columns) that has a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Review<'a> {
    pub rating: &'a str,
    pub comment: &'a str,
    pub nickname: &'a str,
    pub publish_date: &'a str,
    pub helpful_count: &'a str,
}

impl Record {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Trimmed value of a column; missing columns read as empty.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(|v| v.trim()).unwrap_or("")
    }

    pub fn content_id(&self) -> &str {
        self.get(CONTENT_ID)
    }

    /// Existence key of the post this row maps to.
    pub fn slug(&self) -> String {
        super::slug_for(self.content_id())
    }

    /// Comma-separated column split into trimmed, non-empty parts.
    pub fn list(&self, column: &str) -> Vec<&str> {
        split_list(self.get(column))
    }

    /// Non-empty `sample_image_1..=20` URLs in column order.
    pub fn sample_images(&self) -> Vec<&str> {
        (1..=MAX_SAMPLE_IMAGES)
            .map(|n| self.get(&format!("sample_image_{n}")))
            .filter(|u| !u.is_empty())
            .collect()
    }

    pub fn reviews(&self) -> Vec<Review<'_>> {
        (1..=MAX_REVIEWS)
            .filter_map(|n| {
                let comment = self.get(&format!("review{n}_comment"));
                if comment.is_empty() {
                    return None;
                }
                Some(Review {
                    rating: self.get(&format!("review{n}_rating")),
                    comment,
                    nickname: self.get(&format!("review{n}_nickname")),
                    publish_date: self.get(&format!("review{n}_publishDate")),
                    helpful_count: self.get(&format!("review{n}_helpfulCount")),
                })
            })
            .collect()
    }
}

pub(crate) fn split_list(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
