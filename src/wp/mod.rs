//! WordPress REST surface used by the sync: posts, taxonomy terms and media.
pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod types;

pub use client::WpClient;
pub use types::{MediaUpload, PostPayload, Taxonomy, WpMedia, WpPost, WpTerm};

use async_trait::async_trait;

use crate::error::Result;

/// Calls the sync engine makes against the target platform.
///
/// Every method maps to one HTTP request. Implementations return
/// [`crate::SyncError::Api`] for non-success responses.
#[async_trait]
pub trait WordPress: Send + Sync {
    /// `GET /posts?slug=<slug>&per_page=1`; `None` when no post has the slug.
    async fn find_post(&self, slug: &str) -> Result<Option<WpPost>>;

    /// `GET /posts?per_page=<n>`, used by the connectivity check.
    async fn list_posts(&self, per_page: u32) -> Result<Vec<WpPost>>;

    async fn create_post(&self, payload: &PostPayload) -> Result<WpPost>;

    async fn update_post(&self, id: u64, payload: &PostPayload) -> Result<WpPost>;

    /// `GET /{taxonomy}?search=<name>&per_page=100`.
    async fn search_terms(&self, taxonomy: Taxonomy, name: &str) -> Result<Vec<WpTerm>>;

    async fn create_term(&self, taxonomy: Taxonomy, name: &str) -> Result<WpTerm>;

    /// Fetch an image from an arbitrary URL. Failures are [`crate::SyncError::Media`].
    /// `fallback_name` is used when the URL has no usable file name.
    async fn download_image(&self, url: &str, fallback_name: &str) -> Result<MediaUpload>;

    /// `POST /media` with the raw image body.
    async fn upload_media(&self, upload: MediaUpload) -> Result<WpMedia>;
}
