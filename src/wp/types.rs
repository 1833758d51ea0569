use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Taxonomies a post is classified under. Custom ones share their REST base
/// with the payload field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Taxonomy {
    Genre,
    Actress,
    Director,
    Maker,
    Label,
    Series,
    Tag,
}

impl Taxonomy {
    /// Custom taxonomies, in the order they are resolved for a post.
    pub const CUSTOM: [Taxonomy; 6] = [
        Taxonomy::Genre,
        Taxonomy::Actress,
        Taxonomy::Director,
        Taxonomy::Maker,
        Taxonomy::Label,
        Taxonomy::Series,
    ];

    /// Path segment under `/wp/v2`, also the post payload field.
    pub fn rest_base(&self) -> &'static str {
        match self {
            Taxonomy::Genre => "genre",
            Taxonomy::Actress => "actress",
            Taxonomy::Director => "director",
            Taxonomy::Maker => "maker",
            Taxonomy::Label => "label",
            Taxonomy::Series => "series",
            Taxonomy::Tag => "tags",
        }
    }
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rest_base())
    }
}

/// Post as returned by `GET /posts`; only the fields the sync inspects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WpPost {
    pub id: u64,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub status: String,
    /// 0 when the post has no featured image.
    #[serde(default)]
    pub featured_media: u64,
}

impl WpPost {
    pub fn has_featured_media(&self) -> bool {
        self.featured_media != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WpTerm {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WpMedia {
    pub id: u64,
    #[serde(default)]
    pub source_url: String,
}

/// Body for `POST /posts` and `POST /posts/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostPayload {
    pub title: String,
    pub slug: String,
    pub status: String,
    pub content: String,
    pub tags: Vec<u64>,
    pub genre: Vec<u64>,
    pub actress: Vec<u64>,
    pub director: Vec<u64>,
    pub maker: Vec<u64>,
    pub label: Vec<u64>,
    pub series: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_media: Option<u64>,
}

impl PostPayload {
    /// Term id list for a taxonomy field.
    pub fn terms_mut(&mut self, taxonomy: Taxonomy) -> &mut Vec<u64> {
        match taxonomy {
            Taxonomy::Genre => &mut self.genre,
            Taxonomy::Actress => &mut self.actress,
            Taxonomy::Director => &mut self.director,
            Taxonomy::Maker => &mut self.maker,
            Taxonomy::Label => &mut self.label,
            Taxonomy::Series => &mut self.series,
            Taxonomy::Tag => &mut self.tags,
        }
    }
}

/// A downloaded image ready to be re-uploaded to the media library.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub filename: String,
    pub content_type: String,
    pub body: Bytes,
}
