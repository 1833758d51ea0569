//! Run configuration, read once at startup and passed by reference.
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::sheet::SheetSource;
use crate::util::env;

/// Keys included in the startup configuration snapshot.
pub const SNAPSHOT_KEYS: &[&str] = &[
    "WP_BASE_URL",
    "WP_USER",
    "WP_APP_PASS",
    "SHEET_ID",
    "SHEET_NAME",
    "SHEET_CSV_URL",
    "POST_LIMIT",
    "SYNC_MODE",
    "POST_STATUS",
    "MAX_TAGS",
    "RANDOMIZE",
    "FORCE_FEATURED_IMAGE",
    "FEATURED_IMAGE_POLICY",
    "WRITE_DELAY_MS",
    "EXCLUDED_SLUGS",
    "CONTINUE_ON_ERROR",
    "HTTP_TIMEOUT_SECS",
];

/// What to do with a candidate depending on whether its post already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Create new posts, leave existing ones alone.
    #[default]
    Skip,
    /// Update existing posts, never create.
    Update,
    /// Update existing posts and create missing ones.
    Upsert,
}

impl FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "update" => Ok(Self::Update),
            "upsert" => Ok(Self::Upsert),
            other => Err(SyncError::config(format!(
                "SYNC_MODE must be skip, update or upsert (got '{other}')"
            ))),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Skip => write!(f, "skip"),
            SyncMode::Update => write!(f, "update"),
            SyncMode::Upsert => write!(f, "upsert"),
        }
    }
}

/// When an update should (re)upload the featured image. New posts always get one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeaturedImagePolicy {
    NewOnly,
    #[default]
    WhenMissing,
    Always,
}

impl FromStr for FeaturedImagePolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "new-only" => Ok(Self::NewOnly),
            "when-missing" => Ok(Self::WhenMissing),
            "always" => Ok(Self::Always),
            other => Err(SyncError::config(format!(
                "FEATURED_IMAGE_POLICY must be new-only, when-missing or always (got '{other}')"
            ))),
        }
    }
}

/// Publish status sent with every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostStatus {
    #[default]
    Draft,
    Publish,
    Pending,
    Private,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Publish => "publish",
            PostStatus::Pending => "pending",
            PostStatus::Private => "private",
        }
    }
}

impl FromStr for PostStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "publish" => Ok(Self::Publish),
            "pending" => Ok(Self::Pending),
            "private" => Ok(Self::Private),
            other => Err(SyncError::config(format!(
                "POST_STATUS must be draft, publish, pending or private (got '{other}')"
            ))),
        }
    }
}

/// Connection settings for the target WordPress site.
#[derive(Debug, Clone)]
pub struct WpSettings {
    /// Site root without trailing slash, e.g. `https://example.com`.
    pub base_url: String,
    pub user: String,
    pub app_pass: String,
    pub timeout: Option<Duration>,
}

impl WpSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env::env_opt)
    }

    /// Only the `WP_*` keys and `HTTP_TIMEOUT_SECS` are read.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let req = |key: &str| {
            get(key).ok_or_else(|| SyncError::config(format!("Missing env: {key}")))
        };

        let base_url = req("WP_BASE_URL")?.trim().trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| SyncError::config(format!("WP_BASE_URL is not a valid URL: {e}")))?;
        let timeout = parse_opt::<u64>(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Ok(Self {
            base_url,
            user: req("WP_USER")?,
            // application passwords are sent verbatim, spaces included
            app_pass: req("WP_APP_PASS")?,
            timeout,
        })
    }

    /// REST root for the core `wp/v2` namespace.
    pub fn api_root(&self) -> String {
        format!("{}/wp-json/wp/v2", self.base_url)
    }
}

/// Knobs consumed by the sync engine.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Maximum number of writes per run; 0 means unlimited.
    pub limit: usize,
    pub post_status: PostStatus,
    pub max_tags: usize,
    pub shuffle: bool,
    pub force_featured_image: bool,
    pub featured_image_policy: FeaturedImagePolicy,
    pub write_delay: Duration,
    /// Hand-curated slugs the sync must never touch.
    pub excluded_slugs: BTreeSet<String>,
    pub continue_on_error: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::Skip,
            limit: 20,
            post_status: PostStatus::Draft,
            max_tags: 10,
            shuffle: false,
            force_featured_image: false,
            featured_image_policy: FeaturedImagePolicy::WhenMissing,
            write_delay: Duration::from_millis(1200),
            excluded_slugs: BTreeSet::new(),
            continue_on_error: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub wordpress: WpSettings,
    pub sheet: SheetSource,
    pub sync: SyncOptions,
}

impl Config {
    /// Build from the process environment (after loading `.env`).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env::env_opt)
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let wordpress = WpSettings::from_lookup(&lookup)?;

        let csv_url = get("SHEET_CSV_URL").map(|v| v.trim().to_string());
        let sheet_id = match (&csv_url, get("SHEET_ID")) {
            (_, Some(id)) => id.trim().to_string(),
            (Some(_), None) => String::new(),
            (None, None) => return Err(SyncError::config("Missing env: SHEET_ID")),
        };
        let sheet = SheetSource {
            sheet_id,
            sheet_name: get("SHEET_NAME").unwrap_or_else(|| "Sheet1".into()),
            csv_url,
        };

        let defaults = SyncOptions::default();
        let sync = SyncOptions {
            mode: get("SYNC_MODE")
                .map(|v| v.parse::<SyncMode>())
                .transpose()?
                .unwrap_or(defaults.mode),
            limit: parse_opt(get("POST_LIMIT"), "POST_LIMIT")?.unwrap_or(defaults.limit),
            post_status: get("POST_STATUS")
                .map(|v| v.parse::<PostStatus>())
                .transpose()?
                .unwrap_or(defaults.post_status),
            max_tags: parse_opt(get("MAX_TAGS"), "MAX_TAGS")?.unwrap_or(defaults.max_tags),
            shuffle: get("RANDOMIZE").is_some_and(|v| env::parse_flag(&v)),
            force_featured_image: get("FORCE_FEATURED_IMAGE").is_some_and(|v| env::parse_flag(&v)),
            featured_image_policy: get("FEATURED_IMAGE_POLICY")
                .map(|v| v.parse::<FeaturedImagePolicy>())
                .transpose()?
                .unwrap_or(defaults.featured_image_policy),
            write_delay: parse_opt::<u64>(get("WRITE_DELAY_MS"), "WRITE_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.write_delay),
            excluded_slugs: get("EXCLUDED_SLUGS")
                .map(|v| parse_slug_list(&v))
                .unwrap_or_default(),
            continue_on_error: get("CONTINUE_ON_ERROR").is_some_and(|v| env::parse_flag(&v)),
        };

        Ok(Self {
            wordpress,
            sheet,
            sync,
        })
    }
}

fn parse_opt<T>(raw: Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
{
    raw.map(|v| {
        v.trim()
            .parse::<T>()
            .map_err(|_| {
                SyncError::config(format!("{key} must be a non-negative integer (got '{v}')"))
            })
    })
    .transpose()
}

fn parse_slug_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(crate::sheet::slug_for)
        .filter(|s| !s.is_empty())
        .collect()
}
