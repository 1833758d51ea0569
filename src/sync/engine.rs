//! Per-record create/update decision and write.
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::tags::map_tags;
use crate::config::{FeaturedImagePolicy, SyncMode, SyncOptions};
use crate::error::Result;
use crate::render::build_post_html;
use crate::sheet::record::{
    Record, ACTRESSES, DIRECTORS, GENRES, JACKET_IMAGE, LABEL, MAKER, SERIES, TITLE,
};
use crate::taxonomy::TermResolver;
use crate::wp::{PostPayload, Taxonomy, WordPress, WpPost};

const NO_SERIES: &str = "----";

/// Terminal state of one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    /// Post exists and the mode only creates.
    SkippedExisting,
    /// Post is missing and the mode only updates.
    SkippedMissing,
    /// Slug is on the do-not-touch list.
    Excluded,
}

impl Outcome {
    pub fn is_write(&self) -> bool {
        matches!(self, Outcome::Created | Outcome::Updated)
    }
}

/// What mode dispatch decided for a looked-up slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create,
    Update(WpPost),
    Skip(Outcome),
}

pub fn decide(mode: SyncMode, existing: Option<WpPost>) -> Action {
    match (mode, existing) {
        (SyncMode::Skip, Some(_)) => Action::Skip(Outcome::SkippedExisting),
        (SyncMode::Skip | SyncMode::Upsert, None) => Action::Create,
        (SyncMode::Update, None) => Action::Skip(Outcome::SkippedMissing),
        (SyncMode::Update | SyncMode::Upsert, Some(post)) => Action::Update(post),
    }
}

/// Whether this write should carry a freshly uploaded featured image.
pub fn wants_featured_image(opts: &SyncOptions, existing: Option<&WpPost>) -> bool {
    let Some(post) = existing else {
        return true;
    };
    if opts.force_featured_image {
        return true;
    }
    match opts.featured_image_policy {
        FeaturedImagePolicy::Always => true,
        FeaturedImagePolicy::WhenMissing => !post.has_featured_media(),
        FeaturedImagePolicy::NewOnly => false,
    }
}

/// Per-run counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub candidates: usize,
    /// Writes that counted against the limit.
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped_existing: usize,
    pub skipped_missing: usize,
    pub excluded: usize,
    pub failed: usize,
    pub media_uploaded: usize,
    pub media_failed: usize,
    pub terms_created: usize,
}

impl SyncSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::SkippedExisting => self.skipped_existing += 1,
            Outcome::SkippedMissing => self.skipped_missing += 1,
            Outcome::Excluded => self.excluded += 1,
        }
        if outcome.is_write() {
            self.processed += 1;
        }
    }
}

/// Sequential sync of candidates against one platform.
///
/// Records are handled strictly one after another: the term cache is shared
/// across records and the write pause only makes sense without overlap.
pub struct SyncEngine<'a> {
    wp: &'a dyn WordPress,
    opts: &'a SyncOptions,
    terms: TermResolver<'a>,
    summary: SyncSummary,
}

impl<'a> SyncEngine<'a> {
    pub fn new(wp: &'a dyn WordPress, opts: &'a SyncOptions) -> Self {
        Self {
            wp,
            opts,
            terms: TermResolver::new(wp),
            summary: SyncSummary::default(),
        }
    }

    /// Process candidates until they run out or `limit` writes have happened.
    pub async fn run(mut self, candidates: Vec<Record>) -> Result<SyncSummary> {
        self.summary.candidates = candidates.len();
        info!(
            candidates = candidates.len(),
            mode = %self.opts.mode,
            limit = self.opts.limit,
            status = self.opts.post_status.as_str(),
            "sync: starting"
        );

        for record in &candidates {
            if self.opts.limit > 0 && self.summary.processed >= self.opts.limit {
                info!(limit = self.opts.limit, "sync: post limit reached");
                break;
            }
            match self.sync_record(record).await {
                Ok(outcome) => {
                    self.summary.record(outcome);
                    if outcome.is_write() && !self.opts.write_delay.is_zero() {
                        sleep(self.opts.write_delay).await;
                    }
                }
                Err(err) if self.opts.continue_on_error => {
                    warn!(slug = %record.slug(), %err, "sync: record failed; continuing");
                    self.summary.failed += 1;
                }
                Err(err) => return Err(err),
            }
        }

        self.summary.terms_created = self.terms.stats().created;
        info!(
            processed = self.summary.processed,
            created = self.summary.created,
            updated = self.summary.updated,
            skipped_existing = self.summary.skipped_existing,
            skipped_missing = self.summary.skipped_missing,
            excluded = self.summary.excluded,
            failed = self.summary.failed,
            "sync: complete"
        );
        Ok(self.summary)
    }

    /// Look up, dispatch and write a single record.
    pub async fn sync_record(&mut self, record: &Record) -> Result<Outcome> {
        let slug = record.slug();
        if self.opts.excluded_slugs.contains(&slug) {
            info!(%slug, "sync: slug is excluded; not touching");
            return Ok(Outcome::Excluded);
        }

        let existing = self.wp.find_post(&slug).await?;
        let wants_image = wants_featured_image(self.opts, existing.as_ref());
        let action = decide(self.opts.mode, existing);
        if let Action::Skip(outcome) = action {
            info!(%slug, ?outcome, "sync: skipped");
            return Ok(outcome);
        }

        let mut payload = self.build_payload(record, &slug).await?;
        if wants_image {
            payload.featured_media = self.featured_media(record, &slug).await;
        }

        match action {
            Action::Create => {
                let post = self.wp.create_post(&payload).await?;
                info!(%slug, id = post.id, status = %post.status, "sync: created post");
                Ok(Outcome::Created)
            }
            Action::Update(existing) => {
                let post = self.wp.update_post(existing.id, &payload).await?;
                info!(%slug, id = post.id, "sync: updated post");
                Ok(Outcome::Updated)
            }
            Action::Skip(outcome) => Ok(outcome),
        }
    }

    async fn build_payload(&mut self, record: &Record, slug: &str) -> Result<PostPayload> {
        let title = match record.get(TITLE) {
            "" => record.content_id(),
            t => t,
        };
        let mut payload = PostPayload {
            title: title.to_string(),
            slug: slug.to_string(),
            status: self.opts.post_status.as_str().to_string(),
            content: build_post_html(record),
            ..PostPayload::default()
        };

        for taxonomy in Taxonomy::CUSTOM {
            let names = term_names(record, taxonomy);
            let ids = self.terms.resolve_all(taxonomy, &names).await?;
            *payload.terms_mut(taxonomy) = ids;
        }
        let tags = map_tags(record.get(GENRES), self.opts.max_tags);
        payload.tags = self.terms.resolve_all(Taxonomy::Tag, &tags).await?;

        debug!(
            slug,
            tags = payload.tags.len(),
            genres = payload.genre.len(),
            actresses = payload.actress.len(),
            "sync: payload assembled"
        );
        Ok(payload)
    }

    /// Download the jacket image and push it to the media library. Failures
    /// leave the post without a featured image.
    async fn featured_media(&mut self, record: &Record, slug: &str) -> Option<u64> {
        let url = record.get(JACKET_IMAGE);
        if url.is_empty() {
            debug!(slug, "media: no jacket image");
            return None;
        }
        let wp = self.wp;
        let upload = async {
            let image = wp.download_image(url, &format!("{slug}.jpg")).await?;
            wp.upload_media(image).await
        };
        match upload.await {
            Ok(media) => {
                self.summary.media_uploaded += 1;
                info!(slug, media_id = media.id, "media: featured image uploaded");
                Some(media.id)
            }
            Err(err) => {
                self.summary.media_failed += 1;
                warn!(slug, %err, "media: featured image failed; writing post without it");
                None
            }
        }
    }
}

fn term_names(record: &Record, taxonomy: Taxonomy) -> Vec<&str> {
    let column = match taxonomy {
        Taxonomy::Genre => GENRES,
        Taxonomy::Actress => ACTRESSES,
        Taxonomy::Director => DIRECTORS,
        Taxonomy::Maker => MAKER,
        Taxonomy::Label => LABEL,
        Taxonomy::Series => SERIES,
        Taxonomy::Tag => return Vec::new(),
    };
    record
        .list(column)
        .into_iter()
        .filter(|n| *n != NO_SERIES)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::PostStatus;
    use crate::wp::fake::{Call, FakeWordPress};

    fn opts(mode: SyncMode) -> SyncOptions {
        SyncOptions {
            mode,
            write_delay: Duration::ZERO,
            ..SyncOptions::default()
        }
    }

    fn test_record(id: &str) -> Record {
        Record::from_pairs([
            ("content_id", id),
            ("title", "Test title"),
            ("api_status", "OK:ready"),
            ("dmm_affiliate_url", "https://example.com"),
        ])
    }

    fn full_record(id: &str) -> Record {
        Record::from_pairs([
            ("content_id", id),
            ("title", "Full"),
            ("api_status", "OK"),
            ("dmm_affiliate_url", "https://example.com"),
            ("genres", "素人,未知ジャンル,フェラ"),
            ("actresses", "Alice,Bob"),
            ("directors", "Dan"),
            ("maker", "Studio"),
            ("label", "Label"),
            ("series", "----"),
            ("jacket_image", "https://pics.test/jacket.jpg"),
        ])
    }

    #[tokio::test]
    async fn creates_new_post_with_configured_status() {
        let wp = FakeWordPress::new();
        let mut o = opts(SyncMode::Skip);
        o.post_status = PostStatus::Publish;

        let summary = SyncEngine::new(&wp, &o)
            .run(vec![test_record("TEST-001")])
            .await
            .unwrap();

        let writes = wp.writes();
        assert_eq!(writes.len(), 1);
        match &writes[0] {
            Call::CreatePost(p) => {
                assert_eq!(p.slug, "test-001");
                assert_eq!(p.status, "publish");
                assert_eq!(p.title, "Test title");
            }
            other => panic!("expected create, got {other:?}"),
        }
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.created, 1);
    }

    #[tokio::test]
    async fn skip_mode_leaves_existing_posts_alone() {
        let wp = FakeWordPress::new().with_post("test-001", 0);
        let o = opts(SyncMode::Skip);

        let summary = SyncEngine::new(&wp, &o)
            .run(vec![test_record("TEST-001")])
            .await
            .unwrap();

        assert!(wp.writes().is_empty());
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(wp.count(|c| matches!(c, Call::SearchTerms(..))), 0);
    }

    #[tokio::test]
    async fn strict_update_never_creates() {
        let wp = FakeWordPress::new();
        let o = opts(SyncMode::Update);

        let summary = SyncEngine::new(&wp, &o)
            .run(vec![test_record("NEW-1")])
            .await
            .unwrap();

        assert!(wp.writes().is_empty());
        assert_eq!(summary.skipped_missing, 1);
    }

    #[tokio::test]
    async fn update_mode_updates_existing_post_by_id() {
        let wp = FakeWordPress::new().with_post("old-1", 55);
        let id = wp.post("old-1").unwrap().id;
        let o = opts(SyncMode::Update);

        let summary = SyncEngine::new(&wp, &o)
            .run(vec![full_record("OLD-1")])
            .await
            .unwrap();

        let writes = wp.writes();
        assert!(matches!(&writes[..], [Call::UpdatePost(got, p)] if *got == id && p.featured_media.is_none()));
        assert_eq!(summary.updated, 1);
        // featured image already present, default policy leaves it
        assert_eq!(wp.count(|c| matches!(c, Call::Download(_))), 0);
    }

    #[tokio::test]
    async fn upsert_creates_and_updates() {
        let wp = FakeWordPress::new().with_post("a-1", 0);
        let o = opts(SyncMode::Upsert);

        let summary = SyncEngine::new(&wp, &o)
            .run(vec![test_record("A-1"), test_record("B-2")])
            .await
            .unwrap();

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.processed, 2);
    }

    #[tokio::test]
    async fn excluded_slugs_are_never_touched_in_any_mode() {
        for mode in [SyncMode::Skip, SyncMode::Update, SyncMode::Upsert] {
            let wp = FakeWordPress::new().with_post("keep-1", 0);
            let mut o = opts(mode);
            o.excluded_slugs.insert("keep-1".into());
            o.excluded_slugs.insert("keep-2".into());

            let summary = SyncEngine::new(&wp, &o)
                .run(vec![test_record("KEEP-1"), test_record("Keep-2")])
                .await
                .unwrap();

            assert!(wp.calls().is_empty(), "mode {mode} touched the platform");
            assert_eq!(summary.excluded, 2);
        }
    }

    #[tokio::test]
    async fn limit_counts_only_writes() {
        let wp = FakeWordPress::new()
            .with_post("a-1", 0)
            .with_post("b-2", 0);
        let mut o = opts(SyncMode::Skip);
        o.limit = 2;

        let records = ["A-1", "B-2", "C-3", "D-4", "E-5"]
            .into_iter()
            .map(test_record)
            .collect();
        let summary = SyncEngine::new(&wp, &o).run(records).await.unwrap();

        assert_eq!(summary.skipped_existing, 2);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.processed, 2);
        assert!(wp.post("e-5").is_none());
        assert_eq!(wp.count(|c| matches!(c, Call::FindPost(s) if s == "e-5")), 0);
    }

    #[tokio::test]
    async fn payload_carries_terms_tags_and_featured_image() {
        let wp = FakeWordPress::new();
        let o = opts(SyncMode::Skip);

        let summary = SyncEngine::new(&wp, &o)
            .run(vec![full_record("FULL-1")])
            .await
            .unwrap();

        let writes = wp.writes();
        let Call::CreatePost(p) = &writes[0] else {
            panic!("expected create");
        };
        assert_eq!(p.genre.len(), 3);
        assert_eq!(p.actress.len(), 2);
        assert_eq!(p.director.len(), 1);
        assert_eq!(p.maker.len(), 1);
        assert_eq!(p.label.len(), 1);
        assert!(p.series.is_empty());
        assert_eq!(
            p.tags,
            vec![
                wp.term_id(Taxonomy::Tag, "素人").unwrap(),
                wp.term_id(Taxonomy::Tag, "フェラ").unwrap()
            ]
        );
        assert!(p.featured_media.is_some());
        assert!(p.content.contains("Full"));
        assert_eq!(summary.media_uploaded, 1);
        assert!(wp
            .calls()
            .contains(&Call::Upload("full-1.jpg".to_string())));
    }

    #[tokio::test]
    async fn term_lookups_are_shared_across_records() {
        let wp = FakeWordPress::new();
        let o = opts(SyncMode::Skip);

        SyncEngine::new(&wp, &o)
            .run(vec![full_record("FULL-1"), full_record("FULL-2")])
            .await
            .unwrap();

        let actress_searches =
            wp.count(|c| matches!(c, Call::SearchTerms(Taxonomy::Actress, n) if n == "Alice"));
        let actress_creates =
            wp.count(|c| matches!(c, Call::CreateTerm(Taxonomy::Actress, n) if n == "Alice"));
        assert_eq!(actress_searches, 1);
        assert_eq!(actress_creates, 1);
    }

    #[tokio::test]
    async fn image_failure_does_not_abort_the_record() {
        let wp = FakeWordPress::new().failing_downloads();
        let o = opts(SyncMode::Skip);

        let summary = SyncEngine::new(&wp, &o)
            .run(vec![full_record("IMG-1")])
            .await
            .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.media_failed, 1);
        let Call::CreatePost(p) = &wp.writes()[0] else {
            panic!("expected create");
        };
        assert!(p.featured_media.is_none());
    }

    #[tokio::test]
    async fn api_failure_aborts_the_run_by_default() {
        let wp = FakeWordPress::new().failing_writes_for("bad-1");
        let o = opts(SyncMode::Skip);

        let err = SyncEngine::new(&wp, &o)
            .run(vec![test_record("BAD-1"), test_record("GOOD-2")])
            .await
            .unwrap_err();

        assert!(matches!(err, crate::SyncError::Api { status: 500, .. }));
        assert_eq!(wp.count(|c| matches!(c, Call::FindPost(s) if s == "good-2")), 0);
    }

    #[tokio::test]
    async fn continue_on_error_isolates_failures() {
        let wp = FakeWordPress::new().failing_writes_for("bad-1");
        let mut o = opts(SyncMode::Skip);
        o.continue_on_error = true;

        let summary = SyncEngine::new(&wp, &o)
            .run(vec![test_record("BAD-1"), test_record("GOOD-2")])
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created, 1);
        assert!(wp.post("good-2").is_some());
    }

    #[test]
    fn mode_dispatch_table() {
        let post = WpPost {
            id: 1,
            slug: "x".into(),
            status: "publish".into(),
            featured_media: 0,
        };
        assert_eq!(decide(SyncMode::Skip, None), Action::Create);
        assert_eq!(
            decide(SyncMode::Skip, Some(post.clone())),
            Action::Skip(Outcome::SkippedExisting)
        );
        assert_eq!(
            decide(SyncMode::Update, None),
            Action::Skip(Outcome::SkippedMissing)
        );
        assert_eq!(
            decide(SyncMode::Update, Some(post.clone())),
            Action::Update(post.clone())
        );
        assert_eq!(decide(SyncMode::Upsert, None), Action::Create);
    }

    #[test]
    fn featured_image_policy() {
        let with_image = WpPost {
            id: 1,
            slug: "x".into(),
            status: "publish".into(),
            featured_media: 9,
        };
        let without_image = WpPost {
            featured_media: 0,
            ..with_image.clone()
        };
        let mut o = SyncOptions::default();

        assert!(wants_featured_image(&o, None));
        assert!(wants_featured_image(&o, Some(&without_image)));
        assert!(!wants_featured_image(&o, Some(&with_image)));

        o.featured_image_policy = FeaturedImagePolicy::NewOnly;
        assert!(!wants_featured_image(&o, Some(&without_image)));
        assert!(wants_featured_image(&o, None));

        o.featured_image_policy = FeaturedImagePolicy::Always;
        assert!(wants_featured_image(&o, Some(&with_image)));

        o.featured_image_policy = FeaturedImagePolicy::NewOnly;
        o.force_featured_image = true;
        assert!(wants_featured_image(&o, Some(&with_image)));
    }
}
