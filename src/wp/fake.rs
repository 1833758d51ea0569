//! In-memory [`WordPress`] used by the unit tests. Records every call.
use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::{MediaUpload, PostPayload, Taxonomy, WordPress, WpMedia, WpPost, WpTerm};
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FindPost(String),
    ListPosts,
    CreatePost(PostPayload),
    UpdatePost(u64, PostPayload),
    SearchTerms(Taxonomy, String),
    CreateTerm(Taxonomy, String),
    Download(String),
    Upload(String),
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(self, Call::CreatePost(_) | Call::UpdatePost(..))
    }
}

#[derive(Default)]
struct State {
    posts: Vec<WpPost>,
    terms: Vec<(Taxonomy, WpTerm)>,
    next_id: u64,
    calls: Vec<Call>,
    fail_downloads: bool,
    fail_writes_for: HashSet<String>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct FakeWordPress {
    state: Mutex<State>,
}

impl FakeWordPress {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 100,
                ..State::default()
            }),
        }
    }

    pub fn with_post(self, slug: &str, featured_media: u64) -> Self {
        {
            let mut st = self.state.lock().unwrap();
            let id = st.next_id();
            st.posts.push(WpPost {
                id,
                slug: slug.to_string(),
                status: "publish".into(),
                featured_media,
            });
        }
        self
    }

    pub fn with_term(self, taxonomy: Taxonomy, name: &str) -> Self {
        {
            let mut st = self.state.lock().unwrap();
            let id = st.next_id();
            st.terms.push((
                taxonomy,
                WpTerm {
                    id,
                    name: name.to_string(),
                },
            ));
        }
        self
    }

    pub fn failing_downloads(self) -> Self {
        self.state.lock().unwrap().fail_downloads = true;
        self
    }

    /// Create/update for this slug answers with a 500.
    pub fn failing_writes_for(self, slug: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_writes_for
            .insert(slug.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn term_id(&self, taxonomy: Taxonomy, name: &str) -> Option<u64> {
        self.state
            .lock()
            .unwrap()
            .terms
            .iter()
            .find(|(t, term)| *t == taxonomy && term.name == name)
            .map(|(_, term)| term.id)
    }

    pub fn post(&self, slug: &str) -> Option<WpPost> {
        self.state
            .lock()
            .unwrap()
            .posts
            .iter()
            .find(|p| p.slug == slug)
            .cloned()
    }

    fn write(&self, id: Option<u64>, payload: &PostPayload) -> Result<WpPost> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(match id {
            Some(id) => Call::UpdatePost(id, payload.clone()),
            None => Call::CreatePost(payload.clone()),
        });
        if st.fail_writes_for.contains(&payload.slug) {
            return Err(SyncError::Api {
                status: 500,
                method: "POST",
                url: format!("fake://posts/{}", payload.slug),
                body: "internal_server_error".into(),
            });
        }
        let featured_media = payload.featured_media.unwrap_or(0);
        match id {
            Some(id) => {
                let post = st
                    .posts
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| SyncError::Api {
                        status: 404,
                        method: "POST",
                        url: format!("fake://posts/{id}"),
                        body: "rest_post_invalid_id".into(),
                    })?;
                if featured_media != 0 {
                    post.featured_media = featured_media;
                }
                post.status = payload.status.clone();
                Ok(post.clone())
            }
            None => {
                let id = st.next_id();
                let post = WpPost {
                    id,
                    slug: payload.slug.clone(),
                    status: payload.status.clone(),
                    featured_media,
                };
                st.posts.push(post.clone());
                Ok(post)
            }
        }
    }
}

#[async_trait]
impl WordPress for FakeWordPress {
    async fn find_post(&self, slug: &str) -> Result<Option<WpPost>> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::FindPost(slug.to_string()));
        Ok(st.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn list_posts(&self, per_page: u32) -> Result<Vec<WpPost>> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::ListPosts);
        Ok(st.posts.iter().take(per_page as usize).cloned().collect())
    }

    async fn create_post(&self, payload: &PostPayload) -> Result<WpPost> {
        self.write(None, payload)
    }

    async fn update_post(&self, id: u64, payload: &PostPayload) -> Result<WpPost> {
        self.write(Some(id), payload)
    }

    async fn search_terms(&self, taxonomy: Taxonomy, name: &str) -> Result<Vec<WpTerm>> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::SearchTerms(taxonomy, name.to_string()));
        // WordPress search is a case-insensitive substring match.
        let needle = name.to_lowercase();
        Ok(st
            .terms
            .iter()
            .filter(|(t, term)| *t == taxonomy && term.name.to_lowercase().contains(&needle))
            .map(|(_, term)| term.clone())
            .collect())
    }

    async fn create_term(&self, taxonomy: Taxonomy, name: &str) -> Result<WpTerm> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::CreateTerm(taxonomy, name.to_string()));
        let term = WpTerm {
            id: st.next_id(),
            name: name.to_string(),
        };
        st.terms.push((taxonomy, term.clone()));
        Ok(term)
    }

    async fn download_image(&self, url: &str, fallback_name: &str) -> Result<MediaUpload> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::Download(url.to_string()));
        if st.fail_downloads {
            return Err(SyncError::Media(format!("download {url}: HTTP 404 Not Found")));
        }
        Ok(MediaUpload {
            filename: fallback_name.to_string(),
            content_type: "image/jpeg".into(),
            body: Bytes::from_static(b"\xff\xd8\xff"),
        })
    }

    async fn upload_media(&self, upload: MediaUpload) -> Result<WpMedia> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::Upload(upload.filename.clone()));
        let id = st.next_id();
        Ok(WpMedia {
            id,
            source_url: format!("https://blog.test/uploads/{}", upload.filename),
        })
    }
}
