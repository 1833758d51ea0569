use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{MediaUpload, PostPayload, Taxonomy, WordPress, WpMedia, WpPost, WpTerm};
use crate::config::WpSettings;
use crate::error::{truncate_for_log, Result, SyncError};

const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";
const TERM_SEARCH_PAGE_SIZE: &str = "100";

/// reqwest-backed client for the `wp/v2` namespace.
///
/// The Basic auth header is built once from the configured user and
/// application password and attached to every platform request. Image
/// downloads go out without it.
#[derive(Debug, Clone)]
pub struct WpClient {
    http: Client,
    api_root: String,
    auth: HeaderValue,
}

impl WpClient {
    pub fn new(settings: &WpSettings) -> Result<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("sheet-press/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        let token = STANDARD.encode(format!("{}:{}", settings.user, settings.app_pass));
        let mut auth = HeaderValue::from_str(&format!("Basic {token}"))
            .map_err(|e| SyncError::config(format!("invalid credentials header: {e}")))?;
        auth.set_sensitive(true);
        Ok(Self {
            http,
            api_root: settings.api_root(),
            auth,
        })
    }

    /// Unauthenticated client, also used for the sheet fetch.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path.trim_start_matches('/'))
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(AUTHORIZATION, self.auth.clone())
            .header(ACCEPT, "application/json")
    }

    async fn send_json<T>(&self, method: &'static str, url: &str, req: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let resp = self.authed(req).send().await?;
        let resp = ensure_success(method, url, resp).await?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

async fn ensure_success(method: &'static str, url: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = truncate_for_log(resp.text().await.unwrap_or_default(), 2000);
    Err(SyncError::Api {
        status: status.as_u16(),
        method,
        url: url.to_string(),
        body,
    })
}

/// WordPress answers a duplicate term create with `term_exists` and the id of
/// the term that already holds the name.
fn existing_term_id(body: &str) -> Option<u64> {
    let v: Value = serde_json::from_str(body).ok()?;
    if v.get("code").and_then(Value::as_str) != Some("term_exists") {
        return None;
    }
    let data = v.get("data")?;
    data.get("term_id")
        .and_then(Value::as_u64)
        .or_else(|| data.as_u64())
}

/// Last path segment of an image URL reduced to a header-safe file name.
pub fn filename_from_url(url: &str, fallback: &str) -> String {
    let segment = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .unwrap_or_default();
    let decoded = urlencoding::decode(&segment)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| segment.clone());
    let cleaned: String = decoded
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() || !cleaned.contains('.') || cleaned.starts_with('.') {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

#[async_trait]
impl WordPress for WpClient {
    async fn find_post(&self, slug: &str) -> Result<Option<WpPost>> {
        let url = self.url("posts");
        let req = self
            .http
            .get(&url)
            .query(&[("slug", slug), ("per_page", "1"), ("status", "any")]);
        let posts: Vec<WpPost> = self.send_json("GET", &url, req).await?;
        Ok(posts.into_iter().next())
    }

    async fn list_posts(&self, per_page: u32) -> Result<Vec<WpPost>> {
        let url = self.url("posts");
        let req = self.http.get(&url).query(&[("per_page", per_page)]);
        self.send_json("GET", &url, req).await
    }

    async fn create_post(&self, payload: &PostPayload) -> Result<WpPost> {
        let url = self.url("posts");
        let req = self.http.post(&url).json(payload);
        self.send_json("POST", &url, req).await
    }

    async fn update_post(&self, id: u64, payload: &PostPayload) -> Result<WpPost> {
        let url = self.url(&format!("posts/{id}"));
        let req = self.http.post(&url).json(payload);
        self.send_json("POST", &url, req).await
    }

    async fn search_terms(&self, taxonomy: Taxonomy, name: &str) -> Result<Vec<WpTerm>> {
        let url = self.url(taxonomy.rest_base());
        let req = self
            .http
            .get(&url)
            .query(&[("search", name), ("per_page", TERM_SEARCH_PAGE_SIZE)]);
        self.send_json("GET", &url, req).await
    }

    async fn create_term(&self, taxonomy: Taxonomy, name: &str) -> Result<WpTerm> {
        let url = self.url(taxonomy.rest_base());
        let req = self.authed(self.http.post(&url).json(&json!({ "name": name })));
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if status.is_success() {
            return Ok(serde_json::from_str(&text)?);
        }
        if let Some(id) = existing_term_id(&text) {
            debug!(%taxonomy, name, id, "terms: create raced an existing term; reusing id");
            return Ok(WpTerm {
                id,
                name: name.to_string(),
            });
        }
        Err(SyncError::Api {
            status: status.as_u16(),
            method: "POST",
            url,
            body: truncate_for_log(text, 2000),
        })
    }

    async fn download_image(&self, url: &str, fallback_name: &str) -> Result<MediaUpload> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::Media(format!("download {url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Media(format!("download {url}: HTTP {status}")));
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| {
                warn!(%url, "media: no image content type; assuming jpeg");
                DEFAULT_IMAGE_TYPE.to_string()
            });
        let body = resp
            .bytes()
            .await
            .map_err(|e| SyncError::Media(format!("download {url}: {e}")))?;
        if body.is_empty() {
            return Err(SyncError::Media(format!("download {url}: empty body")));
        }
        Ok(MediaUpload {
            filename: filename_from_url(url, fallback_name),
            content_type,
            body,
        })
    }

    async fn upload_media(&self, upload: MediaUpload) -> Result<WpMedia> {
        let url = self.url("media");
        let req = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, upload.content_type)
            .header(
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", upload.filename),
            )
            .body(upload.body);
        self.send_json("POST", &url, req)
            .await
            .map_err(|e| SyncError::Media(format!("upload: {e}")))
    }
}
