//! # Fetcher Module
//!
//! Retrieves listing pages and cause-list documents over HTTP.
//!
//! ## Key Components
//!
//! - `Fetcher`: listing fetch and document download on a shared rate-limited client
//! - `RunContext`: run-scoped URL and content-hash dedupe plus download records
//! - `Layout`: deterministic on-disk layout keyed by court and date
//!
//! ## Features
//!
//! - Retry with exponential backoff on 429 and 5xx responses
//! - One process-wide request rate shared by every clone of the fetcher
//! - URL dedupe: a URL is fetched at most once per run
//! - Content dedupe: a second URL serving identical bytes leaves no second file
//! - Same-named documents from different URLs get distinct files
//! - Files from earlier runs are reused without a network round trip

pub mod config;
mod context;
pub mod error;
pub mod http;
pub mod layout;
pub mod links;

pub use config::FetcherConfig;
pub use context::RunContext;
pub use error::FetchError;
pub use layout::Layout;

use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A link discovered on a listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingLink {
    /// Absolute URL
    pub url: String,

    /// Anchor text
    pub text: String,

    /// Content type learned from a HEAD probe, when probed
    pub content_type: Option<String>,
}

/// Metadata for a document on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub url: String,
    pub filename: String,
    pub path: PathBuf,
    pub sha256: String,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub last_modified: Option<String>,
    pub downloaded_at: DateTime<Utc>,
    /// File was already on disk from an earlier run
    pub reused: bool,
}

/// Result of a download request
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    /// Fetched and written
    Downloaded(DownloadRecord),

    /// Already on disk, not fetched again
    Reused(DownloadRecord),

    /// URL already handled earlier in this run
    AlreadySeen,

    /// Bytes identical to a document already kept in this run
    DuplicateContent {
        /// Path of the document kept for this content
        duplicate_of: PathBuf,
    },
}

impl DownloadOutcome {
    /// Record of a new or reused file
    pub fn record(&self) -> Option<&DownloadRecord> {
        match self {
            DownloadOutcome::Downloaded(record) | DownloadOutcome::Reused(record) => Some(record),
            _ => None,
        }
    }

    /// Local path of a new or reused file
    pub fn path(&self) -> Option<&Path> {
        self.record().map(|r| r.path.as_path())
    }
}

/// Listing and document fetcher
#[derive(Clone)]
pub struct Fetcher {
    http: http::HttpClient,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a fetcher; clones share the rate limiter
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let http = http::HttpClient::new(&config)?;
        Ok(Self { http, config })
    }

    /// Fetch a listing page and return its links.
    ///
    /// Links whose extension is in `probe_extensions` get a HEAD probe for
    /// their content type when probing is enabled; probe failures yield `None`.
    #[instrument(skip(self, probe_extensions))]
    pub async fn fetch_listing(
        &self,
        url: &str,
        probe_extensions: &[String],
    ) -> Result<Vec<ListingLink>, FetchError> {
        Url::parse(url)?;
        let response = self.http.get(url).await?;
        let final_url = response.url().clone();

        if let Some(content_type) = header_string(response.headers(), CONTENT_TYPE.as_str()) {
            if !content_type.to_lowercase().contains("html") {
                return Err(FetchError::NotHtml {
                    url: url.to_string(),
                    content_type,
                });
            }
        }

        let body = response.text().await?;
        let page_links = links::extract_links(&body, &final_url)?;
        info!("Found {} links on {}", page_links.len(), url);

        let mut listing = Vec::with_capacity(page_links.len());
        for link in page_links {
            let content_type = if self.config.probe_content_type
                && has_listed_extension(&link.url, probe_extensions)
            {
                self.probe_content_type(&link.url).await
            } else {
                None
            };

            listing.push(ListingLink {
                url: link.url,
                text: link.text,
                content_type,
            });
        }

        Ok(listing)
    }

    /// HEAD a URL for its content type; errors are not fatal
    pub async fn probe_content_type(&self, url: &str) -> Option<String> {
        match self.http.head(url).await {
            Ok(response) => header_string(response.headers(), CONTENT_TYPE.as_str()),
            Err(e) => {
                debug!("Content type probe failed for {}: {}", url, e);
                None
            }
        }
    }

    /// Assign `url` its local path ahead of the download.
    ///
    /// Reserving every selected link in listing order before a pooled
    /// download keeps same-named documents on the same files across runs.
    /// Links without an extension are named once their content type is known.
    pub async fn reserve(&self, ctx: &RunContext, url: &str, dir: &Path) -> Option<PathBuf> {
        let base_name = layout::filename_for_url(url);
        if layout::has_extension(&base_name) {
            Some(ctx.assign_path(url, dir, &base_name).await)
        } else {
            None
        }
    }

    /// Register the content hashes of documents already in `dir`.
    ///
    /// Run before downloading into a directory from an earlier run so that a
    /// new URL serving the bytes of a kept file is a duplicate of that file.
    #[instrument(skip(self, ctx, extensions))]
    pub async fn register_existing(
        &self,
        ctx: &RunContext,
        dir: &Path,
        extensions: &[String],
    ) -> Result<usize, FetchError> {
        if !tokio::fs::try_exists(dir).await? {
            return Ok(0);
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            let accepted = extensions.iter().any(|ext| name.ends_with(&ext.to_lowercase()));
            if accepted && entry.file_type().await?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut registered = 0;
        for path in paths {
            let bytes = tokio::fs::read(&path).await?;
            let sha256 = layout::sha256_hex(&bytes);
            match ctx.register_hash(&sha256, path.clone()).await {
                None => registered += 1,
                Some(kept) if kept != path => {
                    warn!("Existing file {} duplicates {}", path.display(), kept.display())
                }
                Some(_) => {}
            }
        }
        debug!("Registered {} existing documents in {}", registered, dir.display());
        Ok(registered)
    }

    /// Download a document into `dir`, applying URL and content dedupe
    #[instrument(skip(self, ctx, dir))]
    pub async fn download(
        &self,
        ctx: &RunContext,
        url: &str,
        dir: &Path,
    ) -> Result<DownloadOutcome, FetchError> {
        if !ctx.claim_url(url).await {
            debug!("Already handled in this run: {}", url);
            return Ok(DownloadOutcome::AlreadySeen);
        }

        tokio::fs::create_dir_all(dir).await?;

        if let Some(path) = self.reserve(ctx, url, dir).await {
            if tokio::fs::try_exists(&path).await? {
                return self.reuse_existing(ctx, url, path).await;
            }
            let response = self.http.get(url).await?;
            return self.store_response(ctx, url, path, response).await;
        }

        let response = self.http.get(url).await?;
        let content_type = header_string(response.headers(), CONTENT_TYPE.as_str());
        let filename = format!(
            "{}{}",
            layout::filename_for_url(url),
            layout::extension_for_content_type(content_type.as_deref())
        );
        let path = ctx.assign_path(url, dir, &filename).await;
        if tokio::fs::try_exists(&path).await? {
            return self.reuse_existing(ctx, url, path).await;
        }
        self.store_response(ctx, url, path, response).await
    }

    async fn store_response(
        &self,
        ctx: &RunContext,
        url: &str,
        path: PathBuf,
        response: reqwest::Response,
    ) -> Result<DownloadOutcome, FetchError> {
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        let partial = layout::partial_path(&path);
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        let sha256 = layout::sha256_hex(&bytes);
        if let Some(duplicate_of) = ctx.register_hash(&sha256, path.clone()).await {
            info!(
                "Content of {} duplicates {}; discarding",
                url,
                duplicate_of.display()
            );
            tokio::fs::remove_file(&path).await?;
            return Ok(DownloadOutcome::DuplicateContent { duplicate_of });
        }

        let record = DownloadRecord {
            url: url.to_string(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path,
            sha256,
            content_type: header_string(&headers, CONTENT_TYPE.as_str()),
            content_length: header_string(&headers, CONTENT_LENGTH.as_str())
                .and_then(|v| v.parse().ok())
                .or(Some(bytes.len() as u64)),
            last_modified: header_string(&headers, LAST_MODIFIED.as_str()),
            downloaded_at: Utc::now(),
            reused: false,
        };
        info!("Downloaded {} ({} bytes)", record.filename, bytes.len());
        ctx.push_record(record.clone()).await;

        Ok(DownloadOutcome::Downloaded(record))
    }

    async fn reuse_existing(
        &self,
        ctx: &RunContext,
        url: &str,
        path: PathBuf,
    ) -> Result<DownloadOutcome, FetchError> {
        let bytes = tokio::fs::read(&path).await?;
        let sha256 = layout::sha256_hex(&bytes);

        if let Some(duplicate_of) = ctx.register_hash(&sha256, path.clone()).await {
            if duplicate_of != path {
                warn!(
                    "Existing file {} duplicates {}",
                    path.display(),
                    duplicate_of.display()
                );
                return Ok(DownloadOutcome::DuplicateContent { duplicate_of });
            }
        }

        debug!("Reusing {} for {}", path.display(), url);
        let record = DownloadRecord {
            url: url.to_string(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            sha256,
            content_type: None,
            content_length: Some(bytes.len() as u64),
            last_modified: None,
            downloaded_at: Utc::now(),
            reused: true,
            path,
        };
        ctx.push_record(record.clone()).await;

        Ok(DownloadOutcome::Reused(record))
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn has_listed_extension(url: &str, extensions: &[String]) -> bool {
    let path = Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_default();
    extensions.iter().any(|ext| path.ends_with(&ext.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_fetcher() -> Fetcher {
        Fetcher::new(
            FetcherConfig::builder()
                .backoff_base(Duration::from_millis(5))
                .requests_per_second(1000.0)
                .max_retries(1)
                .build(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_listing_with_probe() {
        let mut server = mockito::Server::new_async().await;
        let html = r#"<html><body>
            <a href="/files/list1.pdf">Cause List Court 1</a>
            <a href="/files/list2.pdf">Cause List Court 2</a>
            <a href="/about">About</a>
            <a href="javascript:print()">Print</a>
        </body></html>"#;
        server
            .mock("GET", "/current")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(html)
            .create_async()
            .await;
        server
            .mock("HEAD", "/files/list1.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .create_async()
            .await;
        // list2 probe is left unmatched and fails

        let links = fast_fetcher()
            .fetch_listing(&format!("{}/current", server.url()), &[".pdf".to_string()])
            .await
            .unwrap();

        assert_eq!(links.len(), 3);
        assert_eq!(links[0].content_type.as_deref(), Some("application/pdf"));
        assert_eq!(links[1].content_type, None);
        assert_eq!(links[2].text, "About");
        assert_eq!(links[2].content_type, None);
    }

    #[tokio::test]
    async fn test_fetch_listing_rejects_non_html() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/current")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let err = fast_fetcher()
            .fetch_listing(&format!("{}/current", server.url()), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotHtml { .. }));
    }

    #[tokio::test]
    async fn test_download_writes_file_and_dedupes_url() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/files/list1.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.4 one")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new();
        let fetcher = fast_fetcher();
        let url = format!("{}/files/list1.pdf", server.url());

        let first = fetcher.download(&ctx, &url, dir.path()).await.unwrap();
        let record = first.record().unwrap().clone();
        assert!(matches!(first, DownloadOutcome::Downloaded(_)));
        assert_eq!(record.filename, "list1.pdf");
        assert_eq!(std::fs::read(&record.path).unwrap(), b"%PDF-1.4 one");
        assert_eq!(record.sha256, layout::sha256_hex(b"%PDF-1.4 one"));

        let second = fetcher.download(&ctx, &url, dir.path()).await.unwrap();
        assert_eq!(second, DownloadOutcome::AlreadySeen);

        m.assert_async().await;
        assert_eq!(ctx.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_identical_content_from_two_urls_keeps_one_file() {
        let mut server = mockito::Server::new_async().await;
        for path in ["/a/first.pdf", "/b/second.pdf"] {
            server
                .mock("GET", path)
                .with_status(200)
                .with_header("content-type", "application/pdf")
                .with_body("%PDF-1.4 same bytes")
                .create_async()
                .await;
        }

        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new();
        let fetcher = fast_fetcher();

        let first = fetcher
            .download(&ctx, &format!("{}/a/first.pdf", server.url()), dir.path())
            .await
            .unwrap();
        let second = fetcher
            .download(&ctx, &format!("{}/b/second.pdf", server.url()), dir.path())
            .await
            .unwrap();

        let kept = first.path().unwrap().to_path_buf();
        assert_eq!(
            second,
            DownloadOutcome::DuplicateContent {
                duplicate_of: kept.clone()
            }
        );
        assert!(kept.exists());
        assert!(!dir.path().join("second.pdf").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(ctx.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_file_is_reused_without_fetch() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/files/old.pdf")
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.pdf"), b"%PDF old").unwrap();

        let outcome = fast_fetcher()
            .download(
                &RunContext::new(),
                &format!("{}/files/old.pdf", server.url()),
                dir.path(),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, DownloadOutcome::Reused(ref r) if r.reused));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_extension_comes_from_content_type() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/download/causelist")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.4")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let outcome = fast_fetcher()
            .download(
                &RunContext::new(),
                &format!("{}/download/causelist", server.url()),
                dir.path(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.record().unwrap().filename, "causelist.pdf");
    }

    #[tokio::test]
    async fn test_download_failure_is_an_error_for_that_url_only() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files/gone.pdf")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/files/ok.pdf")
            .with_status(200)
            .with_body("%PDF ok")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new();
        let fetcher = fast_fetcher();

        let failed = fetcher
            .download(&ctx, &format!("{}/files/gone.pdf", server.url()), dir.path())
            .await;
        assert!(matches!(failed, Err(FetchError::Status { status: 404, .. })));

        let ok = fetcher
            .download(&ctx, &format!("{}/files/ok.pdf", server.url()), dir.path())
            .await
            .unwrap();
        assert!(ok.path().is_some());
    }

    #[tokio::test]
    async fn test_same_file_name_from_two_urls_keeps_both() {
        let mut server = mockito::Server::new_async().await;
        for (path, body) in [
            ("/court1/causelist.pdf", "%PDF court one"),
            ("/court2/causelist.pdf", "%PDF court two"),
        ] {
            server
                .mock("GET", path)
                .with_status(200)
                .with_header("content-type", "application/pdf")
                .with_body(body)
                .create_async()
                .await;
        }

        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new();
        let fetcher = fast_fetcher();

        let first = fetcher
            .download(&ctx, &format!("{}/court1/causelist.pdf", server.url()), dir.path())
            .await
            .unwrap();
        let second = fetcher
            .download(&ctx, &format!("{}/court2/causelist.pdf", server.url()), dir.path())
            .await
            .unwrap();

        assert!(matches!(first, DownloadOutcome::Downloaded(_)));
        assert!(matches!(second, DownloadOutcome::Downloaded(_)));
        assert_ne!(first.path(), second.path());
        assert_eq!(std::fs::read(first.path().unwrap()).unwrap(), b"%PDF court one");
        assert_eq!(std::fs::read(second.path().unwrap()).unwrap(), b"%PDF court two");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_same_file_names_map_to_same_files_on_rerun() {
        let mut server = mockito::Server::new_async().await;
        for (path, body) in [
            ("/court1/causelist.pdf", "%PDF court one"),
            ("/court2/causelist.pdf", "%PDF court two"),
        ] {
            server
                .mock("GET", path)
                .with_status(200)
                .with_body(body)
                .expect(1)
                .create_async()
                .await;
        }
        let urls = [
            format!("{}/court1/causelist.pdf", server.url()),
            format!("{}/court2/causelist.pdf", server.url()),
        ];
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fast_fetcher();

        let mut first_paths = Vec::new();
        let ctx = RunContext::new();
        for url in &urls {
            fetcher.reserve(&ctx, url, dir.path()).await;
        }
        for url in &urls {
            let outcome = fetcher.download(&ctx, url, dir.path()).await.unwrap();
            first_paths.push(outcome.path().unwrap().to_path_buf());
        }

        // Second run downloads in reverse order after reserving in listing order
        let ctx = RunContext::new();
        fetcher
            .register_existing(&ctx, dir.path(), &[".pdf".to_string()])
            .await
            .unwrap();
        for url in &urls {
            fetcher.reserve(&ctx, url, dir.path()).await;
        }
        let second = fetcher.download(&ctx, &urls[1], dir.path()).await.unwrap();
        let first = fetcher.download(&ctx, &urls[0], dir.path()).await.unwrap();

        assert!(matches!(first, DownloadOutcome::Reused(_)));
        assert!(matches!(second, DownloadOutcome::Reused(_)));
        assert_eq!(first.path().unwrap(), first_paths[0]);
        assert_eq!(second.path().unwrap(), first_paths[1]);
        assert_eq!(
            std::fs::read(second.path().unwrap()).unwrap(),
            b"%PDF court two"
        );
    }

    #[tokio::test]
    async fn test_rerun_duplicate_of_existing_file_is_discarded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files/list_copy.pdf")
            .with_status(200)
            .with_body("%PDF kept bytes")
            .create_async()
            .await;
        let kept_mock = server
            .mock("GET", "/files/list.pdf")
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("list.pdf");
        std::fs::write(&kept, b"%PDF kept bytes").unwrap();

        let ctx = RunContext::new();
        let fetcher = fast_fetcher();
        let registered = fetcher
            .register_existing(&ctx, dir.path(), &[".pdf".to_string()])
            .await
            .unwrap();
        assert_eq!(registered, 1);

        // The fresh copy finishes before the kept file is revisited
        let copy = fetcher
            .download(&ctx, &format!("{}/files/list_copy.pdf", server.url()), dir.path())
            .await
            .unwrap();
        let original = fetcher
            .download(&ctx, &format!("{}/files/list.pdf", server.url()), dir.path())
            .await
            .unwrap();

        assert_eq!(
            copy,
            DownloadOutcome::DuplicateContent {
                duplicate_of: kept.clone()
            }
        );
        assert!(matches!(original, DownloadOutcome::Reused(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        kept_mock.assert_async().await;
    }
}
