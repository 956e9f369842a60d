//! Kiwix HTTP content index.
//!
//! Talks to a running `kiwix-serve`: full-text search through `/search`, and
//! article pages under `/{book}/A/{Title_With_Underscores}`.

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{ContentIndex, with_retry};
use crate::error::{IndexError, Result};
use crate::html;
use crate::types::{SearchHit, normalize_title};

/// Default kiwix-serve URL.
pub const DEFAULT_KIWIX_URL: &str = "http://localhost:8080";

/// Default book (ZIM archive name) articles are served under.
pub const DEFAULT_BOOK: &str = "wikipedia_en_all_maxi_2024-01";

/// A lead paragraph shorter than this is passed over for a later one.
const LEAD_MIN_CHARS: usize = 100;

/// Default number of title -> URL entries kept from search hits.
pub const DEFAULT_URL_CACHE_SIZE: usize = 512;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the Kiwix index.
#[derive(Debug, Clone)]
pub struct KiwixConfig {
    /// Base URL of kiwix-serve.
    pub base_url: String,

    /// Book name used in article URLs.
    pub book: String,

    /// Restrict searches to `book` (`books.name=`).
    pub restrict_search: bool,

    /// Request timeout.
    pub timeout: Duration,

    /// Maximum retries for transient errors.
    pub max_retries: u32,

    /// Initial backoff duration for retries.
    pub retry_backoff: Duration,

    /// Body paragraphs shorter than this are skipped.
    pub min_paragraph_chars: usize,

    /// Most recent search-hit URLs remembered for article fetches.
    pub url_cache_size: usize,
}

impl Default for KiwixConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_KIWIX_URL.to_string(),
            book: DEFAULT_BOOK.to_string(),
            restrict_search: false,
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_backoff: Duration::from_millis(250),
            min_paragraph_chars: 50,
            url_cache_size: DEFAULT_URL_CACHE_SIZE,
        }
    }
}

impl KiwixConfig {
    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the book name.
    pub fn with_book(mut self, book: impl Into<String>) -> Self {
        self.book = book.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set max retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the minimum body paragraph length.
    pub fn with_min_paragraph_chars(mut self, min: usize) -> Self {
        self.min_paragraph_chars = min;
        self
    }

    /// Set how many search-hit URLs are remembered.
    pub fn with_url_cache_size(mut self, size: usize) -> Self {
        self.url_cache_size = size;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Kiwix Index
// ─────────────────────────────────────────────────────────────────────────────

/// Content index backed by kiwix-serve.
pub struct KiwixIndex {
    client: Client,
    config: KiwixConfig,
    /// Normalized title -> URL, learned from search hits. Least recently
    /// used entries are evicted.
    urls: Mutex<LruCache<String, String>>,
}

impl KiwixIndex {
    /// Create a new index client.
    pub fn new(config: KiwixConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("tome/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IndexError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let capacity = NonZeroUsize::new(config.url_cache_size).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            client,
            config,
            urls: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Base URL of the server.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Build the article URL for a title.
    pub fn article_url(&self, title: &str) -> String {
        let slug = title.trim().replace(' ', "_");
        format!(
            "{}/{}/A/{}",
            self.config.base_url,
            self.config.book,
            urlencoding::encode(&slug)
        )
    }

    fn resolve_url(&self, title: &str) -> String {
        self.urls
            .lock()
            .get(&normalize_title(title))
            .cloned()
            .unwrap_or_else(|| self.article_url(title))
    }

    fn remember(&self, hits: &[SearchHit]) {
        let mut urls = self.urls.lock();
        for hit in hits {
            if urls.get(&hit.key()).is_none() {
                urls.put(hit.key(), hit.url.clone());
            }
        }
    }

    /// Fetch an article page. `None` when the title does not exist.
    async fn fetch_page(&self, title: &str) -> Result<Option<String>> {
        let url = self.resolve_url(title);
        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            "kiwix",
            || async {
                let response = self.client.get(&url).send().await?;
                match response.status() {
                    StatusCode::NOT_FOUND => Ok(None),
                    s if s.is_success() => Ok(Some(response.text().await?)),
                    s => Err(IndexError::Http {
                        status: s.as_u16(),
                        url: url.clone(),
                    }),
                }
            },
        )
        .await
    }
}

#[async_trait]
impl ContentIndex for KiwixIndex {
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search", self.config.base_url);
        let mut query = vec![
            ("pattern", term.to_string()),
            ("pageSize", limit.to_string()),
        ];
        if self.config.restrict_search {
            query.push(("books.name", self.config.book.clone()));
        }

        let body = with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            "kiwix",
            || async {
                let response = self.client.get(&url).query(&query).send().await?;
                match response.status() {
                    // kiwix-serve answers 404 when nothing matches
                    StatusCode::NOT_FOUND => Ok(String::new()),
                    s if s.is_success() => Ok(response.text().await?),
                    s => Err(IndexError::Http {
                        status: s.as_u16(),
                        url: url.clone(),
                    }),
                }
            },
        )
        .await?;

        let hits = html::parse_search_results(&body, &self.config.base_url, limit);
        tracing::debug!(term, hits = hits.len(), "Kiwix search");
        self.remember(&hits);
        Ok(hits)
    }

    async fn lookup(&self, title: &str) -> Result<Option<SearchHit>> {
        let url = self.article_url(title);
        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            "kiwix",
            || async {
                let response = self.client.head(&url).send().await?;
                let status = response.status();
                if status.is_success() {
                    let canonical = canonical_title(response.url())
                        .unwrap_or_else(|| title.trim().to_string());
                    let hit = SearchHit::new(canonical, response.url().to_string());
                    self.remember(std::slice::from_ref(&hit));
                    Ok(Some(hit))
                } else if status == StatusCode::NOT_FOUND {
                    Ok(None)
                } else {
                    Err(IndexError::Http {
                        status: status.as_u16(),
                        url: url.clone(),
                    })
                }
            },
        )
        .await
    }

    async fn get_lead(&self, title: &str, max_chars: usize) -> Result<String> {
        let Some(page) = self.fetch_page(title).await? else {
            return Ok(String::new());
        };
        let paragraphs = html::article_paragraphs(&page);
        Ok(html::lead_excerpt(&paragraphs, LEAD_MIN_CHARS, max_chars))
    }

    async fn get_content(
        &self,
        title: &str,
        max_paragraphs: usize,
        max_chars: usize,
    ) -> Result<Vec<String>> {
        let Some(page) = self.fetch_page(title).await? else {
            tracing::debug!(title, "Article not found");
            return Ok(Vec::new());
        };
        Ok(html::budget_paragraphs(
            html::article_paragraphs(&page),
            max_paragraphs,
            max_chars,
            self.config.min_paragraph_chars,
        ))
    }

    fn name(&self) -> &str {
        "kiwix"
    }

    async fn health_check(&self) -> Result<()> {
        let response = self.client.get(&self.config.base_url).send().await?;
        if response.status().is_server_error() {
            return Err(IndexError::Http {
                status: response.status().as_u16(),
                url: self.config.base_url.clone(),
            });
        }
        Ok(())
    }
}

/// Article title from the last path segment of a (possibly redirected)
/// article URL.
fn canonical_title(url: &reqwest::Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(segment).ok()?;
    let title = decoded.replace('_', " ").trim().to_string();
    (!title.is_empty()).then_some(title)
}

/// Create a shared Kiwix index.
pub fn create_shared_index(config: KiwixConfig) -> Result<Arc<dyn ContentIndex>> {
    Ok(Arc::new(KiwixIndex::new(config)?))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLE_PATH: &str = "/wikipedia_en_all_maxi_2024-01/A/Photosynthesis";

    fn article_html() -> String {
        format!(
            r#"<html><body><div id="mw-content-text">
                <p>Stub.</p>
                <p>{}</p>
                <p>{}</p>
            </div></body></html>"#,
            "Photosynthesis is a biological process by which plants convert light energy into chemical energy [1] stored in sugars.",
            "The process takes place mainly in the chloroplasts of leaf cells and releases oxygen as a by-product of splitting water."
        )
    }

    fn index_for(server: &MockServer) -> KiwixIndex {
        KiwixIndex::new(
            KiwixConfig::default()
                .with_base_url(server.uri())
                .with_max_retries(0),
        )
        .unwrap()
    }

    #[test]
    fn test_article_url() {
        let index = KiwixIndex::new(KiwixConfig::default()).unwrap();
        assert_eq!(
            index.article_url("Albert Einstein"),
            "http://localhost:8080/wikipedia_en_all_maxi_2024-01/A/Albert_Einstein"
        );
    }

    #[tokio::test]
    async fn test_search_parses_hits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("pattern", "Photosynthesis"))
            .and(query_param("pageSize", "9"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<div class="results"><ul>
                    <li><a href="{ARTICLE_PATH}">Photosynthesis</a><cite>A process</cite></li>
                    <li><a href="/wikipedia_en_all_maxi_2024-01/A/Chloroplast">Chloroplast</a></li>
                </ul></div>"#
            )))
            .mount(&server)
            .await;

        let index = index_for(&server);
        let hits = index.search("Photosynthesis", 9).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, format!("{}{}", server.uri(), ARTICLE_PATH));
        assert_eq!(hits[0].snippet.as_deref(), Some("A process"));
    }

    #[tokio::test]
    async fn test_search_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let hits = index_for(&server).search("zzzz", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_exists_and_missing() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path(ARTICLE_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let index = index_for(&server);
        let hit = index.lookup("Photosynthesis").await.unwrap().unwrap();
        assert_eq!(hit.title, "Photosynthesis");
        assert!(hit.url.ends_with(ARTICLE_PATH));

        assert!(index.lookup("Nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_follows_redirect_to_canonical_title() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/wikipedia_en_all_maxi_2024-01/A/Einstein"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", "/wikipedia_en_all_maxi_2024-01/A/Albert_Einstein"),
            )
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/wikipedia_en_all_maxi_2024-01/A/Albert_Einstein"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let hit = index_for(&server).lookup("Einstein").await.unwrap().unwrap();
        assert_eq!(hit.title, "Albert Einstein");
        assert!(hit.url.ends_with("/A/Albert_Einstein"));
        assert_eq!(hit.key(), SearchHit::new("Albert Einstein", "").key());
    }

    #[test]
    fn test_canonical_title_decodes_segment() {
        let url = reqwest::Url::parse("http://kiwix/book/A/Caf%C3%A9_au_lait").unwrap();
        assert_eq!(canonical_title(&url).as_deref(), Some("Café au lait"));
    }

    #[test]
    fn test_url_cache_is_bounded() {
        let index = KiwixIndex::new(KiwixConfig::default().with_url_cache_size(2)).unwrap();
        let hits: Vec<SearchHit> = ["Alpha", "Beta", "Gamma"]
            .iter()
            .map(|t| SearchHit::new(*t, format!("http://kiwix/other/A/{t}")))
            .collect();
        index.remember(&hits);

        assert_eq!(index.urls.lock().len(), 2);
        assert_eq!(index.resolve_url("Gamma"), "http://kiwix/other/A/Gamma");
        assert_eq!(
            index.resolve_url("Alpha"),
            "http://localhost:8080/wikipedia_en_all_maxi_2024-01/A/Alpha"
        );
    }

    #[tokio::test]
    async fn test_get_lead_and_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ARTICLE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(article_html()))
            .mount(&server)
            .await;

        let index = index_for(&server);

        let lead = index.get_lead("Photosynthesis", 300).await.unwrap();
        assert!(lead.starts_with("Photosynthesis is a biological process"));
        assert!(!lead.contains("[1]"));

        let content = index.get_content("Photosynthesis", 10, 8000).await.unwrap();
        assert_eq!(content.len(), 2, "stub paragraph is skipped");

        let one = index.get_content("Photosynthesis", 1, 8000).await.unwrap();
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_article_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let index = index_for(&server);
        assert_eq!(index.get_lead("Nope", 300).await.unwrap(), "");
        assert!(index.get_content("Nope", 5, 1000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = index_for(&server).search("x", 5).await.unwrap_err();
        assert!(matches!(err, IndexError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_is_network_error() {
        let index = KiwixIndex::new(
            KiwixConfig::default()
                .with_base_url("http://127.0.0.1:1")
                .with_max_retries(0)
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap();

        let err = index.search("x", 5).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
