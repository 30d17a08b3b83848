//! Page scraping with a headless-render fallback

use crate::html::HtmlExtractor;
use crate::{ContentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    Http,
    Rendered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub text: String,
    pub via: FetchMethod,
}

/// Something that turns a URL into HTML
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HtmlSource: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

/// Plain GET with a browser user agent
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HtmlSource for HttpFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ContentError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Headless browser service answering `POST {base}/content {"url": ...}`
/// with the rendered HTML
pub struct RenderServiceFetcher {
    client: Client,
    endpoint: String,
}

impl RenderServiceFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/content", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl HtmlSource for RenderServiceFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "url": url }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ContentError::Status {
                status: response.status().as_u16(),
                url: self.endpoint.clone(),
            });
        }
        Ok(response.text().await?)
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub user_agent: String,
    pub timeout: Duration,
    /// Below this many characters the page is rendered instead
    pub min_text_len: usize,
    pub render_service_url: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(20),
            min_text_len: 200,
            render_service_url: None,
        }
    }
}

pub struct Scraper {
    http: Arc<dyn HtmlSource>,
    renderer: Option<Arc<dyn HtmlSource>>,
    extractor: HtmlExtractor,
    min_text_len: usize,
}

impl Scraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let http: Arc<dyn HtmlSource> = Arc::new(HttpFetcher::new(&config.user_agent, config.timeout)?);
        let renderer = match config.render_service_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(base) => {
                let renderer: Arc<dyn HtmlSource> = Arc::new(RenderServiceFetcher::new(base, config.timeout * 2)?);
                Some(renderer)
            }
            None => None,
        };
        Self::with_sources(http, renderer, config.min_text_len)
    }

    pub fn with_sources(
        http: Arc<dyn HtmlSource>,
        renderer: Option<Arc<dyn HtmlSource>>,
        min_text_len: usize,
    ) -> Result<Self> {
        Ok(Self {
            http,
            renderer,
            extractor: HtmlExtractor::new()?,
            min_text_len,
        })
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Fetch a page and extract its readable text
    ///
    /// Pages whose text is shorter than `min_text_len`, or whose plain fetch
    /// fails, go through the render service when one is configured.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<ScrapedPage> {
        let url = validate_url(url)?;

        let plain = match self.http.fetch_html(url.as_str()).await {
            Ok(html) => Some(self.page(&url, &html, FetchMethod::Http)),
            Err(e) if self.renderer.is_some() => {
                warn!(error = %e, "Plain fetch failed, trying render service");
                None
            }
            Err(e) => return Err(e),
        };

        let long_enough = plain
            .as_ref()
            .is_some_and(|p| p.text.chars().count() >= self.min_text_len);
        debug!(chars = plain.as_ref().map_or(0, |p| p.text.len()), long_enough, "Plain fetch done");
        let renderer = match &self.renderer {
            Some(renderer) if !long_enough => renderer,
            _ => return finish(plain, &url),
        };

        info!("Short page, rendering");
        match renderer.fetch_html(url.as_str()).await {
            Ok(html) => {
                let rendered = self.page(&url, &html, FetchMethod::Rendered);
                let plain_len = plain.as_ref().map_or(0, |p| p.text.len());
                if rendered.text.len() >= plain_len {
                    return finish(Some(rendered), &url);
                }
                finish(plain, &url)
            }
            Err(e) if plain.as_ref().is_some_and(|p| !p.text.is_empty()) => {
                warn!(error = %e, "Render service failed, keeping plain text");
                finish(plain, &url)
            }
            Err(e) => Err(e),
        }
    }

    fn page(&self, url: &Url, html: &str, via: FetchMethod) -> ScrapedPage {
        let extracted = self.extractor.extract(html);
        ScrapedPage {
            url: url.to_string(),
            title: extracted.title,
            description: extracted.description,
            text: extracted.text,
            via,
        }
    }
}

fn finish(page: Option<ScrapedPage>, url: &Url) -> Result<ScrapedPage> {
    match page {
        Some(page) if !page.text.is_empty() => Ok(page),
        _ => Err(ContentError::EmptyPage(url.to_string())),
    }
}

/// Accept only absolute http(s) URLs
pub fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| ContentError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(ContentError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(words: usize) -> String {
        format!(
            "<html><head><title>Earnings</title></head><body><p>{}</p></body></html>",
            "revenue ".repeat(words)
        )
    }

    fn source(html: Result<String>) -> Arc<dyn HtmlSource> {
        let mut mock = MockHtmlSource::new();
        let html = std::sync::Mutex::new(Some(html));
        mock.expect_fetch_html()
            .times(1)
            .returning(move |_| html.lock().unwrap().take().unwrap());
        Arc::new(mock)
    }

    fn unused() -> Arc<dyn HtmlSource> {
        let mut mock = MockHtmlSource::new();
        mock.expect_fetch_html().never();
        Arc::new(mock)
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/a?b=c").is_ok());
        assert!(validate_url(" http://example.com ").is_ok());
        assert!(matches!(validate_url("ftp://example.com"), Err(ContentError::InvalidUrl { .. })));
        assert!(matches!(validate_url("file:///etc/passwd"), Err(ContentError::InvalidUrl { .. })));
        assert!(matches!(validate_url("not a url"), Err(ContentError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_long_page_skips_renderer() {
        let scraper = Scraper::with_sources(source(Ok(article(100))), Some(unused()), 200).unwrap();
        let page = scraper.fetch("https://example.com/story").await.unwrap();
        assert_eq!(page.via, FetchMethod::Http);
        assert_eq!(page.title.as_deref(), Some("Earnings"));
        assert!(page.text.starts_with("revenue revenue"));
    }

    #[tokio::test]
    async fn test_short_page_rendered() {
        let scraper = Scraper::with_sources(
            source(Ok("<html><body><div id=app></div>Loading</body></html>".to_string())),
            Some(source(Ok(article(100)))),
            200,
        )
        .unwrap();
        let page = scraper.fetch("https://spa.example.com").await.unwrap();
        assert_eq!(page.via, FetchMethod::Rendered);
        assert!(page.text.len() > 200);
    }

    #[tokio::test]
    async fn test_short_page_without_renderer() {
        let scraper = Scraper::with_sources(source(Ok(article(3))), None, 200).unwrap();
        let page = scraper.fetch("https://example.com").await.unwrap();
        assert_eq!(page.via, FetchMethod::Http);
        assert_eq!(page.text, "revenue revenue revenue");
    }

    #[tokio::test]
    async fn test_http_failure_falls_back_to_renderer() {
        let blocked = Err(ContentError::Status {
            status: 403,
            url: "https://example.com".into(),
        });
        let scraper =
            Scraper::with_sources(source(blocked), Some(source(Ok(article(60)))), 200).unwrap();
        let page = scraper.fetch("https://example.com").await.unwrap();
        assert_eq!(page.via, FetchMethod::Rendered);
    }

    #[tokio::test]
    async fn test_render_failure_keeps_plain_text() {
        let down = Err(ContentError::Status {
            status: 503,
            url: "http://render/content".into(),
        });
        let scraper = Scraper::with_sources(source(Ok(article(5))), Some(source(down)), 200).unwrap();
        let page = scraper.fetch("https://example.com").await.unwrap();
        assert_eq!(page.via, FetchMethod::Http);
    }

    #[tokio::test]
    async fn test_invalid_scheme_never_fetches() {
        let scraper = Scraper::with_sources(unused(), None, 200).unwrap();
        assert!(scraper.fetch("javascript:alert(1)").await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_fetch_live() {
        let scraper = Scraper::new(&ScraperConfig::default()).unwrap();
        let page = scraper.fetch("https://www.rust-lang.org").await.unwrap();
        assert!(!page.text.is_empty());
    }
}
