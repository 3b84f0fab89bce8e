//! Outbound web helpers: keyword search scraping and bulk image download.
//!
//! Every request is a single blocking attempt bounded by the configured
//! timeout. Nothing is retried.

use std::fs;
use std::path::Path;
use std::time::Duration;

use scraper::{Html, Selector};
use tokio::runtime::Runtime;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::config::WebConfig;
use crate::error::WebError;
use crate::storage::unique_name;

pub const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// Attributes checked, in order, for an `<img>` source.
const IMAGE_SOURCE_ATTRS: [&str; 4] = ["src", "data-src", "data-srcset", "data-fallback-src"];

const SEARCH_REDIRECT_PREFIX: &str = "/url?q=";

/// Something that can GET a URL and hand back the body.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, WebError>;
}

/// reqwest-backed fetcher driving its own single-threaded tokio runtime.
pub struct HttpFetcher {
    client: reqwest::Client,
    runtime: Runtime,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(config: &WebConfig) -> Result<Self, WebError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| WebError::Client(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| WebError::Client(e.to_string()))?;

        Ok(Self {
            client,
            runtime,
            timeout_secs: config.timeout_secs,
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, WebError> {
        let limit = Duration::from_secs(self.timeout_secs);
        debug!(url, "GET");

        self.runtime.block_on(async {
            let response = timeout(limit, self.client.get(url).send())
                .await
                .map_err(|_| WebError::Timeout(self.timeout_secs))?
                .map_err(|e| WebError::Request(e.to_string()))?;

            if !response.status().is_success() {
                return Err(WebError::Status(response.status().as_u16()));
            }

            let body = timeout(limit, response.bytes())
                .await
                .map_err(|_| WebError::Timeout(self.timeout_secs))?
                .map_err(|e| WebError::Request(e.to_string()))?;
            Ok::<_, WebError>(body.to_vec())
        })
    }
}

/// Result links pulled out of a search results page.
///
/// Only the first `limit` anchors are inspected; of those, redirect links
/// (`/url?q=<target>&...`) pointing off-site are kept.
pub fn extract_result_links(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").expect("static selector");

    document
        .select(&anchors)
        .take(limit)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| href.strip_prefix(SEARCH_REDIRECT_PREFIX))
        .map(|target| target.split('&').next().unwrap_or_default().to_string())
        .filter(|link| link.starts_with("http") && !link.contains("google.com"))
        .collect()
}

/// Absolute URLs of every `<img>` on the page whose URL ends in a supported raster extension.
pub fn extract_image_urls(page: &Url, html: &str) -> Vec<Url> {
    let document = Html::parse_document(html);
    let images = Selector::parse("img").expect("static selector");

    document
        .select(&images)
        .filter_map(|img| {
            IMAGE_SOURCE_ATTRS
                .iter()
                .filter_map(|attr| img.value().attr(attr))
                .find(|src| !src.is_empty())
        })
        .filter_map(|src| page.join(src).ok())
        .filter(|url| image_extension(url.as_str()).is_some())
        .collect()
}

fn image_extension(url: &str) -> Option<&'static str> {
    IMAGE_EXTENSIONS.iter().copied().find(|ext| url.ends_with(ext))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSearch {
    pub file_name: String,
    pub link_count: usize,
}

/// Run one search for `keyword` and write the links to a new text file in `dir`.
///
/// Returns `Ok(None)` when the page had no usable links; nothing is written then.
pub fn search_to_file(
    fetcher: &dyn Fetch,
    config: &WebConfig,
    keyword: &str,
    dir: &Path,
) -> Result<Option<SavedSearch>, WebError> {
    let query = format!("{}{}", config.search_url, urlencoding::encode(keyword));
    let body = fetcher.fetch(&query)?;
    let links = extract_result_links(&String::from_utf8_lossy(&body), config.search_limit);

    if links.is_empty() {
        return Ok(None);
    }

    let mut content = format!("Search results for keyword: \"{keyword}\"\n\n");
    for (i, link) in links.iter().enumerate() {
        content.push_str(&format!("{}. {}\n", i + 1, link));
    }

    let file_name = unique_name("search_results_", ".txt");
    fs::write(dir.join(&file_name), content)?;

    Ok(Some(SavedSearch {
        file_name,
        link_count: links.len(),
    }))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Saved(String),
    Failed { url: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    /// Supported images found on the page, before the `max` cap.
    pub found: usize,
    pub outcomes: Vec<ImageOutcome>,
}

impl DownloadReport {
    pub fn saved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ImageOutcome::Saved(_)))
            .count()
    }
}

/// Fetch `page_url`, then download up to `max` of its images into `dir`, one after another.
///
/// A failure fetching the page aborts with nothing written; a failure on a
/// single image is recorded and the next one is tried.
pub fn download_images(
    fetcher: &dyn Fetch,
    page_url: &str,
    dir: &Path,
    max: usize,
) -> Result<DownloadReport, WebError> {
    let page = Url::parse(page_url).map_err(|_| WebError::BadUrl(page_url.to_string()))?;
    let body = fetcher.fetch(page.as_str())?;
    let candidates = extract_image_urls(&page, &String::from_utf8_lossy(&body));

    let mut report = DownloadReport {
        found: candidates.len(),
        outcomes: Vec::new(),
    };

    for image in candidates.iter().take(max) {
        let outcome = match save_image(fetcher, image, dir) {
            Ok(file_name) => ImageOutcome::Saved(file_name),
            Err(e) => {
                warn!(url = %image, error = %e, "image download failed");
                ImageOutcome::Failed {
                    url: image.to_string(),
                    reason: e.to_string(),
                }
            }
        };
        report.outcomes.push(outcome);
    }

    Ok(report)
}

fn save_image(fetcher: &dyn Fetch, image: &Url, dir: &Path) -> Result<String, WebError> {
    let bytes = fetcher.fetch(image.as_str())?;
    let ext = image_extension(image.as_str()).unwrap_or_default();
    let file_name = unique_name("image_", ext);
    fs::write(dir.join(&file_name), bytes)?;
    Ok(file_name)
}
