//! Representative image lookup for article pages.
//!
//! Each new article's page is downloaded and scanned for its first image.
//! Lookups never fail: a page that cannot be fetched or has no usable image
//! simply yields no result, and one article's failure never affects another.
//!
//! # URL Resolution
//!
//! Relative image paths are resolved against the scheme and host of the
//! article URL, not against the article's path:
//! `src="/img/a.png"` on `http://example.com/news/1` becomes
//! `http://example.com/img/a.png`.

use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::UpdateError;
use crate::models::Article;
use crate::sources::success_text;

static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[src]").expect("static selector"));
static BODY_LAZY_IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body img[data-src]").expect("static selector"));

/// Fetches raw HTML for a page.
pub trait PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, UpdateError>;
}

/// [`PageFetcher`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpPageFetcher {
    http: Client,
}

impl HttpPageFetcher {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

impl PageFetcher for HttpPageFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, UpdateError> {
        let resp = self.http.get(url).send().await?;
        success_text(resp).await
    }
}

/// An article URL paired with the image found on its page.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImage {
    pub url: String,
    pub image_url: String,
}

/// Find the representative image for one article.
#[instrument(level = "info", skip(fetcher))]
pub async fn resolve_image<P: PageFetcher>(fetcher: &P, article_url: &str) -> Option<ResolvedImage> {
    let html = match fetcher.fetch(article_url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(error = %e, "Article page fetch failed");
            return None;
        }
    };

    match extract_image(&html, article_url) {
        Some(image_url) => {
            debug!(%image_url, "Resolved article image");
            Some(ResolvedImage {
                url: article_url.to_string(),
                image_url,
            })
        }
        None => {
            debug!("No usable image on page");
            None
        }
    }
}

/// Resolve images for a batch of articles, at most `concurrency` pages at once.
///
/// Only successful lookups are returned, in completion order.
#[instrument(level = "info", skip_all, fields(count = articles.len()))]
pub async fn resolve_images<P: PageFetcher>(
    fetcher: &P,
    articles: &[Article],
    concurrency: usize,
) -> Vec<ResolvedImage> {
    let resolved: Vec<ResolvedImage> = stream::iter(articles)
        .map(|article| resolve_image(fetcher, &article.url))
        .buffer_unordered(concurrency.max(1))
        .filter_map(std::future::ready)
        .collect()
        .await;

    info!(resolved = resolved.len(), "Resolved article images");
    resolved
}

/// Pull the first usable image URL out of `html`.
///
/// The first `img` with a `src` anywhere in the document wins. Pages that
/// only lazy-load images fall back to the first `data-src` under `body`.
pub fn extract_image(html: &str, article_url: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let src = document
        .select(&IMG_SELECTOR)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty() && !src.starts_with("data:"))
        .or_else(|| {
            document
                .select(&BODY_LAZY_IMG_SELECTOR)
                .filter_map(|img| img.value().attr("data-src"))
                .map(str::trim)
                .find(|src| !src.is_empty())
        })?;

    resolve_against_site(src, article_url)
}

/// Turn an image `src` into an absolute URL using the article's site root.
///
/// Only `http` and `https` results are kept; `javascript:` and similar
/// sources yield `None`.
pub fn resolve_against_site(src: &str, article_url: &str) -> Option<String> {
    let mut root = Url::parse(article_url).ok()?;
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);

    let resolved = root.join(src).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}
