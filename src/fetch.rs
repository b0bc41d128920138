//! Page-text retrieval through the external text-extraction service.
//!
//! Content is best-effort: any timeout, transport error or non-2xx reply
//! degrades that one URL to "no content" and never aborts the batch or the
//! query. All fetches of a batch run in parallel and the batch completes
//! once every fetch has settled.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use crate::config::FetcherConfig;

/// Fetches extracted page text for candidate URLs.
pub trait ContentFetcher: Send + Sync {
    /// URL → extracted text (or `None` for every URL that failed).
    fn fetch_batch(
        &self,
        urls: &[String],
    ) -> impl Future<Output = HashMap<String, Option<String>>> + Send;
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Normalize a service response body into usable page text.
///
/// The service answers with either raw text or `{"text": "..."}`, and
/// reports its own failures as an `Error fetching URL:` body with a 2xx
/// status. Truncation applies before the text ever reaches a prompt.
fn extract_text(body: &str, max_chars: usize) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with("Error fetching URL:") {
        return None;
    }

    let text = if trimmed.starts_with('{') {
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value) => value
                .get("text")
                .and_then(|t| t.as_str())
                .map(|t| t.to_string())?,
            Err(_) => trimmed.to_string(),
        }
    } else {
        trimmed.to_string()
    };

    let text = truncate_chars(&text, max_chars).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// `ContentFetcher` backed by the HTTP text-extraction endpoint.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    endpoint: String,
    max_content_chars: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            max_content_chars: config.max_content_chars,
        })
    }

    /// Fetch extracted text for one URL. Returns `None` for non-web URLs
    /// and for every kind of fetch failure.
    pub async fn fetch_text(&self, url: &str) -> Option<String> {
        if !url.starts_with("http:") && !url.starts_with("https:") {
            return None;
        }

        let response = match self
            .client
            .get(&self.endpoint)
            .query(&[("url", url)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                if err.is_timeout() {
                    log::warn!("timeout fetching content for {url}");
                } else {
                    log::debug!("content fetch failed for {url}: {err}");
                }
                return None;
            }
        };

        if !response.status().is_success() {
            log::debug!("content fetch for {url}: {}", response.status());
            return None;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                log::debug!("content body read failed for {url}: {err}");
                return None;
            }
        };

        extract_text(&body, self.max_content_chars)
    }
}

impl ContentFetcher for HttpFetcher {
    async fn fetch_batch(&self, urls: &[String]) -> HashMap<String, Option<String>> {
        let mut set = tokio::task::JoinSet::new();

        for url in urls {
            let fetcher = self.clone();
            let url = url.clone();
            set.spawn(async move {
                let content = fetcher.fetch_text(&url).await;
                (url, content)
            });
        }

        let mut contents = HashMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((url, content)) => {
                    contents.insert(url, content);
                }
                Err(err) => {
                    log::warn!("content fetch task failed: {err}");
                }
            }
        }

        let fetched = contents.values().filter(|c| c.is_some()).count();
        log::info!("content batch done: {fetched}/{} page(s) with text", urls.len());

        contents
    }
}
