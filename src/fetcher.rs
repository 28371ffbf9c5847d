use crate::types::{AgentError, RawArticle, Result};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const NEWS_API_BASE_URL: &str = "https://newsapi.org/v2/everything";
const FETCH_TIMEOUT_SECONDS: u64 = 20;
const PAGE_SIZE: u32 = 20;
const LOOKBACK_HOURS: i64 = 24;

/// Trait for sources that can produce raw articles for a symbol. The live
/// implementation talks to NewsAPI; tests substitute canned sources.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Fetch recent articles matching one watchlist symbol
    async fn fetch_symbol(&self, symbol: &str) -> Result<Vec<RawArticle>>;
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    code: Option<String>,
    message: Option<String>,
    articles: Option<Vec<NewsApiArticle>>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    source: Option<NewsApiSourceName>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSourceName {
    name: Option<String>,
}

/// NewsAPI.org client shared across all watchlist symbols.
pub struct NewsFetcher {
    client: Client,
    api_key: String,
}

impl NewsFetcher {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECONDS))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, api_key }
    }
}

#[async_trait]
impl NewsSource for NewsFetcher {
    fn source_name(&self) -> String {
        "NewsAPI".to_string()
    }

    async fn fetch_symbol(&self, symbol: &str) -> Result<Vec<RawArticle>> {
        // Keep the query window recent; the free tier limits how far back
        // results go anyway.
        let from = (Utc::now() - chrono::Duration::hours(LOOKBACK_HOURS))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();
        let page_size = PAGE_SIZE.to_string();

        debug!("Fetching news for symbol '{}' from NewsAPI", symbol);

        let response = self
            .client
            .get(NEWS_API_BASE_URL)
            .query(&[
                ("q", symbol),
                ("apiKey", self.api_key.as_str()),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("from", from.as_str()),
            ])
            .send()
            .await?;

        let http_status = response.status();
        let body = response.text().await?;
        let envelope: NewsApiResponse = serde_json::from_str(&body).map_err(|_| {
            AgentError::NewsApi {
                code: http_status.as_u16().to_string(),
                message: format!("unparseable response body ({} bytes)", body.len()),
            }
        })?;

        if envelope.status != "ok" {
            let code = envelope.code.unwrap_or_else(|| http_status.as_u16().to_string());
            let message = envelope.message.unwrap_or_else(|| "unknown error".to_string());
            if code == "rateLimited" {
                warn!("Rate limit exceeded while fetching '{}'", symbol);
            } else if code == "apiKeyInvalid" || code == "apiKeyMissing" {
                warn!("Invalid or missing NewsAPI key while fetching '{}'", symbol);
            }
            return Err(AgentError::NewsApi { code, message });
        }

        let articles = envelope
            .articles
            .unwrap_or_default()
            .into_iter()
            .map(|a| RawArticle {
                symbol: symbol.to_string(),
                title: a.title,
                description: a.description,
                url: a.url,
                published_at: a.published_at,
                source: a.source.and_then(|s| s.name),
            })
            .collect::<Vec<_>>();

        debug!("Fetched {} articles for symbol '{}'", articles.len(), symbol);
        Ok(articles)
    }
}

/// Fetch every watchlist symbol concurrently. One symbol's failure is
/// logged and contributes zero articles; it never fails the whole pass.
pub async fn fetch_watchlist(source: &dyn NewsSource, symbols: &[String]) -> Vec<RawArticle> {
    let fetches = symbols.iter().map(|symbol| async move {
        (symbol.as_str(), source.fetch_symbol(symbol).await)
    });

    let mut all_articles = Vec::new();
    for (symbol, result) in join_all(fetches).await {
        match result {
            Ok(articles) => {
                info!("Found {} articles for {}", articles.len(), symbol);
                all_articles.extend(articles);
            }
            Err(e) => {
                error!("Error fetching news for {}: {}", symbol, e);
            }
        }
    }

    info!(
        "Fetched a total of {} articles for the watchlist",
        all_articles.len()
    );
    all_articles
}
