use crate::types::RawArticle;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Drop articles without usable content and deduplicate by URL within one
/// pass. First occurrence wins and input order is preserved. Articles with
/// no URL are kept if they pass the content check; they cannot collide.
pub fn filter_articles(articles: Vec<RawArticle>) -> Vec<RawArticle> {
    let original_count = articles.len();
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(articles.len());

    for article in articles {
        if !article.has_content() {
            debug!(
                "Filtering out article with missing title/description: {:?}",
                article.url
            );
            continue;
        }

        if let Some(url) = article.url.as_deref().filter(|u| !u.is_empty()) {
            if !seen_urls.insert(url.to_string()) {
                debug!("Filtering out duplicate article URL: {}", url);
                continue;
            }
        }

        kept.push(article);
    }

    let dropped = original_count - kept.len();
    if dropped > 0 {
        info!(
            "Filtered {} articles (missing content/duplicates). Retaining {}.",
            dropped,
            kept.len()
        );
    } else {
        info!("No articles filtered out.");
    }

    kept
}

/// Cross-cycle dedup set. The fetch window trails 24 hours, so the same
/// article keeps coming back for up to a day; remembering accepted URLs
/// for that long prevents re-enriching and re-alerting on it. Entries
/// older than the retention window are pruned each pass.
pub struct SeenUrls {
    entries: HashMap<String, DateTime<Utc>>,
    retention: Duration,
}

impl SeenUrls {
    pub fn new() -> Self {
        Self::with_retention(Duration::hours(24))
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            retention,
        }
    }

    /// Keep only articles whose URL has not been accepted within the
    /// retention window, and record the URLs of those that pass.
    pub fn retain_new(&mut self, articles: Vec<RawArticle>) -> Vec<RawArticle> {
        self.retain_new_at(articles, Utc::now())
    }

    pub fn retain_new_at(
        &mut self,
        articles: Vec<RawArticle>,
        now: DateTime<Utc>,
    ) -> Vec<RawArticle> {
        let retention = self.retention;
        self.entries.retain(|_, seen_at| now - *seen_at < retention);

        let before = articles.len();
        let mut fresh = Vec::with_capacity(articles.len());
        for article in articles {
            match article.url.as_deref().filter(|u| !u.is_empty()) {
                Some(url) => {
                    if self.entries.contains_key(url) {
                        debug!("Skipping article already processed recently: {}", url);
                        continue;
                    }
                    self.entries.insert(url.to_string(), now);
                    fresh.push(article);
                }
                // No URL means no identity to remember; let it through.
                None => fresh.push(article),
            }
        }

        if fresh.len() < before {
            info!(
                "Skipped {} articles already processed in earlier cycles.",
                before - fresh.len()
            );
        }
        fresh
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SeenUrls {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(symbol: &str, title: &str, description: &str, url: Option<&str>) -> RawArticle {
        RawArticle {
            symbol: symbol.to_string(),
            title: if title.is_empty() { None } else { Some(title.to_string()) },
            description: if description.is_empty() {
                None
            } else {
                Some(description.to_string())
            },
            url: url.map(str::to_string),
            published_at: None,
            source: None,
        }
    }

    #[test]
    fn drops_articles_without_content() {
        let input = vec![
            article("AAPL", "Apple news", "Details inside.", Some("https://e.com/1")),
            article("MSFT", "", "Microsoft earnings call.", Some("https://e.com/2")),
            article("GOOG", "Google results", "", Some("https://e.com/3")),
            article("TSLA", "Tesla news", "Elon speaks again.", Some("https://e.com/4")),
        ];
        let filtered = filter_articles(input);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].symbol, "AAPL");
        assert_eq!(filtered[1].symbol, "TSLA");
    }

    #[test]
    fn dedup_keeps_first_occurrence_only() {
        let input = vec![
            article("AAPL", "Apple news", "Details.", Some("https://e.com/1")),
            article("MSFT", "Same story", "Syndicated.", Some("https://e.com/1")),
            article("NVDA", "Nvidia gains", "Soaring.", Some("https://e.com/5")),
        ];
        let filtered = filter_articles(input);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].symbol, "AAPL");
        assert_eq!(filtered[1].symbol, "NVDA");
    }

    #[test]
    fn urlless_articles_are_never_deduplicated() {
        let input = vec![
            article("AAPL", "First", "Body.", None),
            article("AAPL", "Second", "Body.", None),
            article("AAPL", "Third", "Body.", Some("")),
        ];
        let filtered = filter_articles(input);
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn filtering_is_idempotent() {
        let input = vec![
            article("AAPL", "Apple news", "Details.", Some("https://e.com/1")),
            article("TSLA", "Tesla news", "More details.", Some("https://e.com/2")),
        ];
        let once = filter_articles(input);
        let twice = filter_articles(once.clone());
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.url, b.url);
            assert_eq!(a.symbol, b.symbol);
        }
    }

    #[test]
    fn seen_urls_skips_articles_across_cycles() {
        let mut seen = SeenUrls::new();
        let now = Utc::now();

        let first = seen.retain_new_at(
            vec![article("AAPL", "News", "Body.", Some("https://e.com/1"))],
            now,
        );
        assert_eq!(first.len(), 1);

        let second = seen.retain_new_at(
            vec![article("AAPL", "News", "Body.", Some("https://e.com/1"))],
            now + Duration::minutes(15),
        );
        assert!(second.is_empty());
    }

    #[test]
    fn seen_urls_expire_after_retention() {
        let mut seen = SeenUrls::with_retention(Duration::hours(24));
        let now = Utc::now();

        seen.retain_new_at(
            vec![article("AAPL", "News", "Body.", Some("https://e.com/1"))],
            now,
        );
        let later = seen.retain_new_at(
            vec![article("AAPL", "News", "Body.", Some("https://e.com/1"))],
            now + Duration::hours(25),
        );
        assert_eq!(later.len(), 1);
        assert_eq!(seen.len(), 1);
    }
}
