use crate::types::{EnrichedArticle, Sentiment};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const DELIVERY_TIMEOUT_SECONDS: u64 = 10;
const COLOR_POSITIVE: &str = "#36a64f";
const COLOR_NEGATIVE: &str = "#ff0000";

/// Trait for notification channels. Delivery reports success or failure;
/// it is never retried within a cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a formatted message. `attachments` carries the structured
    /// payload; `fallback_text` is the plain-text rendering.
    async fn deliver(&self, fallback_text: &str, attachments: serde_json::Value) -> bool;
}

/// Slack incoming-webhook channel.
pub struct SlackNotifier {
    client: Client,
    webhook_url: url::Url,
}

impl SlackNotifier {
    pub fn new(webhook_url: &str) -> crate::types::Result<Self> {
        let webhook_url = url::Url::parse(webhook_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(DELIVERY_TIMEOUT_SECONDS))
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            client,
            webhook_url,
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn deliver(&self, fallback_text: &str, attachments: serde_json::Value) -> bool {
        let payload = json!({
            "text": fallback_text,
            "attachments": attachments,
        });

        match self
            .client
            .post(self.webhook_url.clone())
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!("Slack alert sent successfully.");
                true
            }
            Ok(response) => {
                error!(
                    "Failed to send Slack alert. Status: {}",
                    response.status()
                );
                false
            }
            Err(e) => {
                error!("Error sending Slack alert: {}", e);
                false
            }
        }
    }
}

/// Channel used when no webhook is configured; drops every message.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn deliver(&self, fallback_text: &str, _attachments: serde_json::Value) -> bool {
        debug!(
            "Alerting disabled. Alert not sent: {}",
            fallback_text.chars().take(100).collect::<String>()
        );
        false
    }
}

/// Inspect an enriched article and alert when its sentiment is exactly
/// Positive or Negative. Neutral, uninterpretable and error-marked
/// sentiment never fire. Delivery failure is logged, not escalated.
pub async fn maybe_notify(notifier: &dyn Notifier, article: &EnrichedArticle) {
    let Some(sentiment) = article.sentiment_label() else {
        if article.sentiment.is_failed() {
            warn!(
                "Skipping alert for {} due to sentiment analysis error.",
                article.raw.symbol
            );
        }
        return;
    };
    if !sentiment.is_alertable() {
        return;
    }

    let symbol = article.raw.symbol.as_str();
    info!(
        "Significant sentiment ({}) detected for {}. Triggering alert.",
        sentiment, symbol
    );

    let title = article.raw.title.as_deref().unwrap_or("N/A");
    let url = article.raw.url.as_deref().unwrap_or("#");
    let source = article.raw.source.as_deref().unwrap_or("N/A");
    let published_at = article.raw.published_at.as_deref().unwrap_or("N/A");
    let summary = article.summary.value().map(String::as_str).unwrap_or("N/A");
    let topic = article.topic.value().map(String::as_str).unwrap_or("N/A");

    let color = match sentiment {
        Sentiment::Positive => COLOR_POSITIVE,
        _ => COLOR_NEGATIVE,
    };

    let blocks = json!([
        {
            "type": "header",
            "text": {
                "type": "plain_text",
                "text": format!("{sentiment} Sentiment Alert: {symbol} ({topic})"),
                "emoji": true
            }
        },
        {
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": format!("*Symbol:*\n{symbol}") },
                { "type": "mrkdwn", "text": format!("*Detected Topic:*\n{topic}") },
                { "type": "mrkdwn", "text": format!("*Source:*\n{source}") },
                { "type": "mrkdwn", "text": format!("*Published:*\n{published_at}") }
            ]
        },
        {
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*Title:*\n<{url}|{title}>") }
        },
        {
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*Summary:*\n{summary}") }
        }
    ]);

    // The colored bar comes from wrapping the blocks in an attachment.
    let attachments = json!([{ "color": color, "blocks": blocks }]);
    let fallback_text = format!("[{sentiment}] {symbol} ({topic}): {title} - {url}");

    if !notifier.deliver(&fallback_text, attachments).await {
        warn!("Alert delivery failed for {}.", symbol);
    }
}

/// Test double that records every delivery instead of sending it.
pub struct CountingNotifier {
    deliveries: std::sync::Mutex<Vec<String>>,
}

impl CountingNotifier {
    pub fn new() -> Self {
        Self {
            deliveries: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    pub fn fallback_texts(&self) -> Vec<String> {
        self.deliveries.lock().unwrap().clone()
    }
}

impl Default for CountingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn deliver(&self, fallback_text: &str, _attachments: serde_json::Value) -> bool {
        self.deliveries.lock().unwrap().push(fallback_text.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Enrichment, RawArticle};

    fn article_with(sentiment: Enrichment<Option<Sentiment>>) -> EnrichedArticle {
        EnrichedArticle {
            raw: RawArticle {
                symbol: "TSLA".to_string(),
                title: Some("Tesla news".to_string()),
                description: Some("Body.".to_string()),
                url: Some("https://e.com/t".to_string()),
                published_at: Some("2024-05-01T09:00:00Z".to_string()),
                source: Some("Wire".to_string()),
            },
            summary: Enrichment::Value("Summary.".to_string()),
            sentiment,
            topic: Enrichment::Value("Earnings Report".to_string()),
            processing_error: None,
        }
    }

    #[tokio::test]
    async fn fires_only_for_non_neutral_sentiment() {
        let notifier = CountingNotifier::new();

        maybe_notify(&notifier, &article_with(Enrichment::Value(Some(Sentiment::Positive)))).await;
        maybe_notify(&notifier, &article_with(Enrichment::Value(Some(Sentiment::Negative)))).await;
        maybe_notify(&notifier, &article_with(Enrichment::Value(Some(Sentiment::Neutral)))).await;
        maybe_notify(&notifier, &article_with(Enrichment::Value(None))).await;
        maybe_notify(&notifier, &article_with(Enrichment::Failed("boom".to_string()))).await;

        assert_eq!(notifier.count(), 2);
    }

    #[tokio::test]
    async fn fallback_text_carries_label_symbol_and_topic() {
        let notifier = CountingNotifier::new();
        maybe_notify(&notifier, &article_with(Enrichment::Value(Some(Sentiment::Negative)))).await;

        let texts = notifier.fallback_texts();
        assert_eq!(texts.len(), 1);
        assert_eq!(
            texts[0],
            "[Negative] TSLA (Earnings Report): Tesla news - https://e.com/t"
        );
    }

    #[test]
    fn slack_notifier_rejects_malformed_webhook() {
        assert!(SlackNotifier::new("not a url").is_err());
        assert!(SlackNotifier::new("https://hooks.slack.com/services/T000/B000/XXX").is_ok());
    }
}
