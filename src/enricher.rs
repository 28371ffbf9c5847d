use crate::llm::{self, LlmClient};
use crate::types::{EnrichedArticle, Enrichment, RawArticle};
use tracing::{debug, error, warn};

/// Enrich one article: summary, sentiment and topic are derived from the
/// same text blob, concurrently and independently. A failed call marks its
/// own field and leaves the other two alone; the article is always
/// returned structurally complete.
pub async fn enrich_article(llm: &dyn LlmClient, raw: RawArticle) -> EnrichedArticle {
    debug!("Processing article: {:?}", raw.url);

    let text = raw.text_blob();
    if text.is_empty() {
        // The filter should have removed these already.
        warn!("Article has no text content to process: {:?}", raw.url);
        return EnrichedArticle::unprocessed(raw, "no text content to process");
    }

    let (summary, sentiment, topic) = tokio::join!(
        llm::summarize(llm, &text),
        llm::analyze_sentiment(llm, &text),
        llm::extract_topic(llm, &text),
    );

    let summary = match summary {
        Ok(s) => Enrichment::Value(s),
        Err(f) => {
            error!("Summarization failed for {:?}: {}", raw.url, f);
            Enrichment::Failed(f.cause)
        }
    };
    let sentiment = match sentiment {
        Ok(s) => Enrichment::Value(s),
        Err(f) => {
            error!("Sentiment analysis failed for {:?}: {}", raw.url, f);
            Enrichment::Failed(f.cause)
        }
    };
    let topic = match topic {
        Ok(t) => Enrichment::Value(t),
        Err(f) => {
            error!("Topic extraction failed for {:?}: {}", raw.url, f);
            Enrichment::Failed(f.cause)
        }
    };

    debug!("Finished processing article: {:?}", raw.url);
    EnrichedArticle {
        raw,
        summary,
        sentiment,
        topic,
        processing_error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::types::Sentiment;

    fn raw(title: &str, description: &str) -> RawArticle {
        RawArticle {
            symbol: "AAPL".to_string(),
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            url: Some("https://e.com/1".to_string()),
            published_at: None,
            source: None,
        }
    }

    #[tokio::test]
    async fn all_three_fields_populate_on_success() {
        let llm = MockLlmClient::new();
        let enriched = enrich_article(&llm, raw("Good News for Apple", "Record profits.")).await;

        assert!(enriched.summary.value().is_some());
        assert_eq!(enriched.sentiment_label(), Some(Sentiment::Positive));
        assert!(enriched.topic.value().is_some());
        assert!(enriched.processing_error.is_none());
    }

    #[tokio::test]
    async fn one_failed_call_leaves_the_others_intact() {
        let llm = MockLlmClient::new().failing_sentiment();
        let enriched = enrich_article(&llm, raw("Good News for Apple", "Record profits.")).await;

        assert!(enriched.sentiment.is_failed());
        assert!(enriched.summary.value().is_some());
        assert!(enriched.topic.value().is_some());

        // Record still carries all three keys, with a marker for the failure.
        let record = enriched.to_record();
        assert_eq!(record["sentiment"], "Error: mock sentiment failure");
        assert!(record["summary"].is_string());
        assert!(record["topic"].is_string());
    }

    #[tokio::test]
    async fn all_calls_failing_still_returns_a_complete_record() {
        let llm = MockLlmClient::new()
            .failing_summaries()
            .failing_sentiment()
            .failing_topics();
        let enriched = enrich_article(&llm, raw("Good News", "Body.")).await;

        assert!(enriched.summary.is_failed());
        assert!(enriched.sentiment.is_failed());
        assert!(enriched.topic.is_failed());
        assert_eq!(enriched.sentiment_label(), None);
    }

    #[tokio::test]
    async fn empty_blob_is_returned_unprocessed() {
        let mut article = raw("", "");
        article.title = None;
        article.description = None;

        let llm = MockLlmClient::new();
        let enriched = enrich_article(&llm, article).await;
        assert!(enriched.processing_error.is_some());
        assert!(enriched.summary.is_failed());
    }
}
