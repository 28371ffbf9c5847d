use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// A news article as returned by the news source for one watchlist symbol.
///
/// No uniqueness is guaranteed: the same article can show up for several
/// symbols or again in a later fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArticle {
    pub symbol: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub source: Option<String>,
}

impl RawArticle {
    /// Whether the article carries both a title and a description.
    pub fn has_content(&self) -> bool {
        !self.title.as_deref().unwrap_or("").is_empty()
            && !self.description.as_deref().unwrap_or("").is_empty()
    }

    /// Combined text used as input for all three enrichment calls.
    pub fn text_blob(&self) -> String {
        format!(
            "{}\n{}",
            self.title.as_deref().unwrap_or(""),
            self.description.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

/// Sentiment label the reasoning backend is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Normalize a raw backend answer (trim + capitalize) into a label.
    ///
    /// Returns `None` when the backend answered but the normalized text is
    /// not one of the three labels. That case is distinct from a failed
    /// call and must stay distinguishable downstream.
    pub fn from_response(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let mut chars = trimmed.chars();
        let first = chars.next()?;
        let normalized: String = first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect();
        match normalized.as_str() {
            "Positive" => Some(Sentiment::Positive),
            "Negative" => Some(Sentiment::Negative),
            "Neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    /// Only non-neutral sentiment warrants an alert.
    pub fn is_alertable(&self) -> bool {
        matches!(self, Sentiment::Positive | Sentiment::Negative)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one enrichment call, carried alongside the article until the
/// serialization boundary. A `Failed` value holds the human-readable cause
/// and is only rendered into the on-disk `"Error: ..."` marker when the
/// record is written out.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment<T> {
    Value(T),
    Failed(String),
}

impl<T> Enrichment<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Enrichment::Value(v) => Some(v),
            Enrichment::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Enrichment::Failed(_))
    }
}

/// A raw article plus the three enrichment outcomes.
///
/// The original `RawArticle` fields are never mutated after the merge; the
/// enrichment fields are only ever added next to them.
#[derive(Debug, Clone)]
pub struct EnrichedArticle {
    pub raw: RawArticle,
    pub summary: Enrichment<String>,
    /// `Value(None)` means the backend answered but the label was not
    /// interpretable; `Failed` means the call itself did not succeed.
    pub sentiment: Enrichment<Option<Sentiment>>,
    pub topic: Enrichment<String>,
    pub processing_error: Option<String>,
}

impl EnrichedArticle {
    /// Record for an article that never reached the backend (e.g. an empty
    /// text blob that slipped past the filter). Structurally complete so
    /// downstream consumers still see every field.
    pub fn unprocessed(raw: RawArticle, reason: &str) -> Self {
        Self {
            raw,
            summary: Enrichment::Failed(reason.to_string()),
            sentiment: Enrichment::Failed(reason.to_string()),
            topic: Enrichment::Failed(reason.to_string()),
            processing_error: Some(reason.to_string()),
        }
    }

    /// The parsed sentiment, if the call succeeded and the label parsed.
    pub fn sentiment_label(&self) -> Option<Sentiment> {
        match &self.sentiment {
            Enrichment::Value(s) => *s,
            Enrichment::Failed(_) => None,
        }
    }

    /// Render the persisted record shape: one self-describing JSON object
    /// with every required key present. Failed calls become `"Error: ..."`
    /// marker strings; an uninterpretable sentiment becomes `null`.
    pub fn to_record(&self) -> serde_json::Value {
        let summary = match &self.summary {
            Enrichment::Value(s) => json!(s),
            Enrichment::Failed(cause) => json!(format!("Error: {cause}")),
        };
        let sentiment = match &self.sentiment {
            Enrichment::Value(Some(s)) => json!(s.as_str()),
            Enrichment::Value(None) => serde_json::Value::Null,
            Enrichment::Failed(cause) => json!(format!("Error: {cause}")),
        };
        let topic = match &self.topic {
            Enrichment::Value(t) => json!(t),
            Enrichment::Failed(cause) => json!(format!("Error: {cause}")),
        };

        let mut record = json!({
            "symbol": self.raw.symbol,
            "title": self.raw.title,
            "description": self.raw.description,
            "url": self.raw.url,
            "published_at": self.raw.published_at,
            "source": self.raw.source,
            "summary": summary,
            "sentiment": sentiment,
            "topic": topic,
        });
        if let Some(err) = &self.processing_error {
            record["processing_error"] = json!(err);
        }
        record
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("news API error: {code} - {message}")]
    NewsApi { code: String, message: String },

    #[error("LLM backend error: {0}")]
    Llm(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
