pub mod agent;
pub mod alerting;
pub mod config;
pub mod enricher;
pub mod fetcher;
pub mod filter;
pub mod llm;
pub mod sink;
pub mod types;

pub use agent::{sleep_duration, Agent};
pub use alerting::{maybe_notify, CountingNotifier, DisabledNotifier, Notifier, SlackNotifier};
pub use config::AgentConfig;
pub use enricher::enrich_article;
pub use fetcher::{fetch_watchlist, NewsFetcher, NewsSource};
pub use filter::{filter_articles, SeenUrls};
pub use llm::{GeminiClient, LlmClient, LlmFailure, MockLlmClient};
pub use sink::JsonlSink;
pub use types::{AgentError, EnrichedArticle, Enrichment, RawArticle, Sentiment};
