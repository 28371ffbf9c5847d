use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

/// Runtime configuration, read once at startup. Every tunable is a flag
/// with an environment-variable fallback so the agent can run with no
/// arguments at all.
#[derive(Debug, Clone, Parser)]
#[command(name = "news-agent", about = "Financial news enrichment agent")]
pub struct AgentConfig {
    /// Comma-separated ticker symbols to monitor
    #[arg(long, env = "WATCHLIST_SYMBOLS", default_value = "")]
    pub watchlist_symbols: String,

    /// NewsAPI.org API key
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub news_api_key: String,

    /// API key for the reasoning backend
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: String,

    /// Model name for the reasoning backend
    #[arg(long, env = "LLM_MODEL_NAME", default_value = "gemini-1.5-pro")]
    pub llm_model: String,

    /// Slack incoming-webhook URL; alerts are disabled when unset
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub slack_webhook_url: Option<String>,

    /// Append-only JSON Lines output file
    #[arg(long, env = "OUTPUT_PATH", default_value = "data/processed_news.jsonl")]
    pub output_path: PathBuf,

    /// Seconds between the start of one fetch cycle and the next
    #[arg(long, env = "FETCH_INTERVAL_SECONDS", default_value_t = 900)]
    pub fetch_interval_secs: u64,

    /// Number of articles enriched concurrently against the backend
    #[arg(long, env = "PROCESS_BATCH_SIZE", default_value_t = 5)]
    pub batch_size: usize,

    /// Log level filter (e.g. info, debug, news_agent=debug)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl AgentConfig {
    /// Load `.env` if present, then parse flags and environment.
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment variables from {}", path.display()),
            Err(_) => debug!(".env file not found, using process environment"),
        }
        Self::parse()
    }

    /// Watchlist symbols with whitespace trimmed and empty entries dropped.
    pub fn symbols(&self) -> Vec<String> {
        self.watchlist_symbols
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Masked preview of an API key for startup logs.
pub fn key_preview(key: &str) -> String {
    if key.chars().count() > 4 {
        let head: String = key.chars().take(4).collect();
        format!("{head}...")
    } else {
        "None".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_trimmed_and_filtered() {
        let config = AgentConfig::parse_from([
            "news-agent",
            "--watchlist-symbols",
            " AAPL, TSLA ,,GOOG ",
            "--news-api-key",
            "nk",
            "--llm-api-key",
            "lk",
        ]);
        assert_eq!(config.symbols(), vec!["AAPL", "TSLA", "GOOG"]);
    }

    #[test]
    fn defaults_match_process_surface() {
        let config = AgentConfig::parse_from([
            "news-agent",
            "--news-api-key",
            "nk",
            "--llm-api-key",
            "lk",
        ]);
        assert_eq!(config.fetch_interval_secs, 900);
        assert_eq!(config.batch_size, 5);
        assert!(config.symbols().is_empty());
    }

    #[test]
    fn key_preview_masks() {
        assert_eq!(key_preview("abcdef"), "abcd...");
        assert_eq!(key_preview("abc"), "None");
    }
}
