use anyhow::Context;
use news_agent::{
    config::key_preview, Agent, AgentConfig, DisabledNotifier, GeminiClient, JsonlSink,
    LlmClient, NewsFetcher, NewsSource, Notifier, SlackNotifier,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AgentConfig::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting financial news agent");
    info!(
        "Using NewsAPI key starting with: {}",
        key_preview(&config.news_api_key)
    );
    info!(
        "Using LLM model {} with key starting with: {}",
        config.llm_model,
        key_preview(&config.llm_api_key)
    );

    let source: Arc<dyn NewsSource> = Arc::new(NewsFetcher::new(config.news_api_key.clone()));
    let llm: Arc<dyn LlmClient> = Arc::new(GeminiClient::new(
        config.llm_api_key.clone(),
        config.llm_model.clone(),
    ));
    let notifier: Arc<dyn Notifier> = match &config.slack_webhook_url {
        Some(url) => Arc::new(SlackNotifier::new(url).context("invalid Slack webhook URL")?),
        None => {
            warn!("SLACK_WEBHOOK_URL not set. Slack alerts will be disabled.");
            Arc::new(DisabledNotifier)
        }
    };
    let sink = JsonlSink::new(config.output_path.clone());

    let mut agent = Agent::new(config, source, llm, notifier, sink);
    agent.run().await.context("agent terminated")?;
    Ok(())
}
