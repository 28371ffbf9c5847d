use crate::alerting::{maybe_notify, Notifier};
use crate::config::AgentConfig;
use crate::enricher::enrich_article;
use crate::fetcher::{fetch_watchlist, NewsSource};
use crate::filter::{filter_articles, SeenUrls};
use crate::llm::LlmClient;
use crate::sink::JsonlSink;
use crate::types::{AgentError, EnrichedArticle, Result};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// The cycle orchestrator: fetch, filter, enrich, alert/persist, sleep,
/// forever. All collaborators are constructed explicitly and injected, so
/// tests can swap any of them for fakes.
pub struct Agent {
    config: AgentConfig,
    source: Arc<dyn NewsSource>,
    llm: Arc<dyn LlmClient>,
    notifier: Arc<dyn Notifier>,
    sink: JsonlSink,
    seen_urls: SeenUrls,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        source: Arc<dyn NewsSource>,
        llm: Arc<dyn LlmClient>,
        notifier: Arc<dyn Notifier>,
        sink: JsonlSink,
    ) -> Self {
        Self {
            config,
            source,
            llm,
            notifier,
            sink,
            seen_urls: SeenUrls::new(),
        }
    }

    /// Verify startup preconditions and run cycles until interrupted.
    ///
    /// An empty watchlist or an unreachable reasoning backend is fatal;
    /// anything that goes wrong inside a cycle is logged and the loop
    /// moves on to the next interval.
    pub async fn run(&mut self) -> Result<()> {
        let symbols = self.config.symbols();
        if symbols.is_empty() {
            return Err(AgentError::Config(
                "watchlist is empty, agent cannot proceed".to_string(),
            ));
        }

        info!("Checking {} backend availability", self.llm.backend_name());
        self.llm
            .health_check()
            .await
            .map_err(|f| AgentError::Llm(format!("backend unavailable: {f}")))?;

        let interval = Duration::from_secs(self.config.fetch_interval_secs);
        info!(
            "Agent started. Watchlist: {:?}. Fetch interval: {}s. Output: {}",
            symbols,
            interval.as_secs(),
            self.sink.path().display()
        );

        loop {
            let cycle_start = Instant::now();
            info!("Starting new fetch cycle");

            if let Err(e) = self.run_cycle(&symbols).await {
                error!("An error occurred in the agent cycle: {}", e);
            }

            let elapsed = cycle_start.elapsed();
            let sleep = sleep_duration(interval, elapsed);
            info!(
                "Cycle took {:.2}s. Sleeping for {:.2}s.",
                elapsed.as_secs_f64(),
                sleep.as_secs_f64()
            );
            tokio::time::sleep(sleep).await;
        }
    }

    /// One full pass: FETCHING, FILTERING, ENRICHING, FINALIZING.
    pub async fn run_cycle(&mut self, symbols: &[String]) -> Result<()> {
        // FETCHING: all symbols concurrently, per-symbol failures isolated.
        let raw_articles = fetch_watchlist(self.source.as_ref(), symbols).await;

        // FILTERING: content gate and in-pass dedup, then cross-cycle dedup.
        let filtered = filter_articles(raw_articles);
        let fresh = self.seen_urls.retain_new(filtered);
        if fresh.is_empty() {
            info!("No articles remaining after filtering. Nothing to process.");
            return Ok(());
        }

        // ENRICHING: batches run sequentially to bound concurrency against
        // the backend; every article within a batch enriches concurrently.
        let batch_size = self.config.batch_size.max(1);
        info!(
            "Processing {} filtered articles in batches of {}",
            fresh.len(),
            batch_size
        );
        let mut processed: Vec<EnrichedArticle> = Vec::with_capacity(fresh.len());
        for (index, batch) in fresh.chunks(batch_size).enumerate() {
            debug!("Processing batch {} of {} articles", index + 1, batch.len());
            let enriched = join_all(
                batch
                    .iter()
                    .cloned()
                    .map(|article| enrich_article(self.llm.as_ref(), article)),
            )
            .await;
            processed.extend(enriched);
        }

        // FINALIZING: alert checks and saves run concurrently across the
        // whole processed set, and every one is awaited before sleeping.
        let notifier = self.notifier.as_ref();
        let sink = &self.sink;
        let finalizers = processed.iter().map(|article| async move {
            let record = article.to_record();
            let ((), saved) = tokio::join!(
                maybe_notify(notifier, article),
                sink.append(&record),
            );
            if let Err(e) = saved {
                error!(
                    "Error writing processed article {:?}: {}",
                    article.raw.url, e
                );
            }
        });
        join_all(finalizers).await;

        info!(
            "Finished alert checks and saving for this cycle ({} articles).",
            processed.len()
        );
        Ok(())
    }
}

/// Time left until the next cycle should start. A cycle that overruns the
/// interval sleeps zero time; there is no catch-up burst.
pub fn sleep_duration(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}
