use crate::types::Sentiment;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const LLM_TIMEOUT_SECONDS: u64 = 60;
// Lower temperature for more deterministic results.
const LLM_TEMPERATURE: f64 = 0.2;

/// A reasoning-backend call that did not succeed: transport error, auth
/// error, or a response that could not be decoded. Carried as a value,
/// never raised past the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmFailure {
    pub cause: String,
}

impl LlmFailure {
    pub fn new(cause: impl Into<String>) -> Self {
        Self { cause: cause.into() }
    }
}

impl fmt::Display for LlmFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cause)
    }
}

pub type LlmResult<T> = std::result::Result<T, LlmFailure>;

/// Trait for reasoning backends that can complete a prompt pair.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the name of this backend
    fn backend_name(&self) -> String;

    /// One round trip: system prompt + user prompt in, generated text out.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<String>;

    /// Issue a trivial prompt to verify the backend is reachable and the
    /// credentials work. Used as a startup precondition.
    async fn health_check(&self) -> LlmResult<()> {
        self.complete(
            "You are a helpful assistant.",
            "Reply with the single word: ready",
        )
        .await
        .map(|_| ())
    }
}

/// Google Gemini backend via the generativelanguage REST API.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(LLM_TIMEOUT_SECONDS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn backend_name(&self) -> String {
        format!("Gemini ({})", self.model)
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<String> {
        let url = format!("{GEMINI_BASE_URL}/{}:generateContent", self.model);
        let body = json!({
            "system_instruction": { "parts": [{ "text": system_prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": user_prompt }] }],
            "generationConfig": { "temperature": LLM_TEMPERATURE },
        });

        let log_prompt: String = user_prompt.chars().take(200).collect();
        debug!("Sending request to LLM. User prompt: '{}'", log_prompt);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmFailure::new(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let snippet: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(LlmFailure::new(format!("HTTP {status}: {snippet}")));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmFailure::new(format!("unparseable response: {e}")))?;

        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| LlmFailure::new("response missing candidate text"))?;

        debug!(
            "Received response from LLM: {}",
            text.chars().take(200).collect::<String>()
        );
        Ok(text.to_string())
    }
}

/// One-to-two sentence investor-relevant summary.
pub async fn summarize(llm: &dyn LlmClient, text: &str) -> LlmResult<String> {
    const SYSTEM_PROMPT: &str = "You are an expert financial analyst assistant. \
        Summarize the key financial information or event described in the following \
        text in one or two concise sentences. Focus on the core news relevant to an investor.";
    let user_prompt = format!("Text to summarize:\n\n```\n{text}\n```\n\nConcise financial summary:");

    let summary = llm.complete(SYSTEM_PROMPT, &user_prompt).await?;
    Ok(summary.trim().to_string())
}

/// Classify the sentiment of a financial text.
///
/// `Ok(None)` means the backend answered but the normalized output was not
/// one of the three labels; the caller must keep that distinct from a
/// failed call.
pub async fn analyze_sentiment(llm: &dyn LlmClient, text: &str) -> LlmResult<Option<Sentiment>> {
    const SYSTEM_PROMPT: &str = "You are an expert financial analyst specializing in \
        sentiment analysis. Analyze the sentiment of the following financial text. \
        Consider the potential impact on the stock or market mentioned. \
        Respond with only ONE of the following words: Positive, Negative, or Neutral.";
    let user_prompt = format!("Financial text:\n\n```\n{text}\n```\n\nSentiment (Positive/Negative/Neutral):");

    let raw = llm.complete(SYSTEM_PROMPT, &user_prompt).await?;
    match Sentiment::from_response(&raw) {
        Some(sentiment) => Ok(Some(sentiment)),
        None => {
            warn!("LLM returned unexpected sentiment value: '{}'", raw.trim());
            Ok(None)
        }
    }
}

/// Short free-text label for the main financial topic or event.
pub async fn extract_topic(llm: &dyn LlmClient, text: &str) -> LlmResult<String> {
    const SYSTEM_PROMPT: &str = "You are an expert financial analyst. Read the following \
        financial text and identify the main topic or event being discussed. Be specific \
        and concise. Examples: 'Earnings Report', 'Product Launch', 'Executive Appointment', \
        'Stock Split', 'Macroeconomic Data Release', 'Regulatory Filing', 'Merger/Acquisition'. \
        Respond with only the topic name.";
    let user_prompt = format!("Financial text:\n\n```\n{text}\n```\n\nMain Financial Topic/Event:");

    let topic = llm.complete(SYSTEM_PROMPT, &user_prompt).await?;
    Ok(topic.trim().to_string())
}

/// Mock backend for development and testing. Routes on the system prompt
/// and answers from simple keyword heuristics, with optional latency and
/// per-operation failure injection.
pub struct MockLlmClient {
    response_delay_ms: u64,
    fail_summaries: bool,
    fail_sentiment: bool,
    fail_topics: bool,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            response_delay_ms: 0,
            fail_summaries: false,
            fail_sentiment: false,
            fail_topics: false,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    pub fn failing_summaries(mut self) -> Self {
        self.fail_summaries = true;
        self
    }

    pub fn failing_sentiment(mut self) -> Self {
        self.fail_sentiment = true;
        self
    }

    pub fn failing_topics(mut self) -> Self {
        self.fail_topics = true;
        self
    }

    async fn simulate_processing(&self) {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }
    }

    fn mock_sentiment(text: &str) -> &'static str {
        let lower = text.to_lowercase();
        if lower.contains("good news") || lower.contains("record profits") || lower.contains("beats") {
            "Positive"
        } else if lower.contains("bad news") || lower.contains("plummet") || lower.contains("fined") {
            "Negative"
        } else {
            "Neutral"
        }
    }

    fn mock_topic(text: &str) -> &'static str {
        let lower = text.to_lowercase();
        if lower.contains("earnings") || lower.contains("profits") {
            "Earnings Report"
        } else if lower.contains("merger") || lower.contains("acquisition") {
            "Merger/Acquisition"
        } else if lower.contains("launch") || lower.contains("product") {
            "Product Launch"
        } else {
            "General Market News"
        }
    }

    fn mock_summary(text: &str) -> String {
        // Derived prompts fence the article text in a code block; answer
        // from its first line the way a terse analyst would.
        let body = text.split("```").nth(1).unwrap_or(text).trim();
        let first_line = body.lines().next().unwrap_or("").trim();
        format!("In brief: {first_line}")
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn backend_name(&self) -> String {
        "Mock LLM".to_string()
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<String> {
        self.simulate_processing().await;

        if system_prompt.contains("sentiment") {
            if self.fail_sentiment {
                return Err(LlmFailure::new("mock sentiment failure"));
            }
            return Ok(Self::mock_sentiment(user_prompt).to_string());
        }

        if system_prompt.contains("topic") {
            if self.fail_topics {
                return Err(LlmFailure::new("mock topic failure"));
            }
            return Ok(Self::mock_topic(user_prompt).to_string());
        }

        if self.fail_summaries {
            return Err(LlmFailure::new("mock summary failure"));
        }
        Ok(Self::mock_summary(user_prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_classifies_keyword_sentiment() {
        let llm = MockLlmClient::new();
        assert_eq!(
            analyze_sentiment(&llm, "Good News: earnings soared").await.unwrap(),
            Some(Sentiment::Positive)
        );
        assert_eq!(
            analyze_sentiment(&llm, "Bad News: shares plummet").await.unwrap(),
            Some(Sentiment::Negative)
        );
        assert_eq!(
            analyze_sentiment(&llm, "FOMC meeting scheduled for Tuesday").await.unwrap(),
            Some(Sentiment::Neutral)
        );
    }

    #[tokio::test]
    async fn mock_failure_injection_is_per_operation() {
        let llm = MockLlmClient::new().failing_sentiment();
        assert!(analyze_sentiment(&llm, "Good News").await.is_err());
        assert!(summarize(&llm, "Good News").await.is_ok());
        assert!(extract_topic(&llm, "Good News").await.is_ok());
    }

    #[tokio::test]
    async fn derived_operations_trim_output() {
        struct Padded;

        #[async_trait]
        impl LlmClient for Padded {
            fn backend_name(&self) -> String {
                "padded".to_string()
            }

            async fn complete(&self, _system: &str, _user: &str) -> LlmResult<String> {
                Ok("  Earnings Report \n".to_string())
            }
        }

        let topic = extract_topic(&Padded, "text").await.unwrap();
        assert_eq!(topic, "Earnings Report");
        let summary = summarize(&Padded, "text").await.unwrap();
        assert_eq!(summary, "Earnings Report");
    }

    #[tokio::test]
    async fn health_check_uses_complete() {
        assert!(MockLlmClient::new().health_check().await.is_ok());
        // A backend that always fails should fail its health check too.
        let llm = MockLlmClient::new().failing_summaries();
        assert!(llm.health_check().await.is_err());
    }
}
