//! AI assistant interaction with exponential backoff retry logic.
//!
//! This module lets the user question an OpenAI-compatible chat model about
//! the articles a search produced. It includes automatic retry logic with
//! exponential backoff and jitter to handle transient failures gracefully.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`AskAsync`]: Core trait defining async chat completion
//! - [`OpenAiChat`]: Talks to `POST {api_base}/chat/completions`
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//! - [`Advisor`]: Holds the system instruction and the running conversation
//!
//! # Retry Strategy
//!
//! - Configurable number of retry attempts (5 by default)
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//! - Client errors other than 429 are returned at once

use crate::config::{AssistantConfig, LINKS_PLACEHOLDER};
use crate::error::ChatApiError;
use crate::models::Article;
use crate::utils::truncate_for_log;
use itertools::Itertools;
use rand::{Rng, rng};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A question and the assistant's answer to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub reply: String,
}

/// Trait for async chat completion.
///
/// Implementors receive the whole conversation (system instruction first)
/// and return the assistant's next reply. This abstraction allows for
/// different backends or decorators (like retry logic).
pub trait AskAsync {
    /// The type of response returned by the model.
    type Response;

    /// Send the conversation to the model and receive its reply.
    async fn ask(&self, messages: &[ChatMessage]) -> Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, messages: &[ChatMessage]) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(messages).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if e.downcast_ref::<ChatApiError>().is_some_and(ChatApiError::is_permanent) {
                        error!(
                            attempt,
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() rejected; not retrying"
                        );
                        return Err(e);
                    }

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let shift = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(16);
                    let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiChat {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(config: &AssistantConfig, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
        }
    }

    fn headers(&self) -> Result<HeaderMap, Box<dyn Error>> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

impl fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl AskAsync for OpenAiChat {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, messages: &[ChatMessage]) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let url = format!("{}/chat/completions", self.api_base);
        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        debug!(count = messages.len(), "Chat completion request");
        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            warn!(elapsed_ms = t0.elapsed().as_millis(), %status, "Chat API call failed");
            return Err(ChatApiError {
                status,
                body: truncate_for_log(&body, 300),
            }
            .into());
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| "chat API returned no reply".into())
    }
}

/// Build the retrying chat backend described by `config`.
///
/// Returns `None` when no (non-blank) API key is configured.
pub fn chat_with_backoff(config: &AssistantConfig) -> Option<RetryAsk<OpenAiChat>> {
    let api_key = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
    info!(api_base = %config.api_base, model = %config.model, max_retries = config.max_retries, "AI assistant configured");
    Some(RetryAsk::new(
        OpenAiChat::new(config, api_key),
        config.max_retries,
        StdDuration::from_millis(config.base_delay_ms),
    ))
}

/// Render the system instruction, listing every article URL on its own line.
pub fn system_instruction(template: &str, articles: &[Article]) -> String {
    let links = articles.iter().map(|a| a.url.as_str()).join("\n");
    template.replace(LINKS_PLACEHOLDER, &links)
}

/// Conversation about a set of articles.
///
/// Every question is sent together with the system instruction and all
/// earlier exchanges, so the model sees the whole conversation.
#[derive(Debug)]
pub struct Advisor<'a, T> {
    backend: &'a T,
    system_prompt: String,
    history: Vec<Exchange>,
}

impl<'a, T> Advisor<'a, T>
where
    T: AskAsync<Response = String>,
{
    pub fn new(backend: &'a T, template: &str, articles: &[Article]) -> Self {
        Self {
            backend,
            system_prompt: system_instruction(template, articles),
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    fn conversation(&self, question: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() * 2 + 2);
        messages.push(ChatMessage::new(Role::System, self.system_prompt.as_str()));
        for exchange in &self.history {
            messages.push(ChatMessage::new(Role::User, exchange.question.as_str()));
            messages.push(ChatMessage::new(Role::Assistant, exchange.reply.as_str()));
        }
        messages.push(ChatMessage::new(Role::User, question));
        messages
    }

    /// Ask a question; the exchange is recorded only when a reply arrives.
    #[instrument(level = "info", skip_all, fields(turn = self.history.len() + 1))]
    pub async fn ask(&mut self, question: &str) -> Result<String, Box<dyn Error>> {
        info!(question = %truncate_for_log(question, 200), "Asked a question");
        let reply = self.backend.ask(&self.conversation(question)).await?;
        info!(reply = %truncate_for_log(&reply, 300), "The assistant responded");
        self.history.push(Exchange {
            question: question.to_string(),
            reply: reply.clone(),
        });
        Ok(reply)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replies with canned answers and records every conversation it saw.
    #[derive(Debug, Default)]
    pub(crate) struct CannedChat {
        pub replies: RefCell<Vec<String>>,
        pub seen: RefCell<Vec<Vec<ChatMessage>>>,
    }

    impl CannedChat {
        pub(crate) fn with_replies(replies: &[&str]) -> Self {
            Self {
                replies: RefCell::new(replies.iter().rev().map(|r| r.to_string()).collect()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl AskAsync for CannedChat {
        type Response = String;

        async fn ask(&self, messages: &[ChatMessage]) -> Result<String, Box<dyn Error>> {
            self.seen.borrow_mut().push(messages.to_vec());
            self.replies
                .borrow_mut()
                .pop()
                .ok_or_else(|| "no canned reply left".into())
        }
    }

    #[derive(Debug)]
    struct Flaky {
        failures_left: Cell<usize>,
        calls: Cell<usize>,
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, _messages: &[ChatMessage]) -> Result<String, Box<dyn Error>> {
            self.calls.set(self.calls.get() + 1);
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err("temporary failure".into());
            }
            Ok("ok".to_string())
        }
    }

    fn article(url: &str) -> Article {
        Article {
            id: "1".to_string(),
            url: url.to_string(),
            title: String::new(),
            headline: String::new(),
            description: String::new(),
            published_at: String::new(),
            updated_at: String::new(),
            image_url: String::new(),
            thumbnail_url: String::new(),
            image_caption: String::new(),
            phrase_count: 0,
            contains_money: false,
        }
    }

    #[test]
    fn test_system_instruction_lists_links() {
        let articles = [article("https://a/1"), article("https://a/2")];
        let prompt = system_instruction("Links:\n{links}", &articles);
        assert_eq!(prompt, "Links:\nhttps://a/1\nhttps://a/2");
    }

    #[tokio::test]
    async fn test_advisor_sends_running_history() {
        let chat = CannedChat::with_replies(&["first answer", "second answer"]);
        let articles = [article("https://a/1")];
        let mut advisor = Advisor::new(&chat, "Links: {links}", &articles);

        assert_eq!(advisor.ask("first?").await.unwrap(), "first answer");
        assert_eq!(advisor.ask("second?").await.unwrap(), "second answer");

        let seen = chat.seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].len(), 2);
        assert_eq!(seen[0][0], ChatMessage::new(Role::System, "Links: https://a/1"));
        assert_eq!(
            seen[1],
            vec![
                ChatMessage::new(Role::System, "Links: https://a/1"),
                ChatMessage::new(Role::User, "first?"),
                ChatMessage::new(Role::Assistant, "first answer"),
                ChatMessage::new(Role::User, "second?"),
            ]
        );
        assert_eq!(advisor.history().len(), 2);
    }

    #[tokio::test]
    async fn test_advisor_failure_leaves_history_untouched() {
        let chat = CannedChat::with_replies(&[]);
        let mut advisor = Advisor::new(&chat, "{links}", &[]);
        assert!(advisor.ask("anything?").await.is_err());
        assert!(advisor.history().is_empty());
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let flaky = Flaky {
            failures_left: Cell::new(2),
            calls: Cell::new(0),
        };
        let retry = RetryAsk::new(flaky, 3, StdDuration::from_millis(1));
        assert_eq!(retry.ask(&[]).await.unwrap(), "ok");
        assert_eq!(retry.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let flaky = Flaky {
            failures_left: Cell::new(10),
            calls: Cell::new(0),
        };
        let retry = RetryAsk::new(flaky, 1, StdDuration::from_millis(1));
        assert!(retry.ask(&[]).await.is_err());
        assert_eq!(retry.inner.calls.get(), 2);
    }

    #[tokio::test]
    async fn test_openai_chat_posts_conversation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "Prices rose." } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = AssistantConfig {
            api_base: format!("{}/v1/", server.uri()),
            model: "test-model".to_string(),
            ..AssistantConfig::default()
        };
        let chat = OpenAiChat::new(&config, "sk-test");
        let reply = chat
            .ask(&[ChatMessage::new(Role::User, "What happened?")])
            .await
            .unwrap();
        assert_eq!(reply, "Prices rose.");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "What happened?");
    }

    #[tokio::test]
    async fn test_openai_chat_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let config = AssistantConfig {
            api_base: server.uri(),
            ..AssistantConfig::default()
        };
        let chat = OpenAiChat::new(&config, "bad");
        let err = chat.ask(&[]).await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("invalid api key"));
    }

    #[test]
    fn test_chat_with_backoff_needs_key() {
        let mut config = AssistantConfig::default();
        assert!(chat_with_backoff(&config).is_none());
        config.api_key = Some("   ".to_string());
        assert!(chat_with_backoff(&config).is_none());
        config.api_key = Some("sk-test".to_string());
        let backend = chat_with_backoff(&config).unwrap();
        assert_eq!(backend.max_retries, 5);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let chat = OpenAiChat::new(&AssistantConfig::default(), "sk-secret");
        assert!(!format!("{chat:?}").contains("sk-secret"));
    }

    async fn mount_status(server: &MockServer, status: u16, calls: u64) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .expect(calls)
            .mount(server)
            .await;
    }

    fn backoff_config(server: &MockServer) -> AssistantConfig {
        AssistantConfig {
            api_base: server.uri(),
            api_key: Some("sk-test".to_string()),
            max_retries: 3,
            base_delay_ms: 1,
            ..AssistantConfig::default()
        }
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        mount_status(&server, 401, 1).await;

        let backend = chat_with_backoff(&backoff_config(&server)).unwrap();
        let err = backend.ask(&[]).await.unwrap_err();
        let api_err = err.downcast_ref::<ChatApiError>().unwrap();
        assert_eq!(api_err.status, reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        mount_status(&server, 429, 4).await;

        let backend = chat_with_backoff(&backoff_config(&server)).unwrap();
        assert!(backend.ask(&[]).await.is_err());
        assert_eq!(server.received_requests().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start().await;
        mount_status(&server, 503, 4).await;

        let backend = chat_with_backoff(&backoff_config(&server)).unwrap();
        assert!(backend.ask(&[]).await.is_err());
        assert_eq!(server.received_requests().await.unwrap().len(), 4);
    }
}
