use crate::error::{AppError, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

pub trait TextBackend {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

impl<T: TextBackend + ?Sized> TextBackend for &T {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        (**self).complete(messages)
    }
}

impl<T: TextBackend + ?Sized> TextBackend for Box<T> {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        (**self).complete(messages)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

// OpenAI-compatible wire format
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

pub struct OpenAiBackend {
    client: Client,
    settings: BackendSettings,
}

impl OpenAiBackend {
    pub fn new(settings: BackendSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        log::debug!(
            "Backend configured: endpoint={} model={} auth={}",
            settings.endpoint,
            settings.model,
            settings.api_key.is_some()
        );
        Ok(Self { client, settings })
    }
}

impl TextBackend for OpenAiBackend {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = CompletionRequest {
            model: &self.settings.model,
            messages,
        };

        let mut builder = self
            .client
            .post(&self.settings.endpoint)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(api_key) = &self.settings.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        log::trace!("Sending {} messages to {}", messages.len(), self.settings.endpoint);
        let response = builder.send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(AppError::BackendRequest(format!("API error {}: {}", status, body)));
        }

        let body = response.text()?;
        parse_completion(&body)
    }
}

fn parse_completion(body: &str) -> Result<String> {
    let parsed: CompletionResponse = serde_json::from_str(body).map_err(|e| {
        AppError::BackendResponse(format!("Unexpected response body: {}", e))
    })?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AppError::BackendResponse("Response contained no message content".to_string()))
}

pub struct Retry<B> {
    inner: B,
    max_attempts: u32,
    delay: Duration,
}

impl<B: TextBackend> Retry<B> {
    pub fn new(inner: B, max_attempts: u32, delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl<B: TextBackend> TextBackend for Retry<B> {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let mut attempt = 1;
        loop {
            match self.inner.complete(messages) {
                Ok(answer) => return Ok(answer),
                Err(e) if attempt < self.max_attempts => {
                    log::warn!(
                        "Backend call failed (attempt {}/{}): {}. Retrying in {:?}.",
                        attempt,
                        self.max_attempts,
                        e,
                        self.delay
                    );
                    thread::sleep(self.delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// Canned answers for tests and dry runs. Every conversation is recorded.
#[derive(Debug, Default)]
pub struct MockBackend {
    responses: Vec<(String, String)>,
    default_response: Option<String>,
    echo: bool,
    failures_left: Cell<u32>,
    always_fail: bool,
    calls: RefCell<Vec<Vec<ChatMessage>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(response: &str) -> Self {
        Self {
            default_response: Some(response.to_string()),
            ..Self::default()
        }
    }

    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    pub fn with_failure() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    // Matched against the last user message
    pub fn add_response(&mut self, prompt_contains: &str, response: &str) {
        self.responses
            .push((prompt_contains.to_string(), response.to_string()));
    }

    pub fn fail_first(self, count: u32) -> Self {
        self.failures_left.set(count);
        self
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl TextBackend for MockBackend {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.borrow_mut().push(messages.to_vec());

        if self.always_fail {
            return Err(AppError::BackendRequest(
                "Mock backend configured to fail".to_string(),
            ));
        }
        let failures_left = self.failures_left.get();
        if failures_left > 0 {
            self.failures_left.set(failures_left - 1);
            return Err(AppError::BackendRequest(
                "Mock backend transient failure".to_string(),
            ));
        }

        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if let Some((_, response)) = self.responses.iter().find(|(key, _)| prompt.contains(key)) {
            return Ok(response.clone());
        }
        if self.echo {
            return Ok(format!("> Generated offline for: {}", echo_headline(prompt)));
        }
        self.default_response.clone().ok_or_else(|| {
            AppError::BackendResponse(
                "Mock backend has no response configured for this prompt".to_string(),
            )
        })
    }
}

// First instruction line of a prompt, skipping `### path` headings and fenced file bodies
fn echo_headline(prompt: &str) -> &str {
    let mut open_fence: Option<&str> = None;
    for line in prompt.lines().map(str::trim) {
        match open_fence {
            Some(fence) => {
                if line == fence {
                    open_fence = None;
                }
            }
            None if line.starts_with("```") => {
                let ticks = line.len() - line.trim_start_matches('`').len();
                open_fence = Some(&line[..ticks]);
            }
            None if line.is_empty() || line.starts_with("### ") => {}
            None => return line,
        }
    }
    ""
}
