//! Completion API client.
//!
//! [`CompletionClient`] is the seam the pipeline talks to: it counts tokens and
//! streams one completion as a lazy, finite sequence of chunks. [`OpenAiClient`]
//! implements it against the `OpenAI` legacy completions endpoint with a
//! blocking HTTP client; tests substitute their own implementation.

use crate::config::Config;
use crate::credentials::ApiKey;
use crate::error::{Error, Result};
use crate::sse::SseReader;
use crate::token::{TiktokenEstimator, TokenEstimator};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Lazy sequence of completion chunks in arrival order.
///
/// Dropping it cancels the underlying request.
pub type ChunkStream<'a> = Box<dyn Iterator<Item = Result<CompletionChunk>> + 'a>;

/// Body of a streaming completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model selector
    pub model: String,
    /// Prompts; always exactly one
    pub prompt: Vec<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Number of completions
    pub n: u32,
    /// Whether the prompt is echoed back
    pub echo: bool,
    /// Always `true`; the response is consumed as a stream
    pub stream: bool,
}

impl CompletionRequest {
    /// Builds the request for `payload` from the configured model and limits.
    #[must_use]
    pub fn new(config: &Config, payload: impl Into<String>) -> Self {
        Self {
            model: config.model.clone(),
            prompt: vec![payload.into()],
            temperature: config.temperature,
            max_tokens: config.max_completion_tokens,
            n: 1,
            echo: false,
            stream: true,
        }
    }
}

/// One streamed piece of a completion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletionChunk {
    /// Candidate fragments; only the first is used
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl CompletionChunk {
    /// Creates a chunk holding a single candidate.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                text: text.into(),
                index: 0,
                finish_reason: None,
            }],
        }
    }

    /// Returns the first candidate's text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stream`] if the chunk has no candidates.
    pub fn first_text(&self) -> Result<&str> {
        self.choices
            .first()
            .map(|choice| choice.text.as_str())
            .ok_or_else(|| Error::stream("chunk has no choices"))
    }
}

/// A candidate fragment within a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Choice {
    /// Generated text
    #[serde(default)]
    pub text: String,
    /// Candidate index
    #[serde(default)]
    pub index: u32,
    /// Set on the last chunk of a candidate
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl ApiErrorBody {
    fn describe(&self) -> String {
        match &self.kind {
            Some(kind) => format!("{} ({kind})", self.message),
            None => self.message.clone(),
        }
    }
}

/// Frame payloads are either chunks or an in-band error.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StreamFrame {
    Error(ApiErrorEnvelope),
    Chunk(CompletionChunk),
}

/// Decodes one SSE `data:` payload.
///
/// # Errors
///
/// Returns [`Error::Api`] for an in-band error object and
/// [`Error::Serialization`] for anything that is not a chunk.
pub fn decode_frame(data: &str) -> Result<CompletionChunk> {
    match serde_json::from_str::<StreamFrame>(data)? {
        StreamFrame::Chunk(chunk) => Ok(chunk),
        StreamFrame::Error(envelope) => Err(Error::api(None, envelope.error.describe())),
    }
}

/// Fixed point in time by which the completion must finish.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    /// Starts a deadline `limit` from now.
    #[must_use]
    pub fn after(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// Returns the configured limit.
    #[must_use]
    pub const fn limit(&self) -> Duration {
        self.limit
    }

    /// Time left, zero once expired.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.started.elapsed())
    }

    /// Returns true once the limit has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.started.elapsed() >= self.limit
    }

    /// Fails with [`Error::Timeout`] once expired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            return Err(Error::Timeout { limit: self.limit });
        }
        Ok(())
    }
}

/// Capabilities the pipeline needs from a language model provider.
pub trait CompletionClient {
    /// Counts the tokens the model would consume for `text`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tokenizer`] if counting fails.
    fn count_tokens(&self, text: &str) -> Result<usize>;

    /// Sends one streaming completion request.
    ///
    /// Request-level failures are returned directly; failures while streaming
    /// surface as `Err` items.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`], [`Error::Http`] or [`Error::Timeout`] if the
    /// request is rejected or not answered in time.
    fn stream_completion(
        &self,
        request: &CompletionRequest,
        deadline: Deadline,
    ) -> Result<ChunkStream<'_>>;
}

/// Client for the `OpenAI` completions endpoint.
#[derive(Debug)]
pub struct OpenAiClient {
    http: Client,
    api_key: ApiKey,
    url: String,
    tokenizer: TiktokenEstimator,
}

impl OpenAiClient {
    /// Creates a client for the configured endpoint and encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the tokenizer fails to load or the HTTP client
    /// cannot be built.
    pub fn new(config: &Config, api_key: ApiKey) -> Result<Self> {
        let tokenizer = config.tokenizer.create()?;
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Http {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            api_key,
            url: config.completions_url(),
            tokenizer,
        })
    }

    /// Converts a non-success response into an API error.
    fn error_from_response(response: Response) -> Error {
        let status = response.status();
        let body = response.text().unwrap_or_default();

        let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .map(|envelope| envelope.error.describe())
            .unwrap_or_else(|_| {
                if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    body
                }
            });

        Error::api(Some(status.as_u16()), message)
    }
}

impl CompletionClient for OpenAiClient {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        self.tokenizer.count(text)
    }

    fn stream_completion(
        &self,
        request: &CompletionRequest,
        deadline: Deadline,
    ) -> Result<ChunkStream<'_>> {
        deadline.check()?;

        info!(model = %request.model, url = %self.url, "Sending completion request");

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(self.api_key.expose())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .timeout(deadline.remaining())
            .json(request)
            .send()
            .map_err(|e| Error::from_reqwest(&e, deadline.limit()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from_response(response));
        }

        debug!(%status, "Completion stream opened");

        let frames = SseReader::new(BufReader::new(response));
        Ok(Box::new(frames.map(move |frame| {
            let data = frame.map_err(|e| {
                if deadline.is_expired() || e.kind() == std::io::ErrorKind::TimedOut {
                    Error::Timeout {
                        limit: deadline.limit(),
                    }
                } else {
                    Error::Http {
                        message: format!("error reading completion stream: {e}"),
                    }
                }
            })?;
            decode_frame(&data)
        })))
    }
}
