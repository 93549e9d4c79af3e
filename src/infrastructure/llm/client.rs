use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::http_client::{GenerationTransport, TransportError};
use crate::config::GenerationSettings;
use crate::domain::generation::{
    build_system_prompt, GeneratedAnswer, GenerationBackend, GenerationRequest, Message,
};

const SERVICE_UNAVAILABLE_MSG: &str = "抱歉，服务暂时不可用，请稍后再试。";
const EMPTY_CHOICES_MSG: &str = "抱歉，未能生成有效答案，请稍后再试。";
const GENERIC_ERROR_MSG: &str = "抱歉，生成答案时出现错误，请稍后再试。";
const TIMEOUT_MSG: &str = "抱歉，请求超时，请稍后再试。";
const CONNECT_FAILED_MSG: &str = "抱歉，网络连接失败，请检查网络后重试。";

/// Client for an OpenAI-compatible chat-completions backend.
///
/// Both modes translate every failure into a user-facing answer string:
/// callers never see an error, only a degraded [`GeneratedAnswer`].
#[derive(Debug)]
pub struct GenerationClient<T: GenerationTransport> {
    transport: T,
    settings: GenerationSettings,
    auth_header: String,
}

/// Why an attempt failed, retained so exhaustion can report the last
/// observed cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptFailure {
    Timeout,
    Connect,
    Transport,
    ServerError,
    RateLimited,
}

impl AttemptFailure {
    fn apology(self) -> &'static str {
        match self {
            AttemptFailure::Timeout => TIMEOUT_MSG,
            AttemptFailure::Connect => CONNECT_FAILED_MSG,
            AttemptFailure::Transport => GENERIC_ERROR_MSG,
            AttemptFailure::ServerError | AttemptFailure::RateLimited => SERVICE_UNAVAILABLE_MSG,
        }
    }

    fn backoff(self, attempt: u32) -> Duration {
        match self {
            AttemptFailure::RateLimited => Duration::from_secs(u64::from(attempt) * 2),
            _ => Duration::from_secs(u64::from(attempt)),
        }
    }
}

impl From<&TransportError> for AttemptFailure {
    fn from(e: &TransportError) -> Self {
        match e {
            TransportError::Timeout => AttemptFailure::Timeout,
            TransportError::Connect(_) => AttemptFailure::Connect,
            TransportError::Other(_) => AttemptFailure::Transport,
        }
    }
}

/// Outcome of one non-streaming attempt.
enum AttemptOutcome {
    Answer(String),
    Terminal(GeneratedAnswer),
    Retryable(AttemptFailure),
}

impl<T: GenerationTransport> GenerationClient<T> {
    pub fn new(transport: T, settings: GenerationSettings) -> Self {
        let auth_header = format!("Bearer {}", settings.api_key);
        Self {
            transport,
            settings,
            auth_header,
        }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(&self, question: &str, context: &str, stream: bool) -> serde_json::Value {
        let mut request = GenerationRequest::new(vec![
            Message::system(build_system_prompt(context)),
            Message::user(question),
        ])
        .with_temperature(self.settings.temperature)
        .with_max_tokens(self.settings.max_tokens);
        if stream {
            request = request.streaming();
        }

        serde_json::json!({
            "model": self.settings.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": request.stream,
        })
    }

    fn classify_error_message(message: &str) -> AttemptOutcome {
        let lowered = message.to_lowercase();
        if lowered.contains("rate limit") || lowered.contains("429") || message.contains("限流") {
            AttemptOutcome::Retryable(AttemptFailure::RateLimited)
        } else {
            AttemptOutcome::Terminal(GeneratedAnswer::backend_error(format!(
                "抱歉，生成答案时出现错误：{}",
                message
            )))
        }
    }

    fn evaluate_response(status: u16, body: &str) -> AttemptOutcome {
        if (500..600).contains(&status) {
            return AttemptOutcome::Retryable(AttemptFailure::ServerError);
        }
        if status == 429 {
            return AttemptOutcome::Retryable(AttemptFailure::RateLimited);
        }

        let parsed: ChatResponse = match serde_json::from_str(body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(status, error = %e, "unparseable response body");
                return AttemptOutcome::Terminal(GeneratedAnswer::backend_error(
                    GENERIC_ERROR_MSG,
                ));
            }
        };

        if let Some(error) = parsed.error {
            return Self::classify_error_message(&error.message);
        }

        match parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .map(|message| message.content)
        {
            Some(content) if !content.is_empty() => AttemptOutcome::Answer(content),
            _ => AttemptOutcome::Terminal(GeneratedAnswer::backend_error(EMPTY_CHOICES_MSG)),
        }
    }
}

#[async_trait]
impl<T: GenerationTransport> GenerationBackend for GenerationClient<T> {
    async fn complete(&self, question: &str, context: &str) -> GeneratedAnswer {
        let body = self.build_request(question, context, false);
        let mut last_failure = AttemptFailure::Transport;

        for attempt in 1..=self.settings.max_retries {
            let outcome = match self
                .transport
                .post_json(&self.settings.url, self.headers(), &body)
                .await
            {
                Ok(response) => Self::evaluate_response(response.status, &response.body),
                Err(e) => {
                    warn!(attempt, error = %e, "generation request failed");
                    AttemptOutcome::Retryable(AttemptFailure::from(&e))
                }
            };

            match outcome {
                AttemptOutcome::Answer(text) => return GeneratedAnswer::completed(text),
                AttemptOutcome::Terminal(answer) => return answer,
                AttemptOutcome::Retryable(failure) => {
                    last_failure = failure;
                    if attempt < self.settings.max_retries {
                        let delay = failure.backoff(attempt);
                        debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        GeneratedAnswer::retries_exhausted(last_failure.apology())
    }

    async fn complete_streaming(
        &self,
        question: &str,
        context: &str,
        deltas: mpsc::UnboundedSender<String>,
    ) -> GeneratedAnswer {
        let body = self.build_request(question, context, true);
        let mut last_failure = AttemptFailure::Transport;

        for attempt in 1..=self.settings.max_retries {
            let (status, stream) = match self
                .transport
                .post_json_stream(&self.settings.url, self.headers(), &body)
                .await
            {
                Ok(opened) => opened,
                Err(e) => {
                    warn!(attempt, error = %e, "streaming request failed");
                    last_failure = AttemptFailure::from(&e);
                    if attempt < self.settings.max_retries {
                        tokio::time::sleep(last_failure.backoff(attempt)).await;
                    }
                    continue;
                }
            };

            if (500..600).contains(&status) || status == 429 {
                last_failure = if status == 429 {
                    AttemptFailure::RateLimited
                } else {
                    AttemptFailure::ServerError
                };
                if attempt < self.settings.max_retries {
                    tokio::time::sleep(last_failure.backoff(attempt)).await;
                }
                continue;
            }
            if !(200..300).contains(&status) {
                return GeneratedAnswer::backend_error(GENERIC_ERROR_MSG);
            }

            match read_sse_stream(stream, &deltas).await {
                StreamResult::Finished(text) => return GeneratedAnswer::completed(text),
                StreamResult::BackendError(message) => {
                    return GeneratedAnswer::backend_error(format!(
                        "抱歉，生成答案时出现错误：{}",
                        message
                    ));
                }
                StreamResult::Interrupted(partial, failure) => {
                    // Already-forwarded content cannot be retracted, so
                    // retry only when nothing was delivered yet.
                    if !partial.is_empty() {
                        return GeneratedAnswer::backend_error(partial);
                    }
                    last_failure = failure;
                    if attempt < self.settings.max_retries {
                        tokio::time::sleep(last_failure.backoff(attempt)).await;
                    }
                }
            }
        }

        GeneratedAnswer::retries_exhausted(last_failure.apology())
    }
}

enum StreamResult {
    /// Stream reached `[DONE]`, a finish reason, or natural EOF.
    Finished(String),
    /// Backend reported a structured error mid-stream.
    BackendError(String),
    /// Transport died mid-stream; carries whatever was accumulated.
    Interrupted(String, AttemptFailure),
}

/// Decodes a `data: `-prefixed SSE body into answer fragments, forwarding
/// each fragment as it arrives. Malformed lines are skipped.
async fn read_sse_stream(
    mut stream: super::http_client::ByteStream,
    deltas: &mpsc::UnboundedSender<String>,
) -> StreamResult {
    let mut answer = String::new();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "stream interrupted");
                return StreamResult::Interrupted(answer, AttemptFailure::from(&e));
            }
        };
        buffer.extend_from_slice(&chunk);

        while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            match process_sse_line(line.trim_end(), &mut answer, deltas) {
                LineOutcome::Continue => {}
                LineOutcome::Done => return StreamResult::Finished(answer),
                LineOutcome::Error(message) => return StreamResult::BackendError(message),
            }
        }
    }

    // Flush a trailing line without a newline.
    if !buffer.is_empty() {
        let line = String::from_utf8_lossy(&buffer).into_owned();
        match process_sse_line(line.trim_end(), &mut answer, deltas) {
            LineOutcome::Error(message) => return StreamResult::BackendError(message),
            LineOutcome::Done | LineOutcome::Continue => {}
        }
    }

    StreamResult::Finished(answer)
}

enum LineOutcome {
    Continue,
    Done,
    Error(String),
}

fn process_sse_line(
    line: &str,
    answer: &mut String,
    deltas: &mpsc::UnboundedSender<String>,
) -> LineOutcome {
    let Some(data) = line.strip_prefix("data: ") else {
        return LineOutcome::Continue;
    };
    if data.trim() == "[DONE]" {
        return LineOutcome::Done;
    }

    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(_) => return LineOutcome::Continue,
    };

    if let Some(error) = chunk.error {
        return LineOutcome::Error(error.message);
    }

    if let Some(choice) = chunk.choices.into_iter().next() {
        if let Some(content) = choice.delta.and_then(|delta| delta.content) {
            if !content.is_empty() {
                answer.push_str(&content);
                let _ = deltas.send(content);
            }
        }
        if choice.finish_reason.as_deref().is_some_and(|r| !r.is_empty()) {
            return LineOutcome::Done;
        }
    }

    LineOutcome::Continue
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
