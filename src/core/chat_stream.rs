//! Streaming transport for the chat completions endpoint.
//!
//! Each send spawns one task that owns the HTTP response stream and reports
//! back over an unbounded channel, tagged with a stream id. The event loop
//! ignores chunks from superseded ids, so a new send or a cancellation makes
//! the old stream inert without any teardown handshake.

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{construct_api_url, ChatMessage, ChatRequest, ChatResponse};

#[derive(Clone, Debug)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

/// One parsed `data:` payload from the SSE body.
enum SseEvent {
    Delta(String),
    Done,
    Error(String),
    Ignore,
}

fn parse_sse_line(line: &str) -> SseEvent {
    let Some(payload) = line.strip_prefix("data:").map(str::trim_start) else {
        return SseEvent::Ignore;
    };
    if payload == "[DONE]" {
        return SseEvent::Done;
    }
    if payload.trim().is_empty() {
        return SseEvent::Ignore;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => match response
            .choices
            .first()
            .and_then(|choice| choice.delta.content.clone())
        {
            Some(content) => SseEvent::Delta(content),
            None => SseEvent::Ignore,
        },
        // Anything unparseable on the data channel is an in-band error
        // payload from the provider.
        Err(_) => SseEvent::Error(describe_api_error(payload)),
    }
}

/// Render a provider error body for the transcript: a one-line summary when
/// the JSON shape carries one, with the raw payload fenced below it.
pub fn describe_api_error(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "API error:\n```\n<empty>\n```".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let pretty = serde_json::to_string_pretty(&value).unwrap_or_else(|_| trimmed.to_string());
        if let Some(summary) = error_summary(&value) {
            return format!("API error: {summary}\n```json\n{pretty}\n```");
        }
        return format!("API error:\n```json\n{pretty}\n```");
    }

    format!("API error:\n```\n{trimmed}\n```")
}

fn error_summary(value: &serde_json::Value) -> Option<String> {
    let text = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .or_else(|| value.get("message").and_then(|v| v.as_str()))?;
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub api_messages: Vec<ChatMessage>,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                base_url,
                api_key,
                model,
                api_messages,
                cancel_token,
                stream_id,
            } = params;

            debug!(stream_id, model = %model, "starting chat stream");

            let request = ChatRequest {
                model,
                messages: api_messages,
                stream: true,
            };

            tokio::select! {
                _ = run_stream(&client, &base_url, &api_key, &request, &tx, stream_id) => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "chat stream cancelled");
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn run_stream(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    request: &ChatRequest,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) {
    let url = construct_api_url(base_url, "chat/completions");
    let response = match client
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .json(request)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send((StreamMessage::Error(describe_api_error(&e.to_string())), stream_id));
            let _ = tx.send((StreamMessage::End, stream_id));
            return;
        }
    };

    if !response.status().is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        let _ = tx.send((StreamMessage::Error(describe_api_error(&body)), stream_id));
        let _ = tx.send((StreamMessage::End, stream_id));
        return;
    }

    let mut body = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = body.next().await {
        let Ok(bytes) = chunk else {
            break;
        };
        buffer.extend_from_slice(&bytes);

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            let line = match std::str::from_utf8(&buffer[..newline_pos]) {
                Ok(s) => s.trim().to_string(),
                Err(e) => {
                    debug!(stream_id, error = %e, "invalid UTF-8 in stream");
                    buffer.drain(..=newline_pos);
                    continue;
                }
            };
            buffer.drain(..=newline_pos);

            match parse_sse_line(&line) {
                SseEvent::Delta(content) => {
                    let _ = tx.send((StreamMessage::Chunk(content), stream_id));
                }
                SseEvent::Done => {
                    let _ = tx.send((StreamMessage::End, stream_id));
                    return;
                }
                SseEvent::Error(message) => {
                    let _ = tx.send((StreamMessage::Error(message), stream_id));
                    let _ = tx.send((StreamMessage::End, stream_id));
                    return;
                }
                SseEvent::Ignore => {}
            }
        }
    }

    // Connection closed without a [DONE] marker.
    let _ = tx.send((StreamMessage::End, stream_id));
}
