//! Streaming chat-completion client.

use std::future::Future;

use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use slack_relay_types::ConversationContext;
use tokio::sync::mpsc;

use crate::error::{RelayError, Result};

/// Lazily produced text deltas of one completion.
pub type DeltaStream = BoxStream<'static, Result<String>>;

/// Channel capacity between the decoding task and the consumer.
const DELTA_BUFFER: usize = 256;

/// Source of streamed completions.
pub trait CompletionApi: Send + Sync {
    /// Start a completion over `context`. The returned stream yields each text
    /// delta as it arrives and ends when the model is done.
    fn stream_completion(
        &self,
        context: &ConversationContext,
    ) -> impl Future<Output = Result<DeltaStream>> + Send;
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a ConversationContext,
    stream: bool,
}

#[derive(Deserialize)]
struct ChunkEvent {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChunkError {
    #[serde(default)]
    message: String,
}

/// What a single server-sent-event line means to the consumer.
#[derive(Debug, PartialEq)]
enum SseLine {
    Delta(String),
    Done,
    Skip,
}

/// Decode one line of the event stream. Blank lines, comments, non-`data`
/// fields and chunks without content are skipped.
fn parse_sse_line(line: &str) -> Result<SseLine> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    let event: ChunkEvent = serde_json::from_str(data)
        .map_err(|e| RelayError::CompletionStream(format!("malformed chunk: {e}")))?;
    if let Some(err) = event.error {
        return Err(RelayError::CompletionStream(err.message));
    }
    let content = event
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content);
    Ok(match content {
        Some(text) => SseLine::Delta(text),
        None => SseLine::Skip,
    })
}

// ─────────────────────────────────────────────────────────────────────────────

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    http: HttpClient,
    api_base: String,
    api_key: String,
    pub model: String,
}

impl OpenAiClient {
    pub fn new(
        http: HttpClient,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

impl CompletionApi for OpenAiClient {
    async fn stream_completion(&self, context: &ConversationContext) -> Result<DeltaStream> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: context,
            stream: true,
        };
        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::CompletionStatus {
                status: status.as_u16(),
                body,
            });
        }

        let (tx, rx) = mpsc::channel::<Result<String>>(DELTA_BUFFER);

        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            // Bytes, not text: a chunk boundary may split a UTF-8 sequence.
            let mut line_buf: Vec<u8> = Vec::new();

            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(Err(RelayError::CompletionStream(e.to_string())))
                            .await;
                        return;
                    }
                };
                line_buf.extend_from_slice(&bytes);

                while let Some(pos) = line_buf.iter().position(|&b| b == b'\n') {
                    let raw: Vec<u8> = line_buf.drain(..=pos).collect();
                    if !forward_line(&raw, &tx).await {
                        return;
                    }
                }
            }

            // The last event may arrive without its terminating newline.
            if !line_buf.is_empty() {
                forward_line(&line_buf, &tx).await;
            }
        });

        let deltas = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(deltas.boxed())
    }
}

/// Decodes one raw SSE line and forwards its delta, if any. Returns `false`
/// once nothing more should be read.
async fn forward_line(raw: &[u8], tx: &mpsc::Sender<Result<String>>) -> bool {
    let line = String::from_utf8_lossy(raw);
    match parse_sse_line(line.trim_end()) {
        // Receiver dropped: the consumer gave up on this response.
        Ok(SseLine::Delta(text)) => tx.send(Ok(text)).await.is_ok(),
        Ok(SseLine::Done) => false,
        Ok(SseLine::Skip) => true,
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            false
        }
    }
}
