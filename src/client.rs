use crate::chat::Message;
use crate::decode::StreamDecoder;
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Events emitted while a reply streams in.
///
/// Every turn ends with exactly one terminal event: `StreamComplete` or
/// `Error`. Transport failures, non-success statuses and read errors all
/// collapse into `Error`; the payload is diagnostic detail for the log, not
/// for display.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Response accepted; the empty reply slot should be shown now
    Opened,
    /// Decoded text fragment, in arrival order
    TextDelta(String),
    /// Stream finished normally
    StreamComplete,
    /// The turn failed
    Error(String),
}

/// Outbound payload: the full message history including the newest user turn.
#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
}

/// HTTP client for the chat endpoint.
#[derive(Clone)]
pub struct ChatClient {
    endpoint: String,
    client: reqwest::Client,
}

impl ChatClient {
    /// No request timeout on purpose: a stalled response keeps the turn in
    /// flight until the server closes the connection.
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    #[allow(dead_code)]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send the conversation and stream the reply back as events.
    ///
    /// Returns immediately; the request runs on a spawned task and pushes
    /// events through the receiver.
    pub fn stream_reply(&self, messages: Vec<Message>) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(256);
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let turn_id = uuid::Uuid::new_v4();

        tokio::spawn(
            async move {
                if let Err(err) = run_turn(&client, &endpoint, &messages, &tx).await {
                    tracing::error!(error = %err, "chat turn failed");
                    let _ = tx.send(StreamEvent::Error(err.to_string())).await;
                }
            }
            .instrument(tracing::info_span!("turn", id = %turn_id)),
        );

        rx
    }
}

/// One request/response cycle: POST the history, then forward the body.
async fn run_turn(
    client: &reqwest::Client,
    endpoint: &str,
    messages: &[Message],
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<()> {
    tracing::debug!(messages = messages.len(), "sending conversation");

    let response = client
        .post(endpoint)
        .json(&ChatRequest { messages })
        .send()
        .await
        .context("failed to reach chat endpoint")?;

    if !response.status().is_success() {
        anyhow::bail!("chat endpoint returned {}", response.status());
    }

    // The reply slot goes up before any content arrives.
    if tx.send(StreamEvent::Opened).await.is_err() {
        return Ok(());
    }

    pump_body(response.bytes_stream(), tx).await
}

/// Read the body chunk by chunk, decode statefully and forward each fragment
/// the moment it lands. Chunks are processed strictly in arrival order.
async fn pump_body<S, E>(mut body: S, tx: &mpsc::Sender<StreamEvent>) -> Result<()>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut decoder = StreamDecoder::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("failed to read response stream")?;
        let text = decoder.decode(&chunk);
        if !text.is_empty() && tx.send(StreamEvent::TextDelta(text)).await.is_err() {
            // receiver gone, nobody left to stream to
            return Ok(());
        }
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        let _ = tx.send(StreamEvent::TextDelta(rest)).await;
    }
    let _ = tx.send(StreamEvent::StreamComplete).await;
    Ok(())
}
