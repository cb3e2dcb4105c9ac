//! `reqwest`-backed implementation of [`AiProviderClient`] (§6 "AI provider
//! protocol"): posts the chat-completion request, then turns the
//! `text/event-stream` response body into a [`StreamEvent`] stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::error::ProviderError;

use super::{AiProviderClient, ChatCompletionRequest, ChatStream, ProviderConfig, StreamEvent};

/// Adapts a `tokio::sync::mpsc::Receiver` into a `futures_core::Stream`
/// without pulling in `tokio-stream` for one wrapper.
struct ReceiverStream<T>(mpsc::Receiver<T>);

impl<T> Stream for ReceiverStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.0.poll_recv(cx)
    }
}

/// Default client used in production; holds no state beyond the inner
/// `reqwest::Client` so it can be cloned cheaply per pane.
#[derive(Debug, Clone, Default)]
pub struct ReqwestAiClient {
    http: reqwest::Client,
}

impl ReqwestAiClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl AiProviderClient for ReqwestAiClient {
    fn stream_chat(&self, config: &ProviderConfig, request: ChatCompletionRequest) -> ChatStream {
        let (tx, rx) = mpsc::channel::<Result<StreamEvent, ProviderError>>(32);
        let http = self.http.clone();
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let api_key = config.api_key.clone();

        tokio::spawn(async move {
            let response = match http
                .post(&url)
                .bearer_auth(&api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(Err(ProviderError::Transport(e))).await;
                    return;
                }
            };

            if !response.status().is_success() {
                let _ = tx
                    .send(Err(ProviderError::ProviderHTTPError(
                        response.status().as_u16(),
                    )))
                    .await;
                return;
            }

            let mut bytes_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = bytes_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send(Err(ProviderError::Transport(e))).await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim_end_matches('\r').to_string();
                    buffer.drain(..=newline);

                    let Some(payload) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let payload = payload.trim();
                    if payload.is_empty() {
                        continue;
                    }
                    if payload == "[DONE]" {
                        let _ = tx.send(Ok(StreamEvent::Done)).await;
                        return;
                    }

                    if let Some(delta) = extract_delta_content(payload) {
                        if !delta.is_empty() && tx.send(Ok(StreamEvent::Delta(delta))).await.is_err()
                        {
                            // Receiver dropped: caller cancelled the stream.
                            return;
                        }
                    }
                }
            }

            let _ = tx.send(Ok(StreamEvent::Done)).await;
        });

        Box::pin(ReceiverStream(rx))
    }
}

/// Pulls `choices[0].delta.content` out of one SSE `data:` chunk, tolerating
/// chunks that carry no content delta (e.g. a role-only first chunk).
fn extract_delta_content(payload: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_delta_content_from_chunk() {
        let chunk = r#"{"choices":[{"delta":{"content":"hello"}}]}"#;
        assert_eq!(extract_delta_content(chunk), Some("hello".to_string()));
    }

    #[test]
    fn missing_content_delta_yields_none() {
        let chunk = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(extract_delta_content(chunk), None);
    }

    #[test]
    fn malformed_chunk_yields_none() {
        assert_eq!(extract_delta_content("not json"), None);
    }
}
