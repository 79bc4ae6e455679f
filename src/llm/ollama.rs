use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::error::LlmError;
use super::lines::LineBuffer;
use super::provider::LlmProvider;
use super::stream::TokenStream;
use super::types::ChatRequest;

/// Client for the native Ollama HTTP API.
#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn chat_body(request: &ChatRequest, stream: bool) -> Value {
        let mut options = Map::new();
        if let Some(t) = request.temperature {
            options.insert("temperature".to_string(), json!(t));
        }
        if let Some(n) = request.max_tokens {
            options.insert("num_predict".to_string(), json!(n));
        }

        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
            "stream": stream,
        });
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }
        body
    }
}

#[derive(Deserialize)]
struct ChatLine {
    #[serde(default)]
    message: Option<LineMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct LineMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, PartialEq)]
pub(crate) enum StreamEvent {
    Text(String),
    Done,
    Skip,
}

/// Decodes one NDJSON line of a streaming `/api/chat` response.
pub(crate) fn decode_stream_line(line: &str) -> Result<StreamEvent, LlmError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(StreamEvent::Skip);
    }

    let parsed: ChatLine =
        serde_json::from_str(line).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
    if let Some(message) = parsed.error {
        return Err(LlmError::InvalidResponse(message));
    }
    if parsed.done {
        return Ok(StreamEvent::Done);
    }
    match parsed.message {
        Some(m) if !m.content.is_empty() => Ok(StreamEvent::Text(m.content)),
        _ => Ok(StreamEvent::Skip),
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = Self::chat_body(&request, false);

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from_transport)?;

        if !res.status().is_success() {
            return Err(LlmError::from_response(res).await);
        }

        let payload: ChatLine = res.json().await.map_err(LlmError::from_transport)?;
        if let Some(message) = payload.error {
            return Err(LlmError::InvalidResponse(message));
        }
        payload
            .message
            .map(|m| m.content)
            .ok_or_else(|| LlmError::InvalidResponse("reply has no message".to_string()))
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<TokenStream, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = Self::chat_body(&request, true);

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from_transport)?;

        if !res.status().is_success() {
            return Err(LlmError::from_response(res).await);
        }

        Ok(TokenStream::spawn(move |tx| async move {
            let mut stream = res.bytes_stream();
            let mut lines = LineBuffer::default();

            while let Some(item) = stream.next().await {
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send_error(LlmError::from_transport(e)).await;
                        return;
                    }
                };
                for line in lines.push(&bytes) {
                    match decode_stream_line(&line) {
                        Ok(StreamEvent::Text(text)) => {
                            if !tx.send_text(text).await {
                                tracing::debug!("Ollama stream consumer went away");
                                return;
                            }
                        }
                        Ok(StreamEvent::Done) => return,
                        Ok(StreamEvent::Skip) => {}
                        Err(e) => {
                            let _ = tx.send_error(e).await;
                            return;
                        }
                    }
                }
            }

            if let Some(rest) = lines.finish() {
                match decode_stream_line(&rest) {
                    Ok(StreamEvent::Text(text)) => {
                        let _ = tx.send_text(text).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = tx.send_error(e).await;
                    }
                }
            }
        }))
    }

    async fn embed(&self, input: &str, model_id: &str) -> Result<Vec<f32>, LlmError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = json!({
            "model": model_id,
            "input": input,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from_transport)?;

        if !res.status().is_success() {
            return Err(LlmError::from_response(res).await);
        }

        let payload: EmbedResponse = res.json().await.map_err(LlmError::from_transport)?;
        payload
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("no embedding returned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    #[test]
    fn decodes_content_lines() {
        let line = r#"{"model":"llama3.2","message":{"role":"assistant","content":"Hel"},"done":false}"#;
        assert_eq!(
            decode_stream_line(line).unwrap(),
            StreamEvent::Text("Hel".to_string())
        );
    }

    #[test]
    fn done_line_ends_stream() {
        let line = r#"{"model":"llama3.2","message":{"role":"assistant","content":""},"done":true}"#;
        assert_eq!(decode_stream_line(line).unwrap(), StreamEvent::Done);
    }

    #[test]
    fn error_line_becomes_error() {
        let err = decode_stream_line(r#"{"error":"model not found"}"#).unwrap_err();
        assert_eq!(err, LlmError::InvalidResponse("model not found".to_string()));
    }

    #[test]
    fn blank_and_empty_content_lines_are_skipped() {
        assert_eq!(decode_stream_line("   ").unwrap(), StreamEvent::Skip);
        let line = r#"{"message":{"role":"assistant","content":""},"done":false}"#;
        assert_eq!(decode_stream_line(line).unwrap(), StreamEvent::Skip);
    }

    #[test]
    fn garbage_is_invalid_response() {
        assert!(matches!(
            decode_stream_line("not json"),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn chat_body_maps_sampling_options() {
        let mut request = ChatRequest::new("llama3.2", vec![ChatMessage::user("hi")]);
        request.temperature = Some(0.3);
        request.max_tokens = Some(64);

        let body = OllamaProvider::chat_body(&request, true);
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["options"]["num_predict"], json!(64));
        assert_eq!(body["messages"][0]["role"], json!("user"));

        let plain = OllamaProvider::chat_body(&ChatRequest::new("m", vec![]), false);
        assert!(plain.get("options").is_none());
    }
}
