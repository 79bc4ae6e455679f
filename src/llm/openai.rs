use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};

use super::error::LlmError;
use super::lines::LineBuffer;
use super::provider::LlmProvider;
use super::stream::TokenStream;
use super::types::ChatRequest;

/// Client for OpenAI-compatible local servers (LM Studio, llama.cpp server).
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn chat_body(request: &ChatRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
            "stream": stream,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }
        body
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum SseLine {
    Text(String),
    Done,
    Skip,
}

/// Decodes one line of an OpenAI-style `text/event-stream` body.
pub(crate) fn decode_sse_line(line: &str) -> Result<SseLine, LlmError> {
    let Some(data) = line.trim().strip_prefix("data:") else {
        // comments, `event:` lines and blank separators
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let json: Value =
        serde_json::from_str(data).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
    if let Some(message) = json["error"]["message"].as_str().or(json["error"].as_str()) {
        return Err(LlmError::InvalidResponse(message.to_string()));
    }
    match json["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => Ok(SseLine::Text(content.to_string())),
        _ => Ok(SseLine::Skip),
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        let res = self.client.get(&url).send().await;
        match res {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
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

        let payload: Value = res.json().await.map_err(LlmError::from_transport)?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::InvalidResponse("reply has no message content".to_string()))
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<TokenStream, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
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
                match item {
                    Ok(bytes) => {
                        for line in lines.push(&bytes) {
                            match decode_sse_line(&line) {
                                Ok(SseLine::Text(text)) => {
                                    if !tx.send_text(text).await {
                                        return;
                                    }
                                }
                                Ok(SseLine::Done) => return,
                                Ok(SseLine::Skip) => {}
                                Err(e) => {
                                    let _ = tx.send_error(e).await;
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send_error(LlmError::from_transport(e)).await;
                        return;
                    }
                }
            }

            if let Some(rest) = lines.finish() {
                match decode_sse_line(&rest) {
                    Ok(SseLine::Text(text)) => {
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
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": model_id,
            "input": [input],
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

        let payload: Value = res.json().await.map_err(LlmError::from_transport)?;

        let embedding: Vec<f32> = payload["data"][0]["embedding"]
            .as_array()
            .map(|vals| vals.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect())
            .unwrap_or_default();
        if embedding.is_empty() {
            return Err(LlmError::InvalidResponse("no embedding returned".to_string()));
        }
        Ok(embedding)
    }
}
