#[cfg(test)]
mod tests {
    use crate::core::config::{LlmConfig, ProviderKind};
    use crate::llm::{ChatMessage, ChatOutcome, LlmError, LlmService};
    use crate::testing::MockProvider;

    /// Serves `body` verbatim on `POST path` and returns the base URL.
    async fn serve_body(path: &'static str, body: &'static str) -> String {
        let app = axum::Router::new()
            .route(path, axum::routing::post(move || async move { body }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn provider_follows_config() {
        let ollama = LlmService::from_config(&LlmConfig::default());
        assert_eq!(ollama.provider_name(), "ollama");

        let config = LlmConfig {
            provider: ProviderKind::OpenAi,
            base_url: "http://localhost:1234".to_string(),
            ..LlmConfig::default()
        };
        assert_eq!(LlmService::from_config(&config).provider_name(), "openai");
    }

    #[tokio::test]
    async fn send_returns_complete_reply_when_not_streaming() {
        let (provider, service) = MockProvider::new(&["Hello", " there"]).into_service();
        let request = service.chat_request(vec![ChatMessage::user("hi")]);

        match service.send(request).await.unwrap() {
            ChatOutcome::Complete(text) => assert_eq!(text, "Hello there"),
            ChatOutcome::Streaming(_) => panic!("expected a complete reply"),
        }
        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].model, "llama3.2");
        assert!(!requests[0].stream);
    }

    #[tokio::test]
    async fn send_returns_stream_when_streaming() {
        let (_provider, service) = MockProvider::new(&["a", "b"]).into_service();
        let request = service
            .chat_request(vec![ChatMessage::user("hi")])
            .streaming(true);

        match service.send(request).await.unwrap() {
            ChatOutcome::Streaming(stream) => {
                assert_eq!(stream.collect_text().await.unwrap(), "ab")
            }
            ChatOutcome::Complete(_) => panic!("expected a stream"),
        }
    }

    #[tokio::test]
    async fn unreachable_backend_is_unavailable() {
        // Port 9 (discard) is closed on test machines.
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..LlmConfig::default()
        };
        let service = LlmService::from_config(&config);
        let err = service
            .chat(service.chat_request(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::BackendUnavailable(_)));
        assert!(!service.health_check().await);
    }

    #[tokio::test]
    async fn openai_truncated_final_line_is_an_error() {
        let base_url = serve_body(
            "/v1/chat/completions",
            concat!(
                r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#,
                "\n\n",
                r#"data: {"choices":["#
            ),
        )
        .await;
        let service = LlmService::from_config(&LlmConfig {
            provider: ProviderKind::OpenAi,
            base_url,
            ..LlmConfig::default()
        });

        let request = service
            .chat_request(vec![ChatMessage::user("hi")])
            .streaming(true);
        let mut stream = service.stream_chat(request).await.unwrap();
        assert_eq!(stream.next_fragment().await.unwrap().unwrap().text, "Hi");
        assert!(matches!(
            stream.next_fragment().await,
            Some(Err(LlmError::InvalidResponse(_)))
        ));
        assert!(stream.next_fragment().await.is_none());
    }

    #[tokio::test]
    async fn ollama_truncated_final_line_is_an_error() {
        let base_url = serve_body(
            "/api/chat",
            concat!(
                r#"{"message":{"role":"assistant","content":"Hi"},"done":false}"#,
                "\n",
                r#"{"message":"#
            ),
        )
        .await;
        let service = LlmService::from_config(&LlmConfig {
            base_url,
            ..LlmConfig::default()
        });

        let request = service
            .chat_request(vec![ChatMessage::user("hi")])
            .streaming(true);
        let err = service
            .stream_chat(request)
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_ollama_connection() {
        let service = LlmService::from_config(&LlmConfig::default());
        assert!(service.health_check().await, "Ollama is not running");

        let request = service.chat_request(vec![ChatMessage::user("Say hello in one word.")]);
        match service.chat(request).await {
            Ok(response) => println!("Ollama Chat Response: {}", response),
            Err(e) => panic!("Ollama Chat Error: {}", e),
        }

        let embedding = service.embed("hello").await.expect("embedding should work");
        println!("Embedding dimensions: {}", embedding.len());
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_lmstudio_connection() {
        let config = LlmConfig {
            provider: ProviderKind::OpenAi,
            base_url: "http://localhost:1234".to_string(),
            ..LlmConfig::default()
        };
        let service = LlmService::from_config(&config);

        let request = service
            .chat_request(vec![ChatMessage::user("Hello")])
            .streaming(true);
        match service.stream_chat(request).await {
            Ok(stream) => println!("LM Studio stream: {:?}", stream.collect_text().await),
            Err(e) => println!("LM Studio Chat Error: {}", e),
        }
    }
}
