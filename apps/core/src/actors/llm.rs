use crate::actors::messages::{AppError, ChatMessage, LlmMessage};
use crate::actors::traits::LlmActor;
use crate::config::LlmConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

/// Extra time the handle waits beyond the HTTP timeout before giving up on the actor.
const REPLY_GRACE: Duration = Duration::from_secs(5);

/// A handle to the `LlmActor`.
///
/// This struct provides a public, cloneable interface for sending messages to the
/// running LLM actor. It abstracts away the `mpsc::Sender`.
#[derive(Clone)]
pub struct LlmActorHandle {
    sender: mpsc::Sender<LlmMessage>,
    reply_timeout: Duration,
}

impl LlmActorHandle {
    /// Creates a new `LlmActor` and returns a handle to it.
    ///
    /// This will spawn the `LlmActorRunner` in a new Tokio task.
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint, credentials and sampling parameters.
    pub fn new(config: LlmConfig) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let reply_timeout = Duration::from_secs(config.request_timeout_secs) + REPLY_GRACE;
        let actor = LlmActorRunner::new(receiver, config);
        tokio::spawn(async move { actor.run().await });
        Self {
            sender,
            reply_timeout,
        }
    }

    /// A convenience method for a single-message conversation.
    pub async fn ask(&self, prompt: String) -> Result<String, AppError> {
        self.complete(vec![ChatMessage::user(prompt)]).await
    }
}

#[async_trait]
impl LlmActor for LlmActorHandle {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = LlmMessage::Complete {
            messages,
            responder: send,
        };

        self.sender
            .send(msg)
            .await
            .map_err(|e| AppError::Actor(e.to_string()))?;
        timeout(self.reply_timeout, recv)
            .await?
            .map_err(|e| AppError::Actor(e.to_string()))?
    }
}

// --- Wire Types ---
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// --- Actor Runner (Internal Logic) ---
struct LlmActorRunner {
    receiver: mpsc::Receiver<LlmMessage>,
    client: Client,
    config: LlmConfig,
}

impl LlmActorRunner {
    fn new(receiver: mpsc::Receiver<LlmMessage>, config: LlmConfig) -> Self {
        Self {
            receiver,
            client: Client::new(),
            config,
        }
    }

    async fn run(mut self) {
        info!(model = %self.config.model, "LlmActor started");

        if self.config.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; model-backed answers will fall back to support");
        }

        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg).await;
        }

        info!("LlmActor stopped");
    }

    async fn handle_message(&self, msg: LlmMessage) {
        match msg {
            LlmMessage::Complete {
                messages,
                responder,
            } => {
                let result = self.chat_completion(messages).await;
                if responder.send(result).is_err() {
                    warn!("Failed to send completion response (channel closed)");
                }
            }
        }
    }

    fn completions_url(&self) -> Result<Url, AppError> {
        let endpoint = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        Ok(Url::parse(&endpoint)?)
    }

    fn build_request(&self, payload: &ChatCompletionRequest<'_>) -> Result<RequestBuilder, AppError> {
        let token = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| AppError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        let auth_value: HeaderValue = format!("Bearer {}", token)
            .parse()
            .map_err(|_| AppError::Config("API key is not a valid header value".to_string()))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(self
            .client
            .post(self.completions_url()?)
            .headers(headers)
            .json(payload))
    }

    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String, AppError> {
        debug!(
            model = %self.config.model,
            messages = messages.len(),
            "sending chat completion request"
        );

        let payload = ChatCompletionRequest {
            model: &self.config.model,
            messages: &messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let request = self.build_request(&payload)?;

        // One deadline covers the headers and the body.
        timeout(
            Duration::from_secs(self.config.request_timeout_secs),
            Self::exchange(request),
        )
        .await?
    }

    async fn exchange(request: RequestBuilder) -> Result<String, AppError> {
        let res = request.send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::ModelUnavailable(format!(
                "Completion request failed with status {}: {}",
                status, body
            )));
        }

        let body: ChatCompletionResponse = res.json().await.map_err(|e| {
            AppError::ModelUnavailable(format!("Malformed completion response: {}", e))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                AppError::ModelUnavailable("Completion response contained no answer".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn setup_test_actor(server_url: String, api_key: Option<&str>, timeout_secs: u64) -> LlmActorHandle {
        let (sender, receiver) = mpsc::channel(32);

        let config = LlmConfig {
            api_base: server_url,
            api_key: api_key.map(str::to_string),
            request_timeout_secs: timeout_secs,
            ..LlmConfig::default()
        };
        let actor = LlmActorRunner::new(receiver, config);
        tokio::spawn(async move { actor.run().await });

        LlmActorHandle {
            sender,
            reply_timeout: Duration::from_secs(timeout_secs) + REPLY_GRACE,
        }
    }

    #[tokio::test]
    async fn test_llm_completion_success() {
        // 1. Arrange
        let mock_server = MockServer::start().await;
        let handle = setup_test_actor(mock_server.uri(), Some("test-key"), 10);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4-turbo-preview",
                "max_tokens": 600,
                "messages": [{"role": "user", "content": "Hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "model": "gpt-4-turbo-preview",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "This is a test response."}}
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        // 2. Act
        let result = handle.ask("Hello".to_string()).await;

        // 3. Assert
        assert_eq!(result.unwrap(), "This is a test response.");
    }

    #[tokio::test]
    async fn test_llm_completion_server_error() {
        // 1. Arrange
        let mock_server = MockServer::start().await;
        let handle = setup_test_actor(mock_server.uri(), Some("test-key"), 10);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&mock_server)
            .await;

        // 2. Act
        let result = handle.ask("Hello".to_string()).await;

        // 3. Assert
        if let Err(AppError::ModelUnavailable(err_msg)) = result {
            assert!(err_msg.contains("Completion request failed with status 500"));
            assert!(err_msg.contains("Internal Server Error"));
        } else {
            panic!("Expected AppError::ModelUnavailable, got {:?}", result);
        }
    }

    #[tokio::test]
    async fn test_llm_completion_without_key_is_config_error() {
        let mock_server = MockServer::start().await;
        let handle = setup_test_actor(mock_server.uri(), None, 10);

        let result = handle.ask("Hello".to_string()).await;

        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(mock_server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_llm_completion_empty_choices() {
        let mock_server = MockServer::start().await;
        let handle = setup_test_actor(mock_server.uri(), Some("test-key"), 10);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let result = handle.ask("Hello".to_string()).await;

        assert!(matches!(result, Err(AppError::ModelUnavailable(_))));
    }

    #[tokio::test]
    async fn test_llm_completion_rejects_malformed_base() {
        let handle = setup_test_actor("not a url".to_string(), Some("test-key"), 10);

        let result = handle.ask("Hello".to_string()).await;

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_llm_completion_times_out() {
        let mock_server = MockServer::start().await;
        let handle = setup_test_actor(mock_server.uri(), Some("test-key"), 1);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(json!({"choices": []})),
            )
            .mount(&mock_server)
            .await;

        let result = handle.ask("Hello".to_string()).await;

        assert!(matches!(result, Err(AppError::Timeout(_))));
    }

    /// Serves response headers promising a body that never arrives.
    async fn start_stalling_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let _ = socket.read(&mut buf).await;
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 1000\r\n\r\n{\"choices\"",
                        )
                        .await;
                    tokio::time::sleep(Duration::from_secs(60)).await;
                });
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_stalled_body_times_out_and_actor_recovers() {
        let server_url = start_stalling_server().await;
        let handle = setup_test_actor(server_url, Some("test-key"), 1);

        for _ in 0..2 {
            let started = Instant::now();
            let result = handle.ask("Hello".to_string()).await;

            assert!(matches!(result, Err(AppError::Timeout(_))));
            assert!(started.elapsed() < Duration::from_secs(4));
        }
    }
}
