use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cardinal_core::{
    CardinalError, ChatModel, FunctionAvailable, FunctionCall, Message, Settings, TextStream,
};
use cardinal_models::{
    ByteStream, HttpBackend, HttpBackendConfig, ProviderBackend, ProviderRequest,
    ProviderResponse, RetryPolicy,
};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Per-request timeout enforced by the HTTP transport.
    pub timeout: Duration,
    /// Connection-level re-sends performed by the HTTP transport.
    pub max_retries: usize,
    /// Policy wrapped around every completion request.
    pub retry: RetryPolicy,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 5,
            retry: RetryPolicy::completion(),
        }
    }

    /// Build from process settings. Fails if no API key is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self, CardinalError> {
        let api_key = settings
            .openai_api_key
            .clone()
            .ok_or_else(|| CardinalError::Config("OPENAI_API_KEY is not set".to_string()))?;
        Ok(Self::new(api_key, settings.chat_model.clone())
            .with_base_url(settings.openai_base_url.clone()))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Chat-completions client with retry, streaming and single tool calls.
pub struct ChatOpenAi {
    config: OpenAiConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl ChatOpenAi {
    /// Build a client over the HTTP transport. No request is sent here.
    pub fn new(settings: &Settings) -> Result<Self, CardinalError> {
        Self::from_config(OpenAiConfig::from_settings(settings)?)
    }

    pub fn from_config(config: OpenAiConfig) -> Result<Self, CardinalError> {
        let backend = HttpBackend::new(HttpBackendConfig {
            timeout: config.timeout,
            max_retries: config.max_retries,
        })?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    pub fn with_backend(config: OpenAiConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn build_request(
        &self,
        messages: &[Message],
        stream: bool,
        tools: Option<&[FunctionAvailable]>,
    ) -> ProviderRequest {
        let mut body = json!({
            "messages": parse_messages(messages),
            "model": self.config.model,
            "stream": stream,
        });
        if let Some(tools) = tools {
            body["tools"] = json!(parse_tools(tools));
        }

        ProviderRequest {
            url: format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.config.api_key),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body,
        }
    }

    /// Send a non-streamed completion, retrying every failure under the
    /// configured policy. Each attempt builds a fresh request.
    async fn completion_with_backoff(
        &self,
        messages: &[Message],
        tools: Option<&[FunctionAvailable]>,
    ) -> Result<ProviderResponse, CardinalError> {
        self.config
            .retry
            .run(move || async move {
                let request = self.build_request(messages, false, tools);
                tracing::debug!(
                    model = %self.config.model,
                    message_count = messages.len(),
                    tool_count = tools.map_or(0, <[_]>::len),
                    "sending completion request"
                );
                self.backend.send(request).await?.error_for_status()
            })
            .await
    }

    /// Open a streamed completion. Only establishing the stream is retried.
    async fn stream_with_backoff(&self, messages: &[Message]) -> Result<ByteStream, CardinalError> {
        self.config
            .retry
            .run(move || async move {
                let request = self.build_request(messages, true, None);
                tracing::debug!(
                    model = %self.config.model,
                    message_count = messages.len(),
                    "opening completion stream"
                );
                self.backend.send_stream(request).await
            })
            .await
    }
}

/// Wire form of a conversation: `role` and `content` only, in order.
pub fn parse_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| json!({"role": m.role().as_wire(), "content": m.content()}))
        .collect()
}

/// Wire form of a tool catalog: `type` and `function` only.
pub fn parse_tools(tools: &[FunctionAvailable]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| json!({"type": t.kind, "function": t.function}))
        .collect()
}

fn parse_content(body: &Value) -> Result<String, CardinalError> {
    match body["choices"][0]["message"]["content"].as_str() {
        Some(content) if !content.is_empty() => Ok(content.to_string()),
        _ => Err(CardinalError::EmptyResponse),
    }
}

// Only the first tool call is read; any others are ignored.
fn parse_function_call(body: &Value) -> Result<FunctionCall, CardinalError> {
    let tool_call = &body["choices"][0]["message"]["tool_calls"][0];
    if tool_call.is_null() {
        return Err(CardinalError::NoToolCallReturned);
    }

    let name = tool_call["function"]["name"]
        .as_str()
        .ok_or_else(|| CardinalError::Parsing("tool call has no function name".to_string()))?
        .to_string();
    let raw = tool_call["function"]["arguments"].as_str().ok_or_else(|| {
        CardinalError::MalformedArguments(format!("tool call `{name}` has no argument text"))
    })?;

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(arguments)) => Ok(FunctionCall { name, arguments }),
        Ok(other) => Err(CardinalError::MalformedArguments(format!(
            "expected a JSON object, got `{other}`"
        ))),
        Err(e) => Err(CardinalError::MalformedArguments(e.to_string())),
    }
}

fn parse_stream_delta(data: &str) -> Result<Option<String>, CardinalError> {
    let v: Value = serde_json::from_str(data)
        .map_err(|e| CardinalError::Parsing(format!("invalid stream chunk: {e}")))?;
    Ok(v["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}

#[async_trait]
impl ChatModel for ChatOpenAi {
    async fn chat(&self, messages: &[Message]) -> Result<String, CardinalError> {
        let response = self.completion_with_backoff(messages, None).await?;
        parse_content(&response.body)
    }

    fn stream_chat(&self, messages: Vec<Message>) -> TextStream<'_> {
        Box::pin(async_stream::stream! {
            let byte_stream = match self.stream_with_backoff(&messages).await {
                Ok(s) => s,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            use eventsource_stream::{EventStreamError, Eventsource};
            use futures::StreamExt;

            let mut event_stream = byte_stream.eventsource();

            while let Some(event) = event_stream.next().await {
                match event {
                    Ok(ev) => {
                        if ev.data == "[DONE]" {
                            break;
                        }
                        match parse_stream_delta(&ev.data) {
                            Ok(Some(text)) => yield Ok(text),
                            Ok(None) => {}
                            Err(e) => {
                                yield Err(e);
                                break;
                            }
                        }
                    }
                    Err(EventStreamError::Transport(e)) => {
                        yield Err(e);
                        break;
                    }
                    Err(e) => {
                        yield Err(CardinalError::Parsing(format!("invalid event stream: {e}")));
                        break;
                    }
                }
            }
        })
    }

    async fn function_call(
        &self,
        messages: &[Message],
        tools: &[FunctionAvailable],
    ) -> Result<FunctionCall, CardinalError> {
        let response = self.completion_with_backoff(messages, Some(tools)).await?;
        let call = parse_function_call(&response.body)?;
        tracing::debug!(function = %call.name, "completion returned tool call");
        Ok(call)
    }
}
