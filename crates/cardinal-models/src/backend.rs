use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use cardinal_core::CardinalError;
use futures::Stream;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::RetryPolicy;

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: Value,
}

impl ProviderResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// Turn an error status into the matching [`CardinalError`].
    pub fn error_for_status(self) -> Result<Self, CardinalError> {
        if self.status < 400 {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    fn into_error(self) -> CardinalError {
        let message = self.body["error"]["message"].as_str().map(str::to_string);
        if self.status == 429 {
            CardinalError::RateLimit(message.unwrap_or_else(|| "rate limited".to_string()))
        } else {
            CardinalError::Api {
                status: self.status,
                message: message.unwrap_or_else(|| "unknown API error".to_string()),
            }
        }
    }
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes, CardinalError>> + Send>>;

#[async_trait]
pub trait ProviderBackend: Send + Sync {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, CardinalError>;
    /// Open a streamed response. Error statuses are reported here, before
    /// any body bytes are handed out.
    async fn send_stream(&self, request: ProviderRequest) -> Result<ByteStream, CardinalError>;
}

/// Errors the HTTP transport re-sends on its own, before the caller sees them.
fn is_transport_retryable(err: &CardinalError) -> bool {
    match err {
        CardinalError::Transport(_) | CardinalError::RateLimit(_) => true,
        CardinalError::Api { status, .. } => matches!(status, 408 | 409) || *status >= 500,
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub timeout: Duration,
    pub max_retries: usize,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 5,
        }
    }
}

/// Production backend using reqwest.
///
/// `timeout` bounds connecting and each read. A non-streamed request is also
/// bounded as a whole; a stream may run as long as chunks keep arriving.
pub struct HttpBackend {
    client: reqwest::Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, CardinalError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .build()
            .map_err(|e| CardinalError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout: config.timeout,
            retry: RetryPolicy::transport(config.max_retries),
        })
    }

    fn post(&self, request: &ProviderRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        builder.json(&request.body)
    }

    async fn send_once(&self, request: &ProviderRequest) -> Result<ProviderResponse, CardinalError> {
        let response = self
            .post(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CardinalError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| CardinalError::Transport(format!("failed to read response body: {e}")))?;

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(body) => body,
            Err(_) if status >= 400 => json!({"error": {"message": text}}),
            Err(e) => {
                return Err(CardinalError::Parsing(format!(
                    "failed to parse response JSON: {e}"
                )))
            }
        };

        let response = ProviderResponse { status, body };
        if status >= 400 {
            let err = response.clone().into_error();
            if is_transport_retryable(&err) {
                return Err(err);
            }
        }
        Ok(response)
    }

    async fn open_stream_once(&self, request: &ProviderRequest) -> Result<ByteStream, CardinalError> {
        use futures::StreamExt;

        let response = self
            .post(request)
            .send()
            .await
            .map_err(|e| CardinalError::Transport(format!("HTTP stream request failed: {e}")))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(status, error = %e, "failed to read error response body");
                    format!("failed to read error response body: {e}")
                }
            };
            let body = serde_json::from_str::<Value>(&text)
                .unwrap_or_else(|_| json!({"error": {"message": text}}));
            return Err(ProviderResponse { status, body }.into_error());
        }

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| CardinalError::Transport(format!("stream error: {e}"))));

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl ProviderBackend for HttpBackend {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, CardinalError> {
        self.retry
            .run_if(|| self.send_once(&request), is_transport_retryable)
            .await
    }

    async fn send_stream(&self, request: ProviderRequest) -> Result<ByteStream, CardinalError> {
        self.retry
            .run_if(|| self.open_stream_once(&request), is_transport_retryable)
            .await
    }
}

type StreamScript = Result<Vec<Result<bytes::Bytes, CardinalError>>, CardinalError>;

/// Test backend with queued responses and stream chunks.
///
/// Every call is counted and its request recorded, so tests can assert how
/// many attempts a retrying caller made and what it sent.
pub struct FakeBackend {
    responses: Arc<Mutex<VecDeque<Result<ProviderResponse, CardinalError>>>>,
    streams: Arc<Mutex<VecDeque<StreamScript>>>,
    requests: StdMutex<Vec<ProviderRequest>>,
    send_calls: AtomicUsize,
    stream_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            streams: Arc::new(Mutex::new(VecDeque::new())),
            requests: StdMutex::new(Vec::new()),
            send_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_response(&self, response: ProviderResponse) -> &Self {
        self.responses
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Ok(response));
        self
    }

    pub fn push_error(&self, error: CardinalError) -> &Self {
        self.responses
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Err(error));
        self
    }

    /// Queue a stream that delivers `chunks` and then ends.
    pub fn push_stream_chunks(&self, chunks: Vec<bytes::Bytes>) -> &Self {
        self.streams
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Ok(chunks.into_iter().map(Ok).collect()));
        self
    }

    /// Queue a stream that fails before delivering anything.
    pub fn push_stream_error(&self, error: CardinalError) -> &Self {
        self.streams
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Err(error));
        self
    }

    /// Queue a stream that delivers `chunks` and then fails with `error`.
    pub fn push_broken_stream(&self, chunks: Vec<bytes::Bytes>, error: CardinalError) -> &Self {
        let mut items: Vec<_> = chunks.into_iter().map(Ok).collect();
        items.push(Err(error));
        self.streams
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Ok(items));
        self
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn record(&self, request: ProviderRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderBackend for FakeBackend {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, CardinalError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        self.record(request);
        let mut responses = self.responses.lock().await;
        responses
            .pop_front()
            .unwrap_or_else(|| Err(CardinalError::Transport("FakeBackend exhausted".to_string())))
    }

    async fn send_stream(&self, request: ProviderRequest) -> Result<ByteStream, CardinalError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.record(request);
        let mut streams = self.streams.lock().await;
        let items = streams.pop_front().unwrap_or_else(|| Ok(Vec::new()))?;

        let stream = futures::stream::iter(items);
        Ok(Box::pin(stream))
    }
}
