use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

mod settings;
pub use settings::Settings;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// The author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    System,
    Assistant,
    Tool,
}

impl Role {
    /// Role name used by the chat-completions wire protocol.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Role::Human => "user",
            Role::System => "system",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Human => "human",
            Role::System => "system",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        f.write_str(name)
    }
}

/// A single chat message. Conversations are ordered slices of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

// ---------------------------------------------------------------------------
// Tool-related types
// ---------------------------------------------------------------------------

/// A tool the model may ask the caller to invoke.
///
/// `function` is the schema blob forwarded verbatim to the service
/// (`name`, `description`, `parameters`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionAvailable {
    #[serde(rename = "type", default = "default_tool_type")]
    pub kind: String,
    pub function: Value,
}

fn default_tool_type() -> String {
    "function".to_string()
}

impl FunctionAvailable {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            kind: default_tool_type(),
            function: json!({
                "name": name.into(),
                "description": description.into(),
                "parameters": parameters,
            }),
        }
    }

    /// Wrap an already-built schema blob.
    pub fn from_schema(function: Value) -> Self {
        Self {
            kind: default_tool_type(),
            function,
        }
    }
}

/// A tool invocation returned by the model, with its arguments decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for the completion client and the storage backends.
#[derive(Debug, Error)]
pub enum CardinalError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rate limit: {0}")]
    RateLimit(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("parsing error: {0}")]
    Parsing(String),
    #[error("completion returned no content")]
    EmptyResponse,
    #[error("malformed tool call arguments: {0}")]
    MalformedArguments(String),
    #[error("completion returned no tool call")]
    NoToolCallReturned,
    #[error("storage backend unreachable: {0}")]
    BackendUnreachable(String),
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Chat model trait
// ---------------------------------------------------------------------------

/// Pinned, boxed stream of text fragments from a streamed completion.
pub type TextStream<'a> = Pin<Box<dyn Stream<Item = Result<String, CardinalError>> + Send + 'a>>;

/// A chat-completion backend. `chat` and `function_call` are whole-response
/// calls; `stream_chat` yields content fragments as they arrive.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, messages: &[Message]) -> Result<String, CardinalError>;

    fn stream_chat(&self, messages: Vec<Message>) -> TextStream<'_> {
        Box::pin(async_stream::stream! {
            match self.chat(&messages).await {
                Ok(text) if !text.is_empty() => yield Ok(text),
                Ok(_) => {}
                Err(e) => yield Err(e),
            }
        })
    }

    /// Ask the model to pick one of `tools`. Only the first returned call is used.
    async fn function_call(
        &self,
        messages: &[Message],
        tools: &[FunctionAvailable],
    ) -> Result<FunctionCall, CardinalError>;
}

// ---------------------------------------------------------------------------
// String-keyed storage
// ---------------------------------------------------------------------------

/// Default result count for [`StringKeyedStorage::search`].
pub const DEFAULT_TOP_K: usize = 10;

/// Persistent string-keyed storage of serializable values, with a companion
/// counter that is independent of the stored records.
///
/// `insert` is best effort: pairs are written one at a time, so a failure
/// partway through leaves the earlier pairs in place.
#[async_trait]
pub trait StringKeyedStorage<V>: Send + Sync
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Write each `(key, value)` pair, overwriting existing keys.
    async fn insert(&self, keys: &[&str], values: &[V]) -> Result<(), CardinalError>;

    /// Read a value; `None` when the key is absent.
    async fn query(&self, key: &str) -> Result<Option<V>, CardinalError>;

    /// Keyword search. `top_k` defaults to [`DEFAULT_TOP_K`]. Backends without
    /// an index return [`CardinalError::NotImplemented`].
    async fn search(&self, keyword: &str, top_k: Option<usize>) -> Result<Vec<V>, CardinalError>;

    /// Remove every record of this instance. The counter is left alone.
    async fn clear(&self) -> Result<(), CardinalError>;

    async fn unique_incr(&self) -> Result<(), CardinalError>;

    /// Current counter value, 0 if never incremented or reset.
    async fn unique_get(&self) -> Result<i64, CardinalError>;

    async fn unique_reset(&self) -> Result<(), CardinalError>;

    /// Whether `search` is backed by an index.
    fn can_search(&self) -> bool {
        false
    }
}

/// Check the positional pairing `insert` relies on.
pub fn check_insert_lengths(keys: usize, values: usize) -> Result<(), CardinalError> {
    if keys != values {
        return Err(CardinalError::Validation(format!(
            "insert got {keys} keys but {values} values"
        )));
    }
    Ok(())
}

/// Serialize a stored value to its persisted byte form.
///
/// Uses bincode's standard configuration, so every serde value that does not
/// require a self-describing format round-trips exactly (nested `Option`s,
/// maps with compound keys).
pub fn encode_value<V: Serialize>(value: &V) -> Result<Vec<u8>, CardinalError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| CardinalError::Serialization(e.to_string()))
}

/// Inverse of [`encode_value`]. Trailing bytes are an error.
pub fn decode_value<V: DeserializeOwned>(bytes: &[u8]) -> Result<V, CardinalError> {
    let (value, read) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| CardinalError::Serialization(e.to_string()))?;
    if read != bytes.len() {
        return Err(CardinalError::Serialization(format!(
            "{} trailing bytes after stored value",
            bytes.len() - read
        )));
    }
    Ok(value)
}
