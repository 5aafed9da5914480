//! Cardinal: a chat-completion client with retry and streaming, plus
//! string-keyed storage backends.
//!
//! This crate re-exports the Cardinal sub-crates for single-import usage.
//! Enable features to control which modules are available.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `openai`, `store` |
//! | `model-utils` | `ProviderBackend`, `HttpBackend`, `FakeBackend`, `RetryPolicy` |
//! | `openai` | OpenAI-compatible `ChatModel` |
//! | `store` | In-memory `StringKeyedStorage` |
//! | `redis` | Redis `StringKeyedStorage` |
//! | `full` | All features enabled |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cardinal::core::{ChatModel, Message, Settings};
//! use cardinal::openai::ChatOpenAi;
//!
//! let model = ChatOpenAi::new(&Settings::from_env())?;
//! let reply = model.chat(&[Message::human("Say this is a test")]).await?;
//! ```

/// Core traits and types: ChatModel, Message, FunctionAvailable,
/// StringKeyedStorage, CardinalError, Settings. Always available.
pub use cardinal_core as core;

/// ProviderBackend abstraction, HTTP and fake backends, and RetryPolicy.
#[cfg(feature = "model-utils")]
pub use cardinal_models as models;

/// OpenAI-compatible ChatModel.
#[cfg(feature = "openai")]
pub use cardinal_openai as openai;

/// In-memory StringKeyedStorage.
#[cfg(feature = "store")]
pub use cardinal_store as store;

/// Redis StringKeyedStorage.
#[cfg(feature = "redis")]
pub use cardinal_redis as redis;
