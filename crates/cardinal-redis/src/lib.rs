//! Redis integration for Cardinal.
//!
//! [`RedisStorage`] implements the
//! [`StringKeyedStorage`](cardinal_core::StringKeyedStorage) trait on top of
//! a Redis hash per storage instance plus an atomic counter key.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use cardinal_redis::{RedisStorage, StringKeyedStorage};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Document {
//!     content: String,
//! }
//!
//! # async fn example() -> Result<(), cardinal_core::CardinalError> {
//! let storage = RedisStorage::<Document>::from_url("docs", "redis://127.0.0.1/").await?;
//! storage
//!     .insert(&["doc1"], &[Document { content: "I am alice.".into() }])
//!     .await?;
//! let doc = storage.query("doc1").await?;
//! # Ok(())
//! # }
//! ```

mod storage;

pub use storage::RedisStorage;

// Re-export the storage trait for convenience.
pub use cardinal_core::StringKeyedStorage;
