use cardinal::core::{CardinalError, Settings, StringKeyedStorage};
use cardinal::redis::RedisStorage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    content: String,
    title: String,
}

impl Document {
    fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            title: "test".to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CardinalError> {
    tracing_subscriber::fmt::init();

    let storage = RedisStorage::<Document>::new("test", &Settings::from_env()).await?;

    storage
        .insert(
            &["doc1", "doc2"],
            &[Document::new("I am alice."), Document::new("I am bob.")],
        )
        .await?;
    println!("doc1: {:?}", storage.query("doc1").await?);
    println!("doc2: {:?}", storage.query("doc2").await?);

    storage.clear().await?;
    println!("doc1 after clear: {:?}", storage.query("doc1").await?);

    storage.unique_reset().await?;
    storage.unique_incr().await?;
    storage.unique_incr().await?;
    println!("counter: {}", storage.unique_get().await?);

    Ok(())
}
