use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use cardinal_core::{
    check_insert_lengths, decode_value, encode_value, CardinalError, StringKeyedStorage,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

/// Process-local [`StringKeyedStorage`].
///
/// Values are kept in their serialized form, so a value read back goes
/// through the same encode/decode path as the Redis backend.
pub struct InMemoryStorage<V> {
    name: String,
    records: RwLock<HashMap<String, Vec<u8>>>,
    counter: AtomicI64,
    _value: PhantomData<fn() -> V>,
}

impl<V> InMemoryStorage<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(HashMap::new()),
            counter: AtomicI64::new(0),
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl<V> StringKeyedStorage<V> for InMemoryStorage<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn insert(&self, keys: &[&str], values: &[V]) -> Result<(), CardinalError> {
        check_insert_lengths(keys.len(), values.len())?;
        let encoded = values
            .iter()
            .map(encode_value)
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = self.records.write().await;
        for (key, bytes) in keys.iter().zip(encoded) {
            records.insert((*key).to_string(), bytes);
        }
        Ok(())
    }

    async fn query(&self, key: &str) -> Result<Option<V>, CardinalError> {
        let records = self.records.read().await;
        records.get(key).map(|bytes| decode_value(bytes)).transpose()
    }

    async fn search(&self, _keyword: &str, _top_k: Option<usize>) -> Result<Vec<V>, CardinalError> {
        Err(CardinalError::NotImplemented("InMemoryStorage::search"))
    }

    async fn clear(&self) -> Result<(), CardinalError> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn unique_incr(&self) -> Result<(), CardinalError> {
        self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn unique_get(&self) -> Result<i64, CardinalError> {
        Ok(self.counter.load(Ordering::SeqCst))
    }

    async fn unique_reset(&self) -> Result<(), CardinalError> {
        self.counter.store(0, Ordering::SeqCst);
        Ok(())
    }
}
