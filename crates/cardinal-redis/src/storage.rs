use std::marker::PhantomData;

use async_trait::async_trait;
use cardinal_core::{
    check_insert_lengths, decode_value, encode_value, CardinalError, Settings, StringKeyedStorage,
};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Redis-backed implementation of [`StringKeyedStorage`].
///
/// Records live in one Redis hash named after the storage instance; the
/// counter is a plain integer key `unique_{name}`. Several named storages
/// can share one Redis database.
pub struct RedisStorage<V> {
    name: String,
    counter_key: String,
    con: MultiplexedConnection,
    _value: PhantomData<fn() -> V>,
}

impl<V> RedisStorage<V> {
    /// Connect to `settings.redis_uri` and verify the server answers PING.
    pub async fn new(name: impl Into<String>, settings: &Settings) -> Result<Self, CardinalError> {
        Self::from_url(name, &settings.redis_uri).await
    }

    /// Connect to `url` and verify the server answers PING.
    ///
    /// # Errors
    ///
    /// [`CardinalError::Config`] if the URL is invalid,
    /// [`CardinalError::BackendUnreachable`] if the server cannot be reached.
    pub async fn from_url(name: impl Into<String>, url: &str) -> Result<Self, CardinalError> {
        let name = name.into();
        let client = redis::Client::open(url)
            .map_err(|e| CardinalError::Config(format!("invalid Redis URL: {e}")))?;
        let mut con = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CardinalError::BackendUnreachable(format!("Redis connection error: {e}")))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut con)
            .await
            .map_err(|e| CardinalError::BackendUnreachable(format!("Redis PING failed: {e}")))?;

        tracing::info!(storage = %name, "connected to Redis");
        Ok(Self {
            counter_key: format!("unique_{name}"),
            name,
            con,
            _value: PhantomData,
        })
    }

    /// Name of the Redis hash holding this instance's records.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Redis key of this instance's counter.
    pub fn counter_key(&self) -> &str {
        &self.counter_key
    }

    fn connection(&self) -> MultiplexedConnection {
        self.con.clone()
    }
}

#[async_trait]
impl<V> StringKeyedStorage<V> for RedisStorage<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn insert(&self, keys: &[&str], values: &[V]) -> Result<(), CardinalError> {
        check_insert_lengths(keys.len(), values.len())?;
        let encoded = values
            .iter()
            .map(encode_value)
            .collect::<Result<Vec<_>, _>>()?;

        // One HSET per pair; a failure leaves earlier pairs written.
        let mut con = self.connection();
        for (key, bytes) in keys.iter().zip(encoded) {
            con.hset::<_, _, _, ()>(&self.name, *key, bytes)
                .await
                .map_err(|e| CardinalError::Store(format!("Redis HSET error: {e}")))?;
        }
        tracing::debug!(storage = %self.name, count = keys.len(), "inserted records");
        Ok(())
    }

    async fn query(&self, key: &str) -> Result<Option<V>, CardinalError> {
        let mut con = self.connection();
        let raw: Option<Vec<u8>> = con
            .hget(&self.name, key)
            .await
            .map_err(|e| CardinalError::Store(format!("Redis HGET error: {e}")))?;
        raw.map(|bytes| decode_value(&bytes)).transpose()
    }

    async fn search(&self, _keyword: &str, _top_k: Option<usize>) -> Result<Vec<V>, CardinalError> {
        Err(CardinalError::NotImplemented("RedisStorage::search"))
    }

    async fn clear(&self) -> Result<(), CardinalError> {
        let mut con = self.connection();
        con.del::<_, ()>(&self.name)
            .await
            .map_err(|e| CardinalError::Store(format!("Redis DEL error: {e}")))?;
        tracing::debug!(storage = %self.name, "cleared records");
        Ok(())
    }

    async fn unique_incr(&self) -> Result<(), CardinalError> {
        let mut con = self.connection();
        con.incr::<_, _, ()>(&self.counter_key, 1)
            .await
            .map_err(|e| CardinalError::Store(format!("Redis INCR error: {e}")))
    }

    async fn unique_get(&self) -> Result<i64, CardinalError> {
        let mut con = self.connection();
        let value: Option<i64> = con
            .get(&self.counter_key)
            .await
            .map_err(|e| CardinalError::Store(format!("Redis GET error: {e}")))?;
        Ok(value.unwrap_or(0))
    }

    async fn unique_reset(&self) -> Result<(), CardinalError> {
        let mut con = self.connection();
        con.del::<_, ()>(&self.counter_key)
            .await
            .map_err(|e| CardinalError::Store(format!("Redis DEL error: {e}")))
    }
}
