//! Key-value command surface.
//!
//! Thin wrappers over [`ClusterClient::dispatch`]: each method shapes
//! arguments, dispatches, and interprets the reply frame. Multi-key
//! commands validate that every key lands in the same slot first.

use bytes::Bytes;

use crate::client::ClusterClient;
use crate::error::Result;
use crate::frame::Frame;
use crate::slot::ensure_same_slot;

/// Key-value command interface.
#[derive(Clone)]
pub struct KvCommands {
    client: ClusterClient,
}

fn arg(bytes: impl AsRef<[u8]>) -> Bytes {
    Bytes::copy_from_slice(bytes.as_ref())
}

impl KvCommands {
    pub(crate) fn new(client: ClusterClient) -> Self {
        Self { client }
    }

    /// Sets a key to a value.
    pub async fn set<K, V>(&self, key: K, value: V) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.client
            .dispatch(vec![Bytes::from_static(b"SET"), arg(key), arg(value)])
            .await?
            .expect_ok()
    }

    /// Sets a key with a time-to-live in seconds.
    pub async fn set_ex<K, V>(&self, key: K, value: V, ttl_secs: u64) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.client
            .dispatch(vec![
                Bytes::from_static(b"SETEX"),
                arg(key),
                arg(ttl_secs.to_string()),
                arg(value),
            ])
            .await?
            .expect_ok()
    }

    /// Gets a key's value, or `None` if it does not exist.
    pub async fn get<K: AsRef<[u8]>>(&self, key: K) -> Result<Option<Bytes>> {
        self.client
            .dispatch(vec![Bytes::from_static(b"GET"), arg(key)])
            .await?
            .into_optional_bytes()
    }

    /// Deletes a key, returning whether it existed.
    pub async fn del<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        let n = self
            .client
            .dispatch(vec![Bytes::from_static(b"DEL"), arg(key)])
            .await?
            .into_integer()?;
        Ok(n > 0)
    }

    /// Checks whether a key exists.
    pub async fn exists<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        let n = self
            .client
            .dispatch(vec![Bytes::from_static(b"EXISTS"), arg(key)])
            .await?
            .into_integer()?;
        Ok(n > 0)
    }

    /// Increments a numeric value, returning the new value.
    pub async fn incr<K: AsRef<[u8]>>(&self, key: K) -> Result<i64> {
        self.client
            .dispatch(vec![Bytes::from_static(b"INCR"), arg(key)])
            .await?
            .into_integer()
    }

    /// Decrements a numeric value, returning the new value.
    pub async fn decr<K: AsRef<[u8]>>(&self, key: K) -> Result<i64> {
        self.client
            .dispatch(vec![Bytes::from_static(b"DECR"), arg(key)])
            .await?
            .into_integer()
    }

    /// Gets several keys at once. All keys must hash to the same slot.
    pub async fn mget<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<Vec<Option<Bytes>>> {
        ensure_same_slot(keys)?;
        let mut args = Vec::with_capacity(keys.len() + 1);
        args.push(Bytes::from_static(b"MGET"));
        args.extend(keys.iter().map(arg));
        let items = self.client.dispatch(args).await?.into_array()?;
        items.into_iter().map(Frame::into_optional_bytes).collect()
    }

    /// Sets several key-value pairs at once. All keys must hash to the
    /// same slot.
    pub async fn mset<K, V>(&self, pairs: &[(K, V)]) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let keys: Vec<&K> = pairs.iter().map(|(k, _)| k).collect();
        ensure_same_slot(&keys)?;
        let mut args = Vec::with_capacity(pairs.len() * 2 + 1);
        args.push(Bytes::from_static(b"MSET"));
        for (key, value) in pairs {
            args.push(arg(key));
            args.push(arg(value));
        }
        self.client.dispatch(args).await?.expect_ok()
    }
}
