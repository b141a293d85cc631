//! List command surface.

use bytes::Bytes;

use crate::client::ClusterClient;
use crate::error::Result;
use crate::frame::Frame;
use crate::slot::ensure_same_slot;

/// Which end of a list an element moves from or to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEnd {
    Left,
    Right,
}

impl ListEnd {
    fn token(self) -> Bytes {
        match self {
            ListEnd::Left => Bytes::from_static(b"LEFT"),
            ListEnd::Right => Bytes::from_static(b"RIGHT"),
        }
    }
}

/// List command interface.
#[derive(Clone)]
pub struct ListCommands {
    client: ClusterClient,
}

fn arg(bytes: impl AsRef<[u8]>) -> Bytes {
    Bytes::copy_from_slice(bytes.as_ref())
}

impl ListCommands {
    pub(crate) fn new(client: ClusterClient) -> Self {
        Self { client }
    }

    /// Prepends values, returning the new list length.
    pub async fn lpush<K, V>(&self, key: K, values: &[V]) -> Result<i64>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.push(b"LPUSH", key, values).await
    }

    /// Appends values, returning the new list length.
    pub async fn rpush<K, V>(&self, key: K, values: &[V]) -> Result<i64>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.push(b"RPUSH", key, values).await
    }

    /// Pops from the head.
    pub async fn lpop<K: AsRef<[u8]>>(&self, key: K) -> Result<Option<Bytes>> {
        self.client
            .dispatch(vec![Bytes::from_static(b"LPOP"), arg(key)])
            .await?
            .into_optional_bytes()
    }

    /// Pops from the tail.
    pub async fn rpop<K: AsRef<[u8]>>(&self, key: K) -> Result<Option<Bytes>> {
        self.client
            .dispatch(vec![Bytes::from_static(b"RPOP"), arg(key)])
            .await?
            .into_optional_bytes()
    }

    /// List length.
    pub async fn llen<K: AsRef<[u8]>>(&self, key: K) -> Result<i64> {
        self.client
            .dispatch(vec![Bytes::from_static(b"LLEN"), arg(key)])
            .await?
            .into_integer()
    }

    /// Elements between `start` and `stop`, inclusive, negative indices
    /// counting from the tail.
    pub async fn lrange<K: AsRef<[u8]>>(
        &self,
        key: K,
        start: i64,
        stop: i64,
    ) -> Result<Vec<Bytes>> {
        let items = self
            .client
            .dispatch(vec![
                Bytes::from_static(b"LRANGE"),
                arg(key),
                arg(start.to_string()),
                arg(stop.to_string()),
            ])
            .await?
            .into_array()?;
        items
            .into_iter()
            .map(|f| f.into_optional_bytes().map(Option::unwrap_or_default))
            .collect()
    }

    /// Atomically moves one element from `source` to `destination`.
    /// Both keys must hash to the same slot.
    pub async fn lmove<S, D>(
        &self,
        source: S,
        destination: D,
        from: ListEnd,
        to: ListEnd,
    ) -> Result<Option<Bytes>>
    where
        S: AsRef<[u8]>,
        D: AsRef<[u8]>,
    {
        ensure_same_slot(&[source.as_ref(), destination.as_ref()])?;
        self.client
            .dispatch(vec![
                Bytes::from_static(b"LMOVE"),
                arg(source),
                arg(destination),
                from.token(),
                to.token(),
            ])
            .await?
            .into_optional_bytes()
    }

    /// Tail-to-head move between two lists in the same slot.
    pub async fn rpoplpush<S, D>(&self, source: S, destination: D) -> Result<Option<Bytes>>
    where
        S: AsRef<[u8]>,
        D: AsRef<[u8]>,
    {
        ensure_same_slot(&[source.as_ref(), destination.as_ref()])?;
        self.client
            .dispatch(vec![
                Bytes::from_static(b"RPOPLPUSH"),
                arg(source),
                arg(destination),
            ])
            .await?
            .into_optional_bytes()
    }

    /// Blocking pop over several keys, all of which must hash to the
    /// same slot. Returns `(key, value)` or `None` on timeout.
    pub async fn blpop<K: AsRef<[u8]>>(
        &self,
        keys: &[K],
        timeout_secs: u64,
    ) -> Result<Option<(Bytes, Bytes)>> {
        ensure_same_slot(keys)?;
        let mut args = Vec::with_capacity(keys.len() + 2);
        args.push(Bytes::from_static(b"BLPOP"));
        args.extend(keys.iter().map(arg));
        args.push(arg(timeout_secs.to_string()));
        let reply = self.client.dispatch(args).await?;
        match reply {
            Frame::Null => Ok(None),
            other => {
                let mut items = other.into_array()?.into_iter();
                match (items.next(), items.next()) {
                    (Some(key), Some(value)) => Ok(Some((
                        key.into_optional_bytes()?.unwrap_or_default(),
                        value.into_optional_bytes()?.unwrap_or_default(),
                    ))),
                    _ => Err(crate::error::ClusterError::UnexpectedReply(
                        "short BLPOP reply".into(),
                    )),
                }
            }
        }
    }

    async fn push<K, V>(&self, command: &'static [u8], key: K, values: &[V]) -> Result<i64>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut args = Vec::with_capacity(values.len() + 2);
        args.push(Bytes::from_static(command));
        args.push(arg(key));
        args.extend(values.iter().map(arg));
        self.client.dispatch(args).await?.into_integer()
    }
}
