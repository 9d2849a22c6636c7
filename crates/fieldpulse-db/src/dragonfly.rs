//! `Dragonfly` (Redis-compatible) document store.
//!
//! Each document is stored as one JSON string so a write replaces it
//! atomically. After every write the store publishes the same JSON on a
//! per-document channel; a dedicated subscriber connection listens on all
//! change channels and re-broadcasts them as [`DocumentChange`] values.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `{namespace}:{id}` | JSON | Full snapshot document |
//! | `{namespace}:{id}:changes` | Pub/Sub | Full document after each write |

use std::sync::Arc;

use fieldpulse_types::Snapshot;
use fred::prelude::*;
use fred::types::Message;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::DbError;
use crate::store::{CHANGE_FEED_CAPACITY, DocumentChange, DocumentKey, DocumentStore};

/// Suffix appended to a storage key to form its change channel.
const CHANGE_CHANNEL_SUFFIX: &str = ":changes";

/// Pattern matching every change channel.
const CHANGE_CHANNEL_PATTERN: &str = "*:changes";

/// Connection handles to a `Dragonfly` instance.
///
/// Holds a command client and a separate subscriber client, since a
/// connection in subscribe mode cannot issue regular commands.
pub struct DragonflyStore {
    client: Client,
    _subscriber: Client,
    tx: broadcast::Sender<DocumentChange>,
    listener: JoinHandle<()>,
}

impl DragonflyStore {
    /// Connect to `Dragonfly` at the given URL and start listening for
    /// document changes.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if either connection or the pattern
    /// subscription fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config.clone()).build()?;
        client.init().await?;

        let subscriber = Builder::from_config(config).build()?;
        subscriber.init().await?;

        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        let listener = spawn_listener(subscriber.message_rx(), tx.clone());
        subscriber.psubscribe(CHANGE_CHANNEL_PATTERN).await?;

        tracing::info!(pattern = CHANGE_CHANNEL_PATTERN, "Connected to Dragonfly");
        Ok(Self {
            client,
            _subscriber: subscriber,
            tx,
            listener,
        })
    }

    /// Flush all keys from the `Dragonfly` instance.
    ///
    /// **WARNING:** This deletes all data. Only use for testing.
    pub async fn flush_all(&self) -> Result<(), DbError> {
        let _: () = self.client.flushall(false).await?;
        Ok(())
    }

    /// Return a reference to the command [`Client`].
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

impl DocumentStore for DragonflyStore {
    async fn read(&self, key: &DocumentKey) -> Result<Option<Snapshot>, DbError> {
        let value: Option<String> = self.client.get(key.storage_key()).await?;
        value
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(DbError::from)
    }

    async fn write(&self, key: &DocumentKey, snapshot: &Snapshot) -> Result<(), DbError> {
        let storage_key = key.storage_key();
        let json = serde_json::to_string(snapshot)?;

        let _: () = self
            .client
            .set(storage_key.as_str(), json.as_str(), None, None, false)
            .await?;

        let channel = format!("{storage_key}{CHANGE_CHANNEL_SUFFIX}");
        let receivers: i64 = self.client.publish(channel.as_str(), json.as_str()).await?;
        tracing::debug!(%key, receivers, "Document replaced");
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<DocumentChange> {
        self.tx.subscribe()
    }
}

impl Drop for DragonflyStore {
    fn drop(&mut self) {
        self.listener.abort();
        tracing::debug!("Dragonfly change listener stopped");
    }
}

// ---------------------------------------------------------------------------
// Change listener
// ---------------------------------------------------------------------------

/// Forward pub/sub messages from the subscriber client into the local
/// change feed until the client shuts down.
fn spawn_listener(
    mut rx: broadcast::Receiver<Message>,
    tx: broadcast::Sender<DocumentChange>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => match decode_change(&message) {
                    Ok(change) => {
                        let _ = tx.send(change);
                    }
                    Err(e) => {
                        tracing::warn!(channel = %message.channel, error = %e, "Dropping malformed change message");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dragonfly change listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Turn a pub/sub message into a [`DocumentChange`].
fn decode_change(message: &Message) -> Result<DocumentChange, DbError> {
    let key = parse_channel(&message.channel)
        .ok_or_else(|| DbError::Unavailable(format!("unexpected channel {}", message.channel)))?;
    let payload = message
        .value
        .as_str()
        .ok_or_else(|| DbError::Unavailable("change payload is not a string".to_owned()))?;
    let snapshot: Snapshot = serde_json::from_str(&payload)?;
    Ok(DocumentChange {
        key,
        snapshot: Arc::new(snapshot),
    })
}

/// Recover the document key from a `{namespace}:{id}:changes` channel name.
fn parse_channel(channel: &str) -> Option<DocumentKey> {
    let storage_key = channel.strip_suffix(CHANGE_CHANNEL_SUFFIX)?;
    let (namespace, id) = storage_key.split_once(':')?;
    if namespace.is_empty() || id.is_empty() {
        return None;
    }
    Some(DocumentKey::new(namespace, id))
}
