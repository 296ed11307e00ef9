//! Distribution fabric: per-city fan-out of readings and alerts.
//!
//! Each subscriber owns a bounded queue; `publish` enqueues and never invokes
//! client code, so fan-out latency is decoupled from the publisher. The
//! subscriber registry is an owned instance handed to whoever needs to
//! publish or subscribe — there is no ambient global state.
//!
//! Delivery is best-effort. A full or closed queue drops that one delivery,
//! logged and invisible to the publisher; sibling subscribers are unaffected.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::models::{AlertEvent, StoredReading};

// ---

/// One message pushed to subscribed clients. Serialized as tagged JSON so
/// clients can dispatch on `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PushMessage {
    /// A freshly ingested reading together with the alerts it derived.
    NewReading {
        reading: StoredReading,
        alerts: Vec<AlertEvent>,
    },
    /// A single alert, automatic or manually authored.
    NewAlert { alert: AlertEvent },
}

/// Identifies one client connection for the lifetime of its socket.
pub type ConnId = Uuid;

struct Registry {
    // ---
    connections: HashMap<ConnId, mpsc::Sender<PushMessage>>,
    topics: HashMap<String, HashSet<ConnId>>,
}

pub struct DistributionFabric {
    // ---
    inner: Mutex<Registry>,
    queue_capacity: usize,
}

impl DistributionFabric {
    pub fn new(queue_capacity: u32) -> Self {
        // ---
        DistributionFabric {
            inner: Mutex::new(Registry {
                connections: HashMap::new(),
                topics: HashMap::new(),
            }),
            queue_capacity: queue_capacity.max(1) as usize,
        }
    }

    /// Register a new client connection, returning its id and the receiving
    /// end of its push queue. Every registered connection is implicitly on
    /// the broadcast channel; per-city delivery requires `subscribe`.
    pub async fn register(&self) -> (ConnId, mpsc::Receiver<PushMessage>) {
        // ---
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();
        self.inner.lock().await.connections.insert(id, tx);
        tracing::debug!(conn = %id, "connection registered");
        (id, rx)
    }

    /// Subscribe a connection to a city. Idempotent; a connection may hold
    /// any number of city subscriptions.
    pub async fn subscribe(&self, conn: ConnId, city: &str) {
        // ---
        let mut inner = self.inner.lock().await;
        if !inner.connections.contains_key(&conn) {
            return;
        }
        inner
            .topics
            .entry(city.to_string())
            .or_insert_with(HashSet::new)
            .insert(conn);
        tracing::debug!(conn = %conn, city, "subscribed");
    }

    /// Remove one city subscription. No-op if not subscribed.
    pub async fn unsubscribe(&self, conn: ConnId, city: &str) {
        // ---
        let mut inner = self.inner.lock().await;
        if let Some(subs) = inner.topics.get_mut(city) {
            subs.remove(&conn);
            if subs.is_empty() {
                inner.topics.remove(city);
            }
        }
    }

    /// Drop a connection and all of its subscriptions. Called synchronously
    /// on socket teardown so stale entries never accumulate.
    pub async fn disconnect(&self, conn: ConnId) {
        // ---
        let mut inner = self.inner.lock().await;
        inner.connections.remove(&conn);
        inner.topics.retain(|_, subs| {
            subs.remove(&conn);
            !subs.is_empty()
        });
        tracing::debug!(conn = %conn, "connection removed");
    }

    /// Deliver a message to every subscriber of `city`, or to every
    /// registered connection when `city` is `None` (broadcast).
    ///
    /// Senders are snapshotted under the lock and sends happen outside it, so
    /// concurrent subscribe/unsubscribe never corrupts an in-flight fan-out.
    /// Returns the number of queues the message actually reached.
    pub async fn publish(&self, city: Option<&str>, message: PushMessage) -> usize {
        // ---
        let targets: Vec<(ConnId, mpsc::Sender<PushMessage>)> = {
            let inner = self.inner.lock().await;
            match city {
                Some(c) => inner
                    .topics
                    .get(c)
                    .map(|subs| {
                        subs.iter()
                            .filter_map(|id| {
                                inner.connections.get(id).map(|tx| (*id, tx.clone()))
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                None => inner
                    .connections
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect(),
            }
        };

        let mut delivered = 0;
        let mut dead: Vec<ConnId> = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(conn = %id, "subscriber queue full, delivery dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(id);
                }
            }
        }

        // Reap connections whose receiving task is gone.
        for id in dead {
            self.disconnect(id).await;
        }
        delivered
    }

    /// Number of live subscriptions for a city, for diagnostics and tests.
    pub async fn subscriber_count(&self, city: &str) -> usize {
        // ---
        self.inner
            .lock()
            .await
            .topics
            .get(city)
            .map_or(0, HashSet::len)
    }
}
