//! Connection registry: live sinks per user.
//!
//! A user may hold several concurrent subscriptions (tabs, devices). Each open
//! subscription owns one [`LiveSink`]: the sending half of a bounded channel
//! whose receiver feeds the SSE response body. The registry maps
//! `UserId → { SinkId → LiveSink }` and never keeps an entry with zero sinks.
//!
//! The map is sharded ([`DashMap`]) so registration, removal and snapshots are
//! atomic per shard and safe on the multi-threaded runtime.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::logging::{COMPONENT_REGISTRY, SUBSYSTEM_REALTIME};
use crate::models::UserId;

/// A pre-serialized event body, shared between every sink it is written to.
pub type Frame = Arc<str>;

static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique sink identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u64);

impl SinkId {
    fn next() -> Self {
        Self(NEXT_SINK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink-{}", self.0)
    }
}

/// Why a frame could not be written to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("sink closed")]
    Closed,
    #[error("sink buffer full")]
    Full,
}

/// Write handle for one open subscription.
#[derive(Debug, Clone)]
pub struct LiveSink {
    id: SinkId,
    tx: mpsc::Sender<Frame>,
}

impl LiveSink {
    /// Create a sink and the receiver that drains it.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                id: SinkId::next(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> SinkId {
        self.id
    }

    /// Non-blocking write.
    pub fn try_write(&self, frame: Frame) -> Result<(), SinkError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Registry of live sinks keyed by user.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: DashMap<UserId, HashMap<SinkId, LiveSink>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink for `user`, creating the entry if needed.
    pub fn register(&self, user: UserId, sink: LiveSink) {
        let sink_id = sink.id();
        let mut entry = self.entries.entry(user).or_default();
        entry.insert(sink_id, sink);
        debug!(
            subsystem = SUBSYSTEM_REALTIME,
            component = COMPONENT_REGISTRY,
            user_id = %user,
            sink_id = %sink_id,
            sink_count = entry.len(),
            "Sink registered"
        );
    }

    /// Remove a sink. Drops the user's entry once it has no sinks left.
    /// Returns whether the sink was present; calling twice is harmless.
    pub fn deregister(&self, user: UserId, sink_id: SinkId) -> bool {
        let (removed, remaining) = match self.entries.get_mut(&user) {
            Some(mut entry) => {
                let removed = entry.remove(&sink_id).is_some();
                (removed, entry.len())
            }
            None => return false,
        };

        // Guard released above; a register racing in between keeps the entry.
        self.entries.remove_if(&user, |_, sinks| sinks.is_empty());

        debug!(
            subsystem = SUBSYSTEM_REALTIME,
            component = COMPONENT_REGISTRY,
            user_id = %user,
            sink_id = %sink_id,
            removed,
            sink_count = remaining,
            "Sink deregistered"
        );
        removed
    }

    /// Snapshot of the user's current sinks. Empty when the user has none.
    pub fn sinks_for(&self, user: UserId) -> Vec<LiveSink> {
        let sinks: Vec<LiveSink> = self
            .entries
            .get(&user)
            .map(|entry| entry.values().cloned().collect())
            .unwrap_or_default();
        trace!(user_id = %user, sink_count = sinks.len(), "Sink snapshot");
        sinks
    }

    pub fn is_connected(&self, user: UserId) -> bool {
        self.entries.contains_key(&user)
    }

    pub fn connected_users(&self) -> Vec<UserId> {
        self.entries.iter().map(|e| *e.key()).collect()
    }

    /// Number of users with at least one sink.
    pub fn user_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of open sinks across all users.
    pub fn sink_count(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }
}
