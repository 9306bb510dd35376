//! Connection registry — tracks known workers and whether they are alive.
//!
//! Liveness is edge-triggered: a recurring sweep flips connections whose
//! last signal is too old, rather than each heartbeat comparing clocks on
//! its own. Reclamation of a dead worker's tasks therefore happens promptly
//! and uniformly, regardless of when individual heartbeats arrive.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Liveness state of a worker connection.
///
/// Active --(timeout elapses, no touch)--> Expired --(touch)--> Active.
/// There is no terminal state; a connection is reusable indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Active,
    Expired,
}

/// One worker's session, owned exclusively by the registry.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Supplied by the worker. Arbitrary, untrusted string.
    pub connection_id: String,
    /// When the last liveness signal arrived.
    pub last_seen: Instant,
    pub state: ConnectionState,
}

/// Point-in-time view of a connection, for diagnostics.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub connection_id: String,
    pub state: ConnectionState,
    pub idle: Duration,
}

/// Registry of worker connections, shared between request handlers and the
/// liveness sweeper.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<String, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
        }
    }

    /// Create the connection if unseen; otherwise refresh `last_seen` and
    /// reactivate it if it had expired. Idempotent.
    pub fn register_or_touch(&self, connection_id: &str) {
        match self.connections.entry(connection_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let conn = entry.get_mut();
                if conn.state == ConnectionState::Expired {
                    tracing::info!(connection_id, "worker reactivated");
                }
                conn.state = ConnectionState::Active;
                conn.last_seen = Instant::now();
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                tracing::info!(connection_id, "worker registered");
                entry.insert(Connection {
                    connection_id: connection_id.to_string(),
                    last_seen: Instant::now(),
                    state: ConnectionState::Active,
                });
            }
        }
    }

    /// Liveness-signal path. An unknown id is an implicit late
    /// registration, never an error.
    pub fn touch(&self, connection_id: &str) {
        if !self.connections.contains_key(connection_id) {
            tracing::debug!(connection_id, "heartbeat from unknown worker, registering");
        }
        self.register_or_touch(connection_id);
    }

    /// Flip Active connections whose last signal is older than `timeout` to
    /// Expired. Returns the newly expired ids so the caller can reconcile
    /// the task ledger.
    pub fn sweep_expired(&self, timeout: Duration) -> Vec<String> {
        let mut expired = Vec::new();
        for mut entry in self.connections.iter_mut() {
            let conn = entry.value_mut();
            if conn.state == ConnectionState::Active && conn.last_seen.elapsed() > timeout {
                conn.state = ConnectionState::Expired;
                expired.push(conn.connection_id.clone());
            }
        }
        expired
    }

    pub fn is_active(&self, connection_id: &str) -> bool {
        self.connections
            .get(connection_id)
            .map(|c| c.state == ConnectionState::Active)
            .unwrap_or(false)
    }

    /// Snapshot of every known connection, for the status endpoint.
    pub fn snapshot(&self) -> Vec<ConnectionInfo> {
        self.connections
            .iter()
            .map(|entry| ConnectionInfo {
                connection_id: entry.connection_id.clone(),
                state: entry.state,
                idle: entry.last_seen.elapsed(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
