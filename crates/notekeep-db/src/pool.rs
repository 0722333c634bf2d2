//! Postgres pool settings and the observable store connection state.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use notekeep_core::{Error, Result};

/// Pool size used when `DB_MAX_CONNECTIONS` is unset.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Sizing and timeouts for the Postgres pool behind the notes store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// A request waiting longer than this for a connection fails as unavailable.
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl PoolConfig {
    /// Same settings with `n` connections; zero is raised to one.
    pub fn with_max_connections(self, n: u32) -> Self {
        Self {
            max_connections: n.max(1),
            ..self
        }
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
    }

    /// Open a pool against `url`.
    ///
    /// Failing to reach the server maps to [`Error::Unavailable`] so callers
    /// see the same error as a dropped connection mid-request.
    pub async fn connect(&self, url: &str) -> Result<PgPool> {
        let start = Instant::now();
        let pool = self
            .options()
            .connect(url)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        info!(
            subsystem = "database",
            component = "pool",
            op = "connect",
            max_connections = self.max_connections,
            duration_ms = start.elapsed().as_millis() as u64,
            "Notes store pool ready"
        );
        Ok(pool)
    }
}

/// Point-in-time pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolMetrics {
    pub size: u32,
    pub idle: usize,
}

impl PoolMetrics {
    pub fn of(pool: &PgPool) -> Self {
        Self {
            size: pool.size(),
            idle: pool.num_idle(),
        }
    }

    /// Every open connection is checked out.
    pub fn is_saturated(&self) -> bool {
        self.size > 0 && self.idle == 0
    }

    pub fn log(&self) {
        if self.is_saturated() {
            warn!(
                subsystem = "database",
                component = "pool",
                pool_size = self.size,
                "All store connections busy"
            );
        } else {
            debug!(
                subsystem = "database",
                component = "pool",
                pool_size = self.size,
                pool_idle = self.idle,
                "Pool usage"
            );
        }
    }
}

// =============================================================================
// CONNECTION STATE
// =============================================================================

/// Observable state of the store connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared publisher of [`ConnectionState`] transitions.
///
/// Repositories report each store call through [`ConnectionMonitor::observe`];
/// observers hold a `watch::Receiver` from [`ConnectionMonitor::subscribe`].
/// Once `Closed`, the state never changes again.
#[derive(Clone)]
pub struct ConnectionMonitor {
    tx: Arc<watch::Sender<ConnectionState>>,
}

impl ConnectionMonitor {
    pub fn new(initial: ConnectionState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Move to `next`, returning whether the state changed.
    pub fn set(&self, next: ConnectionState) -> bool {
        let mut previous = next;
        let changed = self.tx.send_if_modified(|state| {
            if *state == next || *state == ConnectionState::Closed {
                return false;
            }
            previous = *state;
            *state = next;
            true
        });
        if changed {
            debug!(
                subsystem = "database",
                component = "pool",
                op = "state",
                from = %previous,
                pool_state = %next,
                "Store connection state changed"
            );
        }
        changed
    }

    /// Record the outcome of a store call.
    ///
    /// Connection-class failures mark the store disconnected; any success
    /// marks it connected again. Other failures leave the state as is.
    pub fn observe<T>(&self, result: &Result<T>) {
        match result {
            Ok(_) => {
                self.set(ConnectionState::Connected);
            }
            Err(Error::Unavailable(_)) => {
                self.set(ConnectionState::Disconnected);
            }
            Err(_) => {}
        }
    }
}

impl fmt::Debug for ConnectionMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionMonitor")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_connections_never_zero() {
        assert_eq!(PoolConfig::default().max_connections, DEFAULT_MAX_CONNECTIONS);
        let config = PoolConfig::default().with_max_connections(0);
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.acquire_timeout, PoolConfig::default().acquire_timeout);
    }

    #[test]
    fn test_saturation() {
        assert!(PoolMetrics { size: 4, idle: 0 }.is_saturated());
        assert!(!PoolMetrics { size: 4, idle: 1 }.is_saturated());
        assert!(!PoolMetrics { size: 0, idle: 0 }.is_saturated());
    }

    #[test]
    fn test_monitor_transitions() {
        let monitor = ConnectionMonitor::new(ConnectionState::Connecting);
        assert!(monitor.set(ConnectionState::Connected));
        assert!(!monitor.set(ConnectionState::Connected));

        monitor.observe::<()>(&Err(Error::Unavailable("pool timed out".into())));
        assert_eq!(monitor.state(), ConnectionState::Disconnected);

        monitor.observe::<()>(&Err(Error::NoteNotFound(uuid::Uuid::nil())));
        assert_eq!(monitor.state(), ConnectionState::Disconnected);

        monitor.observe(&Ok(()));
        assert_eq!(monitor.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_monitor_closed_is_terminal() {
        let monitor = ConnectionMonitor::new(ConnectionState::Connected);
        assert!(monitor.set(ConnectionState::Closed));
        monitor.observe(&Ok(()));
        assert_eq!(monitor.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_monitor_notifies_subscribers() {
        let monitor = ConnectionMonitor::new(ConnectionState::Connected);
        let mut rx = monitor.subscribe();

        let publisher = monitor.clone();
        tokio::spawn(async move {
            publisher.set(ConnectionState::Disconnected);
        });

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let v = serde_json::to_value(ConnectionState::Disconnected).unwrap();
        assert_eq!(v, serde_json::json!("disconnected"));
    }
}
