//! Shared application state.

use std::sync::Arc;
use std::time::Instant;

use notekeep_core::NoteRepository;
use notekeep_db::{ConnectionMonitor, ConnectionState, MemoryNoteRepository};

use crate::config::Environment;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<dyn NoteRepository>,
    /// Store connection state, reported by `/health`.
    pub connection: ConnectionMonitor,
    pub environment: Environment,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        connection: ConnectionMonitor,
        environment: Environment,
    ) -> Self {
        Self {
            notes,
            connection,
            environment,
            started_at: Instant::now(),
        }
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory(environment: Environment) -> Self {
        Self::new(
            Arc::new(MemoryNoteRepository::new()),
            ConnectionMonitor::new(ConnectionState::Connected),
            environment,
        )
    }
}
