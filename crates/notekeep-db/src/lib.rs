//! # notekeep-db
//!
//! Note stores for notekeep.
//!
//! This crate provides:
//! - Connection pool management with an observable connection state
//! - [`PgNoteRepository`], the PostgreSQL implementation of `NoteRepository`
//! - [`MemoryNoteRepository`], an in-process implementation of the same contract
//! - Store-side schema checks applied on every write
//!
//! ## Example
//!
//! ```rust,ignore
//! use notekeep_db::{Database, NoteRepository, CreateNoteRequest, PoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("postgres://localhost/notekeep", PoolConfig::default()).await?;
//!     db.migrate().await?;
//!
//!     let note = db.notes.create(CreateNoteRequest {
//!         title: "Groceries".to_string(),
//!         content: "Milk, eggs".to_string(),
//!         tags: vec![],
//!     }).await?;
//!
//!     println!("Created note: {}", note.id);
//!     db.close().await;
//!     Ok(())
//! }
//! ```
pub mod memory;
pub mod notes;
pub mod pool;
pub mod schema;

// Re-export core types
pub use notekeep_core::*;

pub use memory::MemoryNoteRepository;
pub use notes::{map_db_error, PgNoteRepository};
pub use pool::{ConnectionMonitor, ConnectionState, PoolConfig, PoolMetrics};

use tracing::info;

/// An open PostgreSQL store: the pool, its connection state and the note repository.
pub struct Database {
    pool: sqlx::Pool<sqlx::Postgres>,
    monitor: ConnectionMonitor,
    /// Note repository for CRUD and search.
    pub notes: PgNoteRepository,
}

impl Database {
    /// Wrap an existing pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        let monitor = ConnectionMonitor::new(ConnectionState::Connected);
        Self {
            notes: PgNoteRepository::new(pool.clone(), monitor.clone()),
            monitor,
            pool,
        }
    }

    /// Connect to `url`; the connection state starts at `Connecting`.
    pub async fn open(url: &str, config: PoolConfig) -> Result<Self> {
        let monitor = ConnectionMonitor::new(ConnectionState::Connecting);
        let pool = config.connect(url).await?;
        monitor.set(ConnectionState::Connected);
        Ok(Self {
            notes: PgNoteRepository::new(pool.clone(), monitor.clone()),
            monitor,
            pool,
        })
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        info!(
            subsystem = "database",
            component = "migrations",
            op = "run",
            "Migrations applied"
        );
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Connection state publisher shared with the repository.
    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }

    /// Close every pooled connection. The state becomes `Closed` for good.
    pub async fn close(&self) {
        self.pool.close().await;
        self.monitor.set(ConnectionState::Closed);
        info!(
            subsystem = "database",
            component = "pool",
            op = "close",
            "Database connection pool closed"
        );
    }
}
