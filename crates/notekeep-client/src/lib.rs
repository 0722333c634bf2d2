//! # notekeep-client
//!
//! Rust client for the notekeep HTTP API.
//!
//! - [`NotesClient`] wraps each endpoint, normalizes the response envelope
//!   and retries reads with exponential backoff.
//! - [`NotesStore`] keeps a cached page of notes for a UI and publishes
//!   snapshots on a `tokio::sync::watch` channel.
//!
//! ```rust,ignore
//! use notekeep_client::{ClientConfig, NoteFilter, NotesClient, NotesStore};
//!
//! let client = NotesClient::new(ClientConfig::from_env())?;
//! let store = NotesStore::new(client, NoteFilter::default());
//! store.mount().await;
//! println!("{} notes", store.snapshot().notes.len());
//! ```

pub mod client;
pub mod error;
pub mod store;

pub use client::{ClientConfig, HealthStatus, NoteFilter, NoteList, NotesClient};
pub use error::{ClientError, ErrorCode, Result};
pub use store::{reduce, Action, LoadStatus, NotesApi, NotesState, NotesStore};
