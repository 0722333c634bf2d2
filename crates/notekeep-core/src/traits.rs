//! Repository trait definitions.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    CreateNoteRequest, DeletedNote, ListNotesRequest, Note, NotePage, NotePatch, Result, SearchHit,
};

/// Repository for note persistence.
///
/// Implementations receive input that already passed request validation but
/// still enforce the store schema on writes. Missing notes are reported as
/// [`crate::Error::NoteNotFound`].
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// List one page of notes matching the request's query.
    async fn list(&self, req: ListNotesRequest) -> Result<NotePage>;

    /// Fetch a note by id.
    async fn get(&self, id: Uuid) -> Result<Note>;

    /// Insert a new note, assigning its id and timestamps.
    async fn create(&self, req: CreateNoteRequest) -> Result<Note>;

    /// Apply a partial update and return the updated note.
    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note>;

    /// Permanently delete a note.
    async fn delete(&self, id: Uuid) -> Result<DeletedNote>;

    /// Flip the archive flag and return the updated note.
    async fn toggle_archive(&self, id: Uuid) -> Result<Note>;

    /// Relevance-ranked full-text search over non-archived notes.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>>;
}
