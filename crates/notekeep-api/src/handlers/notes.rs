//! Note handlers.
//!
//! Handlers receive validated input from the extractors in
//! [`crate::extract`], call the repository once and wrap the result in the
//! success envelope. Failures propagate as [`ApiError`] untouched.

use axum::{extract::State, response::IntoResponse};
use serde_json::json;
use tracing::info;

use notekeep_core::NoteQuery;

use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::extract::{CreateNoteInput, ListParams, NoteId, SearchParams, UpdateNoteInput};
use crate::state::AppState;

/// List notes with pagination, filtering and sorting.
#[utoipa::path(
    get,
    path = "/api/notes",
    tag = "Notes",
    params(
        ("page" = Option<u32>, Query, description = "1-based page number (default 1)"),
        ("limit" = Option<u32>, Query, description = "Page size, 1-100 (default 50)"),
        ("sortBy" = Option<String>, Query, description = "createdAt, updatedAt or title"),
        ("sortOrder" = Option<String>, Query, description = "asc or desc"),
        ("archived" = Option<bool>, Query, description = "List archived notes instead"),
        ("search" = Option<String>, Query, description = "Text query; ranks by relevance over non-archived notes"),
    ),
    responses(
        (status = 200, description = "One page of notes", body = [notekeep_core::Note]),
        (status = 400, description = "Invalid query parameters")
    )
)]
pub async fn list_notes(
    State(state): State<AppState>,
    ListParams(req): ListParams,
) -> Result<impl IntoResponse, ApiError> {
    let ordering = req.query.ordering();
    let query = match &req.query {
        NoteQuery::Text { query } => Some(query.clone()),
        NoteQuery::Field { .. } => None,
    };
    let page = state.notes.list(req).await?;
    let pagination = page.pagination();

    Ok(ApiResponse::ok(page.notes)
        .pagination(pagination)
        .meta(json!({ "ordering": ordering, "search": query })))
}

/// Fetch a single note.
#[utoipa::path(
    get,
    path = "/api/notes/{id}",
    tag = "Notes",
    params(("id" = uuid::Uuid, Path, description = "Note id")),
    responses(
        (status = 200, description = "The note", body = notekeep_core::Note),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Note not found")
    )
)]
pub async fn get_note(
    State(state): State<AppState>,
    NoteId(id): NoteId,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.notes.get(id).await?;
    Ok(ApiResponse::ok(note))
}

/// Create a note.
#[utoipa::path(
    post,
    path = "/api/notes",
    tag = "Notes",
    request_body = notekeep_core::CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = notekeep_core::Note),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_note(
    State(state): State<AppState>,
    CreateNoteInput(req): CreateNoteInput,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.notes.create(req).await?;
    info!(
        subsystem = "api",
        component = "notes",
        op = "create",
        note_id = %note.id,
        "Note created"
    );
    Ok(ApiResponse::created(note).message("Note created successfully"))
}

/// Apply a partial update.
#[utoipa::path(
    put,
    path = "/api/notes/{id}",
    tag = "Notes",
    params(("id" = uuid::Uuid, Path, description = "Note id")),
    request_body = notekeep_core::NotePatch,
    responses(
        (status = 200, description = "Note updated", body = notekeep_core::Note),
        (status = 400, description = "Validation failed or malformed id"),
        (status = 404, description = "Note not found")
    )
)]
pub async fn update_note(
    State(state): State<AppState>,
    NoteId(id): NoteId,
    UpdateNoteInput(patch): UpdateNoteInput,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.notes.update(id, patch).await?;
    info!(
        subsystem = "api",
        component = "notes",
        op = "update",
        note_id = %note.id,
        "Note updated"
    );
    Ok(ApiResponse::ok(note).message("Note updated successfully"))
}

/// Permanently delete a note.
#[utoipa::path(
    delete,
    path = "/api/notes/{id}",
    tag = "Notes",
    params(("id" = uuid::Uuid, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note deleted"),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Note not found")
    )
)]
pub async fn delete_note(
    State(state): State<AppState>,
    NoteId(id): NoteId,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.notes.delete(id).await?;
    info!(
        subsystem = "api",
        component = "notes",
        op = "delete",
        note_id = %deleted.id,
        title = %deleted.title,
        "Note deleted"
    );
    Ok(ApiResponse::empty("Note deleted successfully"))
}

/// Flip the archive flag.
#[utoipa::path(
    patch,
    path = "/api/notes/{id}/archive",
    tag = "Notes",
    params(("id" = uuid::Uuid, Path, description = "Note id")),
    responses(
        (status = 200, description = "Archive flag toggled", body = notekeep_core::Note),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Note not found")
    )
)]
pub async fn toggle_archive(
    State(state): State<AppState>,
    NoteId(id): NoteId,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.notes.toggle_archive(id).await?;
    info!(
        subsystem = "api",
        component = "notes",
        op = "toggle_archive",
        note_id = %note.id,
        is_archived = note.is_archived,
        "Note archive flag toggled"
    );
    let message = if note.is_archived {
        "Note archived successfully"
    } else {
        "Note unarchived successfully"
    };
    Ok(ApiResponse::ok(note).message(message))
}

/// Relevance-ranked search over non-archived notes.
#[utoipa::path(
    get,
    path = "/api/notes/search",
    tag = "Notes",
    params(
        ("q" = String, Query, description = "Search text, required"),
        ("limit" = Option<u32>, Query, description = "Maximum hits, 1-100 (default 10)"),
    ),
    responses(
        (status = 200, description = "Matching notes, best first", body = [notekeep_core::SearchHit]),
        (status = 400, description = "Missing or empty query")
    )
)]
pub async fn search_notes(
    State(state): State<AppState>,
    SearchParams(req): SearchParams,
) -> Result<impl IntoResponse, ApiError> {
    let hits = state.notes.search(&req.query, req.limit).await?;
    let count = hits.len();
    Ok(ApiResponse::ok(hits).meta(json!({ "query": req.query, "count": count })))
}
