//! OpenAPI document served at `/openapi.json`.

use utoipa::OpenApi;

use notekeep_core::{
    CreateNoteRequest, DeletedNote, FieldError, Note, NotePatch, PaginationMeta, SearchHit,
};

use crate::handlers::health::HealthResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "notekeep API",
        description = "Personal notes: CRUD, full-text search, tags and archiving."
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::notes::list_notes,
        crate::handlers::notes::get_note,
        crate::handlers::notes::create_note,
        crate::handlers::notes::update_note,
        crate::handlers::notes::delete_note,
        crate::handlers::notes::toggle_archive,
        crate::handlers::notes::search_notes,
    ),
    components(schemas(
        Note,
        CreateNoteRequest,
        NotePatch,
        DeletedNote,
        SearchHit,
        PaginationMeta,
        FieldError,
        HealthResponse,
    )),
    tags(
        (name = "Notes", description = "Note management and search"),
        (name = "System", description = "Health and metadata")
    )
)]
pub struct ApiDoc;
