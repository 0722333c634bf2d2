//! Validating extractors.
//!
//! Each extractor runs the matching rule set from
//! `notekeep_core::validation`, so a handler only ever sees input that
//! passed validation. Rejections are [`ApiError`]s and never reach the store.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use notekeep_core::validation::{self, RawListQuery, RawSearchQuery, SearchNotesRequest};
use notekeep_core::{CreateNoteRequest, ListNotesRequest, NotePatch};

use crate::error::ApiError;

/// A well-formed note id taken from the `:id` path segment.
#[derive(Debug, Clone, Copy)]
pub struct NoteId(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for NoteId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::MalformedId {
                field: "id".to_string(),
                value: e.body_text(),
            })?;
        Ok(NoteId(validation::parse_note_id(&raw)?))
    }
}

async fn json_body<S: Send + Sync>(req: Request, state: &S) -> Result<JsonValue, ApiError> {
    let Json(body) = Json::<JsonValue>::from_request(req, state)
        .await
        .map_err(|rejection: JsonRejection| ApiError::invalid_body(rejection.body_text()))?;
    Ok(body)
}

/// Body of a create request.
#[derive(Debug)]
pub struct CreateNoteInput(pub CreateNoteRequest);

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for CreateNoteInput {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = json_body(req, state).await?;
        Ok(Self(validation::validate_create(body)?))
    }
}

/// Body of a partial update request.
#[derive(Debug)]
pub struct UpdateNoteInput(pub NotePatch);

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for UpdateNoteInput {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = json_body(req, state).await?;
        Ok(Self(validation::validate_update(body)?))
    }
}

/// Query string of a list request.
#[derive(Debug)]
pub struct ListParams(pub ListNotesRequest);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ListParams {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(raw) = Query::<RawListQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_body(e.body_text()))?;
        Ok(Self(validation::validate_list(&raw)?))
    }
}

/// Query string of a search request.
#[derive(Debug)]
pub struct SearchParams(pub SearchNotesRequest);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SearchParams {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(raw) = Query::<RawSearchQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_body(e.body_text()))?;
        Ok(Self(validation::validate_search(&raw)?))
    }
}
