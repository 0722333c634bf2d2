//! Core data models for notekeep.
//!
//! These types are shared by the store, the HTTP server and the client and
//! represent the note entity plus the request/response shapes around it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum title length in characters, after trimming.
pub const TITLE_MAX_LEN: usize = 200;

/// Maximum content length in characters, after trimming.
pub const CONTENT_MAX_LEN: usize = 10_000;

/// Maximum number of tags on a note.
pub const MAX_TAGS: usize = 10;

/// Default page size for list requests.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Default result count for search requests.
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Upper bound accepted for `limit` on list and search requests.
pub const MAX_PAGE_LIMIT: u32 = 100;

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A persisted note, as returned to callers.
///
/// This is a read-only projection: store-internal columns (such as the
/// full-text vector) never appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of a note. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

impl NotePatch {
    /// True when the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.is_archived.is_none()
    }
}

/// Summary of a removed note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DeletedNote {
    pub id: Uuid,
    pub title: String,
}

/// A note matched by full-text search, with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SearchHit {
    #[serde(flatten)]
    pub note: Note,
    pub score: f32,
}

// =============================================================================
// LIST TYPES
// =============================================================================

/// Sortable note fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
}

impl SortField {
    /// Wire name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
            SortField::Title => "title",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(SortField::CreatedAt),
            "updatedAt" => Ok(SortField::UpdatedAt),
            "title" => Ok(SortField::Title),
            other => Err(format!(
                "sortBy must be one of createdAt, updatedAt, title (got '{}')",
                other
            )),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("sortOrder must be asc or desc (got '{}')", other)),
        }
    }
}

/// Field ordering for list requests. Defaults to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteSort {
    pub field: SortField,
    pub order: SortOrder,
}

/// What a list request selects and how it is ranked.
///
/// The two variants are separate ranking algorithms: a text query always
/// ranks by relevance over non-archived notes, and never takes a sort field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteQuery {
    /// Exact match on the archive flag, ordered by a note field.
    Field { archived: bool, sort: NoteSort },
    /// Full-text match over title and content, ordered by relevance.
    Text { query: String },
}

impl Default for NoteQuery {
    fn default() -> Self {
        NoteQuery::Field {
            archived: false,
            sort: NoteSort::default(),
        }
    }
}

impl NoteQuery {
    /// Name of the ranking in effect, reported back to API callers.
    pub fn ordering(&self) -> &'static str {
        match self {
            NoteQuery::Field { .. } => "field",
            NoteQuery::Text { .. } => "relevance",
        }
    }
}

/// Request for one page of notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListNotesRequest {
    pub query: NoteQuery,
    /// 1-based page number.
    pub page: u32,
    /// Page size, at least 1.
    pub limit: u32,
}

impl Default for ListNotesRequest {
    fn default() -> Self {
        Self {
            query: NoteQuery::default(),
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ListNotesRequest {
    /// Number of matching notes skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of notes plus the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct NotePage {
    pub notes: Vec<Note>,
    /// Count of all notes matching the filter, independent of pagination.
    pub total_count: u64,
    pub page: u32,
    pub limit: u32,
}

impl NotePage {
    pub fn pagination(&self) -> PaginationMeta {
        PaginationMeta::new(self.page, self.limit, self.total_count)
    }
}

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub limit: u32,
}

impl PaginationMeta {
    /// Derive page counts from a 1-based page, a page size and a total.
    pub fn new(page: u32, limit: u32, total_count: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total_count.div_ceil(u64::from(limit)) as u32
        };
        Self {
            current_page: page,
            total_pages,
            total_count,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pagination_47_notes_limit_10() {
        let last = PaginationMeta::new(5, 10, 47);
        assert_eq!(last.total_pages, 5);
        assert!(!last.has_next_page);
        assert!(last.has_prev_page);

        let first = PaginationMeta::new(1, 10, 47);
        assert!(first.has_next_page);
        assert!(!first.has_prev_page);
    }

    #[test]
    fn test_pagination_empty_result() {
        let meta = PaginationMeta::new(1, 50, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next_page);
        assert!(!meta.has_prev_page);
    }

    #[test]
    fn test_pagination_exact_multiple() {
        let meta = PaginationMeta::new(2, 25, 50);
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next_page);
    }

    #[test]
    fn test_pagination_page_beyond_end() {
        let meta = PaginationMeta::new(9, 10, 47);
        assert!(!meta.has_next_page);
        assert!(meta.has_prev_page);
    }

    #[test]
    fn test_pagination_serializes_camel_case() {
        let v = serde_json::to_value(PaginationMeta::new(1, 10, 11)).unwrap();
        assert_eq!(
            v,
            json!({
                "currentPage": 1,
                "totalPages": 2,
                "totalCount": 11,
                "hasNextPage": true,
                "hasPrevPage": false,
                "limit": 10
            })
        );
    }

    #[test]
    fn test_list_request_offset() {
        let req = ListNotesRequest {
            page: 3,
            limit: 20,
            ..Default::default()
        };
        assert_eq!(req.offset(), 40);
        assert_eq!(ListNotesRequest::default().offset(), 0);
    }

    #[test]
    fn test_note_serializes_is_archived() {
        let note = Note {
            id: uuid::Uuid::nil(),
            title: "Groceries".into(),
            content: "Milk, eggs".into(),
            tags: vec![],
            is_archived: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let v = serde_json::to_value(&note).unwrap();
        assert_eq!(v["isArchived"], json!(false));
        assert!(v.get("createdAt").is_some());
        assert!(v.get("updatedAt").is_some());
    }

    #[test]
    fn test_search_hit_flattens_note() {
        let hit = SearchHit {
            note: Note {
                id: uuid::Uuid::nil(),
                title: "t".into(),
                content: "c".into(),
                tags: vec!["a".into()],
                is_archived: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            score: 0.5,
        };
        let v = serde_json::to_value(&hit).unwrap();
        assert_eq!(v["title"], "t");
        assert_eq!(v["score"], json!(0.5));
    }

    #[test]
    fn test_sort_field_parsing() {
        assert_eq!("title".parse::<SortField>().unwrap(), SortField::Title);
        assert!("priority".parse::<SortField>().is_err());
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!("ASC".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(NotePatch::default().is_empty());
        let patch = NotePatch {
            is_archived: Some(true),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_query_ordering_names() {
        assert_eq!(NoteQuery::default().ordering(), "field");
        let text = NoteQuery::Text {
            query: "milk".into(),
        };
        assert_eq!(text.ordering(), "relevance");
    }
}
