//! Request validation and sanitization.
//!
//! Every function here is pure: it takes the raw request shape, trims string
//! input, applies the per-operation rule set and either returns a typed
//! request or the full list of rejected fields. Nothing in this module
//! touches the store.

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use crate::{
    CreateNoteRequest, Error, FieldError, ListNotesRequest, NotePatch, NoteQuery, NoteSort,
    Result, SortField, SortOrder, CONTENT_MAX_LEN, DEFAULT_PAGE_LIMIT, DEFAULT_SEARCH_LIMIT,
    MAX_PAGE_LIMIT, MAX_TAGS, TITLE_MAX_LEN,
};

// =============================================================================
// SANITIZATION
// =============================================================================

/// Trim every string value in a request body.
///
/// Applies to top-level string fields and to strings inside arrays, so tag
/// entries are trimmed along with title and content.
pub fn sanitize_body(body: JsonValue) -> JsonValue {
    match body {
        JsonValue::String(s) => JsonValue::String(s.trim().to_string()),
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(sanitize_body).collect()),
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(k, v)| match v {
                    JsonValue::Object(_) => (k, v),
                    other => (k, sanitize_body(other)),
                })
                .collect(),
        ),
        other => other,
    }
}

/// Entity-encode characters that could form markup when rendered verbatim.
pub fn escape_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            other => out.push(other),
        }
    }
    out
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Parse a note id from a path segment.
///
/// A value that is not a UUID is a malformed identifier, which callers must
/// keep distinct from a well-formed id that matches nothing.
pub fn parse_note_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| Error::MalformedId {
        field: "id".to_string(),
        value: raw.to_string(),
    })
}

// =============================================================================
// BODY RULES
// =============================================================================

fn as_object(body: &JsonValue) -> Result<&Map<String, JsonValue>> {
    body.as_object().ok_or_else(|| {
        Error::invalid("body", "Request body must be a JSON object", body.clone())
    })
}

/// Validate a bounded text field that was already trimmed.
fn check_text(
    obj: &Map<String, JsonValue>,
    field: &str,
    label: &str,
    max: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let value = obj.get(field).cloned().unwrap_or(JsonValue::Null);
    let text = match &value {
        JsonValue::Null => {
            errors.push(FieldError::new(field, format!("{} is required", label), value));
            return None;
        }
        JsonValue::String(s) => s,
        _ => {
            errors.push(FieldError::new(field, format!("{} must be a string", label), value));
            return None;
        }
    };

    let len = text.chars().count();
    if len == 0 {
        errors.push(FieldError::new(field, format!("{} is required", label), value));
        return None;
    }
    if len > max {
        errors.push(FieldError::new(
            field,
            format!("{} must be between 1 and {} characters", label, max),
            value,
        ));
        return None;
    }
    Some(text.clone())
}

/// Validate a tag list; entries are trimmed and empty entries dropped.
fn check_tags(value: &JsonValue, errors: &mut Vec<FieldError>) -> Option<Vec<String>> {
    let items = match value {
        JsonValue::Array(items) => items,
        _ => {
            errors.push(FieldError::new("tags", "Tags must be an array", value.clone()));
            return None;
        }
    };

    let mut tags = Vec::with_capacity(items.len());
    let mut ok = true;
    for (i, item) in items.iter().enumerate() {
        match item {
            JsonValue::String(s) => {
                let tag = s.trim();
                if !tag.is_empty() {
                    tags.push(tag.to_string());
                }
            }
            other => {
                ok = false;
                errors.push(FieldError::new(
                    format!("tags[{}]", i),
                    "Each tag must be a string",
                    other.clone(),
                ));
            }
        }
    }

    if tags.len() > MAX_TAGS {
        errors.push(FieldError::new(
            "tags",
            format!("Maximum {} tags allowed", MAX_TAGS),
            value.clone(),
        ));
        return None;
    }
    ok.then_some(tags)
}

/// Validate a create-note body.
///
/// Requires `title` (1–200 characters) and `content` (1–10000 characters)
/// after trimming; `tags` is optional. Title and content are entity-encoded
/// once they pass.
pub fn validate_create(body: JsonValue) -> Result<CreateNoteRequest> {
    let body = sanitize_body(body);
    let obj = as_object(&body)?;
    let mut errors = Vec::new();

    let title = check_text(obj, "title", "Title", TITLE_MAX_LEN, &mut errors);
    let content = check_text(obj, "content", "Content", CONTENT_MAX_LEN, &mut errors);
    let tags = match obj.get("tags") {
        None | Some(JsonValue::Null) => Some(Vec::new()),
        Some(value) => check_tags(value, &mut errors),
    };

    match (title, content, tags) {
        (Some(title), Some(content), Some(tags)) if errors.is_empty() => Ok(CreateNoteRequest {
            title: escape_markup(&title),
            content: escape_markup(&content),
            tags,
        }),
        _ => Err(Error::Validation(errors)),
    }
}

/// Validate a partial-update body.
///
/// At least one of `title`, `content`, `tags` or `isArchived` must be
/// present; `null` counts as absent. Provided fields follow the create rules.
pub fn validate_update(body: JsonValue) -> Result<NotePatch> {
    let body = sanitize_body(body);
    let obj = as_object(&body)?;
    let present = |field: &str| !matches!(obj.get(field), None | Some(JsonValue::Null));

    if !["title", "content", "tags", "isArchived"]
        .iter()
        .any(|f| present(f))
    {
        return Err(Error::invalid(
            "body",
            "At least one of title, content, tags or isArchived must be provided",
            body.clone(),
        ));
    }

    let mut errors = Vec::new();
    let mut patch = NotePatch::default();

    if present("title") {
        patch.title = check_text(obj, "title", "Title", TITLE_MAX_LEN, &mut errors)
            .map(|t| escape_markup(&t));
    }
    if present("content") {
        patch.content = check_text(obj, "content", "Content", CONTENT_MAX_LEN, &mut errors)
            .map(|c| escape_markup(&c));
    }
    if let Some(value) = obj.get("tags").filter(|_| present("tags")) {
        patch.tags = check_tags(value, &mut errors);
    }
    if let Some(value) = obj.get("isArchived").filter(|_| present("isArchived")) {
        match value {
            JsonValue::Bool(b) => patch.is_archived = Some(*b),
            other => errors.push(FieldError::new(
                "isArchived",
                "isArchived must be a boolean",
                other.clone(),
            )),
        }
    }

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(Error::Validation(errors))
    }
}

// =============================================================================
// QUERY RULES
// =============================================================================

/// Raw query string of a list request, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub archived: Option<String>,
    pub search: Option<String>,
}

/// Raw query string of a search request, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSearchQuery {
    pub q: Option<String>,
    pub limit: Option<String>,
}

/// Validated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchNotesRequest {
    pub query: String,
    pub limit: u32,
}

fn parse_bounded(
    field: &str,
    raw: Option<&str>,
    default: u32,
    min: u32,
    max: u32,
    errors: &mut Vec<FieldError>,
) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return default;
    };
    match raw.parse::<u32>() {
        Ok(n) if (min..=max).contains(&n) => n,
        _ => {
            let message = if max == u32::MAX {
                format!("{} must be a positive integer", field)
            } else {
                format!("{} must be an integer between {} and {}", field, min, max)
            };
            errors.push(FieldError::new(field, message, JsonValue::String(raw.to_string())));
            default
        }
    }
}

/// Validate list query parameters, applying defaults (page 1, limit 50,
/// `createdAt desc`, non-archived).
///
/// A non-empty `search` selects relevance ranking over non-archived notes;
/// `sortBy`, `sortOrder` and `archived` do not apply to it.
pub fn validate_list(raw: &RawListQuery) -> Result<ListNotesRequest> {
    let mut errors = Vec::new();

    let page = parse_bounded("page", raw.page.as_deref(), 1, 1, u32::MAX, &mut errors);
    let limit = parse_bounded(
        "limit",
        raw.limit.as_deref(),
        DEFAULT_PAGE_LIMIT,
        1,
        MAX_PAGE_LIMIT,
        &mut errors,
    );

    let mut sort = NoteSort::default();
    if let Some(s) = raw.sort_by.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        match s.parse::<SortField>() {
            Ok(field) => sort.field = field,
            Err(msg) => errors.push(FieldError::new("sortBy", msg, JsonValue::String(s.into()))),
        }
    }
    if let Some(s) = raw.sort_order.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        match s.parse::<SortOrder>() {
            Ok(order) => sort.order = order,
            Err(msg) => {
                errors.push(FieldError::new("sortOrder", msg, JsonValue::String(s.into())))
            }
        }
    }

    let archived = match raw.archived.as_deref().map(str::trim) {
        None | Some("") | Some("false") => false,
        Some("true") => true,
        Some(other) => {
            errors.push(FieldError::new(
                "archived",
                "archived must be true or false",
                JsonValue::String(other.into()),
            ));
            false
        }
    };

    if !errors.is_empty() {
        return Err(Error::Validation(errors));
    }

    let search = raw
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let query = match search {
        Some(text) => {
            if raw.sort_by.is_some() || raw.sort_order.is_some() {
                debug!(
                    subsystem = "api",
                    component = "validation",
                    op = "list",
                    "Text query present; relevance ranking replaces requested sort"
                );
            }
            NoteQuery::Text {
                query: text.to_string(),
            }
        }
        None => NoteQuery::Field { archived, sort },
    };

    Ok(ListNotesRequest { query, page, limit })
}

/// Validate search query parameters. An empty or whitespace-only `q` is a
/// validation failure, not an empty result.
pub fn validate_search(raw: &RawSearchQuery) -> Result<SearchNotesRequest> {
    let mut errors = Vec::new();

    let query = raw.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        errors.push(FieldError::new(
            "q",
            "Search query is required",
            JsonValue::String(query.to_string()),
        ));
    }
    let limit = parse_bounded(
        "limit",
        raw.limit.as_deref(),
        DEFAULT_SEARCH_LIMIT,
        1,
        MAX_PAGE_LIMIT,
        &mut errors,
    );

    if errors.is_empty() {
        Ok(SearchNotesRequest {
            query: query.to_string(),
            limit,
        })
    } else {
        Err(Error::Validation(errors))
    }
}
