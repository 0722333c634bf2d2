//! Store-side schema checks.
//!
//! Writes are checked against the stored shape of a note even though the
//! request layer already validated them; the table CHECK constraints back
//! these up for the PostgreSQL store. Length bounds are not repeated here
//! since stored text is entity-encoded and may exceed the request bounds.

use serde_json::Value as JsonValue;

use notekeep_core::{CreateNoteRequest, Error, FieldError, NotePatch, Result, MAX_TAGS};

fn check_text(field: &str, value: &str, errors: &mut Vec<FieldError>) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(
            field,
            format!("{} must not be empty", field),
            JsonValue::String(value.to_string()),
        ));
    }
}

fn check_tags(tags: &[String], errors: &mut Vec<FieldError>) {
    if tags.len() > MAX_TAGS {
        errors.push(FieldError::new(
            "tags",
            format!("a note holds at most {} tags", MAX_TAGS),
            JsonValue::from(tags.to_vec()),
        ));
    }
    for (i, tag) in tags.iter().enumerate() {
        if tag.trim().is_empty() {
            errors.push(FieldError::new(
                format!("tags[{}]", i),
                "tags must not be empty",
                JsonValue::String(tag.clone()),
            ));
        }
    }
}

fn finish(errors: Vec<FieldError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

/// Check a note about to be inserted.
pub fn check_new_note(req: &CreateNoteRequest) -> Result<()> {
    let mut errors = Vec::new();
    check_text("title", &req.title, &mut errors);
    check_text("content", &req.content, &mut errors);
    check_tags(&req.tags, &mut errors);
    finish(errors)
}

/// Check the fields a patch would write.
pub fn check_patch(patch: &NotePatch) -> Result<()> {
    let mut errors = Vec::new();
    if let Some(title) = &patch.title {
        check_text("title", title, &mut errors);
    }
    if let Some(content) = &patch.content {
        check_text("content", content, &mut errors);
    }
    if let Some(tags) = &patch.tags {
        check_tags(tags, &mut errors);
    }
    finish(errors)
}

/// Map a CHECK constraint name from the `note` table to the field it guards.
pub(crate) fn constraint_field(constraint: &str) -> &str {
    match constraint {
        "note_title_check" => "title",
        "note_content_check" => "content",
        "note_tags_check" => "tags",
        "note_updated_after_created" => "updatedAt",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(title: &str, content: &str, tags: &[&str]) -> CreateNoteRequest {
        CreateNoteRequest {
            title: title.into(),
            content: content.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_accepts_valid_note() {
        assert!(check_new_note(&req("Groceries", "Milk", &["home"])).is_ok());
    }

    #[test]
    fn test_rejects_blank_text() {
        match check_new_note(&req(" ", "", &[])).unwrap_err() {
            Error::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "title");
                assert_eq!(errors[1].field, "content");
            }
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_too_many_tags() {
        let tags: Vec<&str> = std::iter::repeat("t").take(11).collect();
        assert!(check_new_note(&req("t", "c", &tags)).is_err());
    }

    #[test]
    fn test_rejects_empty_tag_entry() {
        let patch = NotePatch {
            tags: Some(vec!["ok".into(), "".into()]),
            ..Default::default()
        };
        match check_patch(&patch).unwrap_err() {
            Error::Validation(errors) => assert_eq!(errors[0].field, "tags[1]"),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_patch_only_checks_present_fields() {
        let patch = NotePatch {
            is_archived: Some(true),
            ..Default::default()
        };
        assert!(check_patch(&patch).is_ok());
    }

    #[test]
    fn test_constraint_field_mapping() {
        assert_eq!(constraint_field("note_title_check"), "title");
        assert_eq!(constraint_field("note_tags_check"), "tags");
        assert_eq!(constraint_field("something_else"), "something_else");
    }
}
