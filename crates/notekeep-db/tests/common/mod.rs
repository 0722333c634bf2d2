//! Repository contract checks shared by the in-memory and PostgreSQL suites.

use std::time::Duration;

use notekeep_core::{
    CreateNoteRequest, Error, ListNotesRequest, NotePatch, NoteQuery, NoteRepository, NoteSort,
    SortField, SortOrder,
};
use uuid::Uuid;

pub fn new_note(title: &str, content: &str, tags: &[&str]) -> CreateNoteRequest {
    CreateNoteRequest {
        title: title.to_string(),
        content: content.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// Titles unique to one test run, so shared databases don't bleed into assertions.
pub fn marker() -> String {
    format!("m{}", Uuid::new_v4().simple())
}

pub async fn create_defaults(repo: &dyn NoteRepository) {
    let note = repo
        .create(new_note("Groceries", "Milk, eggs", &[]))
        .await
        .unwrap();
    assert_eq!(note.title, "Groceries");
    assert!(!note.is_archived);
    assert!(note.tags.is_empty());
    assert_eq!(note.created_at, note.updated_at);

    let fetched = repo.get(note.id).await.unwrap();
    assert_eq!(fetched, note);
}

pub async fn partial_update_keeps_other_fields(repo: &dyn NoteRepository) {
    let note = repo
        .create(new_note("Groceries", "Milk, eggs", &["home"]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;

    let updated = repo
        .update(
            note.id,
            NotePatch {
                content: Some("Milk, eggs, bread".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Groceries");
    assert_eq!(updated.content, "Milk, eggs, bread");
    assert_eq!(updated.tags, vec!["home"]);
    assert_eq!(updated.created_at, note.created_at);
    assert!(updated.updated_at > note.updated_at);
}

pub async fn toggle_twice_restores_flag(repo: &dyn NoteRepository) {
    let note = repo.create(new_note("t", "c", &[])).await.unwrap();

    let archived = repo.toggle_archive(note.id).await.unwrap();
    assert!(archived.is_archived);
    assert!(archived.updated_at > note.updated_at);

    let restored = repo.toggle_archive(note.id).await.unwrap();
    assert!(!restored.is_archived);
    assert!(restored.updated_at > archived.updated_at);
}

pub async fn tags_round_trip_in_order(repo: &dyn NoteRepository) {
    let tags = ["work", "urgent", "work", "q3"];
    let note = repo.create(new_note("t", "c", &tags)).await.unwrap();
    let fetched = repo.get(note.id).await.unwrap();
    assert_eq!(fetched.tags, tags);
}

pub async fn missing_note_is_not_found(repo: &dyn NoteRepository) {
    let id = Uuid::now_v7();
    assert!(matches!(repo.get(id).await, Err(Error::NoteNotFound(x)) if x == id));
    assert!(matches!(
        repo.update(
            id,
            NotePatch {
                is_archived: Some(true),
                ..Default::default()
            }
        )
        .await,
        Err(Error::NoteNotFound(_))
    ));
    assert!(matches!(repo.delete(id).await, Err(Error::NoteNotFound(_))));
    assert!(matches!(
        repo.toggle_archive(id).await,
        Err(Error::NoteNotFound(_))
    ));
}

pub async fn delete_returns_summary(repo: &dyn NoteRepository) {
    let note = repo.create(new_note("Old note", "c", &[])).await.unwrap();
    let deleted = repo.delete(note.id).await.unwrap();
    assert_eq!(deleted.id, note.id);
    assert_eq!(deleted.title, "Old note");
    assert!(matches!(repo.get(note.id).await, Err(Error::NoteNotFound(_))));
}

pub async fn store_rejects_blank_title(repo: &dyn NoteRepository) {
    let err = repo.create(new_note("   ", "c", &[])).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

/// Insert `count` notes sharing a fresh marker word and page through
/// them with a text query, which only matches this run's notes.
pub async fn text_pagination(repo: &dyn NoteRepository, count: usize, limit: u32) {
    let word = marker();
    for i in 0..count {
        repo.create(new_note(&format!("Note {}", i), &word, &[]))
            .await
            .unwrap();
    }

    let mut seen = Vec::new();
    let pages = (count as u32).div_ceil(limit);
    for page in 1..=pages {
        let result = repo
            .list(ListNotesRequest {
                query: NoteQuery::Text {
                    query: word.clone(),
                },
                page,
                limit,
            })
            .await
            .unwrap();
        assert_eq!(result.total_count, count as u64);
        let meta = result.pagination();
        assert_eq!(meta.total_pages, pages);
        assert_eq!(meta.has_next_page, page < pages);
        assert_eq!(meta.has_prev_page, page > 1);
        seen.extend(result.notes.into_iter().map(|n| n.id));
    }

    let mut unique = seen.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(seen.len(), count);
    assert_eq!(unique.len(), count);
}

pub async fn archived_filter_newest_first(repo: &dyn NoteRepository) {
    let live = repo.create(new_note("live", "c", &[])).await.unwrap();
    let older = repo.create(new_note("older", "c", &[])).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    let newer = repo.create(new_note("newer", "c", &[])).await.unwrap();
    repo.toggle_archive(older.id).await.unwrap();
    repo.toggle_archive(newer.id).await.unwrap();

    let archived = repo
        .list(ListNotesRequest {
            query: NoteQuery::Field {
                archived: true,
                sort: NoteSort {
                    field: SortField::CreatedAt,
                    order: SortOrder::Desc,
                },
            },
            page: 1,
            limit: 100,
        })
        .await
        .unwrap();
    assert!(archived.notes.iter().all(|n| n.is_archived));
    assert!(!archived.notes.iter().any(|n| n.id == live.id));

    let position = |id| archived.notes.iter().position(|n| n.id == id);
    let (newer_pos, older_pos) = (position(newer.id), position(older.id));
    assert!(newer_pos.is_some() && older_pos.is_some());
    assert!(newer_pos < older_pos);

    for id in [live.id, older.id, newer.id] {
        repo.delete(id).await.unwrap();
    }
}

pub async fn search_skips_archived(repo: &dyn NoteRepository) {
    let word = marker();
    let live = repo.create(new_note(&word, "visible", &[])).await.unwrap();
    let hidden = repo.create(new_note(&word, "hidden", &[])).await.unwrap();
    repo.toggle_archive(hidden.id).await.unwrap();

    let hits = repo.search(&word, 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].note.id, live.id);
    assert!(hits[0].score > 0.0);
}
