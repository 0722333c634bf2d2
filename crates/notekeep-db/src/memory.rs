//! In-memory note repository.
//!
//! Implements the same contract as [`crate::PgNoteRepository`] over a
//! process-local map. Text matching is a simplified stand-in for PostgreSQL
//! full-text search: every query term must prefix-match a word of the title
//! or content, and title matches weigh twice as much as content matches.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use notekeep_core::{
    new_v7, CreateNoteRequest, DeletedNote, Error, ListNotesRequest, Note, NotePage, NotePatch,
    NoteQuery, NoteRepository, NoteSort, Result, SearchHit, SortField, SortOrder,
};

use crate::schema;

/// Process-local note store.
#[derive(Default)]
pub struct MemoryNoteRepository {
    notes: RwLock<HashMap<Uuid, Note>>,
}

fn poisoned<T>(_: PoisonError<T>) -> Error {
    Error::Internal("note store lock poisoned".to_string())
}

/// `now`, but strictly after `previous`.
fn bump(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous + Duration::microseconds(1))
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Relevance of `note` for `terms`, or `None` when some term is missing.
fn score(note: &Note, terms: &[String]) -> Option<f32> {
    let title = words(&note.title);
    let content = words(&note.content);
    let mut total = 0.0f32;
    for term in terms {
        let in_title = title.iter().filter(|w| w.starts_with(term.as_str())).count();
        let in_content = content.iter().filter(|w| w.starts_with(term.as_str())).count();
        if in_title + in_content == 0 {
            return None;
        }
        total += 2.0 * in_title as f32 + in_content as f32;
    }
    Some(total / (1.0 + (title.len() + content.len()) as f32))
}

fn compare_field(a: &Note, b: &Note, sort: &NoteSort) -> std::cmp::Ordering {
    let ord = match sort.field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Title => a.title.cmp(&b.title),
    }
    .then_with(|| a.id.cmp(&b.id));
    match sort.order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-archived notes matching `query`, best first.
    fn rank(&self, query: &str) -> Result<Vec<SearchHit>> {
        let terms = words(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let notes = self.notes.read().map_err(poisoned)?;
        let mut hits: Vec<SearchHit> = notes
            .values()
            .filter(|n| !n.is_archived)
            .filter_map(|n| {
                score(n, &terms).map(|score| SearchHit {
                    note: n.clone(),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.note.created_at.cmp(&a.note.created_at))
                .then_with(|| b.note.id.cmp(&a.note.id))
        });
        Ok(hits)
    }

    fn modify(&self, id: Uuid, apply: impl FnOnce(&mut Note)) -> Result<Note> {
        let mut notes = self.notes.write().map_err(poisoned)?;
        let note = notes.get_mut(&id).ok_or(Error::NoteNotFound(id))?;
        apply(note);
        note.updated_at = bump(note.updated_at);
        Ok(note.clone())
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    async fn list(&self, req: ListNotesRequest) -> Result<NotePage> {
        let matching: Vec<Note> = match &req.query {
            NoteQuery::Field { archived, sort } => {
                let notes = self.notes.read().map_err(poisoned)?;
                let mut matching: Vec<Note> = notes
                    .values()
                    .filter(|n| n.is_archived == *archived)
                    .cloned()
                    .collect();
                matching.sort_by(|a, b| compare_field(a, b, sort));
                matching
            }
            NoteQuery::Text { query } => self.rank(query)?.into_iter().map(|h| h.note).collect(),
        };

        let total_count = matching.len() as u64;
        let notes = matching
            .into_iter()
            .skip(req.offset() as usize)
            .take(req.limit as usize)
            .collect();

        Ok(NotePage {
            notes,
            total_count,
            page: req.page,
            limit: req.limit,
        })
    }

    async fn get(&self, id: Uuid) -> Result<Note> {
        let notes = self.notes.read().map_err(poisoned)?;
        notes.get(&id).cloned().ok_or(Error::NoteNotFound(id))
    }

    async fn create(&self, req: CreateNoteRequest) -> Result<Note> {
        schema::check_new_note(&req)?;
        let now = Utc::now();
        let note = Note {
            id: new_v7(),
            title: req.title,
            content: req.content,
            tags: req.tags,
            is_archived: false,
            created_at: now,
            updated_at: now,
        };
        let mut notes = self.notes.write().map_err(poisoned)?;
        notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note> {
        schema::check_patch(&patch)?;
        self.modify(id, |note| {
            if let Some(title) = patch.title {
                note.title = title;
            }
            if let Some(content) = patch.content {
                note.content = content;
            }
            if let Some(tags) = patch.tags {
                note.tags = tags;
            }
            if let Some(is_archived) = patch.is_archived {
                note.is_archived = is_archived;
            }
        })
    }

    async fn delete(&self, id: Uuid) -> Result<DeletedNote> {
        let mut notes = self.notes.write().map_err(poisoned)?;
        notes
            .remove(&id)
            .map(|n| DeletedNote {
                id: n.id,
                title: n.title,
            })
            .ok_or(Error::NoteNotFound(id))
    }

    async fn toggle_archive(&self, id: Uuid) -> Result<Note> {
        self.modify(id, |note| note.is_archived = !note.is_archived)
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>> {
        let mut hits = self.rank(query)?;
        hits.truncate(limit as usize);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str, content: &str) -> CreateNoteRequest {
        CreateNoteRequest {
            title: title.into(),
            content: content.into(),
            tags: vec![],
        }
    }

    #[test]
    fn test_words_split_and_lowercase() {
        assert_eq!(words("Milk, Eggs!"), vec!["milk", "eggs"]);
        assert!(words("  ,, ").is_empty());
    }

    #[tokio::test]
    async fn test_score_weights_title_over_content() {
        let repo = MemoryNoteRepository::new();
        let in_title = repo.create(note("milk run", "errands")).await.unwrap();
        let in_content = repo.create(note("errands", "milk run")).await.unwrap();

        let hits = repo.search("milk", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].note.id, in_title.id);
        assert_eq!(hits[1].note.id, in_content.id);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_search_requires_all_terms() {
        let repo = MemoryNoteRepository::new();
        repo.create(note("Groceries", "Milk, eggs")).await.unwrap();
        repo.create(note("Chores", "Milk the cow")).await.unwrap();

        let hits = repo.search("milk eggs", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].note.title, "Groceries");
    }

    #[tokio::test]
    async fn test_search_prefix_matches() {
        let repo = MemoryNoteRepository::new();
        repo.create(note("Meeting", "Planning notes")).await.unwrap();
        assert_eq!(repo.search("plan", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_punctuation_only_query_matches_nothing() {
        let repo = MemoryNoteRepository::new();
        repo.create(note("a", "b")).await.unwrap();
        assert!(repo.search("!!", 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_bump_is_strictly_increasing() {
        let future = Utc::now() + Duration::seconds(60);
        assert!(bump(future) > future);
    }
}
