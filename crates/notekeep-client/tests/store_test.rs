//! NotesStore against an in-process fake API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use uuid::Uuid;

use notekeep_client::{
    ClientError, ErrorCode, LoadStatus, NoteFilter, NoteList, NotesApi, NotesStore, Result,
};
use notekeep_core::{CreateNoteRequest, Note, NotePatch, PaginationMeta};

/// Search text that makes the fake hold its list response until released.
const SLOW: &str = "slow";

#[derive(Default)]
struct FakeApi {
    notes: Mutex<Vec<Note>>,
    fail_list: AtomicBool,
    fail_writes: AtomicBool,
    release: Notify,
}

impl FakeApi {
    fn with_titles(titles: &[&str]) -> Self {
        let api = Self::default();
        {
            let mut notes = api.notes.lock().unwrap();
            for title in titles {
                notes.push(make_note(title));
            }
        }
        api
    }

    fn unavailable() -> ClientError {
        ClientError::from_response(503, None)
    }

    fn find(&self, id: Uuid) -> Result<Note> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| ClientError::from_response(404, None))
    }
}

fn make_note(title: &str) -> Note {
    let now = Utc::now();
    Note {
        id: Uuid::now_v7(),
        title: title.to_string(),
        content: "body".to_string(),
        tags: vec![],
        is_archived: false,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl NotesApi for FakeApi {
    async fn list_notes(&self, filter: &NoteFilter) -> Result<NoteList> {
        if filter.search.as_deref() == Some(SLOW) {
            self.release.notified().await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let notes: Vec<Note> = self
            .notes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| match filter.search.as_deref() {
                Some(q) if q != SLOW => n.title.contains(q),
                _ => true,
            })
            .cloned()
            .collect();
        Ok(NoteList {
            pagination: PaginationMeta::new(filter.page.unwrap_or(1), 10, notes.len() as u64),
            notes,
        })
    }

    async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let note = make_note(&req.title);
        self.notes.lock().unwrap().insert(0, note.clone());
        Ok(note)
    }

    async fn update_note(&self, id: Uuid, patch: NotePatch) -> Result<Note> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let mut note = self.find(id)?;
        if let Some(title) = patch.title {
            note.title = title;
        }
        Ok(note)
    }

    async fn delete_note(&self, id: Uuid) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.find(id)?;
        self.notes.lock().unwrap().retain(|n| n.id != id);
        Ok(())
    }

    async fn toggle_archive(&self, id: Uuid) -> Result<Note> {
        let mut note = self.find(id)?;
        note.is_archived = !note.is_archived;
        Ok(note)
    }
}

fn request(title: &str) -> CreateNoteRequest {
    CreateNoteRequest {
        title: title.to_string(),
        content: "body".to_string(),
        tags: vec![],
    }
}

#[tokio::test]
async fn test_mount_loads_first_page() {
    let store = NotesStore::new(FakeApi::with_titles(&["a", "b"]), NoteFilter::default());
    assert_eq!(store.snapshot().status, LoadStatus::Idle);

    store.mount().await;
    let state = store.snapshot();
    assert_eq!(state.status, LoadStatus::Success);
    assert_eq!(state.notes.len(), 2);
    assert_eq!(state.pagination.unwrap().total_count, 2);
}

#[tokio::test]
async fn test_mount_without_auto_fetch_stays_idle() {
    let store = NotesStore::new(FakeApi::with_titles(&["a"]), NoteFilter::default())
        .auto_fetch(false);
    store.mount().await;
    assert_eq!(store.snapshot().status, LoadStatus::Idle);

    store.refresh().await;
    assert_eq!(store.snapshot().notes.len(), 1);
}

#[tokio::test]
async fn test_failed_create_leaves_list_unchanged() {
    let store = NotesStore::new(FakeApi::with_titles(&["a", "b"]), NoteFilter::default());
    store.mount().await;
    let before = store.snapshot();

    store.api().fail_writes.store(true, Ordering::SeqCst);
    let err = store.create_note(request("c")).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ServiceUnavailable);
    let after = store.snapshot();
    assert_eq!(after.notes, before.notes);
    assert_eq!(after.pagination, before.pagination);
    assert!(after.error.is_none());
    assert_eq!(after.status, LoadStatus::Success);
}

#[tokio::test]
async fn test_create_prepends_after_confirmation() {
    let store = NotesStore::new(FakeApi::with_titles(&["a"]), NoteFilter::default());
    store.mount().await;

    let created = store.create_note(request("fresh")).await.unwrap();
    let state = store.snapshot();
    assert_eq!(state.notes[0].id, created.id);
    assert_eq!(state.pagination.unwrap().total_count, 2);
}

#[tokio::test]
async fn test_update_delete_and_archive() {
    let store = NotesStore::new(FakeApi::with_titles(&["a", "b", "c"]), NoteFilter::default());
    store.mount().await;
    let ids: Vec<Uuid> = store.snapshot().notes.iter().map(|n| n.id).collect();

    store
        .update_note(
            ids[1],
            NotePatch {
                title: Some("renamed".into()),
                ..NotePatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(store.snapshot().notes[1].title, "renamed");

    let archived = store.archive_note(ids[2]).await.unwrap();
    assert!(archived.is_archived);
    assert!(store.snapshot().notes[2].is_archived);

    store.delete_note(ids[0]).await.unwrap();
    let state = store.snapshot();
    assert_eq!(state.notes.len(), 2);
    assert_eq!(state.pagination.unwrap().total_count, 2);
}

#[tokio::test]
async fn test_failed_fetch_preserves_list_and_filter_change_recovers() {
    let store = NotesStore::new(FakeApi::with_titles(&["alpha", "beta"]), NoteFilter::default());
    store.mount().await;

    store.api().fail_list.store(true, Ordering::SeqCst);
    store.refresh().await;
    let state = store.snapshot();
    assert_eq!(state.status, LoadStatus::Error);
    assert!(state.error.is_some());
    assert_eq!(state.notes.len(), 2);
    assert!(!state.is_refreshing);

    store.api().fail_list.store(false, Ordering::SeqCst);
    store
        .set_filter(NoteFilter {
            search: Some("alpha".into()),
            ..NoteFilter::default()
        })
        .await;
    let state = store.snapshot();
    assert_eq!(state.status, LoadStatus::Success);
    assert!(state.error.is_none());
    assert_eq!(state.notes.len(), 1);
}

#[tokio::test]
async fn test_stale_filter_response_is_discarded() {
    let store = NotesStore::new(FakeApi::with_titles(&["alpha", "beta"]), NoteFilter::default());
    store.mount().await;

    let slow = store.set_filter(NoteFilter {
        search: Some(SLOW.into()),
        ..NoteFilter::default()
    });
    let fast = async {
        tokio::task::yield_now().await;
        store
            .set_filter(NoteFilter {
                search: Some("beta".into()),
                ..NoteFilter::default()
            })
            .await;
        store.api().release.notify_one();
    };
    tokio::join!(slow, fast);

    let state = store.snapshot();
    assert_eq!(state.filter.search.as_deref(), Some("beta"));
    assert_eq!(state.notes.len(), 1);
    assert_eq!(state.notes[0].title, "beta");
}

#[tokio::test]
async fn test_response_after_unmount_is_discarded() {
    let store = NotesStore::new(
        FakeApi::with_titles(&["alpha"]),
        NoteFilter {
            search: Some(SLOW.into()),
            ..NoteFilter::default()
        },
    );

    let mount = store.mount();
    let leave = async {
        tokio::task::yield_now().await;
        store.unmount();
        store.api().release.notify_one();
    };
    tokio::join!(mount, leave);

    let state = store.snapshot();
    assert!(state.notes.is_empty());
    assert_eq!(state.status, LoadStatus::Idle);
    assert!(!state.is_refreshing);

    store.create_note(request("late")).await.unwrap();
    assert!(store.snapshot().notes.is_empty());
}

#[tokio::test]
async fn test_subscribers_see_snapshots() {
    let store = NotesStore::new(FakeApi::with_titles(&["a"]), NoteFilter::default());
    let mut rx = store.subscribe();
    store.mount().await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().notes.len(), 1);
}
