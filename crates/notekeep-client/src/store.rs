//! Client-side note list store.
//!
//! [`NotesStore`] caches one page of notes for a UI. The server stays the
//! source of truth: every change to the cached list follows a confirmed
//! server response, and all changes go through [`reduce`].
//!
//! Each list fetch takes a generation ticket. A response is applied only if
//! its ticket is still the latest and the store is still mounted, so a
//! response for an old filter, or one arriving after [`NotesStore::unmount`],
//! is dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use notekeep_core::{CreateNoteRequest, Note, NotePatch, PaginationMeta};

use crate::client::{NoteFilter, NoteList, NotesClient};
use crate::error::Result;

/// Operations the store needs from the API.
#[async_trait]
pub trait NotesApi: Send + Sync {
    async fn list_notes(&self, filter: &NoteFilter) -> Result<NoteList>;
    async fn create_note(&self, req: CreateNoteRequest) -> Result<Note>;
    async fn update_note(&self, id: Uuid, patch: NotePatch) -> Result<Note>;
    async fn delete_note(&self, id: Uuid) -> Result<()>;
    async fn toggle_archive(&self, id: Uuid) -> Result<Note>;
}

#[async_trait]
impl NotesApi for NotesClient {
    async fn list_notes(&self, filter: &NoteFilter) -> Result<NoteList> {
        NotesClient::list_notes(self, filter).await
    }

    async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        NotesClient::create_note(self, &req).await
    }

    async fn update_note(&self, id: Uuid, patch: NotePatch) -> Result<Note> {
        NotesClient::update_note(self, id, &patch).await
    }

    async fn delete_note(&self, id: Uuid) -> Result<()> {
        NotesClient::delete_note(self, id).await
    }

    async fn toggle_archive(&self, id: Uuid) -> Result<Note> {
        NotesClient::toggle_archive(self, id).await
    }
}

/// Load status of the cached list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot published to subscribers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotesState {
    pub status: LoadStatus,
    pub notes: Vec<Note>,
    pub pagination: Option<PaginationMeta>,
    /// Message of the last failed fetch. Mutation failures are never stored.
    pub error: Option<String>,
    /// A background refresh is in flight; the list stays as is meanwhile.
    pub is_refreshing: bool,
    pub filter: NoteFilter,
}

/// State transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    FetchStarted { refresh: bool },
    FetchSucceeded(NoteList),
    FetchFailed(String),
    FilterChanged(NoteFilter),
    Created(Note),
    /// Also used for archive toggles, which return the flipped note.
    Replaced(Note),
    Deleted(Uuid),
    /// In-flight fetches were abandoned.
    Unmounted,
}

fn adjust_total(pagination: &mut Option<PaginationMeta>, added: bool) {
    if let Some(p) = pagination {
        let total = if added {
            p.total_count + 1
        } else {
            p.total_count.saturating_sub(1)
        };
        *p = PaginationMeta::new(p.current_page, p.limit, total);
    }
}

/// Apply `action` to `state`.
pub fn reduce(state: &mut NotesState, action: Action) {
    match action {
        Action::FetchStarted { refresh: true } => state.is_refreshing = true,
        Action::FetchStarted { refresh: false } => state.status = LoadStatus::Loading,
        Action::FetchSucceeded(list) => {
            state.notes = list.notes;
            state.pagination = Some(list.pagination);
            state.status = LoadStatus::Success;
            state.error = None;
            state.is_refreshing = false;
        }
        Action::FetchFailed(message) => {
            state.status = LoadStatus::Error;
            state.error = Some(message);
            state.is_refreshing = false;
        }
        Action::FilterChanged(filter) => {
            state.filter = filter;
            state.error = None;
        }
        Action::Created(note) => {
            state.notes.insert(0, note);
            adjust_total(&mut state.pagination, true);
        }
        Action::Replaced(note) => {
            if let Some(slot) = state.notes.iter_mut().find(|n| n.id == note.id) {
                *slot = note;
            }
        }
        Action::Deleted(id) => {
            let before = state.notes.len();
            state.notes.retain(|n| n.id != id);
            if state.notes.len() < before {
                adjust_total(&mut state.pagination, false);
            }
        }
        Action::Unmounted => {
            if state.status == LoadStatus::Loading {
                state.status = if state.pagination.is_some() {
                    LoadStatus::Success
                } else {
                    LoadStatus::Idle
                };
            }
            state.is_refreshing = false;
        }
    }
}

/// Cached note list backed by a [`NotesApi`].
pub struct NotesStore<A> {
    api: A,
    state: watch::Sender<NotesState>,
    generation: AtomicU64,
    mounted: AtomicBool,
    auto_fetch: bool,
}

impl<A: NotesApi> NotesStore<A> {
    pub fn new(api: A, filter: NoteFilter) -> Self {
        let (state, _rx) = watch::channel(NotesState {
            filter,
            ..NotesState::default()
        });
        Self {
            api,
            state,
            generation: AtomicU64::new(0),
            mounted: AtomicBool::new(false),
            auto_fetch: true,
        }
    }

    /// Whether [`mount`](Self::mount) fetches the first page.
    pub fn auto_fetch(mut self, enabled: bool) -> Self {
        self.auto_fetch = enabled;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<NotesState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> NotesState {
        self.state.borrow().clone()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn dispatch(&self, action: Action) {
        self.state.send_modify(|state| reduce(state, action));
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub async fn mount(&self) {
        self.mounted.store(true, Ordering::SeqCst);
        if self.auto_fetch {
            self.fetch(false).await;
        }
    }

    /// Stop applying responses, including those already in flight.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.dispatch(Action::Unmounted);
    }

    /// Re-fetch the current page without entering `Loading`.
    pub async fn refresh(&self) {
        self.fetch(true).await;
    }

    /// Replace the filter, clear any stale error and fetch.
    pub async fn set_filter(&self, filter: NoteFilter) {
        self.dispatch(Action::FilterChanged(filter));
        self.fetch(false).await;
    }

    pub async fn set_page(&self, page: u32) {
        let mut filter = self.state.borrow().filter.clone();
        filter.page = Some(page);
        self.set_filter(filter).await;
    }

    async fn fetch(&self, refresh: bool) {
        if !self.is_mounted() {
            return;
        }
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let filter = self.state.borrow().filter.clone();
        self.dispatch(Action::FetchStarted { refresh });

        let result = self.api.list_notes(&filter).await;

        if !self.is_mounted() || self.generation.load(Ordering::SeqCst) != ticket {
            debug!(
                subsystem = "client",
                component = "store",
                op = "list",
                ticket,
                "Discarding stale list response"
            );
            return;
        }
        match result {
            Ok(list) => self.dispatch(Action::FetchSucceeded(list)),
            Err(err) => self.dispatch(Action::FetchFailed(err.message)),
        }
    }

    /// Create a note; the list changes only once the server confirms.
    pub async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        let note = self.api.create_note(req).await?;
        if self.is_mounted() {
            self.dispatch(Action::Created(note.clone()));
        }
        Ok(note)
    }

    pub async fn update_note(&self, id: Uuid, patch: NotePatch) -> Result<Note> {
        let note = self.api.update_note(id, patch).await?;
        if self.is_mounted() {
            self.dispatch(Action::Replaced(note.clone()));
        }
        Ok(note)
    }

    pub async fn delete_note(&self, id: Uuid) -> Result<()> {
        self.api.delete_note(id).await?;
        if self.is_mounted() {
            self.dispatch(Action::Deleted(id));
        }
        Ok(())
    }

    /// Toggle the archive flag and cache the server's copy.
    pub async fn archive_note(&self, id: Uuid) -> Result<Note> {
        let note = self.api.toggle_archive(id).await?;
        if self.is_mounted() {
            self.dispatch(Action::Replaced(note.clone()));
        }
        Ok(note)
    }
}
