//! PostgreSQL note repository.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use notekeep_core::{
    new_v7, CreateNoteRequest, DeletedNote, Error, ListNotesRequest, Note, NotePage, NotePatch,
    NoteQuery, NoteRepository, NoteSort, Result, SearchHit, SortField, SortOrder,
};

use crate::pool::ConnectionMonitor;
use crate::schema::{self, constraint_field};

const NOTE_COLUMNS: &str = "id, title, content, tags, is_archived, created_at, updated_at";

/// Next `updated_at` for a mutated row: now, but strictly after the previous value.
const BUMP_UPDATED_AT: &str = "GREATEST($2, updated_at + interval '1 microsecond')";

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
    monitor: ConnectionMonitor,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>, monitor: ConnectionMonitor) -> Self {
        Self { pool, monitor }
    }

    /// Report a store call's outcome to the connection monitor.
    fn track<T>(&self, result: Result<T>) -> Result<T> {
        self.monitor.observe(&result);
        result
    }

    async fn list_inner(&self, req: &ListNotesRequest) -> Result<NotePage> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let limit = i64::from(req.limit);
        let offset = req.offset() as i64;

        let (notes, total) = match &req.query {
            NoteQuery::Field { archived, sort } => {
                let sql = format!(
                    "SELECT {} FROM note WHERE is_archived = $1 ORDER BY {} LIMIT $2 OFFSET $3",
                    NOTE_COLUMNS,
                    order_clause(sort)
                );
                let rows = sqlx::query(&sql)
                    .bind(*archived)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(map_db_error)?;
                let total: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM note WHERE is_archived = $1")
                        .bind(*archived)
                        .fetch_one(&mut *tx)
                        .await
                        .map_err(map_db_error)?;
                (rows.iter().map(note_from_row).collect::<Vec<_>>(), total)
            }
            NoteQuery::Text { query } => {
                let sql = format!(
                    "SELECT {} FROM note, websearch_to_tsquery('english', $1) q \
                     WHERE is_archived = false AND tsv @@ q \
                     ORDER BY ts_rank(tsv, q) DESC, created_at DESC, id DESC \
                     LIMIT $2 OFFSET $3",
                    NOTE_COLUMNS
                );
                let rows = sqlx::query(&sql)
                    .bind(query)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(map_db_error)?;
                let total: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM note, websearch_to_tsquery('english', $1) q \
                     WHERE is_archived = false AND tsv @@ q",
                )
                .bind(query)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_db_error)?;
                (rows.iter().map(note_from_row).collect::<Vec<_>>(), total)
            }
        };

        tx.commit().await.map_err(map_db_error)?;

        Ok(NotePage {
            notes,
            total_count: total.max(0) as u64,
            page: req.page,
            limit: req.limit,
        })
    }

    async fn get_inner(&self, id: Uuid) -> Result<Note> {
        let sql = format!("SELECT {} FROM note WHERE id = $1", NOTE_COLUMNS);
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(|row| note_from_row(&row))
            .ok_or(Error::NoteNotFound(id))
    }

    async fn create_inner(&self, req: CreateNoteRequest) -> Result<Note> {
        schema::check_new_note(&req)?;
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO note (id, title, content, tags, is_archived, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, false, $5, $5) RETURNING {}",
            NOTE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(new_v7())
            .bind(&req.title)
            .bind(&req.content)
            .bind(&req.tags)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(note_from_row(&row))
    }

    async fn update_inner(&self, id: Uuid, patch: NotePatch) -> Result<Note> {
        schema::check_patch(&patch)?;
        let sql = format!(
            "UPDATE note SET \
                title = COALESCE($3, title), \
                content = COALESCE($4, content), \
                tags = COALESCE($5, tags), \
                is_archived = COALESCE($6, is_archived), \
                updated_at = {} \
             WHERE id = $1 RETURNING {}",
            BUMP_UPDATED_AT, NOTE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(Utc::now())
            .bind(patch.title)
            .bind(patch.content)
            .bind(patch.tags)
            .bind(patch.is_archived)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(|row| note_from_row(&row))
            .ok_or(Error::NoteNotFound(id))
    }

    async fn toggle_inner(&self, id: Uuid) -> Result<Note> {
        let sql = format!(
            "UPDATE note SET is_archived = NOT is_archived, updated_at = {} \
             WHERE id = $1 RETURNING {}",
            BUMP_UPDATED_AT, NOTE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(|row| note_from_row(&row))
            .ok_or(Error::NoteNotFound(id))
    }

    async fn delete_inner(&self, id: Uuid) -> Result<DeletedNote> {
        sqlx::query("DELETE FROM note WHERE id = $1 RETURNING id, title")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(|row| DeletedNote {
                id: row.get("id"),
                title: row.get("title"),
            })
            .ok_or(Error::NoteNotFound(id))
    }

    async fn search_inner(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>> {
        let sql = format!(
            "SELECT {}, ts_rank(tsv, q) AS score \
             FROM note, websearch_to_tsquery('english', $1) q \
             WHERE is_archived = false AND tsv @@ q \
             ORDER BY score DESC, created_at DESC, id DESC \
             LIMIT $2",
            NOTE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(query)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(rows
            .iter()
            .map(|row| SearchHit {
                note: note_from_row(row),
                score: row.get::<f32, _>("score"),
            })
            .collect())
    }
}

fn note_from_row(row: &PgRow) -> Note {
    Note {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        tags: row.get::<Vec<String>, _>("tags"),
        is_archived: row.get("is_archived"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Build the ORDER BY clause from a whitelisted sort; ties are broken by id.
fn order_clause(sort: &NoteSort) -> String {
    let column = match sort.field {
        SortField::CreatedAt => "created_at",
        SortField::UpdatedAt => "updated_at",
        SortField::Title => "title",
    };
    let direction = match sort.order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!("{} {}, id {}", column, direction, direction)
}

/// Classify a sqlx error into the core taxonomy.
///
/// Connection-class failures become [`Error::Unavailable`]; CHECK and NOT
/// NULL violations become field errors; unique violations become conflicts.
pub fn map_db_error(err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => Error::Unavailable(err.to_string()),
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
            let constraint = db.constraint().unwrap_or_default().to_string();
            match code.as_str() {
                "23505" => Error::Conflict {
                    field: if constraint.is_empty() {
                        "id".to_string()
                    } else {
                        constraint
                    },
                    value: db.message().to_string(),
                },
                "23514" | "23502" => Error::invalid(
                    constraint_field(&constraint).to_string(),
                    db.message().to_string(),
                    JsonValue::Null,
                ),
                // admin_shutdown, cannot_connect_now
                "57P01" | "57P03" => Error::Unavailable(db.message().to_string()),
                _ => Error::Database(sqlx::Error::Database(db)),
            }
        }
        other => Error::Database(other),
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list(&self, req: ListNotesRequest) -> Result<NotePage> {
        let start = Instant::now();
        let result = self.track(self.list_inner(&req).await);
        if let Ok(page) = &result {
            debug!(
                subsystem = "database",
                component = "notes",
                op = "list",
                ordering = req.query.ordering(),
                page = req.page,
                limit = req.limit,
                result_count = page.notes.len(),
                total_count = page.total_count,
                duration_ms = start.elapsed().as_millis() as u64,
                "Listed notes"
            );
        }
        result
    }

    async fn get(&self, id: Uuid) -> Result<Note> {
        let result = self.get_inner(id).await;
        self.track(result)
    }

    async fn create(&self, req: CreateNoteRequest) -> Result<Note> {
        let result = self.create_inner(req).await;
        self.track(result)
    }

    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note> {
        let result = self.update_inner(id, patch).await;
        self.track(result)
    }

    async fn delete(&self, id: Uuid) -> Result<DeletedNote> {
        let result = self.delete_inner(id).await;
        self.track(result)
    }

    async fn toggle_archive(&self, id: Uuid) -> Result<Note> {
        let result = self.toggle_inner(id).await;
        self.track(result)
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>> {
        let start = Instant::now();
        let result = self.track(self.search_inner(query, limit).await);
        if let Ok(hits) = &result {
            debug!(
                subsystem = "database",
                component = "notes",
                op = "search",
                query = query,
                result_count = hits.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Searched notes"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_clause_default() {
        assert_eq!(
            order_clause(&NoteSort::default()),
            "created_at DESC, id DESC"
        );
    }

    #[test]
    fn test_order_clause_title_asc() {
        let sort = NoteSort {
            field: SortField::Title,
            order: SortOrder::Asc,
        };
        assert_eq!(order_clause(&sort), "title ASC, id ASC");
    }

    #[test]
    fn test_map_pool_errors_to_unavailable() {
        assert!(matches!(
            map_db_error(sqlx::Error::PoolTimedOut),
            Error::Unavailable(_)
        ));
        assert!(matches!(
            map_db_error(sqlx::Error::PoolClosed),
            Error::Unavailable(_)
        ));
    }

    #[test]
    fn test_map_row_not_found_stays_database() {
        assert!(matches!(
            map_db_error(sqlx::Error::RowNotFound),
            Error::Database(_)
        ));
    }
}
