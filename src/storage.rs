//! # Transcript Store
//!
//! SQLite-backed persistence for transcript records. The store owns record
//! lifetime: the transcription pipeline creates records, the query endpoints
//! read and delete them. Records are immutable once written; there is no
//! update path.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (nanosecond
//! precision, `Z` suffix) so lexicographic comparison in SQL matches
//! chronological order and records round-trip exactly.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Persisted result of one transcription operation. Serialized in
/// camelCase to match the service's public API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRecord {
    pub id: i64,
    pub text: String,
    pub file_name: String,
    pub duration_seconds: f64,
    pub created_at: DateTime<Utc>,
}

/// Data needed to persist a new record. The id and creation timestamp are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTranscript {
    pub text: String,
    pub file_name: String,
    pub duration_seconds: f64,
}

/// Filters and pagination for `list`. Page and limit are already clamped by
/// the handler layer; date bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

/// Handle to the SQLite database. Cheap to clone; writes are serialized
/// through the inner mutex.
#[derive(Clone)]
pub struct TranscriptStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for TranscriptStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptStore").finish_non_exhaustive()
    }
}

impl TranscriptStore {
    /// Open (or create) the database at the given path and ensure the schema
    /// exists.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::Database(format!("creating database directory: {e}")))?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL allows the sweeper binary and live requests to read concurrently.
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
        ",
        )?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> AppResult<()> {
        let conn = self.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS transcripts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                file_name TEXT NOT NULL,
                duration_seconds REAL NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transcripts_created_at
                ON transcripts(created_at DESC);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned mutex means another thread panicked mid-query; the
        // connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Persist a new record, assigning its id and creation timestamp.
    pub fn insert(&self, new: NewTranscript) -> AppResult<TranscriptRecord> {
        let created_at = Utc::now();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO transcripts (text, file_name, duration_seconds, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                new.text,
                new.file_name,
                new.duration_seconds,
                encode_timestamp(&created_at)
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, file_name = %new.file_name, "persisted transcript record");

        Ok(TranscriptRecord {
            id,
            text: new.text,
            file_name: new.file_name,
            duration_seconds: new.duration_seconds,
            created_at,
        })
    }

    /// List records matching the query, most recent first, sliced to the
    /// requested page.
    pub fn list(&self, query: &ListQuery) -> AppResult<Vec<TranscriptRecord>> {
        let mut sql = String::from(
            "SELECT id, text, file_name, duration_seconds, created_at FROM transcripts",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(start) = &query.start_date {
            clauses.push("created_at >= ?");
            params.push(Box::new(encode_timestamp(start)));
        }
        if let Some(end) = &query.end_date {
            clauses.push("created_at <= ?");
            params.push(Box::new(encode_timestamp(end)));
        }
        if let Some(search) = &query.search {
            // SQLite LIKE is case-insensitive for ASCII. Wildcards in the
            // term are escaped so the match is a literal substring.
            clauses.push(r"text LIKE '%' || ? || '%' ESCAPE '\'");
            params.push(Box::new(escape_like(search)));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        // id breaks ties between records created within the same microsecond.
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?");
        let limit = i64::from(query.limit);
        let offset = i64::from(query.page.saturating_sub(1)) * limit;
        params.push(Box::new(limit));
        params.push(Box::new(offset));

        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(&param_refs[..], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Fetch a record by id, or signal not-found.
    pub fn get(&self, id: i64) -> AppResult<TranscriptRecord> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, text, file_name, duration_seconds, created_at
             FROM transcripts WHERE id = ?1",
        )?;
        stmt.query_row(params![id], row_to_record)
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("transcription with id {id} not found")))
    }

    /// Delete a record by id, or signal not-found if nothing matched.
    pub fn delete(&self, id: i64) -> AppResult<()> {
        let conn = self.lock();
        let affected = conn.execute("DELETE FROM transcripts WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(AppError::NotFound(format!(
                "transcription with id {id} not found"
            )));
        }
        debug!(id, "deleted transcript record");
        Ok(())
    }
}

fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TranscriptRecord> {
    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?
        .with_timezone(&Utc);

    Ok(TranscriptRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        file_name: row.get(2)?,
        duration_seconds: row.get(3)?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store_with(records: &[(&str, &str)]) -> TranscriptStore {
        let store = TranscriptStore::open_in_memory().unwrap();
        for (text, file_name) in records {
            store
                .insert(NewTranscript {
                    text: text.to_string(),
                    file_name: file_name.to_string(),
                    duration_seconds: 1.5,
                })
                .unwrap();
        }
        store
    }

    fn page(store: &TranscriptStore, page: u32, limit: u32) -> Vec<TranscriptRecord> {
        store
            .list(&ListQuery {
                page,
                limit,
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn insert_assigns_id_and_timestamp() {
        let store = TranscriptStore::open_in_memory().unwrap();
        let before = Utc::now() - Duration::seconds(1);
        let record = store
            .insert(NewTranscript {
                text: "hello world".into(),
                file_name: "greeting.mp3".into(),
                duration_seconds: 2.25,
            })
            .unwrap();

        assert_eq!(record.id, 1);
        assert!(record.created_at >= before);

        let fetched = store.get(record.id).unwrap();
        assert_eq!(fetched, record);
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let store = TranscriptStore::open_in_memory().unwrap();
        assert!(matches!(store.get(42), Err(AppError::NotFound(_))));
    }

    #[test]
    fn delete_removes_record() {
        let store = store_with(&[("a", "a.mp3")]);
        store.delete(1).unwrap();
        assert!(matches!(store.get(1), Err(AppError::NotFound(_))));
    }

    #[test]
    fn delete_unknown_id_leaves_store_unchanged() {
        let store = store_with(&[("a", "a.mp3")]);
        assert!(matches!(store.delete(99), Err(AppError::NotFound(_))));
        assert_eq!(page(&store, 1, 10).len(), 1);
    }

    #[test]
    fn list_orders_most_recent_first_and_paginates() {
        let store = TranscriptStore::open_in_memory().unwrap();
        for i in 0..15 {
            store
                .insert(NewTranscript {
                    text: format!("transcript {i}"),
                    file_name: format!("clip-{i}.wav"),
                    duration_seconds: 1.0,
                })
                .unwrap();
        }

        let first = page(&store, 1, 10);
        assert_eq!(first.len(), 10);
        // Most recently created comes first.
        assert_eq!(first[0].text, "transcript 14");
        assert_eq!(first[9].text, "transcript 5");

        let second = page(&store, 2, 10);
        assert_eq!(second.len(), 5);
        assert_eq!(second[0].text, "transcript 4");
        assert_eq!(second[4].text, "transcript 0");

        assert!(page(&store, 3, 10).is_empty());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let store = store_with(&[
            ("The Quarterly Budget meeting", "q.mp3"),
            ("standup notes", "s.mp3"),
        ]);

        let hits = store
            .list(&ListQuery {
                page: 1,
                limit: 10,
                search: Some("budget".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "q.mp3");
    }

    #[test]
    fn search_wildcards_match_literally() {
        let store = store_with(&[
            ("battery at 100% after charging", "a.mp3"),
            ("meeting ran 100 minutes over", "b.mp3"),
        ]);

        let hits = store
            .list(&ListQuery {
                page: 1,
                limit: 10,
                search: Some("100%".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "a.mp3");
    }

    #[test]
    fn date_range_is_inclusive() {
        let store = store_with(&[("inside", "in.mp3")]);
        let record = store.get(1).unwrap();

        let exact = store
            .list(&ListQuery {
                page: 1,
                limit: 10,
                start_date: Some(record.created_at),
                end_date: Some(record.created_at),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(exact.len(), 1);

        let before = store
            .list(&ListQuery {
                page: 1,
                limit: 10,
                end_date: Some(record.created_at - Duration::seconds(10)),
                ..Default::default()
            })
            .unwrap();
        assert!(before.is_empty());
    }

    #[test]
    fn filters_compose() {
        let store = store_with(&[("alpha report", "a.mp3"), ("beta report", "b.mp3")]);
        let now = Utc::now();

        let hits = store
            .list(&ListQuery {
                page: 1,
                limit: 10,
                start_date: Some(now - Duration::hours(1)),
                end_date: Some(now + Duration::hours(1)),
                search: Some("ALPHA".into()),
            })
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "a.mp3");
    }
}
