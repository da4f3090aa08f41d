//! Chapter storage as JSON blobs in sqlite.
//!
//! Each record is one row holding the serialized chapter; filters run with
//! `json_extract` so new queryable fields don't need schema changes.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params_from_iter, Connection};
use uuid::Uuid;

use super::{ChapterFilter, RecordStore, Result, StoreError};
use crate::model::Chapter;

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

impl SqliteRecordStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS chapters (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            )",
            [],
        )
        .map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn where_clause(filter: &ChapterFilter) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();

        if let Some(v) = &filter.class_name {
            conditions.push("json_extract(data, '$.class') = ?");
            binds.push(v.clone());
        }
        if let Some(v) = &filter.unit {
            conditions.push("json_extract(data, '$.unit') = ?");
            binds.push(v.clone());
        }
        if let Some(v) = &filter.status {
            conditions.push("json_extract(data, '$.status') = ?");
            binds.push(v.as_str().to_string());
        }
        if let Some(v) = &filter.weak_chapters {
            // JSON booleans extract as integers in sqlite.
            conditions.push("json_extract(data, '$.isWeakChapter') = ?");
            binds.push(if *v { "1".to_string() } else { "0".to_string() });
        }
        if let Some(v) = &filter.subject {
            conditions.push("json_extract(data, '$.subject') = ?");
            binds.push(v.clone());
        }

        if conditions.is_empty() {
            (String::new(), binds)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), binds)
        }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn find(
        &self,
        filter: &ChapterFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<Chapter>, u64)> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let (clause, binds) = Self::where_clause(filter);

        let total: u64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM chapters{clause}"),
                params_from_iter(binds.iter()),
                |row| row.get(0),
            )
            .map_err(db_err)?;

        // page/limit come straight off the query string; saturate so a
        // huge page yields an empty page instead of overflowing, and keep
        // both literals inside sqlite's integer range.
        let offset = (page.max(1) - 1)
            .saturating_mul(limit)
            .min(i64::MAX as u64);
        let limit = limit.min(i64::MAX as u64);
        let mut stmt = conn
            .prepare(&format!(
                "SELECT data FROM chapters{clause} ORDER BY rowid LIMIT {limit} OFFSET {offset}"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params_from_iter(binds.iter()), |row| {
                row.get::<_, String>(0)
            })
            .map_err(db_err)?;

        let mut chapters = Vec::new();
        for row in rows {
            let json = row.map_err(db_err)?;
            let chapter = serde_json::from_str(&json)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            chapters.push(chapter);
        }
        Ok((chapters, total))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Chapter>> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn
            .prepare("SELECT data FROM chapters WHERE id = ?")
            .map_err(db_err)?;
        let mut rows = stmt.query([id]).map_err(db_err)?;
        match rows.next().map_err(db_err)? {
            Some(row) => {
                let json: String = row.get(0).map_err(db_err)?;
                let chapter = serde_json::from_str(&json)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(chapter))
            }
            None => Ok(None),
        }
    }

    async fn insert_many(&self, chapters: Vec<Chapter>) -> Result<Vec<Chapter>> {
        let mut conn = self.conn.lock().expect("sqlite mutex poisoned");
        let tx = conn.transaction().map_err(db_err)?;
        let now = Utc::now().to_rfc3339();

        let mut inserted = Vec::with_capacity(chapters.len());
        for mut chapter in chapters {
            let id = Uuid::new_v4().to_string();
            chapter.id = Some(id.clone());
            chapter.created_at = Some(now.clone());
            chapter.updated_at = Some(now.clone());

            let json = serde_json::to_string(&chapter)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            tx.execute(
                "INSERT INTO chapters (id, data) VALUES (?1, ?2)",
                rusqlite::params![id, json],
            )
            .map_err(db_err)?;
            inserted.push(chapter);
        }

        tx.commit().map_err(db_err)?;
        Ok(inserted)
    }
}
