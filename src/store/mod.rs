//! Record store collaborator: the system of record for chapter documents.
//!
//! The query gateway only ever talks to the [`RecordStore`] trait; the
//! sqlite implementation is the default backing, and tests swap in the
//! in-memory one.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Chapter, ChapterStatus};

mod memory;
mod sqlite;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Field-equality filters for chapter list queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterFilter {
    pub class_name: Option<String>,
    pub unit: Option<String>,
    pub status: Option<ChapterStatus>,
    pub weak_chapters: Option<bool>,
    pub subject: Option<String>,
}

impl ChapterFilter {
    pub fn matches(&self, chapter: &Chapter) -> bool {
        self.class_name
            .as_ref()
            .map_or(true, |v| &chapter.class_name == v)
            && self.unit.as_ref().map_or(true, |v| &chapter.unit == v)
            && self.status.as_ref().map_or(true, |v| &chapter.status == v)
            && self
                .weak_chapters
                .as_ref()
                .map_or(true, |v| &chapter.is_weak_chapter == v)
            && self
                .subject
                .as_ref()
                .map_or(true, |v| &chapter.subject == v)
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Page through chapters matching the filter. `page` is 1-based.
    /// Returns the page of items plus the total match count.
    async fn find(
        &self,
        filter: &ChapterFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<Chapter>, u64)>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Chapter>>;

    /// Insert a batch, assigning ids and timestamps. Returns the inserted
    /// records as stored.
    async fn insert_many(&self, chapters: Vec<Chapter>) -> Result<Vec<Chapter>>;
}
