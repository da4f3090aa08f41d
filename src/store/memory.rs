//! In-memory record store used by gateway and integration tests. Tracks
//! how often `find` is called so tests can assert whether a read actually
//! reached the store or was served from cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{ChapterFilter, RecordStore, Result};
use crate::model::Chapter;

#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    chapters: Arc<Mutex<Vec<Chapter>>>,
    find_calls: Arc<AtomicU64>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_calls(&self) -> u64 {
        self.find_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find(
        &self,
        filter: &ChapterFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<Chapter>, u64)> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let chapters = self.chapters.lock().expect("store mutex poisoned");
        let matching: Vec<Chapter> = chapters
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        let total = matching.len() as u64;
        let offset = (page.max(1) - 1).saturating_mul(limit);
        let items = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect();
        Ok((items, total))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Chapter>> {
        let chapters = self.chapters.lock().expect("store mutex poisoned");
        Ok(chapters
            .iter()
            .find(|c| c.id.as_deref() == Some(id))
            .cloned())
    }

    async fn insert_many(&self, incoming: Vec<Chapter>) -> Result<Vec<Chapter>> {
        let now = Utc::now().to_rfc3339();
        let mut chapters = self.chapters.lock().expect("store mutex poisoned");
        let mut inserted = Vec::with_capacity(incoming.len());
        for mut chapter in incoming {
            chapter.id = Some(Uuid::new_v4().to_string());
            chapter.created_at = Some(now.clone());
            chapter.updated_at = Some(now.clone());
            chapters.push(chapter.clone());
            inserted.push(chapter);
        }
        Ok(inserted)
    }
}
