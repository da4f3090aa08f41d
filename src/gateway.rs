//! Query gateway: sequences cache, record store and invalidation.
//!
//! Read path: cache lookup, then record store on a miss, then best-effort
//! populate. Write path: record store first, then best-effort namespace
//! invalidation. Rate-limit admission runs in middleware before any of
//! this, so a rejected request never reaches the gateway.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::cache::{CacheLayer, Lookup};
use crate::model::{validate_chapter, Chapter, ChapterStatus, FailedChapter};
use crate::store::{ChapterFilter, RecordStore, StoreError};

pub const CHAPTERS_NAMESPACE: &str = "chapters";

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Query string accepted by the chapter list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChapterListQuery {
    pub class: Option<String>,
    pub unit: Option<String>,
    pub status: Option<ChapterStatus>,
    #[serde(rename = "weakChapters")]
    pub weak_chapters: Option<bool>,
    pub subject: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl ChapterListQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(DEFAULT_PAGE).max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    pub fn filter(&self) -> ChapterFilter {
        ChapterFilter {
            class_name: self.class.clone(),
            unit: self.unit.clone(),
            status: self.status,
            weak_chapters: self.weak_chapters,
            subject: self.subject.clone(),
        }
    }

    /// Normalized parameter pairs for cache fingerprinting. Absent filters
    /// contribute nothing, and page/limit defaults are made explicit so
    /// `?page=1` and no page at all share an entry.
    pub fn cache_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(v) = &self.class {
            params.push(("class".to_string(), v.clone()));
        }
        if let Some(v) = &self.unit {
            params.push(("unit".to_string(), v.clone()));
        }
        if let Some(v) = &self.status {
            params.push(("status".to_string(), v.as_str().to_string()));
        }
        if let Some(v) = &self.weak_chapters {
            params.push(("weakChapters".to_string(), v.to_string()));
        }
        if let Some(v) = &self.subject {
            params.push(("subject".to_string(), v.clone()));
        }
        params.push(("page".to_string(), self.page().to_string()));
        params.push(("limit".to_string(), self.limit().to_string()));
        params
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterListResponse {
    pub success: bool,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub data: Vec<Chapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "uploadedCount")]
    pub uploaded_count: u64,
    #[serde(rename = "failedChapters")]
    pub failed_chapters: Vec<FailedChapter>,
}

/// A list response body, plus whether it came out of the cache.
#[derive(Debug, Clone)]
pub struct ListOutcome {
    pub body: String,
    pub from_cache: bool,
}

#[derive(Clone)]
pub struct QueryGateway {
    cache: CacheLayer,
    store: Arc<dyn RecordStore>,
}

impl QueryGateway {
    pub fn new(cache: CacheLayer, store: Arc<dyn RecordStore>) -> Self {
        Self { cache, store }
    }

    /// Read path. A cache hit is returned verbatim; a miss (or an
    /// unavailable cache) falls through to the record store and then
    /// populates the cache best-effort.
    pub async fn list_chapters(&self, query: &ChapterListQuery) -> Result<ListOutcome, StoreError> {
        let params = query.cache_params();

        match self.cache.lookup(CHAPTERS_NAMESPACE, &params).await {
            Lookup::Hit(body) => {
                return Ok(ListOutcome {
                    body,
                    from_cache: true,
                })
            }
            Lookup::Miss | Lookup::Unavailable => {}
        }

        let (data, total) = self
            .store
            .find(&query.filter(), query.page(), query.limit())
            .await?;
        let response = ChapterListResponse {
            success: true,
            total,
            page: query.page(),
            limit: query.limit(),
            data,
        };
        let body = serde_json::to_string(&response)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        // Only a fully successful read reaches this point, so an error
        // response can never be memoized.
        self.cache.store(CHAPTERS_NAMESPACE, &params, &body).await;

        Ok(ListOutcome {
            body,
            from_cache: false,
        })
    }

    pub async fn get_chapter(&self, id: &str) -> Result<Option<Chapter>, StoreError> {
        self.store.find_by_id(id).await
    }

    /// Write path. Each raw item is validated independently; failures are
    /// collected, not fatal. Valid items are inserted, then the chapters
    /// namespace is invalidated best-effort.
    pub async fn upload_chapters(&self, raw_items: Vec<Value>) -> Result<UploadResponse, StoreError> {
        let mut valid = Vec::new();
        let mut failed_chapters = Vec::new();
        for raw in raw_items {
            match validate_chapter(raw) {
                Ok(chapter) => valid.push(chapter),
                Err(failure) => failed_chapters.push(failure),
            }
        }

        let inserted: Vec<Chapter> = if valid.is_empty() {
            Vec::new()
        } else {
            self.store.insert_many(valid).await?
        };

        if let Err(e) = self.invalidate_after_write().await {
            // Deliberately discarded: staleness self-heals on the next
            // write, and the client's upload already succeeded.
            error!(error = %e, "post-write invalidation failed");
        }

        info!(
            uploaded = inserted.len(),
            failed = failed_chapters.len(),
            "chapters uploaded"
        );
        Ok(UploadResponse {
            success: true,
            message: "Chapters uploaded successfully".to_string(),
            uploaded_count: inserted.len() as u64,
            failed_chapters,
        })
    }

    async fn invalidate_after_write(&self) -> Result<u64, String> {
        self.cache
            .invalidate(CHAPTERS_NAMESPACE)
            .await
            .ok_or_else(|| "cache unavailable".to_string())
    }
}
