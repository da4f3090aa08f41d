//! Chapter record schema and per-item validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChapterStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl ChapterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterStatus::NotStarted => "Not Started",
            ChapterStatus::InProgress => "In Progress",
            ChapterStatus::Completed => "Completed",
        }
    }
}

/// A single chapter record. Field names stay camelCase on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub subject: String,
    pub chapter: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub unit: String,
    #[serde(rename = "yearWiseQuestionCount")]
    pub year_wise_question_count: BTreeMap<String, u32>,
    #[serde(rename = "questionSolved", default)]
    pub question_solved: u32,
    #[serde(default)]
    pub status: ChapterStatus,
    #[serde(rename = "isWeakChapter", default)]
    pub is_weak_chapter: bool,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A record that failed validation during a batch upload, returned to the
/// caller alongside the successes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedChapter {
    pub data: Value,
    pub error: String,
}

/// Validate one uploaded array element. Missing required fields and wrong
/// types surface as the serde error message.
pub fn validate_chapter(raw: Value) -> Result<Chapter, FailedChapter> {
    match serde_json::from_value::<Chapter>(raw.clone()) {
        Ok(chapter) => Ok(chapter),
        Err(e) => Err(FailedChapter {
            data: raw,
            error: e.to_string(),
        }),
    }
}
