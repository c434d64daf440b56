// src/history.rs

//! Transfer history: the record of files recently placed into the library.
//!
//! The refresh workflow only reads history. Where it comes from is up to the
//! embedding application; a JSON file export is supported out of the box.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::HistoryError;

/// Status value of a successful transfer.
pub const STATUS_SUCCESS: i64 = 1;

/// Kind of content a transfer placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    #[serde(rename = "movie", alias = "电影")]
    Movie,
    #[serde(rename = "show", alias = "tv", alias = "电视剧")]
    Show,
    #[serde(other)]
    Other,
}

/// One historical file placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub status: i64,
    /// Destination path; absent when the transfer never got that far.
    #[serde(default)]
    pub dest: Option<String>,
    #[serde(with = "local_timestamp")]
    pub date: NaiveDateTime,
}

impl TransferRecord {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// `YYYY-mm-dd HH:MM:SS` in local time, the format the history store writes.
pub mod local_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Source of transfer history.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Records dated at or after `cutoff`, in no particular order.
    async fn list_since(&self, cutoff: NaiveDateTime) -> Result<Vec<TransferRecord>, HistoryError>;
}

/// History held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    records: Vec<TransferRecord>,
}

impl InMemoryHistory {
    pub fn new(records: Vec<TransferRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl HistorySource for InMemoryHistory {
    async fn list_since(&self, cutoff: NaiveDateTime) -> Result<Vec<TransferRecord>, HistoryError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.date >= cutoff)
            .cloned()
            .collect())
    }
}

/// History exported as a JSON array of records.
#[derive(Debug, Clone)]
pub struct JsonFileHistory {
    path: PathBuf,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl HistorySource for JsonFileHistory {
    async fn list_since(&self, cutoff: NaiveDateTime) -> Result<Vec<TransferRecord>, HistoryError> {
        if !self.path.exists() {
            log::debug!("History: no history file at {}", self.path.display());
            return Ok(Vec::new());
        }
        let path = self.path.display().to_string();
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| HistoryError::Io {
                path: path.clone(),
                source,
            })?;
        let records: Vec<TransferRecord> =
            serde_json::from_str(&content).map_err(|source| HistoryError::Parse { path, source })?;
        Ok(records.into_iter().filter(|r| r.date >= cutoff).collect())
    }
}
