//! Sinks for a finished batch: CSV, JSON or a SQLite table.
//!
//! All formats share the flat [`ExportRow`] shape, so a CSV, a JSON array and
//! a database table written from the same batch carry identical columns.

pub mod csv;
pub mod json;
pub mod sqlite;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::record::CanonicalRecord;

pub const HASHTAG_SEPARATOR: &str = ", ";
pub const MISSING_DOWNLOAD_URL: &str = "N/A";
pub const STATUS_OK: &str = "ok";
pub const STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
    Sqlite,
}

impl ExportFormat {
    /// Guesses the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            "db" | "sqlite" | "sqlite3" => Some(ExportFormat::Sqlite),
            _ => None,
        }
    }
}

/// One exported line. Hashtags are flattened into a single string and a
/// missing download URL is written as `N/A`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub identifier: String,
    pub title: String,
    pub upload_date: String,
    pub upload_time: String,
    pub duration: String,
    pub views: u64,
    pub likes: u64,
    pub dislikes: u64,
    pub comments: u64,
    pub engagement_rate: f64,
    pub performance_score: u8,
    pub description: String,
    pub channel: String,
    pub channel_id: String,
    pub country: String,
    pub category: String,
    pub hashtags: String,
    pub thumbnail: String,
    pub source_url: String,
    pub download_url: String,
    pub status: String,
}

impl ExportRow {
    pub fn from_record(record: &CanonicalRecord) -> Self {
        Self {
            identifier: record.identifier.clone(),
            title: record.title.clone(),
            upload_date: record.upload_date_text(),
            upload_time: record.upload_time_text(),
            duration: record.duration_text(),
            views: record.view_count,
            likes: record.like_count,
            dislikes: record.dislike_count,
            comments: record.comment_count,
            engagement_rate: record.engagement_rate,
            performance_score: record.performance_score,
            description: record.description.clone(),
            channel: record.channel_name.clone(),
            channel_id: record.channel_id.clone().unwrap_or_default(),
            country: record.country.clone(),
            category: record.category.clone(),
            hashtags: record
                .hashtags
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(HASHTAG_SEPARATOR),
            thumbnail: record.thumbnail_url.clone().unwrap_or_default(),
            source_url: record.source_url.clone(),
            download_url: record
                .download_url
                .clone()
                .unwrap_or_else(|| MISSING_DOWNLOAD_URL.to_owned()),
            status: if record.is_placeholder() {
                STATUS_FAILED
            } else {
                STATUS_OK
            }
            .to_owned(),
        }
    }

    /// Splits the flattened hashtag column back into a set.
    pub fn hashtag_set(&self) -> BTreeSet<String> {
        self.hashtags
            .split(HASHTAG_SEPARATOR)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

pub fn rows_from_records(records: &[CanonicalRecord]) -> Vec<ExportRow> {
    records.iter().map(ExportRow::from_record).collect()
}

/// Writes the batch to `path`. Records are never modified, so a failed
/// export can simply be retried.
pub fn export_records(records: &[CanonicalRecord], format: ExportFormat, path: &Path) -> Result<()> {
    let rows = rows_from_records(records);
    match format {
        ExportFormat::Csv => csv::write_csv(path, &rows)?,
        ExportFormat::Json => json::write_json(path, &rows)?,
        ExportFormat::Sqlite => {
            let mut store = sqlite::RecordStore::open(path)?;
            store.replace_all(&rows)?;
        }
    }
    info!(path = %path.display(), rows = rows.len(), ?format, "export written");
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::error::FetchError;
    use crate::normalize::{RawMetadata, normalize};
    use crate::record::CanonicalRecord;

    pub(crate) fn resolved() -> CanonicalRecord {
        normalize(RawMetadata {
            identifier: "dQw4w9WgXcQ".into(),
            title: "Never Gonna Give You Up, \"Official\" #80s".into(),
            description: "line one\nline two #RickAstley".into(),
            upload_date: chrono::NaiveDate::from_ymd_opt(2009, 10, 25),
            upload_time: chrono::NaiveTime::from_hms_opt(6, 57, 33),
            duration_seconds: Some(212),
            view_count: 1_500_000_000,
            like_count: 18_000_000,
            dislike_count: 700_000,
            comment_count: 2_300_000,
            channel_name: "Rick Astley".into(),
            channel_id: Some("UCuAXFkgsw1L7xaCfnd5JJOw".into()),
            country: "US".into(),
            category: "Music".into(),
            thumbnail_url: Some("https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg".into()),
            source_url: "https://youtu.be/dQw4w9WgXcQ".into(),
            download_url: Some("https://rr1.googlevideo.com/videoplayback?id=dQw4w9WgXcQ".into()),
        })
    }

    pub(crate) fn failed() -> CanonicalRecord {
        CanonicalRecord::placeholder(
            "https://youtu.be/bbbbbbbbbbb",
            Some("bbbbbbbbbbb"),
            &FetchError::Http { status: 403 },
        )
    }
}
