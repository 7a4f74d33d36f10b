//! The one record shape every backend is normalized into.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};

use crate::error::FetchError;
use crate::normalize::format_duration;

/// Rendered for dates, times, durations and labels nobody could determine.
pub const UNKNOWN: &str = "unknown";

/// Result of analyzing one input string. Built once per analysis pass and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub identifier: String,
    pub title: String,
    pub upload_date: Option<NaiveDate>,
    pub upload_time: Option<NaiveTime>,
    pub duration_seconds: Option<u64>,
    pub view_count: u64,
    pub like_count: u64,
    pub dislike_count: u64,
    pub comment_count: u64,
    pub engagement_rate: f64,
    pub performance_score: u8,
    pub description: String,
    pub channel_name: String,
    pub channel_id: Option<String>,
    pub country: String,
    pub category: String,
    pub hashtags: BTreeSet<String>,
    pub thumbnail_url: Option<String>,
    /// The caller's original input, verbatim.
    pub source_url: String,
    /// Direct stream URL; only the fallback backend can provide one.
    pub download_url: Option<String>,
    /// Diagnostic reason when this record stands in for a failed item.
    pub failure: Option<String>,
}

impl CanonicalRecord {
    /// Stand-in for an input that could not be resolved. Keeps the batch the
    /// same length as its input list.
    pub fn placeholder(source_url: &str, identifier: Option<&str>, reason: &FetchError) -> Self {
        Self {
            identifier: identifier.unwrap_or(UNKNOWN).to_owned(),
            title: format!("FAILED: {}", reason.label()),
            upload_date: None,
            upload_time: None,
            duration_seconds: None,
            view_count: 0,
            like_count: 0,
            dislike_count: 0,
            comment_count: 0,
            engagement_rate: 0.0,
            performance_score: 0,
            description: reason.to_string(),
            channel_name: UNKNOWN.to_owned(),
            channel_id: None,
            country: UNKNOWN.to_owned(),
            category: UNKNOWN.to_owned(),
            hashtags: BTreeSet::new(),
            thumbnail_url: None,
            source_url: source_url.to_owned(),
            download_url: None,
            failure: Some(reason.to_string()),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.failure.is_some()
    }

    pub fn upload_date_text(&self) -> String {
        self.upload_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN.to_owned())
    }

    pub fn upload_time_text(&self) -> String {
        self.upload_time
            .map(|time| time.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| UNKNOWN.to_owned())
    }

    pub fn duration_text(&self) -> String {
        format_duration(self.duration_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_zeroes_numbers_and_keeps_input() {
        let reason = FetchError::Transport("connection reset".into());
        let record =
            CanonicalRecord::placeholder("https://youtu.be/dQw4w9WgXcQ", Some("dQw4w9WgXcQ"), &reason);

        assert_eq!(record.identifier, "dQw4w9WgXcQ");
        assert_eq!(record.title, "FAILED: Timeout/Blocked");
        assert_eq!(record.source_url, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(record.view_count + record.like_count + record.dislike_count, 0);
        assert_eq!(record.comment_count, 0);
        assert_eq!(record.engagement_rate, 0.0);
        assert_eq!(record.performance_score, 0);
        assert!(record.hashtags.is_empty());
        assert!(record.download_url.is_none());
        assert!(record.is_placeholder());
        assert_eq!(record.upload_date_text(), UNKNOWN);
        assert_eq!(record.upload_time_text(), UNKNOWN);
        assert_eq!(record.duration_text(), UNKNOWN);
    }

    #[test]
    fn placeholder_without_identifier_uses_sentinel() {
        let reason = FetchError::UnrecognizedInput("not a url".into());
        let record = CanonicalRecord::placeholder("not a url", None, &reason);
        assert_eq!(record.identifier, UNKNOWN);
        assert_eq!(record.title, "FAILED: Invalid URL");
        assert!(record.description.contains("not a url"));
    }
}
