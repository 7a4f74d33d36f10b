//! Schema normalization shared by both backends.
//!
//! Each backend maps its own response shape into [`RawMetadata`]; everything
//! derived (engagement, score, hashtags, truncation) happens here so the two
//! paths cannot drift apart.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::extract::extract_hashtags;
use crate::record::{CanonicalRecord, UNKNOWN};

pub const DESCRIPTION_LIMIT: usize = 500;
pub const DESCRIPTION_ELLIPSIS: &str = "...";
pub const GLOBAL_COUNTRY: &str = "Global";
pub const OTHER_CATEGORY: &str = "Other";

const LANGUAGE_REGIONS: &[(&str, &str)] = &[
    ("en", "US"),
    ("es", "ES"),
    ("hi", "IN"),
    ("ar", "SA"),
    ("pt", "BR"),
    ("fr", "FR"),
    ("de", "DE"),
    ("ru", "RU"),
    ("ur", "PK"),
];

const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("1", "Film & Animation"),
    ("2", "Autos & Vehicles"),
    ("10", "Music"),
    ("15", "Pets & Animals"),
    ("17", "Sports"),
    ("19", "Travel & Events"),
    ("20", "Gaming"),
    ("22", "People & Blogs"),
    ("23", "Comedy"),
    ("24", "Entertainment"),
    ("25", "News & Politics"),
    ("26", "Howto & Style"),
    ("27", "Education"),
    ("28", "Science & Technology"),
    ("29", "Nonprofits & Activism"),
];

/// Backend-neutral metadata before derived fields are computed.
#[derive(Debug, Clone, Default)]
pub struct RawMetadata {
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub upload_date: Option<NaiveDate>,
    pub upload_time: Option<NaiveTime>,
    pub duration_seconds: Option<u64>,
    pub view_count: u64,
    pub like_count: u64,
    pub dislike_count: u64,
    pub comment_count: u64,
    pub channel_name: String,
    pub channel_id: Option<String>,
    pub country: String,
    pub category: String,
    pub thumbnail_url: Option<String>,
    pub source_url: String,
    pub download_url: Option<String>,
}

pub fn normalize(raw: RawMetadata) -> CanonicalRecord {
    let engagement = engagement_rate(raw.like_count, raw.view_count);
    let score = performance_score(raw.view_count, raw.like_count, engagement);
    // Tags are taken from the full description, before truncation.
    let hashtags = extract_hashtags(&format!("{} {}", raw.description, raw.title));

    CanonicalRecord {
        identifier: raw.identifier,
        title: raw.title,
        upload_date: raw.upload_date,
        upload_time: raw.upload_time,
        duration_seconds: raw.duration_seconds.filter(|seconds| *seconds > 0),
        view_count: raw.view_count,
        like_count: raw.like_count,
        dislike_count: raw.dislike_count,
        comment_count: raw.comment_count,
        engagement_rate: engagement,
        performance_score: score,
        description: truncate_description(&raw.description),
        channel_name: non_empty_or_unknown(raw.channel_name),
        channel_id: raw.channel_id,
        country: non_empty_or_unknown(raw.country),
        category: non_empty_or_unknown(raw.category),
        hashtags,
        thumbnail_url: raw.thumbnail_url,
        source_url: raw.source_url,
        download_url: raw.download_url,
        failure: None,
    }
}

/// Likes as a percentage of views, rounded to two decimals. Zero views means
/// zero engagement; the division never happens.
pub fn engagement_rate(likes: u64, views: u64) -> f64 {
    if views == 0 {
        return 0.0;
    }
    let rate = likes as f64 / views as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Bounded popularity score in `[0, 100]`, non-decreasing in every input.
pub fn performance_score(views: u64, likes: u64, engagement: f64) -> u8 {
    let engagement_points = if engagement.is_finite() && engagement > 0.0 {
        (engagement * 10.0).floor() as u64
    } else {
        0
    };
    let total = (views / 10_000)
        .saturating_add(likes / 1_000)
        .saturating_add(engagement_points);
    total.min(100) as u8
}

/// Parses compact ISO-8601 durations such as `PT1H2M3S` or `P1DT2H`.
/// Returns `None` for empty, malformed or all-zero encodings.
pub fn parse_iso8601_duration(encoded: &str) -> Option<u64> {
    let body = encoded.trim().strip_prefix('P')?;
    let mut total: u64 = 0;
    let mut digits = String::new();
    let mut in_time = false;

    for c in body.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'T' if digits.is_empty() => in_time = true,
            'D' | 'H' | 'M' | 'S' => {
                let value: u64 = digits.parse().ok()?;
                digits.clear();
                let unit = match (c, in_time) {
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
                total = total.checked_add(value.checked_mul(unit)?)?;
            }
            _ => return None,
        }
    }

    if !digits.is_empty() || total == 0 {
        return None;
    }
    Some(total)
}

/// `HH:MM:SS`, or `unknown` when the duration is missing or zero.
pub fn format_duration(seconds: Option<u64>) -> String {
    match seconds {
        Some(total) if total > 0 => format!(
            "{:02}:{:02}:{:02}",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        ),
        _ => UNKNOWN.to_owned(),
    }
}

pub fn truncate_description(description: &str) -> String {
    if description.chars().count() <= DESCRIPTION_LIMIT {
        return description.to_owned();
    }
    let mut truncated: String = description.chars().take(DESCRIPTION_LIMIT).collect();
    truncated.push_str(DESCRIPTION_ELLIPSIS);
    truncated
}

/// Statistic counters arrive as strings; absent or garbage means zero.
pub fn parse_count(value: Option<&str>) -> u64 {
    value
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Reported country first, then the first language that maps to a region.
pub fn resolve_country(reported: Option<&str>, languages: &[Option<&str>]) -> String {
    if let Some(country) = reported.map(str::trim).filter(|c| !c.is_empty()) {
        return country.to_owned();
    }
    languages
        .iter()
        .flatten()
        .find_map(|language| region_for_language(language))
        .unwrap_or(GLOBAL_COUNTRY)
        .to_owned()
}

pub fn region_for_language(language: &str) -> Option<&'static str> {
    let prefix: String = language.trim().chars().take(2).collect::<String>().to_ascii_lowercase();
    LANGUAGE_REGIONS
        .iter()
        .find(|(code, _)| *code == prefix)
        .map(|(_, region)| *region)
}

pub fn category_label(category_id: Option<&str>) -> String {
    category_id
        .and_then(|id| CATEGORY_LABELS.iter().find(|(code, _)| *code == id.trim()))
        .map(|(_, label)| *label)
        .unwrap_or(OTHER_CATEGORY)
        .to_owned()
}

/// Splits an RFC 3339 timestamp into its UTC date and time.
pub fn split_rfc3339(value: &str) -> (Option<NaiveDate>, Option<NaiveTime>) {
    match DateTime::parse_from_rfc3339(value.trim()) {
        Ok(parsed) => {
            let utc = parsed.with_timezone(&Utc);
            (Some(utc.date_naive()), Some(utc.time()))
        }
        Err(_) => (None, None),
    }
}

/// yt-dlp style `YYYYMMDD`.
pub fn parse_compact_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y%m%d").ok()
}

pub fn time_of_timestamp(timestamp: i64) -> Option<NaiveTime> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).map(|datetime| datetime.time())
}

fn non_empty_or_unknown(value: String) -> String {
    if value.trim().is_empty() {
        UNKNOWN.to_owned()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn python_round2(value: f64) -> f64 {
        (value * 100.0).round() / 100.0
    }

    #[test]
    fn engagement_is_zero_without_views() {
        assert_eq!(engagement_rate(0, 0), 0.0);
        assert_eq!(engagement_rate(500, 0), 0.0);
    }

    #[test]
    fn engagement_rounds_to_two_decimals() {
        assert_eq!(engagement_rate(1, 3), 33.33);
        assert_eq!(engagement_rate(50, 1000), 5.0);
        for (likes, views) in [(7_u64, 913_u64), (12_345, 1_000_001), (1, 1)] {
            assert_eq!(
                engagement_rate(likes, views),
                python_round2(likes as f64 / views as f64 * 100.0)
            );
        }
    }

    #[test]
    fn score_is_bounded() {
        assert_eq!(performance_score(0, 0, 0.0), 0);
        assert_eq!(performance_score(u64::MAX, u64::MAX, 100.0), 100);
        assert_eq!(performance_score(50_000, 2_000, 1.5), 5 + 2 + 15);
    }

    #[test]
    fn score_is_monotonic_in_each_input() {
        let steps = [0_u64, 9_999, 10_000, 55_555, 1_000_000, 5_000_000];
        for pair in steps.windows(2) {
            assert!(performance_score(pair[0], 10, 1.0) <= performance_score(pair[1], 10, 1.0));
            assert!(performance_score(10, pair[0], 1.0) <= performance_score(10, pair[1], 1.0));
        }
        let rates = [0.0, 0.05, 0.1, 2.3, 7.77, 100.0];
        for pair in rates.windows(2) {
            assert!(performance_score(10, 10, pair[0]) <= performance_score(10, 10, pair[1]));
        }
    }

    #[test]
    fn iso_durations_convert() {
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
        assert_eq!(format_duration(parse_iso8601_duration("PT1H2M3S")), "01:02:03");
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT10M"), Some(600));
        assert_eq!(parse_iso8601_duration("P1DT2H"), Some(93_600));
        assert_eq!(parse_iso8601_duration(""), None);
        assert_eq!(parse_iso8601_duration("P0D"), None);
        assert_eq!(parse_iso8601_duration("PT0S"), None);
        assert_eq!(parse_iso8601_duration("garbage"), None);
        assert_eq!(format_duration(parse_iso8601_duration("")), UNKNOWN);
        assert_eq!(format_duration(Some(0)), UNKNOWN);
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let short = "short text";
        assert_eq!(truncate_description(short), short);

        let long = "é".repeat(DESCRIPTION_LIMIT + 20);
        let truncated = truncate_description(&long);
        assert!(truncated.ends_with(DESCRIPTION_ELLIPSIS));
        assert_eq!(truncated.chars().count(), DESCRIPTION_LIMIT + DESCRIPTION_ELLIPSIS.len());

        let exact = "a".repeat(DESCRIPTION_LIMIT);
        assert_eq!(truncate_description(&exact), exact);
    }

    #[test]
    fn country_prefers_reported_value() {
        assert_eq!(resolve_country(Some("PK"), &[Some("en")]), "PK");
        assert_eq!(resolve_country(None, &[Some("en-GB")]), "US");
        assert_eq!(resolve_country(None, &[None, Some("ur")]), "PK");
        assert_eq!(resolve_country(Some(" "), &[Some("xx")]), GLOBAL_COUNTRY);
        assert_eq!(resolve_country(None, &[]), GLOBAL_COUNTRY);
    }

    #[test]
    fn category_falls_back_to_other() {
        assert_eq!(category_label(Some("10")), "Music");
        assert_eq!(category_label(Some("28")), "Science & Technology");
        assert_eq!(category_label(Some("999")), OTHER_CATEGORY);
        assert_eq!(category_label(None), OTHER_CATEGORY);
    }

    #[test]
    fn counts_default_to_zero() {
        assert_eq!(parse_count(Some("1234")), 1234);
        assert_eq!(parse_count(Some("n/a")), 0);
        assert_eq!(parse_count(None), 0);
    }

    #[test]
    fn published_at_splits_into_date_and_time() {
        let (date, time) = split_rfc3339("2009-10-25T06:57:33Z");
        assert_eq!(date, NaiveDate::from_ymd_opt(2009, 10, 25));
        assert_eq!(time, NaiveTime::from_hms_opt(6, 57, 33));
        assert_eq!(split_rfc3339("yesterday"), (None, None));
        assert_eq!(parse_compact_date("20240101"), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(parse_compact_date("2024"), None);
    }

    #[test]
    fn normalize_derives_metrics_and_tags() {
        let raw = RawMetadata {
            identifier: "dQw4w9WgXcQ".into(),
            title: "Never #GonnaGiveYouUp".into(),
            description: format!("{} #rickroll", "x".repeat(DESCRIPTION_LIMIT)),
            view_count: 2_000_000,
            like_count: 40_000,
            channel_name: "Rick Astley".into(),
            country: "US".into(),
            category: "Music".into(),
            source_url: "https://youtu.be/dQw4w9WgXcQ".into(),
            duration_seconds: Some(213),
            ..RawMetadata::default()
        };
        let record = normalize(raw);

        assert_eq!(record.engagement_rate, 2.0);
        assert_eq!(record.performance_score, 100);
        assert!(record.hashtags.contains("#rickroll"));
        assert!(record.hashtags.contains("#GonnaGiveYouUp"));
        assert!(record.description.ends_with(DESCRIPTION_ELLIPSIS));
        assert!(!record.description.contains("#rickroll"));
        assert_eq!(record.duration_text(), "00:03:33");
        assert!(!record.is_placeholder());
    }

    #[test]
    fn normalize_fills_blank_labels() {
        let record = normalize(RawMetadata {
            identifier: "abcdefghijk".into(),
            duration_seconds: Some(0),
            ..RawMetadata::default()
        });
        assert_eq!(record.channel_name, UNKNOWN);
        assert_eq!(record.country, UNKNOWN);
        assert_eq!(record.category, UNKNOWN);
        assert_eq!(record.duration_seconds, None);
    }
}
