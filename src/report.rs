//! Plain-text summary table printed after a batch.

use std::fmt::Write;

use crate::record::CanonicalRecord;

const TITLE_LIMIT: usize = 45;
const TITLE_KEEP: usize = 42;

pub fn render_table(records: &[CanonicalRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<45}  {:>8}  {:>8}  {:>8}  {:<7}  {:>5}  {:>7}",
        "#", "Title", "Views", "Likes", "Duration", "Country", "Score", "Eng %"
    );
    let _ = writeln!(out, "{}", "-".repeat(3 + 2 + 45 + 2 + 8 + 2 + 8 + 2 + 8 + 2 + 7 + 2 + 5 + 2 + 7));

    for (index, record) in records.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<45}  {:>8}  {:>8}  {:>8}  {:<7}  {:>5}  {:>7.2}",
            index + 1,
            short_title(&record.title),
            abbreviate(record.view_count),
            abbreviate(record.like_count),
            record.duration_text(),
            record.country,
            record.performance_score,
            record.engagement_rate,
        );
    }

    let failed = records.iter().filter(|r| r.is_placeholder()).count();
    let _ = writeln!(
        out,
        "\n{} analyzed, {} resolved, {} failed",
        records.len(),
        records.len() - failed,
        failed
    );
    out
}

fn short_title(title: &str) -> String {
    if title.chars().count() > TITLE_LIMIT {
        let mut short: String = title.chars().take(TITLE_KEEP).collect();
        short.push_str("...");
        short
    } else {
        title.to_owned()
    }
}

fn abbreviate(count: u64) -> String {
    if count >= 1_000 {
        format!("{}K", count / 1_000)
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures;

    #[test]
    fn long_titles_are_shortened() {
        assert_eq!(short_title("short"), "short");
        let exact = "t".repeat(TITLE_LIMIT);
        assert_eq!(short_title(&exact), exact);
        let long = "t".repeat(TITLE_LIMIT + 1);
        assert_eq!(short_title(&long), format!("{}...", "t".repeat(TITLE_KEEP)));
    }

    #[test]
    fn counts_are_abbreviated() {
        assert_eq!(abbreviate(999), "999");
        assert_eq!(abbreviate(1_000), "1K");
        assert_eq!(abbreviate(1_500_000_000), "1500000K");
    }

    #[test]
    fn table_lists_every_record() {
        let table = render_table(&[fixtures::resolved(), fixtures::failed()]);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].contains("Title"));
        assert!(lines[2].trim_start().starts_with("1  Never Gonna Give You Up"));
        assert!(lines[2].contains("1500000K"));
        assert!(lines[2].contains("00:03:32"));
        assert!(lines[3].contains("FAILED: Quota/Forbidden"));
        assert!(lines[3].contains("unknown"));
        assert!(table.ends_with("2 analyzed, 1 resolved, 1 failed\n"));
    }
}
