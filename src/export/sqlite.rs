//! SQLite sink. Each export replaces the previous batch so the table always
//! mirrors the latest run, in input order.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params};

use super::ExportRow;

pub const RESULTS_TABLE: &str = "analysis_results";

#[derive(Debug)]
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Opens (and if necessary creates) the database and its table.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating export directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening results DB {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("enabling WAL mode for results DB")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("setting results DB synchronous mode")?;

        let mut store = Self { conn };
        store.ensure_table()?;
        Ok(store)
    }

    fn ensure_table(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {RESULTS_TABLE} (
                position INTEGER PRIMARY KEY,
                identifier TEXT NOT NULL,
                title TEXT NOT NULL,
                upload_date TEXT NOT NULL,
                upload_time TEXT NOT NULL,
                duration TEXT NOT NULL,
                views INTEGER NOT NULL,
                likes INTEGER NOT NULL,
                dislikes INTEGER NOT NULL,
                comments INTEGER NOT NULL,
                engagement_rate REAL NOT NULL,
                performance_score INTEGER NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                channel TEXT NOT NULL,
                channel_id TEXT NOT NULL DEFAULT '',
                country TEXT NOT NULL,
                category TEXT NOT NULL,
                hashtags TEXT NOT NULL DEFAULT '',
                thumbnail TEXT NOT NULL DEFAULT '',
                source_url TEXT NOT NULL,
                download_url TEXT NOT NULL,
                status TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_{RESULTS_TABLE}_identifier
                ON {RESULTS_TABLE}(identifier);
            "#
        ))?;
        tx.commit()?;
        Ok(())
    }

    /// Drops the previous batch and inserts `rows` in one transaction, so a
    /// failure leaves the old contents in place.
    pub fn replace_all(&mut self, rows: &[ExportRow]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DELETE FROM {RESULTS_TABLE}"), [])?;

        {
            let mut insert = tx.prepare(&format!(
                r#"
                INSERT INTO {RESULTS_TABLE} (
                    position, identifier, title, upload_date, upload_time, duration,
                    views, likes, dislikes, comments, engagement_rate, performance_score,
                    description, channel, channel_id, country, category, hashtags,
                    thumbnail, source_url, download_url, status
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                    ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22
                )
                "#
            ))?;
            for (position, row) in rows.iter().enumerate() {
                insert
                    .execute(params![
                        position as i64,
                        row.identifier,
                        row.title,
                        row.upload_date,
                        row.upload_time,
                        row.duration,
                        saturating_i64(row.views),
                        saturating_i64(row.likes),
                        saturating_i64(row.dislikes),
                        saturating_i64(row.comments),
                        row.engagement_rate,
                        row.performance_score,
                        row.description,
                        row.channel,
                        row.channel_id,
                        row.country,
                        row.category,
                        row.hashtags,
                        row.thumbnail,
                        row.source_url,
                        row.download_url,
                        row.status,
                    ])
                    .with_context(|| format!("inserting result row for {}", row.identifier))?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn list_rows(&self) -> Result<Vec<ExportRow>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT identifier, title, upload_date, upload_time, duration,
                   views, likes, dislikes, comments, engagement_rate, performance_score,
                   description, channel, channel_id, country, category, hashtags,
                   thumbnail, source_url, download_url, status
            FROM {RESULTS_TABLE}
            ORDER BY position ASC
            "#
        ))?;

        let mut rows = stmt.query([])?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(row_to_export(row)?);
        }
        Ok(results)
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn row_to_export(row: &Row<'_>) -> Result<ExportRow> {
    let count = |name: &str| -> rusqlite::Result<u64> {
        row.get::<_, i64>(name).map(|value| value.max(0) as u64)
    };
    Ok(ExportRow {
        identifier: row.get("identifier")?,
        title: row.get("title")?,
        upload_date: row.get("upload_date")?,
        upload_time: row.get("upload_time")?,
        duration: row.get("duration")?,
        views: count("views")?,
        likes: count("likes")?,
        dislikes: count("dislikes")?,
        comments: count("comments")?,
        engagement_rate: row.get("engagement_rate")?,
        performance_score: row.get("performance_score")?,
        description: row.get("description")?,
        channel: row.get("channel")?,
        channel_id: row.get("channel_id")?,
        country: row.get("country")?,
        category: row.get("category")?,
        hashtags: row.get("hashtags")?,
        thumbnail: row.get("thumbnail")?,
        source_url: row.get("source_url")?,
        download_url: row.get("download_url")?,
        status: row.get("status")?,
    })
}
