use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use super::ExportRow;

/// Pretty-printed JSON array, one object per row.
pub fn write_json(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating JSON export {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, rows)
        .with_context(|| format!("serializing JSON export {}", path.display()))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .with_context(|| format!("flushing JSON export {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures;

    #[test]
    fn writes_array_of_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let rows = vec![
            ExportRow::from_record(&fixtures::resolved()),
            ExportRow::from_record(&fixtures::failed()),
        ];
        write_json(&path, &rows).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["hashtags"], "#80s, #RickAstley");
        assert_eq!(array[0]["views"], 1_500_000_000_u64);
        assert_eq!(array[1]["download_url"], "N/A");

        let back: Vec<ExportRow> = serde_json::from_value(value).unwrap();
        assert_eq!(back, rows);
    }
}
