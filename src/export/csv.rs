use std::path::Path;

use anyhow::{Context, Result};

use super::ExportRow;

pub fn write_csv(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut writer = ::csv::Writer::from_path(path)
        .with_context(|| format!("creating CSV export {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("writing CSV row for {}", row.identifier))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing CSV export {}", path.display()))?;
    Ok(())
}

pub fn read_csv(path: &Path) -> Result<Vec<ExportRow>> {
    let mut reader = ::csv::Reader::from_path(path)
        .with_context(|| format!("opening CSV export {}", path.display()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<ExportRow>, _>>()
        .with_context(|| format!("parsing CSV export {}", path.display()))
}
