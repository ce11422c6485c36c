//! Reading crawl rows and writing annotated rows

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of the crawl CSV as read by the annotation pass
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaperRow {
    #[serde(rename = "Year")]
    pub year: i32,

    #[serde(rename = "Title")]
    pub title: String,

    #[serde(rename = "Authors")]
    pub authors: String,

    #[serde(rename = "Paper Link")]
    pub paper_link: String,

    #[serde(rename = "PDF Link", default)]
    pub pdf_link: String,
}

/// One row of the annotation output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(rename = "Year")]
    pub year: i32,

    #[serde(rename = "Title")]
    pub title: String,

    #[serde(rename = "Authors")]
    pub authors: String,

    #[serde(rename = "Paper Link")]
    pub paper_link: String,

    #[serde(rename = "Abstract")]
    pub abstract_text: String,

    #[serde(rename = "Category")]
    pub category: String,
}

/// Reads every row of the crawl CSV
///
/// A missing or unreadable file is an error; individual malformed rows are
/// logged and skipped.
pub fn read_papers(path: &Path) -> Result<Vec<PaperRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<PaperRow>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => tracing::warn!("Skipping malformed row {} in {}: {}", index + 1, path.display(), e),
        }
    }

    Ok(rows)
}

/// Loads previously annotated rows
///
/// A missing file means nothing was annotated yet. An unreadable file is
/// logged and treated the same way; it will be rewritten by the next save.
pub fn load_existing(path: &Path) -> Vec<EnrichedRecord> {
    if !path.exists() {
        return Vec::new();
    }

    let parsed = csv::Reader::from_path(path).and_then(|mut reader| {
        reader
            .deserialize::<EnrichedRecord>()
            .collect::<std::result::Result<Vec<_>, _>>()
    });

    match parsed {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!("Could not read existing output {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Writes the header and all rows, replacing `path`
///
/// Rows go to a sibling temporary file first so a failed write leaves the
/// previous output in place.
pub fn save_enriched(path: &Path, rows: &[EnrichedRecord]) -> Result<()> {
    let mut tmp_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "annotation.csv".into());
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    {
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        // Header-only output when there are no rows yet
        if rows.is_empty() {
            writer.write_record(["Year", "Title", "Authors", "Paper Link", "Abstract", "Category"])?;
        }
        writer.flush()?;
    }

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
