//! JSON copy of a report.
//!
//! The document carries the filters that produced the search alongside the
//! articles, so it can be read back without the spreadsheet.

use crate::models::{Article, SearchFilters};
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    filters: &'a SearchFilters,
    total_size: usize,
    articles: &'a [Article],
}

/// Write `articles` and their `filters` to `path` as pretty-printed JSON.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report_json(
    path: &Path,
    filters: &SearchFilters,
    articles: &[Article],
) -> Result<(), Box<dyn Error>> {
    let document = ReportDocument {
        filters,
        total_size: articles.len(),
        articles,
    };
    let json = serde_json::to_string_pretty(&document)?;

    if let Err(e) = fs::write(path, json).await {
        error!(error = %e, "Failed to write JSON report");
        return Err(e.into());
    }
    info!(count = articles.len(), "Wrote JSON report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageSize;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_writes_filters_and_articles() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("report.json");
        let filters = SearchFilters::new(
            "coffee",
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(),
            ImageSize::W240,
        )
        .unwrap();

        write_report_json(&path, &filters, &[]).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["filters"]["phrase"], "coffee");
        assert_eq!(value["filters"]["start_date"], "2024-06-30");
        assert_eq!(value["filters"]["image_size"], "240w");
        assert_eq!(value["total_size"], 0);
        assert!(value["articles"].as_array().unwrap().is_empty());
    }
}
